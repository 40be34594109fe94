//! URI parsing and `.m3u8` text formatting for the external interface
//! contracts. Pure functions; no I/O.

use crate::error::{Result, VdkError};
use crate::segment::Segment;

/// A parsed playlist or create-index request: the media group and the
/// path relative to that group's root, with the recognized suffix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUri {
    /// Media folder group (first path segment).
    pub group: String,
    /// Path relative to the group's root, without the `.m3u8`/`.ts` suffix.
    pub rel_stem: String,
}

/// A parsed segment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentUri {
    /// Media folder group.
    pub group: String,
    /// Path relative to the group's root, without the `_<seq>.ts` suffix.
    pub rel_stem: String,
    /// Requested segment sequence number.
    pub sequence: u32,
}

fn split_group(path: &str) -> Result<(&str, &str)> {
    let path = path.trim_start_matches('/');
    path.split_once('/')
        .filter(|(group, _)| !group.is_empty())
        .ok_or_else(|| VdkError::GetStreamFailed(format!("URI missing media group: {path}")))
}

/// Parses `<group>/<relpath>.m3u8` (case-insensitive suffix).
pub fn parse_playlist_uri(uri: &str) -> Result<SourceUri> {
    let (group, rest) = split_group(uri)?;
    let rel_stem = strip_suffix_ci(rest, ".m3u8")
        .ok_or_else(|| VdkError::GetStreamFailed(format!("not a playlist URI: {uri}")))?;
    Ok(SourceUri {
        group: group.to_string(),
        rel_stem: rel_stem.to_string(),
    })
}

/// Parses `<group>/<relpath>.ts` (create-index request).
pub fn parse_create_index_uri(uri: &str) -> Result<SourceUri> {
    let (group, rest) = split_group(uri)?;
    let rel_stem = strip_suffix_ci(rest, ".ts")
        .ok_or_else(|| VdkError::GetStreamFailed(format!("not a source URI: {uri}")))?;
    Ok(SourceUri {
        group: group.to_string(),
        rel_stem: rel_stem.to_string(),
    })
}

/// Parses `<group>/<relpath>_<sequence>.ts`.
pub fn parse_segment_uri(uri: &str) -> Result<SegmentUri> {
    let (group, rest) = split_group(uri)?;
    let rest = strip_suffix_ci(rest, ".ts")
        .ok_or_else(|| VdkError::GetStreamFailed(format!("not a segment URI: {uri}")))?;
    let (rel_stem, seq_str) = rest
        .rsplit_once('_')
        .ok_or_else(|| VdkError::GetStreamFailed(format!("segment URI missing sequence: {uri}")))?;
    let sequence: u32 = seq_str
        .parse()
        .map_err(|_| VdkError::GetStreamFailed(format!("invalid segment sequence: {seq_str}")))?;
    Ok(SegmentUri {
        group: group.to_string(),
        rel_stem: rel_stem.to_string(),
        sequence,
    })
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let (head, tail) = s.split_at(s.len() - suffix.len());
    if tail.eq_ignore_ascii_case(suffix) {
        Some(head)
    } else {
        None
    }
}

/// Percent-encodes spaces as `%20`, matching the original playlist emitter.
fn encode_path(path: &str) -> String {
    path.replace(' ', "%20")
}

/// Renders the VOD playlist for `segments` per the external playlist
/// format: one `#EXTINF` (no trailing comma) plus a segment URL per
/// segment, framed by the standard VOD header/footer tags.
pub fn build_playlist(
    segments: &[Segment],
    target_duration_secs: u32,
    host: &str,
    group: &str,
    rel_stem: &str,
) -> String {
    let mut out = String::new();
    out.push_str("#EXTM3U\n");
    out.push_str("#EXT-X-VERSION:4\n");
    out.push_str(&format!("#EXT-X-TARGETDURATION:{target_duration_secs}\n"));
    out.push_str("#EXT-X-MEDIA-SEQUENCE:0\n");
    out.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n");

    let encoded_stem = encode_path(rel_stem);
    for segment in segments {
        out.push_str(&format!("#EXTINF:{:.2}\n", segment.duration));
        out.push_str(&format!(
            "http://{host}/video/{group}/{encoded_stem}_{}.ts\n",
            segment.sequence
        ));
    }

    out.push_str("#EXT-X-ENDLIST\n");
    out
}
