//! External interface contracts: the pure, synchronous surface an HTTP
//! layer drives. See [`Api::get_index`], [`Api::create_index`],
//! [`Api::get_segment`], [`Api::get_progress`], [`Api::build_playlist`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::coordinator::{Coordinator, ProgressInfo};
use crate::error::{Result, VdkError};
use crate::index::{self, codec, MediaFileIndex};
use crate::playlist;
use crate::segment::{self, Segment};

/// Ties configuration, the build coordinator, and the index/segment/
/// playlist pure functions together into the five external contracts.
pub struct Api {
    config: Arc<Config>,
    coordinator: Arc<Coordinator>,
}

impl Api {
    /// Builds an `Api` over the given configuration, with a fresh build
    /// coordinator.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            coordinator: Arc::new(Coordinator::new()),
        }
    }

    /// Reads the index for `(source_path, index_path)`, building it if
    /// missing or stale. At most one build per `source_path` runs at a
    /// time across all callers sharing this `Api`.
    fn get_or_build_index(&self, source_path: &Path, index_path: &Path) -> Result<MediaFileIndex> {
        if let Ok(index) = try_read_fresh(source_path, index_path) {
            return Ok(index);
        }

        let file_size = fs::metadata(source_path).map(|m| m.len() as i64).unwrap_or(0);

        self.coordinator.run_exclusive(
            source_path,
            file_size,
            || try_read_fresh(source_path, index_path).ok(),
            |coordinator| {
                if let Ok(index) = try_read_fresh(source_path, index_path) {
                    return Ok(index);
                }
                info!(source = %source_path.display(), "building index");
                let index = index::build_index(source_path, |cur, total| {
                    coordinator.update(source_path, cur, total);
                })?;
                if let Some(parent) = index_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let file = fs::File::create(index_path)?;
                codec::encode(&index, file)?;
                Ok(index)
            },
        )
    }

    /// `get_index(source_uri)`: reads or builds the index for a `.ts`
    /// source, keyed by `(group, rel_path)`.
    pub fn get_index(&self, group: &str, rel_path: &str) -> Result<MediaFileIndex> {
        let source_path = self.config.resolve_source(group, &format!("{rel_path}.ts"))?;
        let index_path = self.config.resolve_index(group, &format!("{rel_path}.tsidx"));
        self.get_or_build_index(&source_path, &index_path)
    }

    /// `create_index(source_uri)`: forces a build if needed, discards the
    /// result.
    pub fn create_index(&self, group: &str, rel_path: &str) -> Result<()> {
        self.get_index(group, rel_path).map(|_| ())
    }

    /// `get_segment(segment_uri)`: resolves a segment request to a byte
    /// range of the local source file.
    pub fn get_segment(&self, uri: &str) -> Result<(Segment, PathBuf)> {
        let parsed = playlist::parse_segment_uri(uri)?;
        let index = self.get_index(&parsed.group, &parsed.rel_stem)?;
        let segments = segment::build_segments(&index, self.config.hls.target_duration_secs);
        let segment = segment::resolve(&segments, parsed.sequence)?;
        let source_path = self
            .config
            .resolve_source(&parsed.group, &format!("{}.ts", parsed.rel_stem))?;
        Ok((segment, source_path))
    }

    /// `get_progress()`: snapshot of builds currently in flight.
    pub fn get_progress(&self) -> Vec<ProgressInfo> {
        self.coordinator.progress()
    }

    /// `build_playlist(source_uri, host)`: loads the index, segments it,
    /// and formats the playlist text.
    pub fn build_playlist(&self, uri: &str, host: &str) -> Result<String> {
        let parsed = playlist::parse_playlist_uri(uri)?;
        let index = self.get_index(&parsed.group, &parsed.rel_stem)?;
        let segments = segment::build_segments(&index, self.config.hls.target_duration_secs);
        Ok(playlist::build_playlist(
            &segments,
            self.config.hls.target_duration_secs,
            host,
            &parsed.group,
            &parsed.rel_stem,
        ))
    }
}

/// Reads `index_path` and returns it only if it exists and is not stale
/// relative to `source_path`'s modification time.
fn try_read_fresh(source_path: &Path, index_path: &Path) -> Result<MediaFileIndex> {
    let index_meta = fs::metadata(index_path)?;
    let source_meta = fs::metadata(source_path)?;
    if source_meta.modified()? > index_meta.modified()? {
        return Err(VdkError::GetIndexFailed("index is stale".into()));
    }
    let file = fs::File::open(index_path)?;
    codec::decode(file)
}

/// Renders `bytes` using binary (1024-based) units, as used in the
/// progress JSON response.
pub fn human_readable_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_human_readable_sizes() {
        assert_eq!(human_readable_bytes(0), "0 B");
        assert_eq!(human_readable_bytes(1023), "1023 B");
        assert_eq!(human_readable_bytes(1024), "1.00 KiB");
        assert_eq!(human_readable_bytes(10 * 1024 * 1024), "10.00 MiB");
    }
}
