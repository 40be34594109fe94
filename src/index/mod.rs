//! Index data model and construction.
//!
//! [`build_index`] drives a [`crate::demux::Demuxer`] over a source file in
//! large chunks, groups the resulting frame events into one-second time
//! slices anchored at PES boundaries, and returns a [`MediaFileIndex`].

pub mod codec;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, trace};

use crate::demux::{Demuxer, FrameEvent};
use crate::demux::types::TS_PACKET_SIZE;
use crate::error::{Result, VdkError};

/// A sub-second grouping of frames sharing a starting byte offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSlice {
    /// Start of this slice, in seconds from the source's first PTS.
    pub min_time: f32,
    /// End of this slice, in seconds from the source's first PTS.
    pub max_time: f32,
    /// Byte offset in the source file where this slice begins.
    pub start_offset: u64,
}

/// The full per-file index: bitrate/duration summary plus ordered time
/// slices.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFileIndex {
    /// Source file size in bytes, captured at index-build time.
    pub video_size: u64,
    /// Average bitrate in bytes/second (`video_size / duration`).
    pub bindwidth: u32,
    /// Duration in whole seconds (`(max_pts - min_pts) / 1000`).
    pub duration: u32,
    /// Time slices in ascending `start_offset` order.
    pub times: Vec<TimeSlice>,
}

/// Number of TS packets read per chunk while indexing (≈18.8 MB).
const READ_CHUNK_PACKETS: usize = 100_000;

/// Drives the demuxer over the source file at `path`, grouping frame events
/// into time slices. `on_progress(bytes_read, total_bytes)` is called after
/// every chunk.
pub fn build_index(path: &Path, mut on_progress: impl FnMut(u64, u64)) -> Result<MediaFileIndex> {
    let mut file = File::open(path)?;
    let video_size = file.metadata()?.len();

    let mut demuxer = Demuxer::new();
    let mut events: Vec<FrameEvent> = Vec::new();

    let chunk_bytes = READ_CHUNK_PACKETS * TS_PACKET_SIZE;
    let mut chunk = vec![0u8; chunk_bytes];
    let mut total_read: u64 = 0;

    loop {
        let mut filled = 0usize;
        while filled < chunk_bytes {
            let n = file.read(&mut chunk[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        let whole_packets = filled / TS_PACKET_SIZE;
        for i in 0..whole_packets {
            let packet = &chunk[i * TS_PACKET_SIZE..(i + 1) * TS_PACKET_SIZE];
            if let Some(event) = demuxer.feed_packet(packet)? {
                trace!(pts_ms = event.pts_ms, offset = event.pkg_offset, "frame event");
                events.push(event);
            }
        }
        total_read += (whole_packets * TS_PACKET_SIZE) as u64;
        on_progress(total_read, video_size);
        if filled < chunk_bytes {
            break;
        }
    }

    debug!(
        video_pid = ?demuxer.video_pid(),
        audio_pid = ?demuxer.audio_pid(),
        frame_count = events.len(),
        "demux complete"
    );

    build_from_events(&events, video_size)
}

/// Pure grouping step, split out from [`build_index`] so it can be unit
/// tested without touching the filesystem.
fn build_from_events(events: &[FrameEvent], video_size: u64) -> Result<MediaFileIndex> {
    if events.is_empty() {
        return Err(VdkError::GetIndexFailed("no video frames found in source".into()));
    }

    let min_pts_ms = events.iter().map(|e| e.pts_ms).min().unwrap();
    let max_pts_ms = events.iter().map(|e| e.pts_ms).max().unwrap();
    let duration = (max_pts_ms - min_pts_ms) / 1000;
    if duration <= 0 {
        return Err(VdkError::GetIndexFailed("integer divide by zero".into()));
    }
    let duration = duration as u32;
    let bindwidth = (video_size / duration as u64) as u32;

    let mut times = Vec::new();
    let mut last_slice_max_time: f32 = 0.0;
    let mut slice_max_time: f32 = 0.0;
    let mut slice_min_time: f32 = 0.0;
    let mut slice_start_offset: u64 = 0;
    let mut new_slice = true;

    for event in events {
        if new_slice {
            slice_min_time = last_slice_max_time;
            slice_start_offset = event.pkg_offset;
            new_slice = false;
        }

        let cur_frame_time = (event.pts_ms - min_pts_ms) as f32 / 1000.0;
        if cur_frame_time > slice_max_time {
            slice_max_time = cur_frame_time;
        }

        if slice_max_time - last_slice_max_time > 1.0 {
            times.push(TimeSlice {
                min_time: slice_min_time,
                max_time: slice_max_time,
                start_offset: slice_start_offset,
            });
            last_slice_max_time = slice_max_time;
            slice_max_time = -1.0;
            new_slice = true;
        }
    }

    times.push(TimeSlice {
        min_time: slice_min_time,
        max_time: slice_max_time,
        start_offset: slice_start_offset,
    });

    Ok(MediaFileIndex {
        video_size,
        bindwidth,
        duration,
        times,
    })
}
