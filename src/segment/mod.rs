//! Virtual HLS segmentation: turning a [`MediaFileIndex`] into byte-range
//! segments given a target duration.

use crate::error::{Result, VdkError};
use crate::index::MediaFileIndex;

/// One virtual HLS segment: a contiguous byte range of the source file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Zero-based sequence number, matching playlist order.
    pub sequence: u32,
    /// Byte offset in the source file where this segment begins.
    pub start_offset: u64,
    /// Length of this segment in bytes.
    pub size: u64,
    /// Segment duration in seconds.
    pub duration: f32,
}

/// Partitions `index` into segments no longer than `target_duration_secs`,
/// accumulating consecutive time slices until the next one would exceed the
/// target, then cutting.
pub fn build_segments(index: &MediaFileIndex, target_duration_secs: u32) -> Vec<Segment> {
    let target = target_duration_secs as f32;
    let mut segments = Vec::new();

    let mut sequence = 0u32;
    let mut start_offset = 0u64;
    let mut duration = 0f32;

    for (i, slice) in index.times.iter().enumerate() {
        let slice_duration = slice.max_time - slice.min_time;
        let next_duration = duration + slice_duration;
        let size = slice.start_offset - start_offset;

        if next_duration > target {
            segments.push(Segment {
                sequence,
                start_offset,
                size,
                duration,
            });
            sequence += 1;
            start_offset = slice.start_offset;
            duration = slice_duration;
        } else {
            duration = next_duration;
        }

        if i == index.times.len() - 1 {
            segments.push(Segment {
                sequence,
                start_offset,
                size: index.video_size - start_offset,
                duration,
            });
        }
    }

    segments
}

/// Resolves a sequence number to its segment, given the full segment list
/// produced by [`build_segments`].
pub fn resolve(segments: &[Segment], sequence: u32) -> Result<Segment> {
    segments
        .binary_search_by_key(&sequence, |s| s.sequence)
        .map(|i| segments[i])
        .map_err(|_| VdkError::GetStreamFailed(format!("no segment with sequence {sequence}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::TimeSlice;

    fn slice(min: f32, max: f32, offset: u64) -> TimeSlice {
        TimeSlice {
            min_time: min,
            max_time: max,
            start_offset: offset,
        }
    }

    #[test]
    fn twelve_one_second_slices_split_at_ten_seconds() {
        let times: Vec<TimeSlice> = (0..12)
            .map(|i| slice(i as f32, (i + 1) as f32, i as u64 * 1_000_000))
            .collect();
        let index = MediaFileIndex {
            video_size: 12_000_000,
            bindwidth: 1_000_000,
            duration: 12,
            times,
        };
        let segments = build_segments(&index, 10);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].sequence, 0);
        assert_eq!(segments[0].start_offset, 0);
        assert_eq!(segments[0].size, 10_000_000);
        assert_eq!(segments[0].duration, 10.0);
        assert_eq!(segments[1].sequence, 1);
        assert_eq!(segments[1].start_offset, 10_000_000);
        assert_eq!(segments[1].size, 2_000_000);
        assert_eq!(segments[1].duration, 2.0);
    }

    #[test]
    fn single_slice_yields_single_segment_covering_whole_file() {
        let index = MediaFileIndex {
            video_size: 188,
            bindwidth: 188,
            duration: 1,
            times: vec![slice(0.0, 0.0, 0)],
        };
        let segments = build_segments(&index, 10);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start_offset, 0);
        assert_eq!(segments[0].size, 188);
    }

    #[test]
    fn segments_are_contiguous_and_cover_video_size() {
        let times: Vec<TimeSlice> = (0..25)
            .map(|i| slice(i as f32, (i + 1) as f32, i as u64 * 100_000))
            .collect();
        let index = MediaFileIndex {
            video_size: 2_500_000,
            bindwidth: 100_000,
            duration: 25,
            times,
        };
        let segments = build_segments(&index, 10);
        let total: u64 = segments.iter().map(|s| s.size).sum();
        assert_eq!(total, index.video_size);
        for w in segments.windows(2) {
            assert_eq!(w[0].start_offset + w[0].size, w[1].start_offset);
        }
        assert_eq!(
            segments.last().unwrap().start_offset + segments.last().unwrap().size,
            index.video_size
        );
    }

    #[test]
    fn resolve_finds_sequence() {
        let segments = vec![
            Segment { sequence: 0, start_offset: 0, size: 10, duration: 1.0 },
            Segment { sequence: 1, start_offset: 10, size: 10, duration: 1.0 },
        ];
        let found = resolve(&segments, 1).unwrap();
        assert_eq!(found.start_offset, 10);
        assert!(resolve(&segments, 2).is_err());
    }
}
