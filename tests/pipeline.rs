//! End-to-end pipeline test: build a synthetic `.ts` file, index it, turn it
//! into segments and a playlist, and resolve a segment back to bytes.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use vdkio::api::Api;
use vdkio::config::{Config, HlsConfig, LoggingConfig, MediaConfig, MediaFolder, ServerConfig};

const TS_PACKET_SIZE: usize = 188;
const STREAM_TYPE_H264: u8 = 0x1b;

fn pat_packet(pmt_pid: u16) -> Vec<u8> {
    let mut p = vec![0xffu8; TS_PACKET_SIZE];
    p[0] = 0x47;
    p[1] = 0x40;
    p[2] = 0x00;
    p[3] = 0x10;
    p[4] = 0x00;
    p[5] = 0x00; // table_id PAT
    p[6] = 0xb0;
    p[7] = 0x0d;
    p[8] = 0x00;
    p[9] = 0x01;
    p[10] = 0xc1;
    p[11] = 0x00;
    p[12] = 0x00;
    p[13] = 0x00;
    p[14] = 0x01;
    p[15] = 0xe0 | ((pmt_pid >> 8) as u8 & 0x1f);
    p[16] = (pmt_pid & 0xff) as u8;
    p
}

fn pmt_packet(pmt_pid: u16, video_pid: u16) -> Vec<u8> {
    let mut p = vec![0xffu8; TS_PACKET_SIZE];
    p[0] = 0x47;
    p[1] = 0x40 | ((pmt_pid >> 8) as u8 & 0x1f);
    p[2] = (pmt_pid & 0xff) as u8;
    p[3] = 0x10;
    p[4] = 0x00;
    p[5] = 0x02; // table_id PMT
    p[6] = 0xb0;
    p[7] = 0x17;
    p[8] = 0x00;
    p[9] = 0x01;
    p[10] = 0xc1;
    p[11] = 0x00;
    p[12] = 0x00;
    p[13] = 0xe1;
    p[14] = 0x00;
    p[15] = 0xf0;
    p[16] = 0x00;
    p[17] = STREAM_TYPE_H264;
    p[18] = 0xe0 | ((video_pid >> 8) as u8 & 0x1f);
    p[19] = (video_pid & 0xff) as u8;
    p[20] = 0xf0;
    p[21] = 0x00;
    p
}

fn pes_packet(video_pid: u16, pts_90khz: i64) -> Vec<u8> {
    let mut p = vec![0xffu8; TS_PACKET_SIZE];
    p[0] = 0x47;
    p[1] = 0x40 | ((video_pid >> 8) as u8 & 0x1f);
    p[2] = (video_pid & 0xff) as u8;
    p[3] = 0x10;
    p[4] = 0x00;
    p[5] = 0x00;
    p[6] = 0x01;
    p[7] = 0xe0;
    p[8] = 0x00;
    p[9] = 0x00;
    p[10] = 0x80;
    p[11] = 0x80;
    p[12] = 5;
    p[13] = 0x21 | (((pts_90khz >> 29) & 0x0e) as u8);
    p[14] = ((pts_90khz >> 22) & 0xff) as u8;
    p[15] = 0x01 | (((pts_90khz >> 14) & 0xfe) as u8);
    p[16] = ((pts_90khz >> 7) & 0xff) as u8;
    p[17] = 0x01 | (((pts_90khz << 1) & 0xfe) as u8);
    p
}

fn build_synthetic_ts(frame_count: u32, frame_spacing_ms: i64, padding_packets: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&pat_packet(0x100));
    data.extend_from_slice(&pmt_packet(0x100, 0x101));
    for i in 0..frame_count {
        let pts = (i as i64 * frame_spacing_ms) * 90;
        data.extend_from_slice(&pes_packet(0x101, pts));
        for _ in 0..padding_packets {
            let mut filler = vec![0xffu8; TS_PACKET_SIZE];
            filler[0] = 0x47;
            filler[1] = 0x1f; // PID 0x1fff, null packet
            filler[2] = 0xff;
            filler[3] = 0x10;
            data.extend_from_slice(&filler);
        }
    }
    data
}

fn test_config(source_dir: &std::path::Path, index_dir: &std::path::Path) -> Config {
    Config {
        server: ServerConfig {
            bind_addr: "127.0.0.1:0".into(),
        },
        media: MediaConfig {
            index_root: index_dir.to_path_buf(),
            folders: vec![MediaFolder {
                group_name: "test".into(),
                local_path: source_dir.to_path_buf(),
            }],
        },
        hls: HlsConfig {
            target_duration_secs: 10,
        },
        logging: LoggingConfig { level: "info".into() },
    }
}

#[test]
fn end_to_end_index_segment_and_playlist() {
    let source_dir = tempfile::tempdir().unwrap();
    let index_dir = tempfile::tempdir().unwrap();

    // 30 frames, one every 500ms, 25 filler packets between each so the
    // segmenter has meaningful byte spans to work with.
    let ts_bytes = build_synthetic_ts(30, 500, 25);
    let source_path = source_dir.path().join("show.ts");
    let mut f = fs::File::create(&source_path).unwrap();
    f.write_all(&ts_bytes).unwrap();
    drop(f);

    let config = test_config(source_dir.path(), index_dir.path());
    let api = Api::new(Arc::new(config));

    let index = api.get_index("test", "show").unwrap();
    assert!(index.duration > 0);
    assert_eq!(index.times[0].min_time, 0.0);
    assert_eq!(index.times[0].start_offset, 0);
    for w in index.times.windows(2) {
        assert_eq!(w[0].max_time, w[1].min_time);
    }

    // A stale-check re-read should return the cached index without
    // rebuilding (no observable difference from the caller's perspective).
    let index_again = api.get_index("test", "show").unwrap();
    assert_eq!(index, index_again);

    let playlist = api.build_playlist("test/show.m3u8", "example.com").unwrap();
    assert!(playlist.starts_with("#EXTM3U\n"));
    assert!(playlist.contains("#EXT-X-PLAYLIST-TYPE:VOD"));
    assert!(playlist.trim_end().ends_with("#EXT-X-ENDLIST"));
    assert!(playlist.contains("test/show_0.ts"));

    let (segment, resolved_source) = api.get_segment("test/show_0.ts").unwrap();
    assert_eq!(segment.sequence, 0);
    assert_eq!(segment.start_offset, 0);
    assert_eq!(resolved_source, source_path);

    let progress = api.get_progress();
    assert!(progress.is_empty());
}

#[test]
fn rebuilds_when_source_is_newer_than_index() {
    let source_dir = tempfile::tempdir().unwrap();
    let index_dir = tempfile::tempdir().unwrap();

    let ts_bytes = build_synthetic_ts(10, 500, 10);
    let source_path = source_dir.path().join("clip.ts");
    fs::write(&source_path, &ts_bytes).unwrap();

    let config = test_config(source_dir.path(), index_dir.path());
    let api = Api::new(Arc::new(config));
    let first = api.get_index("test", "clip").unwrap();

    // Touch the source file so its mtime moves past the index file's.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let more_bytes = build_synthetic_ts(12, 500, 10);
    fs::write(&source_path, &more_bytes).unwrap();

    let second = api.get_index("test", "clip").unwrap();
    assert_ne!(first.video_size, second.video_size);
}
