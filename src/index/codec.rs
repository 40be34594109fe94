//! Binary `.tsidx` framing: fixed 18-byte records, each
//! `0xF0|type` ‖ 16-byte payload ‖ `0xFF`.

use bytes::{Buf, BufMut, BytesMut};
use std::io::{self, Read, Write};

use super::{MediaFileIndex, TimeSlice};
use crate::error::{Result, VdkError};

/// Current on-disk index format version.
pub const VERSION: u8 = 0;

const RECORD_LEN: usize = 18;
const TYPE_HEADER: u8 = 0;
const TYPE_SOURCE_INFO: u8 = 1;
const TYPE_TIME_SLICE: u8 = 2;
const TERMINATOR: u8 = 0xff;

/// Encodes `index` as a sequence of framed records and writes them to `w`.
pub fn encode<W: Write>(index: &MediaFileIndex, mut w: W) -> Result<()> {
    let mut buf = BytesMut::with_capacity(RECORD_LEN * (2 + index.times.len()));

    write_record(&mut buf, TYPE_HEADER, |payload| {
        payload.put_u8(VERSION);
        payload.put_u32(index.bindwidth);
        payload.put_u32(index.duration);
        payload.put_slice(&[0u8; 7]);
    });

    write_record(&mut buf, TYPE_SOURCE_INFO, |payload| {
        payload.put_u64(index.video_size);
        payload.put_u64(0);
    });

    for slice in &index.times {
        write_record(&mut buf, TYPE_TIME_SLICE, |payload| {
            payload.put_f32(slice.min_time);
            payload.put_f32(slice.max_time);
            payload.put_u64(slice.start_offset);
        });
    }

    w.write_all(&buf)?;
    Ok(())
}

fn write_record(buf: &mut BytesMut, record_type: u8, fill: impl FnOnce(&mut BytesMut)) {
    let start = buf.len();
    buf.put_u8(0xf0 | record_type);
    fill(buf);
    debug_assert_eq!(buf.len() - start, 17);
    buf.put_u8(TERMINATOR);
}

/// Decodes a `.tsidx` byte stream back into a [`MediaFileIndex`].
pub fn decode<R: Read>(mut r: R) -> Result<MediaFileIndex> {
    let mut bindwidth = None;
    let mut duration = None;
    let mut video_size = None;
    let mut times = Vec::new();

    let mut record = [0u8; RECORD_LEN];
    loop {
        match r.read_exact(&mut record) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(VdkError::Io(e)),
        }

        if record[0] & 0xf0 != 0xf0 {
            return Err(VdkError::GetIndexFailed(format!(
                "bad record header byte: 0x{:02x}",
                record[0]
            )));
        }
        if record[RECORD_LEN - 1] != TERMINATOR {
            return Err(VdkError::GetIndexFailed("missing record terminator".into()));
        }

        let record_type = record[0] & 0x0f;
        let mut payload = &record[1..17];
        match record_type {
            TYPE_HEADER => {
                let version = payload.get_u8();
                if version != VERSION {
                    return Err(VdkError::GetIndexFailed(format!(
                        "unsupported index version: {version}"
                    )));
                }
                bindwidth = Some(payload.get_u32());
                duration = Some(payload.get_u32());
            }
            TYPE_SOURCE_INFO => {
                video_size = Some(payload.get_u64());
            }
            TYPE_TIME_SLICE => {
                let min_time = payload.get_f32();
                let max_time = payload.get_f32();
                let start_offset = payload.get_u64();
                times.push(TimeSlice {
                    min_time,
                    max_time,
                    start_offset,
                });
            }
            other => {
                return Err(VdkError::GetIndexFailed(format!(
                    "unknown record type: {other}"
                )));
            }
        }
    }

    let bindwidth = bindwidth.ok_or_else(|| VdkError::GetIndexFailed("missing header record".into()))?;
    let duration = duration.ok_or_else(|| VdkError::GetIndexFailed("missing header record".into()))?;
    let video_size =
        video_size.ok_or_else(|| VdkError::GetIndexFailed("missing source info record".into()))?;
    if times.is_empty() {
        return Err(VdkError::GetIndexFailed("index has no time slices".into()));
    }

    Ok(MediaFileIndex {
        video_size,
        bindwidth,
        duration,
        times,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> MediaFileIndex {
        MediaFileIndex {
            video_size: 12_000_000,
            bindwidth: 1_000_000,
            duration: 12,
            times: vec![
                TimeSlice {
                    min_time: 0.0,
                    max_time: 0.0,
                    start_offset: 0,
                },
                TimeSlice {
                    min_time: 0.0,
                    max_time: 1.5,
                    start_offset: 188,
                },
            ],
        }
    }

    #[test]
    fn round_trips() {
        let index = sample_index();
        let mut buf = Vec::new();
        encode(&index, &mut buf).unwrap();
        let decoded = decode(&buf[..]).unwrap();
        assert_eq!(decoded.video_size, index.video_size);
        assert_eq!(decoded.bindwidth, index.bindwidth);
        assert_eq!(decoded.duration, index.duration);
        assert_eq!(decoded.times.len(), index.times.len());
        for (a, b) in decoded.times.iter().zip(index.times.iter()) {
            assert_eq!(a.start_offset, b.start_offset);
            assert!((a.min_time - b.min_time).abs() < f32::EPSILON);
            assert!((a.max_time - b.max_time).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn rejects_bad_high_nibble() {
        let index = sample_index();
        let mut buf = Vec::new();
        encode(&index, &mut buf).unwrap();
        buf[0] = 0x00;
        assert!(decode(&buf[..]).is_err());
    }

    #[test]
    fn rejects_missing_terminator() {
        let index = sample_index();
        let mut buf = Vec::new();
        encode(&index, &mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] = 0x00;
        assert!(decode(&buf[..]).is_err());
    }

    #[test]
    fn rejects_empty_stream() {
        assert!(decode(&[][..]).is_err());
    }
}
