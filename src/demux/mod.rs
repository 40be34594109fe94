//! MPEG-2 Transport Stream demultiplexing.
//!
//! [`Demuxer`] is a stateful, synchronous consumer of 188-byte TS packets.
//! Feed it packets in file order via [`Demuxer::feed_packet`]; it tracks the
//! adopted PAT/PMT and emits a [`FrameEvent`] for every video PES header it
//! recognizes.

pub mod parser;
pub mod types;

use tracing::{debug, trace};

use crate::error::{Result, VdkError};
use types::*;

/// A single video frame's presentation timestamp and the byte offset, in
/// the source file, of the TS packet that introduced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameEvent {
    /// Presentation timestamp in milliseconds (raw 90kHz PTS / 90).
    pub pts_ms: i64,
    /// Byte offset, in the source file, of the TS packet carrying the PES
    /// header this frame's PTS came from.
    pub pkg_offset: u64,
}

/// Raw section bytes accumulated across TS packets for one PID, starting at
/// the `table_id` byte, until `section_number == last_section_number` and
/// `data.len()` reaches the section's declared `section_length`.
#[derive(Default)]
struct AccumulatedSection {
    data: Vec<u8>,
}

/// Stateful TS demultiplexer.
pub struct Demuxer {
    offset: u64,
    pat: Option<Pat>,
    pat_accum: Option<AccumulatedSection>,
    pmt_pid: Option<u16>,
    pmt: Option<Pmt>,
    pmt_accum: Option<AccumulatedSection>,
    video_pid: Option<u16>,
    audio_pid: Option<u16>,
}

impl Default for Demuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demuxer {
    /// Creates a demuxer with no adopted PAT/PMT and a zero byte offset.
    pub fn new() -> Self {
        Self {
            offset: 0,
            pat: None,
            pat_accum: None,
            pmt_pid: None,
            pmt: None,
            pmt_accum: None,
            video_pid: None,
            audio_pid: None,
        }
    }

    /// PID of the identified video elementary stream, once a PMT has been
    /// adopted.
    pub fn video_pid(&self) -> Option<u16> {
        self.video_pid
    }

    /// PID of the identified audio elementary stream, once a PMT has been
    /// adopted.
    pub fn audio_pid(&self) -> Option<u16> {
        self.audio_pid
    }

    /// Feeds one 188-byte packet at the given source-file offset. Returns a
    /// [`FrameEvent`] when this packet introduced a video PES header with a
    /// PTS.
    pub fn feed_packet(&mut self, packet: &[u8]) -> Result<Option<FrameEvent>> {
        if packet.len() != TS_PACKET_SIZE {
            return Err(VdkError::DemuxFailed(format!(
                "expected a {}-byte packet, got {}",
                TS_PACKET_SIZE,
                packet.len()
            )));
        }
        let packet_offset = self.offset;
        self.offset += TS_PACKET_SIZE as u64;

        let header = parser::parse_header(packet)?;
        if header.transport_error {
            return Ok(None);
        }
        if !header.has_payload() {
            return Ok(None);
        }

        let payload_offset = parser::payload_offset(packet, &header)?;
        let payload = &packet[payload_offset..];

        if header.pid == PID_PAT {
            self.handle_psi_packet(PsiTable::Pat, payload, header.payload_unit_start)?;
            return Ok(None);
        }

        if Some(header.pid) == self.pmt_pid {
            self.handle_psi_packet(PsiTable::Pmt, payload, header.payload_unit_start)?;
            return Ok(None);
        }

        if Some(header.pid) == self.video_pid && header.payload_unit_start {
            if payload.is_empty() {
                return Ok(None);
            }
            return match parser::parse_pes_pts(payload)? {
                Some(pts) => {
                    let event = FrameEvent {
                        pts_ms: pts / (PTS_HZ / 1000),
                        pkg_offset: packet_offset,
                    };
                    trace!(pts_ms = event.pts_ms, pkg_offset = event.pkg_offset, "frame event");
                    Ok(Some(event))
                }
                None => Ok(None),
            };
        }

        Ok(None)
    }

    fn handle_psi_packet(&mut self, table: PsiTable, payload: &[u8], pusi: bool) -> Result<()> {
        let accum = match table {
            PsiTable::Pat => &mut self.pat_accum,
            PsiTable::Pmt => &mut self.pmt_accum,
        };
        let Some(section) = accumulate_section(accum, payload, pusi)? else {
            return Ok(());
        };

        match table {
            PsiTable::Pat => {
                let pat = parser::parse_pat(&section)?;
                let changed = self
                    .pat
                    .as_ref()
                    .map(|existing| !pat_entries_equal(existing, &pat))
                    .unwrap_or(true);
                if changed {
                    self.pmt_pid = pat.first_program_pmt_pid();
                    debug!(program_count = pat.entries.len(), "adopted new PAT");
                    self.pat = Some(pat);
                }
            }
            PsiTable::Pmt => {
                let pmt = parser::parse_pmt(&section)?;
                let changed = self
                    .pmt
                    .as_ref()
                    .map(|existing| !pmt_streams_equal(existing, &pmt))
                    .unwrap_or(true);
                if changed {
                    self.video_pid = pmt.video_pid();
                    self.audio_pid = pmt.audio_pid();
                    debug!(
                        video_pid = ?self.video_pid,
                        audio_pid = ?self.audio_pid,
                        "adopted new PMT"
                    );
                    self.pmt = Some(pmt);
                }
            }
        }
        Ok(())
    }
}

enum PsiTable {
    Pat,
    Pmt,
}

/// Accumulates PSI section bytes for one PID across TS packets, returning
/// the complete section (from `table_id` through the byte before CRC32's
/// end, i.e. `3 + section_length` bytes) once it is fully buffered and its
/// `section_number` equals its `last_section_number`.
///
/// Only single-section tables are supported: a section whose
/// `section_number != last_section_number` is dropped rather than
/// concatenated with sibling sections, which matches the single-program
/// PAT/PMT tables this demultiplexer targets.
fn accumulate_section(
    accum: &mut Option<AccumulatedSection>,
    payload: &[u8],
    pusi: bool,
) -> Result<Option<Vec<u8>>> {
    if pusi {
        if payload.is_empty() {
            return Ok(None);
        }
        let pointer_field = payload[0] as usize;
        let section_start = 1 + pointer_field;
        if section_start > payload.len() {
            return Err(VdkError::DemuxFailed("PSI pointer field past end of payload".into()));
        }
        *accum = Some(AccumulatedSection {
            data: payload[section_start..].to_vec(),
        });
    } else {
        match accum {
            Some(acc) => acc.data.extend_from_slice(payload),
            None => return Ok(None),
        }
    }

    let acc = accum.as_ref().expect("just populated above");
    if acc.data.len() < 8 {
        return Ok(None);
    }
    let section_length = (((acc.data[1] & 0x0f) as usize) << 8) | acc.data[2] as usize;
    let total_length = 3 + section_length;
    if acc.data.len() < total_length {
        return Ok(None);
    }

    let section_number = acc.data[6];
    let last_section_number = acc.data[7];
    let mut data = accum.take().unwrap().data;
    if section_number != last_section_number {
        return Ok(None);
    }
    data.truncate(total_length);
    Ok(Some(data))
}

fn pat_entries_equal(a: &Pat, b: &Pat) -> bool {
    a.entries.len() == b.entries.len()
        && a.entries
            .iter()
            .zip(b.entries.iter())
            .all(|(x, y)| x.program_number == y.program_number && x.pid == y.pid)
}

fn pmt_streams_equal(a: &Pmt, b: &Pmt) -> bool {
    a.streams.len() == b.streams.len()
        && a.streams
            .iter()
            .zip(b.streams.iter())
            .all(|(x, y)| x.stream_type == y.stream_type && x.elementary_pid == y.elementary_pid)
}
