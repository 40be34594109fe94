//! Constants and small value types for MPEG-2 Transport Stream parsing.

/// Size of a Transport Stream packet in bytes.
pub const TS_PACKET_SIZE: usize = 188;
/// Size of the fixed Transport Stream header in bytes.
pub const TS_HEADER_SIZE: usize = 4;
/// PID carrying the Program Association Table.
pub const PID_PAT: u16 = 0x0000;
/// Table ID of the Program Association Table.
pub const TABLE_ID_PAT: u8 = 0x00;
/// Table ID of the Program Map Table.
pub const TABLE_ID_PMT: u8 = 0x02;
/// Elementary stream type for H.264 video.
pub const STREAM_TYPE_H264: u8 = 0x1b;
/// Elementary stream type for AAC audio.
pub const STREAM_TYPE_AAC: u8 = 0x0f;
/// Clock frequency of the Presentation Time Stamp, in Hz.
pub const PTS_HZ: i64 = 90_000;

/// One entry of a Program Association Table: a program number mapped to
/// either the network PID (`program_number == 0`) or a PMT PID.
#[derive(Debug, Clone, Copy)]
pub struct PatEntry {
    /// Program number; 0 is reserved for the network PID.
    pub program_number: u16,
    /// PID carrying the network information table or the program's PMT.
    pub pid: u16,
}

/// Parsed Program Association Table.
#[derive(Debug, Clone, Default)]
pub struct Pat {
    /// Program entries in table order.
    pub entries: Vec<PatEntry>,
}

impl Pat {
    /// The PID of the first program's PMT, ignoring network-PID entries.
    /// Only the first program is followed; multi-program sources are not
    /// supported.
    pub fn first_program_pmt_pid(&self) -> Option<u16> {
        self.entries
            .iter()
            .find(|e| e.program_number != 0)
            .map(|e| e.pid)
    }
}

/// One elementary stream entry of a Program Map Table.
#[derive(Debug, Clone, Copy)]
pub struct StreamInfo {
    /// Elementary stream type, e.g. [`STREAM_TYPE_H264`].
    pub stream_type: u8,
    /// PID carrying this elementary stream.
    pub elementary_pid: u16,
}

/// Parsed Program Map Table.
#[derive(Debug, Clone, Default)]
pub struct Pmt {
    /// Elementary streams in table order.
    pub streams: Vec<StreamInfo>,
}

impl Pmt {
    /// PID of the first H.264 stream, if any.
    pub fn video_pid(&self) -> Option<u16> {
        self.streams
            .iter()
            .find(|s| s.stream_type == STREAM_TYPE_H264)
            .map(|s| s.elementary_pid)
    }

    /// PID of the first AAC stream, if any.
    pub fn audio_pid(&self) -> Option<u16> {
        self.streams
            .iter()
            .find(|s| s.stream_type == STREAM_TYPE_AAC)
            .map(|s| s.elementary_pid)
    }
}

/// Decoded fixed 4-byte Transport Stream header.
#[derive(Debug, Clone, Copy)]
pub struct TsHeader {
    /// Set when the packet is known to carry an uncorrectable error.
    pub transport_error: bool,
    /// Set when a PSI section or PES packet starts in this packet's payload.
    pub payload_unit_start: bool,
    /// 13-bit packet identifier.
    pub pid: u16,
    /// Adaptation field control, bits 4-5 of byte 3 (`0b01` payload only,
    /// `0b10` adaptation only, `0b11` both).
    pub adaptation_field_control: u8,
}

impl TsHeader {
    /// Whether an adaptation field precedes the payload.
    pub fn has_adaptation_field(&self) -> bool {
        matches!(self.adaptation_field_control, 0b10 | 0b11)
    }

    /// Whether the packet carries a payload.
    pub fn has_payload(&self) -> bool {
        matches!(self.adaptation_field_control, 0b01 | 0b11)
    }
}
