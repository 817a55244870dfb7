//! The replication event header, and the event-type / flag constants
//! referenced by the event router.

use crate::codec::extract_uint;

/// Numeric values follow the upstream MySQL 5.6 replication specification.
pub const FORMAT_DESCRIPTION_EVENT: u8 = 15;
pub const ROTATE_EVENT: u8 = 4;
pub const HEARTBEAT_EVENT: u8 = 27;

pub const LOG_EVENT_ARTIFICIAL_F: u16 = 0x0020;

/// Offset, within the post-OK-byte pointer, of the error message for a
/// stream-level protocol error. Matches `&ptr[7]` in the source this core
/// was distilled from.
pub const STREAM_ERROR_MESSAGE_OFFSET: usize = 7;

/// Fixed header length, inclusive of the 4-byte MySQL packet header.
pub const HEADER_LEN: usize = 24;

/// One replication event's common header, decoded from a whole wire packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub payload_len: u32,
    pub seqno: u8,
    /// Nonzero means the packet is an error response, not an event.
    pub ok: u8,
    pub timestamp: u32,
    pub event_type: u8,
    pub server_id: u32,
    pub event_size: u32,
    pub next_pos: u32,
    pub flags: u16,
}

impl EventHeader {
    /// Parses the 24-byte header out of a whole packet. Panics if `pkt` is
    /// shorter than [`HEADER_LEN`]; callers must check packet length first
    /// (the event router does, per its own contract).
    pub fn parse(pkt: &[u8]) -> EventHeader {
        debug_assert!(pkt.len() >= HEADER_LEN);
        EventHeader {
            payload_len: extract_uint(&pkt[0..3], 24),
            seqno: pkt[3],
            ok: pkt[4],
            timestamp: extract_uint(&pkt[5..9], 32),
            event_type: pkt[9],
            server_id: extract_uint(&pkt[10..14], 32),
            event_size: extract_uint(&pkt[14..18], 32),
            next_pos: extract_uint(&pkt[18..22], 32),
            flags: extract_uint(&pkt[22..24], 16) as u16,
        }
    }

    pub fn is_artificial(&self) -> bool {
        self.flags & LOG_EVENT_ARTIFICIAL_F != 0
    }

    /// The pre-image position of this event: where it started in the file.
    pub fn pre_image_position(&self) -> u64 {
        self.next_pos as u64 - self.event_size as u64
    }
}
