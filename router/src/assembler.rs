//! Turns a fragmented byte stream into whole MySQL wire packets.
//!
//! The upstream transport delivers arbitrarily-sized chunks; a packet's
//! 3-byte length header may itself straddle a chunk boundary. We sidestep
//! the source's hand-rolled partial-header bookkeeping (see DESIGN.md on
//! the `reslen >= 3` dead branch) by accumulating everything into one
//! contiguous `BytesMut` and slicing complete packets off the front.

use bytes::{Bytes, BytesMut};
use tracing::warn;

use common::err::ReError;

use crate::codec::extract_uint;

/// Minimum bytes needed to read the 3-byte length header itself.
const HEADER_PREFIX_LEN: usize = 3;

/// Packets whose declared length would exceed this are treated as
/// corrupt: dropped rather than trusted with an unbounded allocation.
const MAX_PACKET_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct PacketAssembler {
    residual: BytesMut,
    pub dropped_packets: u64,
}

impl PacketAssembler {
    pub fn new() -> Self {
        PacketAssembler::default()
    }

    /// Number of bytes currently held as residual (exposed for tests of
    /// the residual-carry property).
    pub fn residual_len(&self) -> usize {
        self.residual.len()
    }

    /// Appends `data` to the held residual and extracts every whole packet
    /// now available. Bytes that do not yet form a whole packet — whether
    /// because the 3-byte length header itself straddles this feed and
    /// the last, or because the declared body hasn't fully arrived — stay
    /// in `residual` for the next call.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.residual.extend_from_slice(data);

        let mut packets = Vec::new();
        loop {
            if self.residual.len() < HEADER_PREFIX_LEN {
                break;
            }

            let declared_len = extract_uint(&self.residual[0..3], 24) as usize;
            let total = declared_len + 4;

            if total > MAX_PACKET_SIZE {
                let err = ReError::Protocol(format!(
                    "declared length {declared_len} exceeds maximum packet size"
                ));
                warn!(error = %err, "dropping packet with implausible declared length");
                self.dropped_packets += 1;
                self.residual.clear();
                break;
            }

            if self.residual.len() < total {
                // Declared length exceeds what we have so far; wait for
                // more bytes from a later feed.
                break;
            }

            let packet = self.residual.split_to(total).freeze();
            packets.push(packet);
        }

        packets
    }
}
