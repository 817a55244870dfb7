//! Fans a persisted event out to every downstream replica that is caught
//! up to its pre-image position.

use bytes::{BufMut, BytesMut};
use tracing::{trace, warn};

use common::err::ReError;

use crate::codec::encode_uint;
use crate::event_header::EventHeader;
use crate::router_instance::RouterState;

/// Outbound relay packets past this size are refused rather than built:
/// a malformed or hostile event_size should not translate into an
/// unbounded allocation on the replica fan-out path.
const MAX_RELAY_PACKET_SIZE: usize = 64 * 1024 * 1024;

pub struct ReplicaDistributor;

impl ReplicaDistributor {
    /// `payload` is the raw event bytes as persisted (OK byte already
    /// stripped). Iterates `state.replicas`, relaying to each whose
    /// `binlog_pos` equals this event's pre-image position.
    pub fn distribute(state: &mut RouterState, hdr: &EventHeader, payload: &[u8]) {
        let pre_image = hdr.pre_image_position();
        let is_rotate = hdr.event_type == crate::event_header::ROTATE_EVENT;
        let new_binlog_name = if is_rotate {
            Some(state.binlog_name.clone())
        } else {
            None
        };

        for replica in state.replicas.iter_mut() {
            if replica.binlog_pos != pre_image {
                continue;
            }

            let packet_len = 5 + payload.len();
            if packet_len > MAX_RELAY_PACKET_SIZE {
                let err = ReError::Allocation;
                warn!(error = %err, replica_id = replica.id, packet_len, "skipping relay");
                continue;
            }

            let mut packet = BytesMut::with_capacity(packet_len);
            packet.put_u8(0);
            packet.put_u8(0);
            packet.put_u8(0);
            packet.put_u8(0);
            packet.put_u8(0);
            encode_uint(&mut packet[0..3], hdr.event_size + 1, 24);
            packet[3] = replica.next_seqno();
            packet[4] = 0x00;
            packet.put_slice(payload);

            replica.link.write(packet.freeze());
            replica.binlog_pos = hdr.next_pos as u64;

            if let Some(name) = &new_binlog_name {
                replica.binlog_name = name.clone();
            }

            trace!(replica_id = replica.id, new_pos = replica.binlog_pos, "relayed event");
        }
    }
}
