//! Dispatches one whole packet received while the router is in the
//! `BinlogDump` state: parses the common header, updates counters,
//! handles the special event types, persists, and forwards to replicas.

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::codec::extract_uint;
use crate::distributor::ReplicaDistributor;
use crate::event_header::{
    EventHeader, FORMAT_DESCRIPTION_EVENT, HEADER_LEN, HEARTBEAT_EVENT, ROTATE_EVENT,
    STREAM_ERROR_MESSAGE_OFFSET,
};
use crate::router_instance::RouterInstance;

pub struct EventRouter;

impl EventRouter {
    pub fn handle_packet(router: &RouterInstance, packet: &Bytes) {
        if packet.len() < HEADER_LEN {
            warn!(len = packet.len(), "packet shorter than the common header, dropping");
            return;
        }

        let hdr = EventHeader::parse(packet);

        if hdr.ok != 0 {
            let msg = Self::extract_error_message(packet);
            warn!(message = %msg, "binlog stream error from primary");
            let mut state = router.state.lock().unwrap();
            state.stats.binlog_errors += 1;
            return;
        }

        {
            let mut state = router.state.lock().unwrap();
            state.stats.events_total += 1;
            state.stats.events_by_type[hdr.event_type as usize] += 1;
        }

        if hdr.event_type == FORMAT_DESCRIPTION_EVENT && hdr.next_pos == 0 {
            Self::handle_fake_format_description(router, packet, &hdr);
            return;
        }

        if hdr.event_type == HEARTBEAT_EVENT {
            trace!("heartbeat event");
            return;
        }

        if hdr.is_artificial() {
            if hdr.event_type == ROTATE_EVENT {
                // Advanced past the OK byte, matching the non-artificial path.
                if let Some((name, position)) = Self::apply_rotate(router, &packet[5..]) {
                    let mut storage = router.storage.lock().unwrap();
                    storage.rotate(&name, position);
                }
            }
            return;
        }

        let payload = &packet[5..];
        {
            let mut storage = router.storage.lock().unwrap();
            storage.write(&hdr, payload);
        }

        // Rotate bookkeeping updates `binlog_name`/`binlog_position` before
        // distribution so replicas that get relayed this event also pick up
        // the post-rotate filename (§4.5).
        let rotated = if hdr.event_type == ROTATE_EVENT {
            Self::apply_rotate(router, payload)
        } else {
            None
        };

        {
            let mut state = router.state.lock().unwrap();
            ReplicaDistributor::distribute(&mut state, &hdr, payload);
            if rotated.is_none() {
                state.binlog_position = hdr.next_pos as u64;
            }
        }

        if let Some((name, position)) = rotated {
            let mut storage = router.storage.lock().unwrap();
            storage.rotate(&name, position);
        }
    }

    /// Called once per drained inbound chain.
    pub fn flush(router: &RouterInstance) {
        let mut storage = router.storage.lock().unwrap();
        storage.flush();
    }

    fn extract_error_message(packet: &Bytes) -> String {
        if packet.len() <= STREAM_ERROR_MESSAGE_OFFSET {
            return String::new();
        }
        let rest = &packet[STREAM_ERROR_MESSAGE_OFFSET..];
        let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }

    /// `next_pos == 0` marks a synthetic Format-Description event: retain
    /// its payload for replay, don't persist or distribute it.
    fn handle_fake_format_description(router: &RouterInstance, packet: &Bytes, hdr: &EventHeader) {
        let mut state = router.state.lock().unwrap();
        state.stats.fake_events += 1;

        let start = 5usize;
        let end = (start + hdr.event_size as usize).min(packet.len());
        let fde = packet.slice(start..end);
        state.saved_master.fde_len = fde.len() as u32;
        state.saved_master.fde_event = Some(fde);
        debug!(size = hdr.event_size, "retained fake format-description event");
    }

    /// Payload layout after the 19-byte common header: 8-byte LE position
    /// (low 32, then high 32), then the new filename. `payload` here is
    /// the packet bytes from the post-OK-byte pointer onward, i.e. it
    /// still includes the 19-byte common header at its front.
    ///
    /// Updates `state.binlog_name`/`state.binlog_position` and the rotate
    /// counter in place, but leaves calling `storage.rotate` to the caller
    /// so the state lock is never held across a storage call. Returns the
    /// new `(name, position)` only when the filename actually changed.
    fn apply_rotate(router: &RouterInstance, payload: &[u8]) -> Option<(Vec<u8>, u64)> {
        const COMMON_HEADER_LEN: usize = 19;
        if payload.len() < COMMON_HEADER_LEN + 8 {
            warn!("rotate event payload too short, dropping");
            return None;
        }

        let low = extract_uint(&payload[COMMON_HEADER_LEN..COMMON_HEADER_LEN + 4], 32) as u64;
        let high = extract_uint(&payload[COMMON_HEADER_LEN + 4..COMMON_HEADER_LEN + 8], 32) as u64;
        let position = low + (high << 32);

        let name_start = COMMON_HEADER_LEN + 8;
        let name = &payload[name_start..];

        let mut state = router.state.lock().unwrap();
        if state.binlog_name != name {
            state.stats.n_rotates += 1;
            state.binlog_name = name.to_vec();
            state.binlog_position = position;
            debug!(position, "binlog rotated");
            Some((state.binlog_name.clone(), position))
        } else {
            None
        }
    }
}
