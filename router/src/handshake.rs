//! Drives the primary through the fixed sequence of administrative
//! queries required before a binlog-dump request may be issued.

use bytes::Bytes;
use tracing::{debug, warn};

use common::err::ReError;

use crate::codec::make_query;
use crate::router_instance::RouterInstance;

/// States, in strict order. `BinlogDump` is the terminal state: once
/// reached, every subsequent packet is handed to the event router instead
/// of this state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeState {
    Authenticated = 0,
    Timestamp = 1,
    ServerId = 2,
    HbPeriod = 3,
    Chksum1 = 4,
    Chksum2 = 5,
    GtidMode = 6,
    MUuid = 7,
    SUuid = 8,
    Latin1 = 9,
    Register = 10,
    BinlogDump = 11,
}

impl HandshakeState {
    /// Numeric state name, used in error logging the way the source logs
    /// which administrative step failed.
    pub fn name(self) -> &'static str {
        match self {
            HandshakeState::Authenticated => "AUTHENTICATED",
            HandshakeState::Timestamp => "TIMESTAMP",
            HandshakeState::ServerId => "SERVERID",
            HandshakeState::HbPeriod => "HBPERIOD",
            HandshakeState::Chksum1 => "CHKSUM1",
            HandshakeState::Chksum2 => "CHKSUM2",
            HandshakeState::GtidMode => "GTIDMODE",
            HandshakeState::MUuid => "MUUID",
            HandshakeState::SUuid => "SUUID",
            HandshakeState::Latin1 => "LATIN1",
            HandshakeState::Register => "REGISTER",
            HandshakeState::BinlogDump => "BINLOGDUMP",
        }
    }
}

pub struct HandshakeStateMachine;

impl HandshakeStateMachine {
    /// Sends `SELECT UNIX_TIMESTAMP()` and transitions into `Timestamp`.
    /// The explicit entry point distinct from "on response" — the source's
    /// `blr_start_master` — since the state table in §4.2 only describes
    /// transitions out of responses.
    pub fn start(router: &RouterInstance) {
        {
            let mut state = router.state.lock().unwrap();
            state.handshake_state = HandshakeState::Timestamp;
        }
        router.primary_link.write(make_query("SELECT UNIX_TIMESTAMP()"));
    }

    /// Processes one inbound response while in a handshake state. Returns
    /// `true` if the buffer was consumed by the handshake (whether or not
    /// it advanced state); `false` means the router is already streaming
    /// and the caller should hand the buffer to the event router instead.
    pub fn on_response(router: &RouterInstance, buf: &Bytes) -> bool {
        let current = {
            let state = router.state.lock().unwrap();
            state.handshake_state
        };

        if current == HandshakeState::BinlogDump {
            return false;
        }

        if buf.len() > 4 && buf[4] == 0xFF {
            warn!(state = current.name(), "primary returned an error during handshake");
            return true;
        }

        let next = match current {
            HandshakeState::Authenticated => {
                // `start()` is the only legitimate entry into Timestamp;
                // reaching this arm means on_response was called before
                // start(). Treat as an invalid state per §7.
                let err = ReError::InvalidState(current as u8);
                warn!(error = %err, "handshake response received before start()");
                return true;
            }
            HandshakeState::Timestamp => Some((
                None,
                make_query("SHOW VARIABLES LIKE 'SERVER_ID'"),
                HandshakeState::ServerId,
            )),
            HandshakeState::ServerId => Some((
                Some(SavedSlot::ServerId),
                make_query("SET @master_heartbeat_period = 1799999979520"),
                HandshakeState::HbPeriod,
            )),
            HandshakeState::HbPeriod => Some((
                Some(SavedSlot::Heartbeat),
                make_query("SET @master_binlog_checksum = @@global.binlog_checksum"),
                HandshakeState::Chksum1,
            )),
            HandshakeState::Chksum1 => Some((
                Some(SavedSlot::Chksum1),
                make_query("SELECT @master_binlog_checksum"),
                HandshakeState::Chksum2,
            )),
            HandshakeState::Chksum2 => Some((
                Some(SavedSlot::Chksum2),
                make_query("SELECT @@GLOBAL.GTID_MODE"),
                HandshakeState::GtidMode,
            )),
            HandshakeState::GtidMode => Some((
                Some(SavedSlot::GtidMode),
                make_query("SHOW VARIABLES LIKE 'SERVER_UUID'"),
                HandshakeState::MUuid,
            )),
            HandshakeState::MUuid => Some((
                Some(SavedSlot::Uuid),
                make_query(&format!("SET @slave_uuid='{}'", router.self_uuid)),
                HandshakeState::SUuid,
            )),
            HandshakeState::SUuid => Some((
                Some(SavedSlot::SetSlaveUuid),
                make_query("SET NAMES latin1"),
                HandshakeState::Latin1,
            )),
            HandshakeState::Latin1 => {
                let primary_server_id = {
                    let state = router.state.lock().unwrap();
                    state.primary_server_id.unwrap_or(0)
                };
                Some((
                    Some(SavedSlot::SetNames),
                    crate::codec::make_register_replica(
                        router.self_server_id,
                        router.self_listen_port,
                        primary_server_id,
                    ),
                    HandshakeState::Register,
                ))
            }
            HandshakeState::Register => {
                let (binlog_position, binlog_name) = {
                    let state = router.state.lock().unwrap();
                    (state.binlog_position, state.binlog_name.clone())
                };
                Some((
                    None,
                    crate::codec::make_dump_request(
                        router.self_server_id,
                        binlog_position as u32,
                        &binlog_name,
                    ),
                    HandshakeState::BinlogDump,
                ))
            }
            HandshakeState::BinlogDump => unreachable!("handled above"),
        };

        let Some((slot, next_packet, next_state)) = next else {
            return true;
        };

        {
            let mut state = router.state.lock().unwrap();
            if let Some(slot) = slot {
                slot.store(&mut state.saved_master, buf.clone());
            }
            state.handshake_state = next_state;
        }

        debug!(from = current.name(), to = next_state.name(), "handshake advanced");
        router.primary_link.write(next_packet);
        true
    }
}

/// Which `saved_master` field a handshake response is retained under.
enum SavedSlot {
    ServerId,
    Heartbeat,
    Chksum1,
    Chksum2,
    GtidMode,
    Uuid,
    SetSlaveUuid,
    SetNames,
}

impl SavedSlot {
    fn store(&self, saved: &mut crate::router_instance::SavedMaster, buf: Bytes) {
        match self {
            SavedSlot::ServerId => saved.server_id = Some(buf),
            SavedSlot::Heartbeat => saved.heartbeat = Some(buf),
            SavedSlot::Chksum1 => saved.chksum1 = Some(buf),
            SavedSlot::Chksum2 => saved.chksum2 = Some(buf),
            SavedSlot::GtidMode => saved.gtid_mode = Some(buf),
            SavedSlot::Uuid => saved.uuid = Some(buf),
            SavedSlot::SetSlaveUuid => saved.set_slave_uuid = Some(buf),
            SavedSlot::SetNames => saved.set_names = Some(buf),
        }
    }
}
