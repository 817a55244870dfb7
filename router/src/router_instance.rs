//! `RouterInstance` is the long-lived object per replication relationship:
//! one primary-facing link, its handshake and streaming state, the
//! attached downstream replicas, and the single mutex that serializes
//! everything guarded in §5.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::assembler::PacketAssembler;
use crate::handshake::HandshakeState;
use crate::storage::StorageSink;
use crate::transport::Transport;
use crate::BINLOG_FNAMELEN;

/// A downstream attachment.
pub struct Replica {
    pub id: u64,
    pub link: Arc<dyn Transport>,
    /// The file offset this replica expects as the next event's
    /// pre-image position.
    pub binlog_pos: u64,
    /// Next packet sequence byte to stamp on outbound relay packets;
    /// wraps mod 256.
    pub seqno: u8,
    pub binlog_name: Vec<u8>,
}

impl Replica {
    pub fn new(id: u64, link: Arc<dyn Transport>, binlog_pos: u64) -> Self {
        Replica {
            id,
            link,
            binlog_pos,
            seqno: 0,
            binlog_name: Vec::new(),
        }
    }

    pub(crate) fn next_seqno(&mut self) -> u8 {
        let s = self.seqno;
        self.seqno = self.seqno.wrapping_add(1);
        s
    }
}

/// Verbatim primary responses retained for replay to newly attached
/// replicas, keyed by the handshake state that produced them, plus the
/// synthetic Format-Description event payload.
#[derive(Default)]
pub struct SavedMaster {
    pub server_id: Option<Bytes>,
    pub heartbeat: Option<Bytes>,
    pub chksum1: Option<Bytes>,
    pub chksum2: Option<Bytes>,
    pub gtid_mode: Option<Bytes>,
    pub uuid: Option<Bytes>,
    pub set_slave_uuid: Option<Bytes>,
    pub set_names: Option<Bytes>,

    pub fde_event: Option<Bytes>,
    pub fde_len: u32,
}

/// Counters for {events received, events by type-index 0..0x23, fake
/// events, rotates, binlog errors}. Sized generously past the source's
/// 0x24 bound per the §9 design note.
pub struct Stats {
    pub events_total: u64,
    pub events_by_type: [u64; 256],
    pub fake_events: u64,
    pub n_rotates: u64,
    pub binlog_errors: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            events_total: 0,
            events_by_type: [0; 256],
            fake_events: 0,
            n_rotates: 0,
            binlog_errors: 0,
        }
    }
}

/// Everything guarded by the router lock: the inbound queue, the
/// single-writer flag, the replica set, and the handshake/streaming state.
pub struct RouterState {
    pub queue: VecDeque<Bytes>,
    pub active_logs: bool,
    pub replicas: Vec<Replica>,
    pub saved_master: SavedMaster,

    pub handshake_state: HandshakeState,
    pub primary_server_id: Option<u32>,

    pub binlog_name: Vec<u8>,
    pub binlog_position: u64,

    pub stats: Stats,
    pub assembler: PacketAssembler,
}

impl RouterState {
    fn new(binlog_name: Vec<u8>, binlog_position: u64) -> Self {
        RouterState {
            queue: VecDeque::new(),
            active_logs: false,
            replicas: Vec::new(),
            saved_master: SavedMaster::default(),
            handshake_state: HandshakeState::Authenticated,
            primary_server_id: None,
            binlog_name,
            binlog_position,
            stats: Stats::default(),
            assembler: PacketAssembler::new(),
        }
    }
}

pub struct RouterInstance {
    pub primary_link: Arc<dyn Transport>,
    pub self_server_id: u32,
    pub self_uuid: String,
    pub self_listen_port: u16,

    pub state: Mutex<RouterState>,
    pub storage: Mutex<Box<dyn StorageSink>>,
}

impl RouterInstance {
    pub fn new(
        primary_link: Arc<dyn Transport>,
        self_server_id: u32,
        self_uuid: String,
        self_listen_port: u16,
        binlog_name: Vec<u8>,
        binlog_position: u64,
        storage: Box<dyn StorageSink>,
    ) -> Arc<Self> {
        Arc::new(RouterInstance {
            primary_link,
            self_server_id,
            self_uuid,
            self_listen_port,
            state: Mutex::new(RouterState::new(binlog_name, binlog_position)),
            storage: Mutex::new(storage),
        })
    }

    /// Builds a `RouterInstance` from a loaded `RouterConfig`, the way
    /// the router's owning service is expected to wire one up: identity
    /// and resume position come from config, the link and storage
    /// collaborators are supplied by the caller.
    pub fn from_config(
        cfg: &common::config::RouterConfig,
        primary_link: Arc<dyn Transport>,
        storage: Box<dyn StorageSink>,
    ) -> Arc<Self> {
        RouterInstance::new(
            primary_link,
            cfg.self_server_id,
            cfg.self_uuid.clone(),
            cfg.self_listen_port,
            cfg.binlog_file.clone().into_bytes(),
            cfg.binlog_position,
            storage,
        )
    }

    /// Registers a newly-handshaken downstream replica. Modeled, per §6,
    /// only as adding an entry to the replica set at an initial position;
    /// replaying `saved_master` to it is the caller's responsibility.
    pub fn attach_replica(&self, id: u64, link: Arc<dyn Transport>, binlog_pos: u64) {
        let mut state = self.state.lock().unwrap();
        state.replicas.push(Replica::new(id, link, binlog_pos));
    }

    /// Removes a replica whose transport has closed.
    pub fn detach_replica(&self, id: u64) {
        let mut state = self.state.lock().unwrap();
        state.replicas.retain(|r| r.id != id);
    }

    pub fn binlog_fnamelen(&self) -> usize {
        BINLOG_FNAMELEN
    }
}
