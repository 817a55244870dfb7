pub mod assembler;
pub mod bootstrap;
pub mod codec;
pub mod distributor;
pub mod event_header;
pub mod event_router;
pub mod handshake;
pub mod router_instance;
pub mod serializer;
pub mod storage;
pub mod transport;

pub mod testing;

pub use event_header::EventHeader;
pub use handshake::HandshakeState;
pub use router_instance::{Replica, RouterInstance, Stats};
pub use storage::StorageSink;
pub use transport::Transport;

/// Fixed width of the filename field in the dump-request and rotate-event
/// payloads. The source this core was distilled from hardcodes this; we
/// size it generously per the §9 design note on `stats.events`.
pub const BINLOG_FNAMELEN: usize = 256;
