use std::io;
use thiserror::Error;

/// Crate-wide error type for the replication core and its ambient plumbing.
#[derive(Debug, Error)]
pub enum ReError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// A malformed or unexpected protocol structure (bad header, truncated
    /// rotate body, declared length mismatch).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Reassembly or packet construction could not allocate the buffer it
    /// needed.
    #[error("allocation failed while building packet")]
    Allocation,

    /// The handshake state machine was invoked in a state outside its valid
    /// range.
    #[error("invalid handshake state: {0}")]
    InvalidState(u8),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    String(String),
}
