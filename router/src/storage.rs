//! The on-disk binlog storage collaborator. File format and rotation
//! mechanics live outside this core; this trait only describes when the
//! router calls into storage.

use crate::EventHeader;

pub trait StorageSink: Send {
    /// Appends one event's persistent payload (the raw event bytes with
    /// the leading OK byte already stripped).
    fn write(&mut self, header: &EventHeader, payload: &[u8]);

    /// Updates the active file name and offset.
    fn rotate(&mut self, new_name: &[u8], new_position: u64);

    /// Called exactly once per drained inbound chain.
    fn flush(&mut self);
}
