//! The outbound-link collaborator. Network transport, TLS, and socket I/O
//! live entirely outside this core; a `Transport` is how the router hands
//! bytes to whatever actually owns the wire.

use bytes::Bytes;

/// A non-blocking outbound link: `write` assumes ownership of the packet
/// and must buffer/return promptly so replica fan-out never head-of-line
/// blocks on a slow downstream. `close` is idempotent.
pub trait Transport: Send + Sync {
    fn write(&self, packet: Bytes);
    fn close(&self);
}
