//! Little-endian field encoding and construction of the three outbound
//! command packets sent to the primary during the handshake.

use byteorder::{ByteOrder, LittleEndian};
use bytes::{BufMut, Bytes, BytesMut};

use crate::BINLOG_FNAMELEN;

pub const COM_QUERY: u8 = 0x03;
pub const COM_BINLOG_DUMP: u8 = 0x12;
pub const COM_REGISTER_SLAVE: u8 = 0x15;

/// Writes `value` little-endian into the low `bits/8` bytes of `dst`.
///
/// `bits` must be a multiple of 8 in `8..=32`; `dst` must hold at least
/// `bits/8` bytes.
pub fn encode_uint(dst: &mut [u8], value: u32, bits: u32) {
    debug_assert!(bits % 8 == 0 && (8..=32).contains(&bits));
    let n = (bits / 8) as usize;
    let mut buf = [0u8; 4];
    LittleEndian::write_u32(&mut buf, value);
    dst[..n].copy_from_slice(&buf[..n]);
}

/// Inverse of [`encode_uint`]: reads the low `bits/8` bytes of `src` as a
/// little-endian unsigned integer.
pub fn extract_uint(src: &[u8], bits: u32) -> u32 {
    debug_assert!(bits % 8 == 0 && (8..=32).contains(&bits));
    let n = (bits / 8) as usize;
    let mut buf = [0u8; 4];
    buf[..n].copy_from_slice(&src[..n]);
    LittleEndian::read_u32(&buf)
}

/// Wraps a payload in a MySQL wire packet: 3-byte LE length, 1-byte
/// sequence id (always 0 for the administrative packets built here).
fn wrap_packet(payload: &[u8]) -> Bytes {
    let mut pkt = BytesMut::with_capacity(4 + payload.len());
    pkt.put_u8(0);
    pkt.put_u8(0);
    pkt.put_u8(0);
    pkt.put_u8(0);
    encode_uint(&mut pkt[0..3], payload.len() as u32, 24);
    pkt.put_slice(payload);
    pkt.freeze()
}

/// Payload is one `COM_QUERY` byte followed by the raw query text, no
/// trailing NUL.
pub fn make_query(sql: &str) -> Bytes {
    let mut payload = Vec::with_capacity(1 + sql.len());
    payload.push(COM_QUERY);
    payload.extend_from_slice(sql.as_bytes());
    wrap_packet(&payload)
}

/// Builds the `COM_REGISTER_SLAVE` packet. Layout per the component design:
/// command byte, self server id, three zero-length strings (host/user/pw),
/// listening port, replication rank (0), primary server id.
pub fn make_register_replica(
    self_server_id: u32,
    listen_port: u16,
    primary_server_id: u32,
) -> Bytes {
    let mut payload = [0u8; 18];
    payload[0] = COM_REGISTER_SLAVE;
    encode_uint(&mut payload[1..5], self_server_id, 32);
    payload[5] = 0;
    payload[6] = 0;
    payload[7] = 0;
    encode_uint(&mut payload[8..10], listen_port as u32, 16);
    encode_uint(&mut payload[10..14], 0, 32);
    encode_uint(&mut payload[14..18], primary_server_id, 32);
    wrap_packet(&payload)
}

/// Builds the `COM_BINLOG_DUMP` packet. The payload's filename field is
/// sized to [`BINLOG_FNAMELEN`] rather than the original's hardcoded
/// `0x1b`, which under-allocated relative to the filename it copied in;
/// see DESIGN.md.
pub fn make_dump_request(self_server_id: u32, binlog_position: u32, binlog_name: &[u8]) -> Bytes {
    let mut payload = vec![0u8; 11 + BINLOG_FNAMELEN];
    payload[0] = COM_BINLOG_DUMP;
    encode_uint(&mut payload[1..5], binlog_position, 32);
    encode_uint(&mut payload[5..7], 0, 16);
    encode_uint(&mut payload[7..11], self_server_id, 32);
    let n = binlog_name.len().min(BINLOG_FNAMELEN);
    payload[11..11 + n].copy_from_slice(&binlog_name[..n]);
    wrap_packet(&payload)
}
