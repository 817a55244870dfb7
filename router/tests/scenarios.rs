//! End-to-end scenarios from the component design, driven through the
//! public `Serializer`/`EventRouter` entry points against fake transport
//! and storage collaborators.

use std::sync::Arc;

use bytes::Bytes;
use router::codec::make_query;
use router::event_header::{HEARTBEAT_EVENT, LOG_EVENT_ARTIFICIAL_F, ROTATE_EVENT};
use router::handshake::{HandshakeState, HandshakeStateMachine};
use router::event_router::EventRouter;
use router::router_instance::RouterInstance;
use router::serializer::Serializer;
use router::testing::{FakeStorage, FakeTransport};

fn new_router() -> (Arc<RouterInstance>, Arc<FakeTransport>) {
    let link = Arc::new(FakeTransport::new());
    let router = RouterInstance::new(
        link.clone(),
        1001,
        "abc-uuid".to_string(),
        4000,
        b"mysql-bin.000001".to_vec(),
        4,
        Box::new(FakeStorage::new()),
    );
    (router, link)
}

/// Frames a whole wire packet whose payload is `0x00` (OK marker) followed
/// by `body`, suitable for feeding through `Serializer::on_bytes` (which
/// runs the packet through the real length-prefix assembler).
fn ok_response(body: &[u8]) -> Bytes {
    let payload_len = 1 + body.len();
    let mut pkt = Vec::with_capacity(4 + payload_len);
    pkt.extend_from_slice(&(payload_len as u32).to_le_bytes()[0..3]);
    pkt.push(0); // seqno
    pkt.push(0x00); // OK marker
    pkt.extend_from_slice(body);
    Bytes::from(pkt)
}

/// Frames a whole wire packet carrying a MySQL error indicator (payload
/// byte 0 is `0xFF`) for the handshake-error path.
fn error_response() -> Bytes {
    let payload_len = 4usize;
    let mut pkt = Vec::with_capacity(4 + payload_len);
    pkt.extend_from_slice(&(payload_len as u32).to_le_bytes()[0..3]);
    pkt.push(0); // seqno
    pkt.push(0xFF);
    pkt.extend_from_slice(&[0, 0, 0]);
    Bytes::from(pkt)
}

fn event_packet(event_type: u8, event_size: u32, next_pos: u32, flags: u16, body: &[u8]) -> Bytes {
    let mut pkt = vec![0u8; 24 + body.len()];
    pkt[4] = 0x00;
    pkt[9] = event_type;
    pkt[14..18].copy_from_slice(&event_size.to_le_bytes());
    pkt[18..22].copy_from_slice(&next_pos.to_le_bytes());
    pkt[22..24].copy_from_slice(&flags.to_le_bytes());
    pkt[24..].copy_from_slice(body);
    Bytes::from(pkt)
}

fn rotate_body(position: u64, name: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&(position as u32).to_le_bytes());
    body.extend_from_slice(&((position >> 32) as u32).to_le_bytes());
    body.extend_from_slice(name);
    body
}

/// S1: full handshake drives eleven outbound commands and lands in
/// BinlogDump.
#[test]
fn s1_full_handshake() {
    let (router, link) = new_router();
    HandshakeStateMachine::start(&router);

    let responses: [&[u8]; 10] = [
        b"ts", b"1234", b"ok", b"ok", b"CRC32", b"ON", b"abc-uuid", b"ok", b"ok", b"ok",
    ];
    for r in responses {
        Serializer::on_bytes(&router, ok_response(r));
    }

    let state = router.state.lock().unwrap();
    assert_eq!(state.handshake_state, HandshakeState::BinlogDump);
    assert_eq!(
        state.saved_master.server_id.as_deref(),
        Some(ok_response(b"1234").as_ref())
    );
    assert_eq!(link.writes().len(), 11);

    let first = &link.writes()[0];
    assert_eq!(&first[5..], b"SELECT UNIX_TIMESTAMP()");
}

/// S2: a packet whose 3-byte length header straddles two feeds is still
/// assembled as one 14-byte packet.
#[test]
fn s2_split_header() {
    use router::assembler::PacketAssembler;

    let a: [u8; 2] = [0x0A, 0x00];
    let mut b = vec![0x00u8, 0x00];
    b.extend_from_slice(&[0u8; 10]);

    let mut asm = PacketAssembler::new();
    assert!(asm.feed(&a).is_empty());
    let out = asm.feed(&b);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].len(), 14);
}

/// S3: a rotate event updates name/position and calls storage once.
#[test]
fn s3_rotate() {
    let (router, _link) = new_router();
    let body = rotate_body(0xF0, b"mysql-bin.000042");
    let pkt = event_packet(ROTATE_EVENT, body.len() as u32, 0xF0, 0, &body);

    EventRouter::handle_packet(&router, &pkt);

    let state = router.state.lock().unwrap();
    assert_eq!(state.stats.n_rotates, 1);
    assert_eq!(state.binlog_name, b"mysql-bin.000042");
    assert_eq!(state.binlog_position, 0xF0);
}

/// S4: an artificial rotate updates bookkeeping via `rotate` but never
/// calls `write`, and no replica is distributed to.
#[test]
fn s4_artificial_rotate_skips_write_and_distribution() {
    let (router, _link) = new_router();
    let replica_link = Arc::new(FakeTransport::new());
    router.attach_replica(7, replica_link.clone(), 0);

    let body = rotate_body(0xF0, b"mysql-bin.000042");
    let pkt = event_packet(
        ROTATE_EVENT,
        body.len() as u32,
        0xF0,
        LOG_EVENT_ARTIFICIAL_F,
        &body,
    );

    EventRouter::handle_packet(&router, &pkt);

    assert!(replica_link.writes().is_empty());
    let state = router.state.lock().unwrap();
    assert_eq!(state.stats.n_rotates, 1);
}

/// S5: with two replicas at different positions, only the one already at
/// the event's pre-image position is forwarded to.
#[test]
fn s5_fanout_to_one_of_two_replicas() {
    let (router, _link) = new_router();
    let r1 = Arc::new(FakeTransport::new());
    let r2 = Arc::new(FakeTransport::new());
    router.attach_replica(1, r1.clone(), 100);
    router.attach_replica(2, r2.clone(), 200);

    let pkt = event_packet(0, 50, 250, 0, &[0xCDu8; 50]);
    EventRouter::handle_packet(&router, &pkt);

    assert!(r1.writes().is_empty());
    assert_eq!(r2.writes().len(), 1);

    let state = router.state.lock().unwrap();
    assert_eq!(state.replicas.iter().find(|r| r.id == 2).unwrap().binlog_pos, 250);
    assert_eq!(state.replicas.iter().find(|r| r.id == 1).unwrap().binlog_pos, 100);
}

/// S6: a primary error mid-handshake leaves state untouched and issues no
/// new command; the binlog-error counter (a stream-level concept) is not
/// incremented by a handshake-level error.
#[test]
fn s6_primary_error_mid_handshake() {
    let (router, link) = new_router();
    HandshakeStateMachine::start(&router);
    Serializer::on_bytes(&router, ok_response(b"ts"));
    Serializer::on_bytes(&router, ok_response(b"1234"));
    Serializer::on_bytes(&router, ok_response(b"ok"));

    {
        let state = router.state.lock().unwrap();
        assert_eq!(state.handshake_state, HandshakeState::Chksum1);
    }
    let writes_before = link.writes().len();

    Serializer::on_bytes(&router, error_response());

    let state = router.state.lock().unwrap();
    assert_eq!(state.handshake_state, HandshakeState::Chksum1);
    assert_eq!(state.stats.binlog_errors, 0);
    assert_eq!(link.writes().len(), writes_before);
}

/// Property: heartbeat events are fully inert.
#[test]
fn heartbeat_event_is_a_no_op() {
    let (router, _link) = new_router();
    let pkt = event_packet(HEARTBEAT_EVENT, 0, 0, 0, &[]);
    EventRouter::handle_packet(&router, &pkt);

    let state = router.state.lock().unwrap();
    assert_eq!(state.stats.events_total, 1);
    assert_eq!(state.binlog_position, 4);
}

/// Property: make_query never trails a NUL after the query text.
#[test]
fn codec_query_packet_matches_wire_shape() {
    let pkt = make_query("SHOW VARIABLES LIKE 'SERVER_ID'");
    assert_eq!(pkt[pkt.len() - 1], b'\'');
}
