//! In-memory `Transport`/`StorageSink` doubles shared by this crate's unit
//! tests and the `tests/` integration suite.

use std::sync::Mutex;

use bytes::Bytes;

use crate::event_header::EventHeader;
use crate::storage::StorageSink;
use crate::transport::Transport;

#[derive(Default)]
pub struct FakeTransport {
    writes: Mutex<Vec<Bytes>>,
    closed: Mutex<bool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        FakeTransport::default()
    }

    pub fn writes(&self) -> Vec<Bytes> {
        self.writes.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl Transport for FakeTransport {
    fn write(&self, packet: Bytes) {
        self.writes.lock().unwrap().push(packet);
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub writes: Vec<(u8, Vec<u8>)>,
    pub rotates: Vec<(Vec<u8>, u64)>,
    pub flushes: u32,
}

impl FakeStorage {
    pub fn new() -> Self {
        FakeStorage::default()
    }
}

impl StorageSink for FakeStorage {
    fn write(&mut self, header: &EventHeader, payload: &[u8]) {
        self.writes.push((header.event_type, payload.to_vec()));
    }

    fn rotate(&mut self, new_name: &[u8], new_position: u64) {
        self.rotates.push((new_name.to_vec(), new_position));
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
