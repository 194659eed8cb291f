//! Synthetic ULog byte builder shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

const ULOG_MAGIC: [u8; 7] = [0x55, 0x4C, 0x6F, 0x67, 0x01, 0x12, 0x35];
const SYNC_MAGIC: [u8; 8] = [0x2F, 0x73, 0x13, 0x20, 0x25, 0x0C, 0xBB, 0x12];

pub struct ULogBuilder {
    bytes: Vec<u8>,
}

impl ULogBuilder {
    pub fn new() -> Self {
        let mut bytes = ULOG_MAGIC.to_vec();
        bytes.push(1);
        bytes.extend_from_slice(&1_000u64.to_le_bytes());
        Self { bytes }
    }

    pub fn message(mut self, msg_type: u8, payload: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(&(payload.len() as u16).to_le_bytes());
        self.bytes.push(msg_type);
        self.bytes.extend_from_slice(payload);
        self
    }

    /// `B` message with the data-appended incompat bit set
    pub fn flag_bits(self, appended_offset: u64) -> Self {
        let mut payload = vec![0u8; 8];
        payload.extend_from_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0]);
        payload.extend_from_slice(&appended_offset.to_le_bytes());
        payload.extend_from_slice(&[0u8; 16]);
        self.message(b'B', &payload)
    }

    /// `F` message, e.g. `"A:uint64_t timestamp;float x;"`
    pub fn format(self, definition: &str) -> Self {
        self.message(b'F', definition.as_bytes())
    }

    /// `I` message with a `char[n]` string value
    pub fn info(self, key: &str, value: &str) -> Self {
        let declaration = format!("char[{}] {}", value.len(), key);
        let mut payload = vec![declaration.len() as u8];
        payload.extend_from_slice(declaration.as_bytes());
        payload.extend_from_slice(value.as_bytes());
        self.message(b'I', &payload)
    }

    /// `P` message with an `int32_t` value
    pub fn parameter(self, name: &str, value: i32) -> Self {
        let declaration = format!("int32_t {}", name);
        let mut payload = vec![declaration.len() as u8];
        payload.extend_from_slice(declaration.as_bytes());
        payload.extend_from_slice(&value.to_le_bytes());
        self.message(b'P', &payload)
    }

    pub fn add_logged(self, multi_id: u8, msg_id: u16, name: &str) -> Self {
        let mut payload = vec![multi_id];
        payload.extend_from_slice(&msg_id.to_le_bytes());
        payload.extend_from_slice(name.as_bytes());
        self.message(b'A', &payload)
    }

    pub fn remove_logged(self, msg_id: u16) -> Self {
        self.message(b'R', &msg_id.to_le_bytes())
    }

    /// `D` message: timestamp followed by f32 fields
    pub fn data(self, msg_id: u16, timestamp: u64, values: &[f32]) -> Self {
        let mut payload = msg_id.to_le_bytes().to_vec();
        payload.extend_from_slice(&timestamp.to_le_bytes());
        for value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        self.message(b'D', &payload)
    }

    pub fn logging(self, level: u8, timestamp: u64, text: &str) -> Self {
        let mut payload = vec![level];
        payload.extend_from_slice(&timestamp.to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        self.message(b'L', &payload)
    }

    pub fn tagged_logging(self, level: u8, tag: u16, timestamp: u64, text: &str) -> Self {
        let mut payload = vec![level];
        payload.extend_from_slice(&tag.to_le_bytes());
        payload.extend_from_slice(&timestamp.to_le_bytes());
        payload.extend_from_slice(text.as_bytes());
        self.message(b'C', &payload)
    }

    pub fn dropout(self, duration_ms: u16) -> Self {
        self.message(b'O', &duration_ms.to_le_bytes())
    }

    pub fn sync(self) -> Self {
        self.message(b'S', &SYNC_MAGIC)
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write_to(self, path: &Path) -> PathBuf {
        std::fs::write(path, self.finish()).expect("Failed to write test log");
        path.to_path_buf()
    }
}

/// Log with A (timestamp, x, y) logged 3 times and B (timestamp, z) logged twice
pub fn two_message_log() -> ULogBuilder {
    ULogBuilder::new()
        .format("A:uint64_t timestamp;float x;float y;")
        .format("B:uint64_t timestamp;float z;")
        .add_logged(0, 0, "A")
        .add_logged(0, 1, "B")
        .data(0, 100, &[1.0, 2.0])
        .data(1, 150, &[9.5])
        .data(0, 200, &[3.0, 4.0])
        .data(1, 250, &[8.5])
        .data(0, 300, &[5.0, 6.0])
}
