use crate::error::{Result, ULogError};

/// Sync marker used to recover after corrupted messages
pub const SYNC_MAGIC: [u8; 8] = [0x2F, 0x73, 0x13, 0x20, 0x25, 0x0C, 0xBB, 0x12];

/// ULog data stream for reading little-endian binary data
pub struct ULogDataStream<'a> {
    data: &'a [u8],
    pub pos: usize,
    end: usize,
    pub eof: bool,
}

impl<'a> ULogDataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            end: data.len(),
            eof: false,
        }
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.end);
        self.eof = self.pos >= self.end;
    }

    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        if self.pos < self.end {
            let byte = self.data[self.pos];
            self.pos += 1;
            Ok(byte)
        } else {
            self.eof = true;
            Err(ULogError::UnexpectedEof)
        }
    }

    /// Borrow the next `len` bytes and advance past them
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            self.eof = true;
            return Err(ULogError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    /// Skip ahead until just past the next sync marker.
    /// Returns the number of bytes skipped, or `None` if no marker remains.
    pub fn skip_to_next_sync(&mut self) -> Option<usize> {
        let start = self.pos;
        let haystack = &self.data[self.pos..self.end];
        match haystack
            .windows(SYNC_MAGIC.len())
            .position(|window| window == SYNC_MAGIC)
        {
            Some(offset) => {
                self.set_position(start + offset + SYNC_MAGIC.len());
                Some(offset + SYNC_MAGIC.len())
            }
            None => {
                self.set_position(self.end);
                None
            }
        }
    }
}

/// Decode string-typed content, lossily when string errors are ignored
pub fn decode_string(bytes: &[u8], ignore_errors: bool) -> Result<String> {
    if ignore_errors {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    } else {
        Ok(std::str::from_utf8(bytes)?.to_string())
    }
}
