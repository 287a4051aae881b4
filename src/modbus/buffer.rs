use std::fmt;

use super::protocol::{FrameDescriptor, RESPONSE_BUFFER_LEN};

/// The logical reply of one status query: every frame's reply placed at its offset.
#[derive(Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    bytes: [u8; RESPONSE_BUFFER_LEN],
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; RESPONSE_BUFFER_LEN],
        }
    }

    /// Copies `reply` into the buffer starting at the frame's offset.
    ///
    /// Bytes that would run past the end of the buffer are dropped. A reply
    /// longer than its declared length spills into the next frame's region,
    /// which that frame then overwrites.
    pub fn place(&mut self, frame: &FrameDescriptor, reply: &[u8]) {
        let start = frame.offset;
        let n = reply.len().min(RESPONSE_BUFFER_LEN - start);
        self.bytes[start..start + n].copy_from_slice(&reply[..n]);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.bytes[index]
    }

    pub fn slice(&self, start: usize, len: usize) -> &[u8] {
        &self.bytes[start..start + len]
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl From<[u8; RESPONSE_BUFFER_LEN]> for ResponseBuffer {
    fn from(bytes: [u8; RESPONSE_BUFFER_LEN]) -> Self {
        Self { bytes }
    }
}

impl fmt::Debug for ResponseBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseBuffer({})", hex::encode(self.bytes))
    }
}
