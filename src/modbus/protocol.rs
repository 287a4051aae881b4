//! Request frames for the Tracer status query.
//!
//! Each descriptor is one complete request (unit id, function code, register
//! range and CRC) together with the reply length the controller sends back and
//! the position of that reply inside the assembled response buffer.

use super::crc::crc16_modbus;

/// Size of the logical response buffer all replies are assembled into.
pub const RESPONSE_BUFFER_LEN: usize = 120;

/// Number of request/response round-trips in one status query.
pub const FRAME_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub request: &'static [u8],
    pub reply_len: usize,
    pub offset: usize,
}

impl FrameDescriptor {
    pub const fn new(request: &'static [u8], reply_len: usize, offset: usize) -> Self {
        Self {
            request,
            reply_len,
            offset,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.request[0]
    }

    pub fn function_code(&self) -> u8 {
        self.request[1]
    }

    pub fn start_register(&self) -> u16 {
        u16::from_be_bytes([self.request[2], self.request[3]])
    }

    pub fn register_count(&self) -> u16 {
        u16::from_be_bytes([self.request[4], self.request[5]])
    }

    /// Byte range of this frame's reply inside the response buffer.
    pub fn region(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.reply_len
    }

    /// True when the trailing two bytes are the CRC-16/Modbus of the rest.
    pub fn checksum_valid(&self) -> bool {
        let data_len = self.request.len() - 2;
        let received = u16::from_le_bytes([self.request[data_len], self.request[data_len + 1]]);
        received == crc16_modbus(&self.request[..data_len])
    }
}

/// Status query, in the order it is sent. Regions are disjoint and ascending.
pub static STATUS_FRAMES: [FrameDescriptor; FRAME_COUNT] = [
    // Status registers 0x3200..
    FrameDescriptor::new(&[0x01, 0x04, 0x32, 0x00, 0x00, 0x03, 0xBE, 0xB3], 11, 0),
    // Discrete input 0x2000
    FrameDescriptor::new(&[0x01, 0x02, 0x20, 0x00, 0x00, 0x01, 0xB2, 0x0A], 6, 11),
    // Real-time block: PV, battery, load, temperatures, SOC
    FrameDescriptor::new(&[0x01, 0x43, 0x31, 0x00, 0x00, 0x1B, 0x0A, 0xF2], 51, 17),
    // Battery current
    FrameDescriptor::new(&[0x01, 0x04, 0x33, 0x1A, 0x00, 0x03, 0x9E, 0x88], 11, 68),
    // Statistics: min/max battery voltage and energy counters
    FrameDescriptor::new(&[0x01, 0x04, 0x33, 0x02, 0x00, 0x12, 0xDE, 0x83], 41, 79),
];
