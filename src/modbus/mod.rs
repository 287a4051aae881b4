pub mod buffer;
pub mod client;
pub mod crc;
pub mod protocol;
pub mod transport;

pub use buffer::ResponseBuffer;
pub use client::{read_at_least, ModbusClient, ModbusClientTrait};
pub use crc::crc16_modbus;
pub use protocol::{FrameDescriptor, FRAME_COUNT, RESPONSE_BUFFER_LEN, STATUS_FRAMES};
pub use transport::{list_ports, open_serial, ParityConfig, PortInfo, SerialSettings, Transport};
