//! EPsolar Tracer charge controller status reader
//!
//! Queries a Tracer BN-series controller over its RS485/USB serial link with a
//! fixed set of five Modbus-style request frames, assembles the replies into one
//! response buffer and decodes it into a [`TracerStatus`] snapshot.
//!
//! ```no_run
//! # async fn demo() -> Result<(), tracer_monitor::TracerError> {
//! let status = tracer_monitor::status("/dev/ttyUSB0").await?;
//! println!("{}", status);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod devices;
pub mod modbus;
pub mod output;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use devices::{query_status, DeviceData, StatusQuery, StatusReader, TracerClient, TracerStatus};
pub use modbus::{list_ports, ModbusClient, SerialSettings, Transport};
pub use output::{DataFormatter, DataSender, JsonFormatter, TextFormatter};
pub use services::DataService;
pub use utils::error::TracerError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Reads one status snapshot from the controller on `port_name` (115200 8N1, 2 s per frame).
///
/// The port is opened for this call only and released before returning.
pub async fn status(port_name: &str) -> Result<TracerStatus, TracerError> {
    TracerClient::new(SerialSettings::new(port_name)).read_status().await
}
