use log::info;
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

use crate::utils::error::TracerError;

/// Byte-oriented duplex channel the protocol engine talks through.
///
/// A serial port is the production transport, tests plug in scripted
/// in-memory ones.
pub trait Transport: Read + Write + Send + 'static {
    /// Bounds how long the next `read` may block.
    ///
    /// Transports whose reads never block (in-memory buffers) keep the default.
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Box<dyn SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_timeout(timeout).map_err(io::Error::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ParityConfig {
    #[default]
    None,
    Even,
    Odd,
}

impl From<ParityConfig> for serialport::Parity {
    fn from(parity: ParityConfig) -> Self {
        match parity {
            ParityConfig::None => serialport::Parity::None,
            ParityConfig::Even => serialport::Parity::Even,
            ParityConfig::Odd => serialport::Parity::Odd,
        }
    }
}

/// Line settings for the controller's RS485 adapter. Data bits are always 8, stop bits 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub parity: ParityConfig,
    pub timeout: Duration,
}

impl SerialSettings {
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate: Self::DEFAULT_BAUD_RATE,
            parity: ParityConfig::None,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_parity(mut self, parity: ParityConfig) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Opens and configures the serial device.
///
/// The read timeout set here is only the initial one; the transceiver narrows
/// it before every read so no read outlives the response deadline.
pub fn open_serial(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, TracerError> {
    info!("🔌 Connecting to Tracer on port: {}", settings.port_name);
    info!(
        "⚙️  Configuration: {} baud, 8 data bits, 1 stop bit, parity {:?}",
        settings.baud_rate, settings.parity
    );

    let port = serialport::new(settings.port_name.as_str(), settings.baud_rate)
        .timeout(settings.timeout)
        .data_bits(serialport::DataBits::Eight)
        .stop_bits(serialport::StopBits::One)
        .parity(settings.parity.into())
        .flow_control(serialport::FlowControl::None)
        .open()
        .map_err(|e| TracerError::OpenFailed {
            port: settings.port_name.clone(),
            reason: e.to_string(),
        })?;

    Ok(port)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: Option<String>,
}

pub fn list_ports() -> Result<Vec<PortInfo>, TracerError> {
    let ports = serialport::available_ports().map_err(|e| TracerError::OpenFailed {
        port: "*".to_string(),
        reason: format!("Failed to enumerate serial ports: {}", e),
    })?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                serialport::SerialPortType::UsbPort(usb) => Some(format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.manufacturer.unwrap_or_default()
                )),
                serialport::SerialPortType::PciPort => Some("PCI".to_string()),
                serialport::SerialPortType::BluetoothPort => Some("Bluetooth".to_string()),
                _ => None,
            };
            PortInfo {
                name: port.port_name,
                description,
            }
        })
        .collect())
}
