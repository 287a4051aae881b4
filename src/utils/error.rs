use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("Failed to open serial port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Write failed on frame {step}: {reason}")]
    WriteFailed { step: usize, reason: String },

    #[error("Timed out after {timeout_ms} ms waiting for reply to frame {step}")]
    Timeout { step: usize, timeout_ms: u64 },

    #[error("Read failed on frame {step}: {reason}")]
    ReadFailed { step: usize, reason: String },

    #[error("Lock acquisition failed")]
    LockError,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Output error: {0}")]
    OutputError(String),
}

impl TracerError {
    /// Frame index (1-based) the error was raised on, if it came from an exchange.
    pub fn step(&self) -> Option<usize> {
        match self {
            TracerError::WriteFailed { step, .. }
            | TracerError::Timeout { step, .. }
            | TracerError::ReadFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TracerError::Timeout { .. })
    }
}

impl From<serde_json::Error> for TracerError {
    fn from(err: serde_json::Error) -> Self {
        TracerError::SerializationError(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for TracerError {
    fn from(err: toml::de::Error) -> Self {
        TracerError::ConfigError(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for TracerError {
    fn from(err: toml::ser::Error) -> Self {
        TracerError::ConfigError(format!("TOML encode error: {}", err))
    }
}
