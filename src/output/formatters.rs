use crate::devices::{DeviceData, TracerStatus};
use crate::utils::error::TracerError;

pub trait DataFormatter: Send + Sync {
    fn format_status(&self, status: &TracerStatus) -> Result<String, TracerError>;
    fn format_header(&self) -> String;
    fn name(&self) -> &str;
}

/// `Name: value` lines, one per measurement.
pub struct TextFormatter;

impl DataFormatter for TextFormatter {
    fn format_status(&self, status: &TracerStatus) -> Result<String, TracerError> {
        Ok(format!(
            "☀️  Tracer status at {}\n{}",
            status.timestamp().format("%Y-%m-%d %H:%M:%S UTC"),
            status
        ))
    }

    fn format_header(&self) -> String {
        String::new()
    }

    fn name(&self) -> &str {
        "text"
    }
}

/// One JSON object per snapshot, keyed with the controller's short field names.
pub struct JsonFormatter {
    pub pretty: bool,
}

impl DataFormatter for JsonFormatter {
    fn format_status(&self, status: &TracerStatus) -> Result<String, TracerError> {
        let value = status.to_json();
        let json = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(json)
    }

    fn format_header(&self) -> String {
        String::new() // JSON doesn't need headers
    }

    fn name(&self) -> &str {
        "json"
    }
}

pub fn formatter_for(format: &str) -> Result<Box<dyn DataFormatter>, TracerError> {
    match format {
        "text" => Ok(Box::new(TextFormatter)),
        "json" => Ok(Box::new(JsonFormatter { pretty: false })),
        other => Err(TracerError::ConfigError(format!("Unknown output format '{}'", other))),
    }
}
