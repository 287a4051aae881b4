use log::{error, info, warn};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::Config;
use crate::devices::{DeviceData, StatusReader, TracerClient, TracerStatus};
use crate::output::{formatter_for, ConsoleSender, DataFormatter, DataSender, FileSender};
use crate::utils::error::TracerError;

/// Outcome of a polling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub succeeded: u64,
    pub failed: u64,
}

pub struct DataService {
    reader: Box<dyn StatusReader>,
    formatter: Box<dyn DataFormatter>,
    senders: Vec<Box<dyn DataSender>>,
    latest: Option<TracerStatus>,
}

impl DataService {
    pub fn new(config: Config) -> Result<Self, TracerError> {
        let reader = TracerClient::new(config.serial_settings());
        Self::with_reader(config, Box::new(reader))
    }

    /// Builds the service around any status source; outputs follow the configuration.
    pub fn with_reader(config: Config, reader: Box<dyn StatusReader>) -> Result<Self, TracerError> {
        config.validate()?;

        info!("🚀 Initializing Data Service");
        info!("📡 {} on {} @ {} baud", reader.device_type(), reader.port_name(), config.baud_rate);

        let formatter = formatter_for(&config.output.default_format)?;
        let mut senders: Vec<Box<dyn DataSender>> = Vec::new();
        senders.push(Box::new(ConsoleSender));
        if let Some(path) = &config.output.file_path {
            senders.push(Box::new(FileSender::new(path, true)));
        }

        Ok(Self {
            reader,
            formatter,
            senders,
            latest: None,
        })
    }

    // Output system management
    pub fn add_sender(&mut self, sender: Box<dyn DataSender>) {
        info!("📤 Added {} sender to {}", sender.sender_type(), sender.destination());
        self.senders.push(sender);
    }

    pub fn set_formatter(&mut self, formatter: Box<dyn DataFormatter>) {
        info!("🎨 Using {} formatter", formatter.name());
        self.formatter = formatter;
    }

    pub fn clear_senders(&mut self) {
        self.senders.clear();
    }

    /// Formatted value of one measurement from the latest snapshot.
    pub fn get_parameter(&self, name: &str) -> Option<String> {
        self.latest.as_ref().and_then(|status| status.get_parameter(name))
    }

    /// Queries the controller once and publishes the snapshot to every sender.
    pub async fn read_once(&mut self) -> Result<TracerStatus, TracerError> {
        let status = self.reader.read_status().await?;

        let header = self.formatter.format_header();
        let body = self.formatter.format_status(&status)?;
        self.broadcast(&format!("{}{}", header, body)).await;

        self.latest = Some(status.clone());
        Ok(status)
    }

    // Sender failures are logged; they never fail the query.
    async fn broadcast(&self, data: &str) {
        for sender in &self.senders {
            if let Err(e) = sender.send(data).await {
                error!(
                    "❌ Failed to send data via {} to {}: {}",
                    sender.sender_type(),
                    sender.destination(),
                    e
                );
            }
        }
    }

    /// Polls every `period` until `count` queries have run (or forever) or Ctrl-C.
    ///
    /// A failed query is logged and polling continues.
    pub async fn run(&mut self, period: Duration, count: Option<u64>) -> PollSummary {
        info!("⏱️  Polling every {:?}", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary = PollSummary::default();

        loop {
            if let Some(limit) = count {
                if summary.succeeded + summary.failed >= limit {
                    break;
                }
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    warn!("🛑 Interrupted, stopping polling");
                    break;
                }
            }

            match self.read_once().await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    error!("❌ Status query failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!("📊 Polling finished: {} successful, {} failed", summary.succeeded, summary.failed);
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modbus::{ResponseBuffer, RESPONSE_BUFFER_LEN};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Fails every other call, starting with the second.
    struct FlakyReader {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StatusReader for FlakyReader {
        fn device_type(&self) -> &str {
            "Fake"
        }

        fn port_name(&self) -> &str {
            "mem"
        }

        async fn read_status(&self) -> Result<TracerStatus, TracerError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 1 {
                return Err(TracerError::Timeout { step: 1, timeout_ms: 2000 });
            }
            let mut bytes = [0u8; RESPONSE_BUFFER_LEN];
            bytes[65] = 42;
            Ok(TracerStatus::from_buffer(&ResponseBuffer::from(bytes), Utc::now()))
        }
    }

    #[derive(Clone, Default)]
    struct MemorySender {
        lines: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl DataSender for MemorySender {
        async fn send(&self, data: &str) -> Result<(), TracerError> {
            self.lines.lock().unwrap().push(data.to_string());
            Ok(())
        }

        fn sender_type(&self) -> &str {
            "memory"
        }

        fn destination(&self) -> &str {
            "vec"
        }
    }

    fn service() -> (DataService, MemorySender) {
        let mut config = Config::default();
        config.output.default_format = "json".to_string();
        let mut service =
            DataService::with_reader(config, Box::new(FlakyReader { calls: AtomicUsize::new(0) })).unwrap();
        let sink = MemorySender::default();
        service.clear_senders();
        service.add_sender(Box::new(sink.clone()));
        (service, sink)
    }

    #[tokio::test]
    async fn test_read_once_publishes() {
        let (mut service, sink) = service();
        let status = service.read_once().await.unwrap();

        assert_eq!(status.battery_soc, 42);
        assert_eq!(service.get_parameter("BatterySOC").as_deref(), Some("42%"));
        let lines = sink.lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"bsoc\":42"));
    }

    #[tokio::test]
    async fn test_run_continues_after_failure() {
        let (mut service, sink) = service();
        let summary = service.run(Duration::from_millis(5), Some(4)).await;

        assert_eq!(summary, PollSummary { succeeded: 2, failed: 2 });
        assert_eq!(sink.lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = Config::default();
        config.output.default_format = "yaml".to_string();
        let reader = Box::new(FlakyReader { calls: AtomicUsize::new(0) });
        assert!(DataService::with_reader(config, reader).is_err());
    }
}
