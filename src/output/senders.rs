use async_trait::async_trait;
use log::debug;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::utils::error::TracerError;

#[async_trait]
pub trait DataSender: Send + Sync {
    async fn send(&self, data: &str) -> Result<(), TracerError>;
    fn sender_type(&self) -> &str;
    fn destination(&self) -> &str;
}

pub struct ConsoleSender;

#[async_trait]
impl DataSender for ConsoleSender {
    async fn send(&self, data: &str) -> Result<(), TracerError> {
        println!("{}", data);
        Ok(())
    }

    fn sender_type(&self) -> &str {
        "console"
    }

    fn destination(&self) -> &str {
        "stdout"
    }
}

pub struct FileSender {
    file_path: String,
    append: bool,
}

impl FileSender {
    pub fn new<P: AsRef<Path>>(file_path: P, append: bool) -> Self {
        Self {
            file_path: file_path.as_ref().to_string_lossy().to_string(),
            append,
        }
    }
}

#[async_trait]
impl DataSender for FileSender {
    async fn send(&self, data: &str) -> Result<(), TracerError> {
        debug!("📝 Writing {} bytes to {}", data.len(), self.file_path);

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.file_path)
            .await
            .map_err(|e| TracerError::OutputError(format!("File open error {}: {}", self.file_path, e)))?;

        file.write_all(format!("{}\n", data).as_bytes())
            .await
            .map_err(|e| TracerError::OutputError(format!("File write error {}: {}", self.file_path, e)))?;
        file.flush()
            .await
            .map_err(|e| TracerError::OutputError(format!("File flush error {}: {}", self.file_path, e)))?;

        Ok(())
    }

    fn sender_type(&self) -> &str {
        "file"
    }

    fn destination(&self) -> &str {
        &self.file_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_sender_appends_lines() {
        let path = std::env::temp_dir().join(format!("tracer-monitor-out-{}.jsonl", std::process::id()));
        std::fs::remove_file(&path).ok();

        let sender = FileSender::new(&path, true);
        sender.send("{\"a\":1}").await.unwrap();
        sender.send("{\"a\":2}").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(sender.sender_type(), "file");

        let overwrite = FileSender::new(&path, false);
        overwrite.send("x").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "x\n");

        std::fs::remove_file(&path).ok();
    }
}
