use async_trait::async_trait;
use log::debug;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::protocol::{FrameDescriptor, RESPONSE_BUFFER_LEN};
use super::transport::Transport;
use crate::utils::error::TracerError;

// Shortest timeout handed to the transport; some drivers treat zero as "block forever".
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// One request/response round-trip, split so callers can observe the two halves.
#[async_trait]
pub trait ModbusClientTrait: Send + Sync {
    /// Writes the whole request frame. `step` is the 1-based frame index, used in errors.
    async fn send(&self, step: usize, frame: &FrameDescriptor) -> Result<(), TracerError>;

    /// Waits for at least `frame.reply_len` bytes or the response timeout.
    async fn receive(&self, step: usize, frame: &FrameDescriptor) -> Result<Vec<u8>, TracerError>;

    /// Sends `frame` and waits for its reply. `on_sent` runs once the request is on the wire.
    async fn exchange(
        &self,
        step: usize,
        frame: &FrameDescriptor,
        on_sent: &mut (dyn FnMut() + Send),
    ) -> Result<Vec<u8>, TracerError> {
        self.send(step, frame).await?;
        on_sent();
        self.receive(step, frame).await
    }
}

type PendingRead = JoinHandle<io::Result<Vec<u8>>>;

pub struct ModbusClient<T: Transport> {
    port: Arc<Mutex<T>>,
    timeout: Duration,
    // Read that lost the race against the timer and still holds the port.
    abandoned: Mutex<Option<PendingRead>>,
}

impl<T: Transport> ModbusClient<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            port: Arc::new(Mutex::new(transport)),
            timeout,
            abandoned: Mutex::new(None),
        }
    }

    fn timeout_error(&self, step: usize) -> TracerError {
        TracerError::Timeout {
            step,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }

    /// Closes the transport.
    ///
    /// An abandoned read stops at its deadline; it is waited for here so the
    /// transport is dropped before this returns.
    pub async fn release(self) {
        let pending = match self.abandoned.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(read) = pending {
            debug!("⏳ Waiting for abandoned read to stop");
            let _ = read.await;
        }
    }
}

#[async_trait]
impl<T: Transport> ModbusClientTrait for ModbusClient<T> {
    async fn send(&self, step: usize, frame: &FrameDescriptor) -> Result<(), TracerError> {
        debug!("📤 Frame {} request: {}", step, hex::encode(frame.request));

        let mut port = self.port.lock().map_err(|_| TracerError::LockError)?;

        port.write_all(frame.request).map_err(|e| TracerError::WriteFailed {
            step,
            reason: e.to_string(),
        })?;
        port.flush().map_err(|e| TracerError::WriteFailed {
            step,
            reason: format!("Flush failed: {}", e),
        })?;

        Ok(())
    }

    async fn receive(&self, step: usize, frame: &FrameDescriptor) -> Result<Vec<u8>, TracerError> {
        let port = Arc::clone(&self.port);
        let min_len = frame.reply_len;
        let deadline = Instant::now() + self.timeout;

        // The read blocks on the device, so it runs off the async workers. If the
        // timer wins, the read is parked in `abandoned` until `release`.
        let mut read = tokio::task::spawn_blocking(move || -> io::Result<Vec<u8>> {
            let mut port = port
                .lock()
                .map_err(|_| io::Error::new(io::ErrorKind::Other, "transport lock poisoned"))?;
            let mut buf = vec![0u8; RESPONSE_BUFFER_LEN];
            let n = read_at_least(&mut *port, &mut buf, min_len, deadline)?;
            buf.truncate(n);
            Ok(buf)
        });

        let finished = tokio::select! {
            joined = &mut read => Some(joined),
            _ = tokio::time::sleep(self.timeout) => None,
        };

        match finished {
            Some(Ok(Ok(reply))) => {
                debug!("📥 Frame {} reply ({} bytes): {}", step, reply.len(), hex::encode(&reply));
                Ok(reply)
            }
            Some(Ok(Err(e))) if e.kind() == io::ErrorKind::TimedOut => Err(self.timeout_error(step)),
            Some(Ok(Err(e))) => Err(TracerError::ReadFailed { step, reason: e.to_string() }),
            Some(Err(e)) => Err(TracerError::ReadFailed {
                step,
                reason: format!("Read task failed: {}", e),
            }),
            None => {
                if let Ok(mut slot) = self.abandoned.lock() {
                    *slot = Some(read);
                }
                Err(self.timeout_error(step))
            }
        }
    }
}

/// Reads until at least `min` bytes are in `buf`, returning how many were read.
///
/// Every read is bounded by the time left until `deadline`; once it passes
/// with fewer than `min` bytes the result is `TimedOut`, even if the device
/// keeps trickling data. A zero-length read is reported as `UnexpectedEof`.
pub fn read_at_least<R: Transport + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    min: usize,
    deadline: Instant,
) -> io::Result<usize> {
    if buf.len() < min {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer of {} bytes cannot hold {} bytes", buf.len(), min),
        ));
    }

    let mut filled = 0;
    while filled < min {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("deadline passed after {} of {} bytes", filled, min),
            ));
        }
        reader.set_read_timeout(remaining.max(MIN_READ_TIMEOUT))?;

        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("connection closed after {} of {} bytes", filled, min),
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
