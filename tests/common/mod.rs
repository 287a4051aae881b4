#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracer_monitor::modbus::{Transport, STATUS_FRAMES};

/// What the fake controller does in answer to one request.
#[derive(Debug, Clone)]
pub enum Step {
    Reply(Vec<u8>),
    /// Never answers for this long; a read blocks until then or its timeout.
    Stall(Duration),
    /// Closes the link before answering.
    Eof,
    /// Refuses the request bytes.
    RejectWrite,
}

#[derive(Debug, Default)]
pub struct Wire {
    pub writes: Vec<Vec<u8>>,
    pub closed: bool,
}

/// In-memory transport that answers requests from a script.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    current: Option<Step>,
    pending: VecDeque<u8>,
    chunk: usize,
    read_timeout: Duration,
    wire: Arc<Mutex<Wire>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>) -> (Self, Arc<Mutex<Wire>>) {
        let wire = Arc::new(Mutex::new(Wire::default()));
        let transport = Self {
            script: script.into(),
            current: None,
            pending: VecDeque::new(),
            chunk: usize::MAX,
            read_timeout: Duration::from_secs(60),
            wire: Arc::clone(&wire),
        };
        (transport, wire)
    }

    /// Serves replies at most `chunk` bytes per read.
    pub fn fragmented(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.wire.lock().unwrap().writes.push(buf.to_vec());
        match self.script.pop_front() {
            Some(Step::RejectWrite) => Ok(0),
            Some(Step::Reply(bytes)) => {
                self.pending.extend(bytes);
                self.current = None;
                Ok(buf.len())
            }
            other => {
                self.current = other;
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.pending.is_empty() {
            let n = self.chunk.min(buf.len()).min(self.pending.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.pending.pop_front().unwrap();
            }
            return Ok(n);
        }
        match self.current.take() {
            Some(Step::Stall(d)) => {
                // Like a serial port: block for at most the read timeout.
                let waited = d.min(self.read_timeout);
                thread::sleep(waited);
                if waited < d {
                    self.current = Some(Step::Stall(d - waited));
                }
                Err(io::Error::new(io::ErrorKind::TimedOut, "stalled"))
            }
            _ => Ok(0),
        }
    }
}

impl Transport for ScriptedTransport {
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        if let Ok(mut wire) = self.wire.lock() {
            wire.closed = true;
        }
    }
}

/// Five replies of the declared lengths, all zero.
pub fn zero_replies() -> Vec<Vec<u8>> {
    STATUS_FRAMES.iter().map(|f| vec![0u8; f.reply_len]).collect()
}

/// Replies whose assembled buffer has load on, PV 12.34 V and SOC 80 %.
pub fn sample_replies() -> Vec<Vec<u8>> {
    let mut replies = zero_replies();
    replies[0][8] = 0x01;
    replies[2][24 - 17] = 0x04;
    replies[2][25 - 17] = 0xD2;
    replies[2][65 - 17] = 0x50;
    // Battery current -2.50 A
    replies[3][73 - 68..75 - 68].copy_from_slice(&(-250i16).to_be_bytes());
    // Total generated 5000.00 kWh
    replies[4][112 - 79..116 - 79].copy_from_slice(&500_000u32.to_be_bytes());
    replies
}

pub fn script_of(replies: Vec<Vec<u8>>) -> Vec<Step> {
    replies.into_iter().map(Step::Reply).collect()
}
