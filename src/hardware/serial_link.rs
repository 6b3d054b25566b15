//! Serial connection to the transport panel.

use std::io::{self, Read};
use std::time::Duration;

use log::{debug, info, warn};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use crate::config::HardwareConfig;
use crate::error::HardwareError;

const READ_CHUNK_BYTES: usize = 64;
const MAX_PENDING_BYTES: usize = 256;

/// Source of terminator-delimited command tokens.
pub trait HardwareLink: Send {
    fn connect(&mut self) -> Result<(), HardwareError>;
    fn is_connected(&self) -> bool;
    /// Returns the next complete token, or `None` when nothing arrived before the read timeout.
    fn read_token(&mut self) -> Result<Option<String>, HardwareError>;
    fn disconnect(&mut self);
}

/// Accumulates raw bytes and splits them on the terminator.
#[derive(Debug)]
pub struct TokenBuffer {
    terminator: u8,
    pending: Vec<u8>,
}

impl TokenBuffer {
    pub fn new(terminator: char) -> Self {
        let terminator = if terminator.is_ascii() {
            terminator as u8
        } else {
            warn!(
                "SerialLink: non-ASCII terminator {:?} replaced with '.'",
                terminator
            );
            b'.'
        };
        Self {
            terminator,
            pending: Vec::new(),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&self.terminator) {
            debug!(
                "SerialLink: dropping {} bytes without terminator",
                self.pending.len()
            );
            self.pending.clear();
        }
    }

    /// Pops the next non-empty token, trimmed. Partial input stays buffered.
    pub fn next_token(&mut self) -> Option<String> {
        while let Some(end) = self.pending.iter().position(|b| *b == self.terminator) {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let token = String::from_utf8_lossy(&raw[..end]).trim().to_string();
            if !token.is_empty() {
                return Some(token);
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// `HardwareLink` over a serial port opened 8N1 with a read timeout.
pub struct SerialLink {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
    buffer: TokenBuffer,
}

impl SerialLink {
    pub fn new(config: &HardwareConfig) -> Self {
        Self {
            port_name: config.port.clone(),
            baud_rate: config.baud_rate,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            port: None,
            buffer: TokenBuffer::new(config.terminator),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl HardwareLink for SerialLink {
    fn connect(&mut self) -> Result<(), HardwareError> {
        if self.port.is_some() {
            return Ok(());
        }
        let port = serialport::new(self.port_name.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()
            .map_err(|error| HardwareError::Open {
                port: self.port_name.clone(),
                reason: error.to_string(),
            })?;
        info!(
            "SerialLink: connected to {} at {} baud",
            self.port_name, self.baud_rate
        );
        self.buffer.clear();
        self.port = Some(port);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn read_token(&mut self) -> Result<Option<String>, HardwareError> {
        if let Some(token) = self.buffer.next_token() {
            return Ok(Some(token));
        }
        let port = self.port.as_mut().ok_or(HardwareError::NotConnected)?;
        let mut chunk = [0_u8; READ_CHUNK_BYTES];
        match port.read(&mut chunk) {
            Ok(0) => Ok(None),
            Ok(read) => {
                self.buffer.extend(&chunk[..read]);
                Ok(self.buffer.next_token())
            }
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(error) => Err(HardwareError::Io(error)),
        }
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!("SerialLink: disconnected from {}", self.port_name);
        }
        self.buffer.clear();
    }
}
