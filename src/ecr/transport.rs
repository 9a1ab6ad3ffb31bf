//! Transport layer for cash-register communication.
//!
//! Defines the `Transport` trait the link protocol runs on and the serial
//! (COM / RS-232 / USB-serial) implementation. Reads are byte-counted and a
//! short read means the per-byte timeout expired, not an error.

use crate::config::ConnectionConfig;
use crate::error::{KkmError, Result};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info, trace};

// ---------------------------------------------------------------------------
// Transport state
// ---------------------------------------------------------------------------

/// Connection state for transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

// ---------------------------------------------------------------------------
// Transport trait
// ---------------------------------------------------------------------------

/// Half-duplex byte transport to one register.
pub trait Transport: Send {
    /// Open the line.
    fn open(&mut self) -> Result<()>;

    /// Close the line. Closing a closed transport is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Write all bytes.
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `n` bytes. Fewer than `n` means the timeout expired.
    fn read(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Discard bytes until a read times out, so a frame still arriving is
    /// swallowed along with what is already buffered.
    fn drain(&mut self) -> Result<usize> {
        let mut dropped = 0;
        while !self.read(1)?.is_empty() {
            dropped += 1;
        }
        Ok(dropped)
    }

    fn is_open(&self) -> bool;

    fn state(&self) -> TransportState;

    /// Human-readable description of the connection target.
    fn description(&self) -> String;
}

// ---------------------------------------------------------------------------
// Serial transport
// ---------------------------------------------------------------------------

/// Serial transport using the `serialport` crate, 8N1.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    timeout: Duration,
    port: Option<Box<dyn serialport::SerialPort>>,
    state: TransportState,
}

impl SerialTransport {
    pub fn new(port_name: &str, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            port_name: port_name.to_string(),
            baud_rate,
            timeout,
            port: None,
            state: TransportState::Disconnected,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(&config.port, config.baud_rate, config.timeout())
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>> {
        let name = &self.port_name;
        self.port
            .as_mut()
            .ok_or_else(|| KkmError::Connection(format!("serial port {name} is not open")))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        self.state = TransportState::Connecting;
        info!(
            "Opening serial port {} @ {} baud",
            self.port_name, self.baud_rate
        );

        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|e| {
                self.state = TransportState::Error;
                e
            })?;

        self.port = Some(port);
        self.state = TransportState::Connected;
        info!("Serial port {} open", self.port_name);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            info!("Serial port {} closed", self.port_name);
        }
        self.state = TransportState::Disconnected;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        debug!("Serial TX ({} bytes): {:02X?}", data.len(), data);
        let res = port.write_all(data).and_then(|_| port.flush());
        if res.is_err() {
            self.state = TransportState::Error;
        }
        Ok(res?)
    }

    fn read(&mut self, n: usize) -> Result<Vec<u8>> {
        let port = self.port_mut()?;
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    trace!("Serial RX timeout after {filled}/{n} bytes");
                    break;
                }
                Err(e) => {
                    self.state = TransportState::Error;
                    return Err(e.into());
                }
            }
        }
        buf.truncate(filled);
        debug!("Serial RX ({filled} bytes): {:02X?}", &buf);
        Ok(buf)
    }

    fn is_open(&self) -> bool {
        self.state == TransportState::Connected && self.port.is_some()
    }

    fn state(&self) -> TransportState {
        self.state
    }

    fn description(&self) -> String {
        format!("Serial({}@{})", self.port_name, self.baud_rate)
    }
}

/// Names of the serial ports present on this machine.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

// ---------------------------------------------------------------------------
// Scripted transport for tests
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
