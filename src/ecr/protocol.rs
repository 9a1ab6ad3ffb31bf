//! Link protocol: ENQ/ACK/NAK handshake, framed command exchange and bounded
//! retries over a [`Transport`].
//!
//! One `Protocol` owns one physical line and runs one command at a time.
//! Share it between threads only behind a mutex.

use super::decoder::{self, Response};
use super::frame::{self, ACK, ENQ, NAK, STX};
use super::registry::CommandRegistry;
use super::transport::{SerialTransport, Transport};
use super::values::DeviceProfile;
use crate::config::ConnectionConfig;
use crate::error::{KkmError, Result};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Frame transmissions (and response reads) per handshake round.
pub const MAX_ATTEMPTS: usize = 10;
/// Handshake rounds per command or connect.
pub const CHECK_NUM: usize = 3;

/// Link state of a [`Protocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    /// Connected, nothing in flight.
    Idle,
    /// Connected, a command was sent and its response is awaited.
    Turnaround,
}

/// Outcome of a single ENQ round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    Ready,
    Garbage,
}

pub struct Protocol {
    transport: Box<dyn Transport>,
    registry: &'static CommandRegistry,
    profile: DeviceProfile,
    state: LinkState,
}

impl Protocol {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_registry(transport, CommandRegistry::builtin())
    }

    pub fn with_registry(transport: Box<dyn Transport>, registry: &'static CommandRegistry) -> Self {
        Self {
            transport,
            registry,
            profile: DeviceProfile::default(),
            state: LinkState::Disconnected,
        }
    }

    /// Serial protocol for a validated configuration.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(Box::new(SerialTransport::from_config(config))))
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Idle | LinkState::Turnaround)
    }

    pub fn profile(&self) -> DeviceProfile {
        self.profile
    }

    /// Decoding context used for every later response.
    pub fn set_profile(&mut self, profile: DeviceProfile) {
        self.profile = profile;
    }

    pub fn registry(&self) -> &'static CommandRegistry {
        self.registry
    }

    pub fn description(&self) -> String {
        self.transport.description()
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Open the line and wait for the register to answer an ENQ.
    pub fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.state = LinkState::Connecting;
        if let Err(e) = self.transport.open() {
            self.state = LinkState::Disconnected;
            return Err(KkmError::Connection(format!(
                "cannot open {}: {e}",
                self.transport.description()
            )));
        }

        for round in 1..=CHECK_NUM {
            match self.handshake_round() {
                Ok(Handshake::Ready) => {
                    self.state = LinkState::Idle;
                    info!("Connected to {}", self.transport.description());
                    return Ok(());
                }
                Ok(Handshake::Garbage) => {
                    warn!("Handshake round {round}/{CHECK_NUM} got garbage");
                }
                Err(e) if e.is_connection_error() => {
                    warn!("Handshake round {round}/{CHECK_NUM} failed: {e}");
                }
                Err(e) => {
                    self.close_quietly();
                    return Err(e);
                }
            }
        }

        self.close_quietly();
        Err(KkmError::Connection(format!(
            "{} did not answer {CHECK_NUM} handshakes",
            self.transport.description()
        )))
    }

    pub fn disconnect(&mut self) -> Result<()> {
        if self.state == LinkState::Disconnected {
            return Ok(());
        }
        self.transport.close()?;
        self.state = LinkState::Disconnected;
        info!("Disconnected from {}", self.transport.description());
        Ok(())
    }

    fn close_quietly(&mut self) {
        if let Err(e) = self.transport.close() {
            debug!("Closing {} failed: {e}", self.transport.description());
        }
        self.state = LinkState::Disconnected;
    }

    // -----------------------------------------------------------------------
    // Command exchange
    // -----------------------------------------------------------------------

    /// Send a command whose parameters already contain any password.
    pub fn send_command(&mut self, code: u16, params: &[u8]) -> Result<Response> {
        let frame = frame::encode(code, None, params)?;
        self.exchange(code, &frame)
    }

    /// Send a command with a 4-byte operator password ahead of `params`.
    pub fn command(&mut self, code: u16, password: u32, params: &[u8]) -> Result<Response> {
        let frame = Zeroizing::new(frame::encode(code, Some(password), params)?);
        self.exchange(code, &frame)
    }

    fn exchange(&mut self, code: u16, frame: &[u8]) -> Result<Response> {
        if !self.is_connected() {
            return Err(KkmError::Connection("not connected, call connect() first".into()));
        }
        debug!(
            "Command 0x{:02X} ({})",
            code,
            self.registry.name(code).unwrap_or("unknown")
        );

        for round in 1..=CHECK_NUM {
            if self.handshake_round()? == Handshake::Garbage {
                warn!("Handshake round {round}/{CHECK_NUM} before 0x{code:02X} got garbage");
                continue;
            }

            self.state = LinkState::Turnaround;
            let result = self.turnaround(code, frame);
            self.state = LinkState::Idle;
            return result;
        }

        Err(KkmError::Connection(format!(
            "no clean handshake for 0x{code:02X} in {CHECK_NUM} rounds"
        )))
    }

    /// Write the frame until it is acknowledged, then read the response.
    fn turnaround(&mut self, code: u16, frame: &[u8]) -> Result<Response> {
        for attempt in 1..=MAX_ATTEMPTS {
            self.transport.write(frame)?;
            match self.read_byte()? {
                Some(ACK) => return self.read_response(),
                other => {
                    warn!(
                        "Frame 0x{code:02X} attempt {attempt}/{MAX_ATTEMPTS} not acknowledged ({other:02X?})"
                    );
                }
            }
        }
        Err(KkmError::Connection(format!(
            "command 0x{code:02X} not acknowledged after {MAX_ATTEMPTS} attempts"
        )))
    }

    /// One ENQ round.
    fn handshake_round(&mut self) -> Result<Handshake> {
        self.transport.write(&[ENQ])?;
        match self.read_byte()? {
            None => Err(KkmError::Connection("no answer to ENQ".into())),
            Some(NAK) => Ok(Handshake::Ready),
            Some(ACK) => {
                // register still holds the response to an earlier command
                match self.read_response() {
                    Ok(stale) => {
                        debug!("Discarded pending response to 0x{:02X}", stale.command());
                        Ok(Handshake::Ready)
                    }
                    Err(KkmError::Device(e)) => {
                        warn!("Discarded pending device error: {e}");
                        Ok(Handshake::Ready)
                    }
                    Err(e) => Err(e),
                }
            }
            Some(other) => {
                let dropped = self.transport.drain()?;
                debug!("Unexpected 0x{other:02X} after ENQ, drained {dropped} bytes");
                Ok(Handshake::Garbage)
            }
        }
    }

    /// Read one response frame, acknowledging it or asking for a resend.
    fn read_response(&mut self) -> Result<Response> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.read_byte()? {
                Some(STX) => {}
                other => {
                    return Err(KkmError::Connection(format!(
                        "expected STX, got {other:02X?}"
                    )))
                }
            }

            let len = self.read_byte()?;
            let payload = match len {
                Some(len) => self.transport.read(len as usize)?,
                None => Vec::new(),
            };
            let checksum = self.read_byte()?;

            let valid = match (len, checksum) {
                (Some(len), Some(checksum)) if payload.len() == len as usize => {
                    frame::lrc(&payload) ^ len == checksum
                }
                _ => false,
            };

            if valid {
                self.transport.write(&[ACK])?;
                return decoder::decode_payload(self.registry, &self.profile, &payload);
            }

            warn!("Response checksum mismatch, attempt {attempt}/{MAX_ATTEMPTS}");
            self.transport.write(&[NAK])?;
            self.transport.write(&[ENQ])?;
            match self.read_byte()? {
                Some(ACK) => {}
                other => {
                    return Err(KkmError::ProtocolViolation(format!(
                        "expected ACK after NAK, got {other:02X?}"
                    )))
                }
            }
        }

        Err(KkmError::Connection(format!(
            "no valid response in {MAX_ATTEMPTS} reads"
        )))
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(self.transport.read(1)?.first().copied())
    }
}

impl Drop for Protocol {
    fn drop(&mut self) {
        if self.state != LinkState::Disconnected {
            self.close_quietly();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
