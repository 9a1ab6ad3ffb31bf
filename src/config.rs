//! Connection configuration.
//!
//! Mirrors the JSON connection-details objects the POS stores per device
//! (`{"port": "COM3", "baudRate": 19200, ...}`), with serde defaults for
//! every key so partial objects are accepted.

use crate::error::{KkmError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: &str = "/dev/ttyS0";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_CASHIER_PASSWORD: u32 = 1;
pub const DEFAULT_ADMIN_PASSWORD: u32 = 30;

/// Baud rates the register can be switched to, indexed by their wire code.
pub const BAUD_RATES: [u32; 7] = [2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// Wire code (0..=6) for a baud rate.
pub fn baud_to_code(baud: u32) -> Option<u8> {
    BAUD_RATES.iter().position(|&b| b == baud).map(|i| i as u8)
}

/// Baud rate for a wire code.
pub fn code_to_baud(code: u8) -> Option<u32> {
    BAUD_RATES.get(code as usize).copied()
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_password() -> u32 {
    DEFAULT_CASHIER_PASSWORD
}

fn default_admin_password() -> u32 {
    DEFAULT_ADMIN_PASSWORD
}

/// Serial connection and operator settings for one register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Per-byte read/write timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Cashier (operator) password.
    #[serde(default = "default_password")]
    pub password: u32,
    /// System administrator password.
    #[serde(default = "default_admin_password")]
    pub admin_password: u32,
    /// Device variant name; `None` means "all commands".
    #[serde(default)]
    pub variant: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            password: DEFAULT_CASHIER_PASSWORD,
            admin_password: DEFAULT_ADMIN_PASSWORD,
            variant: None,
        }
    }
}

impl ConnectionConfig {
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Build from a connection-details JSON object and validate it.
    pub fn from_json(details: &serde_json::Value) -> Result<Self> {
        let config: Self = serde_json::from_value(details.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(KkmError::Argument("port must not be empty".into()));
        }
        if baud_to_code(self.baud_rate).is_none() {
            return Err(KkmError::Argument(format!(
                "unsupported baud rate {} (expected one of {:?})",
                self.baud_rate, BAUD_RATES
            )));
        }
        if self.timeout_ms == 0 {
            return Err(KkmError::Argument("timeoutMs must be > 0".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
