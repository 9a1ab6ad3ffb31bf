//! Driver for Shtrih-family fiscal cash registers (KKM).
//!
//! The register speaks a half-duplex binary protocol over RS-232: ENQ/ACK/NAK
//! handshakes around LRC-checked frames. [`Protocol`] runs that exchange and
//! decodes responses through the command registry; [`Device`] adds the typed
//! operations a given [`DeviceVariant`] supports.
//!
//! ```no_run
//! use kkm_driver::{ConnectionConfig, Device};
//!
//! # fn main() -> kkm_driver::Result<()> {
//! let config = ConnectionConfig::from_json_str(
//!     r#"{"port": "/dev/ttyUSB0", "baudRate": 115200, "variant": "Shtrih-M-01F"}"#,
//! )?;
//! let mut device = Device::from_config(&config)?;
//! device.connect()?;
//! let status = device.state()?;
//! println!("{}", serde_json::to_string(&status)?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod discovery;
pub mod ecr;
pub mod error;
pub mod logging;
pub mod text;

pub use config::ConnectionConfig;
pub use ecr::{DecodedResponse, Device, DeviceVariant, Operation, Protocol, Response};
pub use error::{DeviceError, DeviceErrorKind, KkmError, Result};
