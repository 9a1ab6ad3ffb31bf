//! Driver error types.
//!
//! Every fallible call in the crate returns [`KkmError`]. Callers can tell a
//! register that could not be reached (`Connection`, `Io`, `Serial`) apart
//! from one that answered and refused (`Device`). Argument problems are
//! reported before any byte is written.

use crate::ecr::error_codes;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, KkmError>;

/// Errors produced by the KKM driver.
#[derive(Error, Debug)]
pub enum KkmError {
    /// Handshake exhausted, line lost, or STX never seen.
    #[error("no connection to cash register: {0}")]
    Connection(String),

    /// The register sent something the link protocol does not allow.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// The register decoded the command and rejected it.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// Caller-supplied value out of range.
    #[error("invalid argument: {0}")]
    Argument(String),

    /// The operation is not part of the variant's resolved command set.
    #[error("{operation} is not supported by {variant}")]
    Unsupported {
        operation: &'static str,
        variant: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl KkmError {
    /// True when the hardware could not be reached at all.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            KkmError::Connection(_) | KkmError::Io(_) | KkmError::Serial(_)
        )
    }

    /// True when the hardware answered and refused the operation.
    pub fn is_device_error(&self) -> bool {
        matches!(self, KkmError::Device(_))
    }

    /// The device-side error, if this is one.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            KkmError::Device(e) => Some(e),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Device error
// ---------------------------------------------------------------------------

/// Narrower label attached to a device error by the operation that saw it.
///
/// Relabeling is purely for caller ergonomics; the numeric code is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    Generic,
    OpenCheck,
    ItemSale,
    CloseCheck,
}

impl DeviceErrorKind {
    fn label(self) -> &'static str {
        match self {
            DeviceErrorKind::Generic => "device error",
            DeviceErrorKind::OpenCheck => "open check error",
            DeviceErrorKind::ItemSale => "item sale error",
            DeviceErrorKind::CloseCheck => "close check error",
        }
    }
}

/// Nonzero error code returned in a response payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} 0x{code:02X} on command 0x{command:02X}: {message}", .kind.label())]
pub struct DeviceError {
    pub code: u8,
    pub command: u16,
    pub message: &'static str,
    pub kind: DeviceErrorKind,
}

impl DeviceError {
    pub fn new(code: u8, command: u16) -> Self {
        Self {
            code,
            command,
            message: error_codes::message(code),
            kind: DeviceErrorKind::Generic,
        }
    }

    /// Re-wrap under a narrower kind, keeping the code and command.
    pub fn relabel(self, kind: DeviceErrorKind) -> Self {
        Self { kind, ..self }
    }
}

/// Relabel a device error inside a result; other errors pass through.
pub(crate) fn relabel<T>(result: Result<T>, kind: DeviceErrorKind) -> Result<T> {
    result.map_err(|e| match e {
        KkmError::Device(dev) => KkmError::Device(dev.relabel(kind)),
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_carries_message() {
        let e = DeviceError::new(0x46, 0x51);
        assert_eq!(e.code, 0x46);
        assert_eq!(e.command, 0x51);
        assert!(e.message.to_lowercase().contains("not enough cash"));
        assert_eq!(e.kind, DeviceErrorKind::Generic);
    }

    #[test]
    fn test_relabel_preserves_code() {
        let e = DeviceError::new(0x4A, 0x8D).relabel(DeviceErrorKind::OpenCheck);
        assert_eq!(e.code, 0x4A);
        assert_eq!(e.command, 0x8D);
        assert_eq!(e.kind, DeviceErrorKind::OpenCheck);
        assert!(e.to_string().starts_with("open check error 0x4A"));
    }

    #[test]
    fn test_relabel_result_passes_other_errors() {
        let r: Result<()> = Err(KkmError::Connection("gone".into()));
        let r = relabel(r, DeviceErrorKind::CloseCheck);
        assert!(r.unwrap_err().is_connection_error());

        let r: Result<()> = Err(DeviceError::new(0x45, 0x85).into());
        let err = relabel(r, DeviceErrorKind::CloseCheck).unwrap_err();
        assert!(err.is_device_error());
        assert_eq!(err.device_error().unwrap().kind, DeviceErrorKind::CloseCheck);
        assert_eq!(err.device_error().unwrap().code, 0x45);
    }

    #[test]
    fn test_error_classification() {
        assert!(KkmError::Connection("x".into()).is_connection_error());
        assert!(!KkmError::Argument("x".into()).is_connection_error());
        assert!(!KkmError::ProtocolViolation("x".into()).is_device_error());
    }
}
