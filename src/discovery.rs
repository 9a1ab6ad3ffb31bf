//! Register discovery.
//!
//! Scans serial ports and baud rates, asks whatever answers for its device
//! type (0xFC) and maps the reported name onto a known variant. Only the
//! plain link surface is used: connect, one command, disconnect.

use crate::config::BAUD_RATES;
use crate::ecr::decoder::DecodedResponse;
use crate::ecr::protocol::Protocol;
use crate::ecr::transport::{list_ports, SerialTransport, Transport};
use crate::ecr::variants::{DeviceVariant, SHTRIH_COMBO_FR_K, SHTRIH_COMBO_PTK, SHTRIH_FR_K};
use crate::error::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Per-byte timeout while probing.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_millis(500);

const MODEL_COMMAND: u16 = 0xFC;

/// A register that answered during a scan.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub port: String,
    pub baud_rate: u32,
    pub variant: &'static DeviceVariant,
    pub info: DecodedResponse,
}

/// Variant for a reported device name. Checked most specific first.
pub fn match_variant(device_name: &str) -> Option<&'static DeviceVariant> {
    let name = device_name.to_uppercase();
    if name.contains("ПТК") {
        Some(&SHTRIH_COMBO_PTK)
    } else if name.contains("КОМБО-ФР-К") {
        Some(&SHTRIH_COMBO_FR_K)
    } else if name.contains("ФР-К") {
        Some(&SHTRIH_FR_K)
    } else {
        None
    }
}

/// Connect, read the device type and disconnect.
pub fn probe(transport: Box<dyn Transport>) -> Result<DecodedResponse> {
    let mut protocol = Protocol::new(transport);
    protocol.connect()?;
    let result = protocol
        .send_command(MODEL_COMMAND, &[])
        .and_then(|r| r.into_fields());
    protocol.disconnect()?;
    result
}

/// Scan every serial port on this machine. `callback` is told each
/// `(port, baud)` pair before it is tried.
pub fn discover<C>(callback: C) -> Result<Vec<Discovered>>
where
    C: FnMut(&str, u32),
{
    let ports = list_ports()?;
    Ok(discover_on(&ports, callback, |port, baud| {
        Box::new(SerialTransport::new(port, baud, DISCOVERY_TIMEOUT))
    }))
}

/// Scan the given ports, newest first, fastest baud first. A port that
/// answers is not tried at further speeds, whether or not its name is known.
pub fn discover_on<C, F>(ports: &[String], mut callback: C, mut open: F) -> Vec<Discovered>
where
    C: FnMut(&str, u32),
    F: FnMut(&str, u32) -> Box<dyn Transport>,
{
    let mut found = Vec::new();
    for port in ports.iter().rev() {
        for &baud in BAUD_RATES.iter().rev() {
            callback(port, baud);
            let info = match probe(open(port, baud)) {
                Ok(info) => info,
                Err(e) => {
                    debug!("No register on {port} @ {baud}: {e}");
                    continue;
                }
            };

            let name = info.text("device_name").unwrap_or_default().to_string();
            match match_variant(&name) {
                Some(variant) => {
                    info!("Found {name} on {port} @ {baud} ({})", variant.name);
                    found.push(Discovered {
                        port: port.clone(),
                        baud_rate: baud,
                        variant,
                        info,
                    });
                }
                None => info!("Unrecognised register '{name}' on {port} @ {baud}"),
            }
            break;
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
