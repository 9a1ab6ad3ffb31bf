//! Fiscal document tag data.
//!
//! Extra receipt requisites are sent to the fiscal storage (command 0xFF0C)
//! as a flat run of TLV records: 2-byte LE tag, 2-byte LE length, CP866
//! value. Values longer than the tag allows are truncated.

use crate::error::{KkmError, Result};
use crate::text::encode_cp866;
use tracing::debug;

/// Buyer phone number or e-mail.
pub const BUYER_CONTACT: u16 = 1008;
/// Settlement address.
pub const SETTLEMENT_ADDRESS: u16 = 1009;
pub const CASHIER: u16 = 1021;
/// Settlement place.
pub const SETTLEMENT_PLACE: u16 = 1087;
pub const SUPPLIER_NAME: u16 = 1225;

/// Maximum encoded value length for a supported tag.
pub fn max_len(tag: u16) -> Option<usize> {
    match tag {
        BUYER_CONTACT | CASHIER => Some(64),
        SETTLEMENT_ADDRESS | SETTLEMENT_PLACE | SUPPLIER_NAME => Some(256),
        _ => None,
    }
}

/// Builder for a run of text TLV records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiscalTags {
    data: Vec<u8>,
    count: usize,
}

impl FiscalTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Unknown tags are rejected before anything is added.
    pub fn set(&mut self, tag: u16, value: &str) -> Result<&mut Self> {
        let limit = max_len(tag)
            .ok_or_else(|| KkmError::Argument(format!("tag {tag} is not supported")))?;
        let mut encoded = encode_cp866(value);
        encoded.truncate(limit);

        self.data.extend_from_slice(&tag.to_le_bytes());
        self.data
            .extend_from_slice(&(encoded.len() as u16).to_le_bytes());
        self.data.extend_from_slice(&encoded);
        self.count += 1;
        debug!("TLV tag {tag}: {} bytes", encoded.len());
        Ok(self)
    }

    /// Build from `(tag, value)` pairs, in order.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u16, &'a str)>,
    {
        let mut tags = Self::new();
        for (tag, value) in pairs {
            tags.set(tag, value)?;
        }
        Ok(tags)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
