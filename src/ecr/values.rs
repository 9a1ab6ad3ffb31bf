//! Decoded response values and the field decode functions.
//!
//! Every decoder has the same shape, `fn(&[u8], &DeviceProfile) -> Result<Value>`,
//! so response schemas can name them in static tables. Integer decoders are
//! tolerant: a slice of the wrong width yields [`Value::Null`] because
//! firmware may omit optional trailing data. Multi-byte tuples (versions,
//! dates, times) are strict and fail with `ProtocolViolation`.

use crate::error::{KkmError, Result};
use crate::text;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::time::Duration;

/// Signature shared by all field decoders.
pub type Decoder = fn(&[u8], &DeviceProfile) -> Result<Value>;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A single decoded response field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    /// Serialized as whole milliseconds.
    Duration(#[serde(serialize_with = "serialize_millis")] Duration),
    /// Named bits, serialized as a JSON object.
    Flags(#[serde(serialize_with = "serialize_pairs")] Vec<(&'static str, bool)>),
    Mode(Mode),
    SubMode(SubMode),
    FieldType(TableFieldType),
    Label(&'static str),
    /// Sub-map produced by an unnamed field; merged into the parent response.
    Map(#[serde(serialize_with = "serialize_pairs")] Vec<(&'static str, Value)>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_submode(&self) -> Option<SubMode> {
        match self {
            Value::SubMode(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_mode(&self) -> Option<Mode> {
        match self {
            Value::Mode(m) => Some(*m),
            _ => None,
        }
    }

    /// Look up a named flag.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self {
            Value::Flags(flags) => flags.iter().find(|(k, _)| *k == name).map(|(_, v)| *v),
            _ => None,
        }
    }
}

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

fn serialize_pairs<S, V>(pairs: &[(&'static str, V)], s: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
    V: Serialize,
{
    let mut map = s.serialize_map(Some(pairs.len()))?;
    for (k, v) in pairs {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

// ---------------------------------------------------------------------------
// Mode / submode
// ---------------------------------------------------------------------------

const MODE_DESCR: [&str; 16] = [
    "Printer in working mode",
    "Data output",
    "Shift open, 24 hours not expired",
    "Shift open, 24 hours expired",
    "Shift closed",
    "Locked by wrong tax inspector password",
    "Waiting for date confirmation",
    "Decimal point change allowed",
    "Open document",
    "Technological reset allowed",
    "Test run",
    "Printing full fiscal report",
    "Printing EKLZ report",
    "Fiscal slip document in progress",
    "Printing slip document",
    "Fiscal slip document formed",
];

fn mode_status_descr(number: u8, status: u8) -> Option<&'static str> {
    let table: &[&str] = match number {
        8 => &["Sale", "Purchase", "Sale return", "Purchase return"],
        13 => &[
            "Sale (open)",
            "Purchase (open)",
            "Sale return (open)",
            "Purchase return (open)",
        ],
        14 => &[
            "Waiting for load",
            "Loading and positioning",
            "Positioning",
            "Printing",
            "Printing finished",
            "Ejecting document",
            "Waiting for removal",
        ],
        _ => return None,
    };
    Some(table.get(status as usize).copied().unwrap_or("Unknown mode status"))
}

/// Main operating mode: low nibble is the mode number, high nibble its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Mode {
    pub number: u8,
    pub status: u8,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_description: Option<&'static str>,
}

impl Mode {
    pub fn from_code(code: u8) -> Self {
        let number = code & 0x0F;
        let status = code >> 4;
        Self {
            number,
            status,
            description: MODE_DESCR[number as usize],
            status_description: mode_status_descr(number, status),
        }
    }

    pub fn state(&self) -> (u8, u8) {
        (self.number, self.status)
    }

    pub fn message(&self) -> String {
        match self.status_description {
            Some(status) => format!("{}: {}", self.description, status),
            None => self.description.to_string(),
        }
    }
}

/// Secondary status axis, mostly about the paper path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubMode {
    pub state: u8,
    pub description: &'static str,
}

impl SubMode {
    pub const PAPER_PRESENT: u8 = 0;
    pub const NO_PAPER: u8 = 1;
    pub const WAITING_FOR_PAPER: u8 = 2;
    pub const AWAITING_CONTINUE: u8 = 3;
    pub const PRINTING_REPORTS: u8 = 4;
    pub const PRINTING: u8 = 5;

    pub fn from_code(code: u8) -> Self {
        let description = match code {
            0 => "Paper present",
            1 => "No paper",
            2 => "Waiting for paper to continue printing",
            3 => "Waiting for continue-print command",
            4 => "Printing fiscal reports",
            5 => "Printing operation",
            _ => "Unknown submode",
        };
        Self {
            state: code,
            description,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == Self::PAPER_PRESENT
    }
}

/// Type of a settings-table field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFieldType {
    Int,
    Text,
}

// ---------------------------------------------------------------------------
// Device profile
// ---------------------------------------------------------------------------

/// Per-connection decoding context.
///
/// The model number (byte 5 of the 0xFC response) decides which FR flags a
/// given firmware actually reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceProfile {
    pub model: Option<u8>,
}

impl DeviceProfile {
    pub fn new(model: Option<u8>) -> Self {
        Self { model }
    }

    /// Which of the 16 FR flags are meaningful, in [`FR_FLAG_NAMES`] order.
    pub fn fr_flag_mask(&self) -> [bool; 16] {
        const T: bool = true;
        const F: bool = false;
        match self.model {
            // Shtrih-FR-K
            Some(4) => [F, T, F, F, T, T, T, T, T, T, T, T, F, F, T, T],
            // Shtrih-Combo-FR-K, revisions 01 and 02
            Some(9) | Some(12) => [F, T, F, F, T, F, T, F, T, F, T, T, T, T, T, F],
            _ => [T; 16],
        }
    }
}

// ---------------------------------------------------------------------------
// Integer helpers
// ---------------------------------------------------------------------------

fn exact<const N: usize>(bytes: &[u8]) -> Option<[u8; N]> {
    bytes.try_into().ok()
}

fn strict<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N]> {
    exact(bytes).ok_or_else(|| {
        KkmError::ProtocolViolation(format!(
            "{what} needs {N} bytes, got {}",
            bytes.len()
        ))
    })
}

/// Little-endian unsigned integer of any width up to 8 bytes.
pub fn le_uint(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (b as u64) << (8 * i))
}

/// Named bits, most significant first: `names[0]` is bit `names.len() - 1`.
fn bit_flags(value: u64, names: &[&'static str]) -> Value {
    let width = names.len();
    Value::Flags(
        names
            .iter()
            .enumerate()
            .map(|(i, &name)| (name, (value >> (width - 1 - i)) & 1 == 1))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

pub fn u8_value(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| Value::Int(b[0] as i64)))
}

pub fn u16_value(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<2>(bytes).map_or(Value::Null, |b| {
        Value::Int(u16::from_le_bytes(b) as i64)
    }))
}

pub fn i16_value(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<2>(bytes).map_or(Value::Null, |b| {
        Value::Int(i16::from_le_bytes(b) as i64)
    }))
}

pub fn u32_value(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<4>(bytes).map_or(Value::Null, |b| {
        Value::Int(u32::from_le_bytes(b) as i64)
    }))
}

/// Money registers and change amounts (5 or 6 bytes).
pub fn le_int(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(Value::Int(le_uint(bytes) as i64))
}

/// Two ASCII characters rendered as `"a.b"`.
pub fn version(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let [major, minor] = strict::<2>(bytes, "version")?;
    Ok(Value::Text(format!("{}.{}", major as char, minor as char)))
}

/// Day, month, year-since-2000.
pub fn date(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let [d, m, y] = strict::<3>(bytes, "date")?;
    NaiveDate::from_ymd_opt(2000 + y as i32, m as u32, d as u32)
        .map(Value::Date)
        .ok_or_else(|| KkmError::ProtocolViolation(format!("invalid date {d:02}.{m:02}.{y:02}")))
}

/// Year-since-2000, month, day. Invalid dates collapse to the Unix epoch.
pub fn rev_date(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let [y, m, d] = strict::<3>(bytes, "date")?;
    Ok(Value::Date(
        NaiveDate::from_ymd_opt(2000 + y as i32, m as u32, d as u32)
            .unwrap_or(NaiveDate::default()),
    ))
}

pub fn time(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let [h, m, s] = strict::<3>(bytes, "time")?;
    NaiveTime::from_hms_opt(h as u32, m as u32, s as u32)
        .map(Value::Time)
        .ok_or_else(|| KkmError::ProtocolViolation(format!("invalid time {h:02}:{m:02}:{s:02}")))
}

/// Year-since-2000, month, day, hour, minute. Invalid values collapse to the
/// Unix epoch.
pub fn date_time(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let [y, mo, d, h, mi] = strict::<5>(bytes, "date/time")?;
    let dt = NaiveDate::from_ymd_opt(2000 + y as i32, mo as u32, d as u32)
        .and_then(|date| date.and_hms_opt(h as u32, mi as u32, 0))
        .unwrap_or(NaiveDateTime::default());
    Ok(Value::DateTime(dt))
}

/// FR flag names, bit 15 first.
pub const FR_FLAG_NAMES: [&str; 16] = [
    "increased_quantity_precision",
    "eklz_almost_full",
    "left_printer_sensor_failure",
    "right_printer_sensor_failure",
    "cash_drawer",
    "case_cover",
    "receipt_head_lever",
    "journal_head_lever",
    "receipt_optical_sensor",
    "journal_optical_sensor",
    "eklz",
    "decimal_point",
    "slip_lower_sensor",
    "slip_upper_sensor",
    "receipt_roll",
    "journal_roll",
];

pub fn fr_flags(bytes: &[u8], profile: &DeviceProfile) -> Result<Value> {
    let Some(raw) = exact::<2>(bytes) else {
        return Ok(Value::Null);
    };
    let raw = u16::from_le_bytes(raw);
    let mask = profile.fr_flag_mask();
    let flags = FR_FLAG_NAMES
        .iter()
        .enumerate()
        .filter(|(i, _)| mask[*i])
        .map(|(i, &name)| (name, (raw >> (15 - i)) & 1 == 1))
        .collect();
    Ok(Value::Flags(flags))
}

pub fn fp_flags(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    const NAMES: [&str; 8] = [
        "fp1",
        "fp2",
        "license",
        "fp_overflow",
        "fp_battery",
        "fp_last_record",
        "fp_shift_open",
        "fp_24_hours",
    ];
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| bit_flags(b[0] as u64, &NAMES)))
}

pub fn mode(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| Value::Mode(Mode::from_code(b[0]))))
}

pub fn submode(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| Value::SubMode(SubMode::from_code(b[0]))))
}

/// Baud-rate code to bits per second; unknown codes read as 0.
pub fn baud_rate(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| {
        Value::Int(crate::config::code_to_baud(b[0]).unwrap_or(0) as i64)
    }))
}

/// Byte-receive timeout code.
pub fn byte_timeout(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let Some([code]) = exact::<1>(bytes) else {
        return Ok(Value::Null);
    };
    let code = code as u64;
    let millis = match code {
        0..=150 => code,
        151..=249 => (code - 149) * 150,
        _ => (code - 248) * 15_000,
    };
    Ok(Value::Duration(Duration::from_millis(millis)))
}

/// Taxpayer number: six bytes read as a big-endian hex number, all-FF means
/// "not set" and reads as -1.
pub fn inn(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    if bytes.iter().all(|&b| b == 0xFF) {
        return Ok(Value::Int(-1));
    }
    let value = bytes
        .iter()
        .fold(0i64, |acc, &b| acc.wrapping_shl(8) | b as i64);
    Ok(Value::Int(value))
}

pub fn table_field_type(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    match bytes {
        [0] => Ok(Value::FieldType(TableFieldType::Int)),
        [1] => Ok(Value::FieldType(TableFieldType::Text)),
        other => Err(KkmError::ProtocolViolation(format!(
            "unknown table field type {other:02X?}"
        ))),
    }
}

/// Trailing `count, min[count], max[count]` block of the field-structure
/// response.
pub fn field_min_max(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let count = bytes.first().copied().unwrap_or(0) as usize;
    let slice = |from: usize, to: usize| {
        let to = to.min(bytes.len());
        bytes.get(from..to).unwrap_or(&[])
    };
    Ok(Value::Map(vec![
        ("byte_count", Value::Int(count as i64)),
        ("min_value", Value::Int(le_uint(slice(1, count + 1)) as i64)),
        (
            "max_value",
            Value::Int(le_uint(slice(count + 1, 2 * count + 1)) as i64),
        ),
    ]))
}

/// Windows-1251 text with NUL padding removed.
pub fn cp1251(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    Ok(Value::Text(text::decode_cp1251(text::strip_nul(bytes))))
}

pub fn fs_life_state(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    const NAMES: [&str; 4] = [
        "ofd_transfer_finished",
        "fiscal_mode_closed",
        "fiscal_mode_open",
        "fs_configured",
    ];
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| bit_flags(b[0] as u64, &NAMES)))
}

pub fn fs_current_document(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    let Some([code]) = exact::<1>(bytes) else {
        return Ok(Value::Null);
    };
    let label = match code {
        0x00 => "no open document",
        0x01 => "fiscalization report",
        0x02 => "shift opening report",
        0x04 => "cash receipt",
        0x08 => "shift closing report",
        0x10 => "fiscal mode closing report",
        0x11 => "strict reporting form",
        0x12 => "registration change report (FS replacement)",
        0x13 => "registration change report",
        0x14 => "correction receipt",
        0x15 => "correction strict reporting form",
        0x17 => "settlement status report",
        _ => "unknown document type",
    };
    Ok(Value::Label(label))
}

pub fn fs_document_data(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    match bytes {
        [0] => Ok(Value::Label("no document data")),
        [1] => Ok(Value::Label("document data received")),
        [] => Ok(Value::Null),
        other => Err(KkmError::ProtocolViolation(format!(
            "unknown document data state {other:02X?}"
        ))),
    }
}

pub fn fs_shift_state(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    match bytes {
        [0] => Ok(Value::Label("shift closed")),
        [1] => Ok(Value::Label("shift open")),
        [] => Ok(Value::Null),
        other => Err(KkmError::ProtocolViolation(format!(
            "unknown shift state {other:02X?}"
        ))),
    }
}

pub fn fs_warning_flags(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    const NAMES: [&str; 4] = [
        "ofd_timeout",
        "fs_memory_90_percent",
        "crypto_resource_30_days",
        "crypto_replace_3_days",
    ];
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| bit_flags(b[0] as u64, &NAMES)))
}

pub fn info_exchange_status(bytes: &[u8], _: &DeviceProfile) -> Result<Value> {
    const NAMES: [&str; 6] = [
        "awaiting_ofd_command_reply",
        "ofd_settings_changed",
        "ofd_command_pending",
        "awaiting_ofd_receipt",
        "message_for_ofd",
        "transport_connected",
    ];
    Ok(exact::<1>(bytes).map_or(Value::Null, |b| bit_flags(b[0] as u64, &NAMES)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const P: DeviceProfile = DeviceProfile { model: None };

    #[test]
    fn test_tolerant_integers() {
        assert_eq!(u8_value(&[7], &P).unwrap(), Value::Int(7));
        assert_eq!(u16_value(&[0x34, 0x12], &P).unwrap(), Value::Int(0x1234));
        assert_eq!(u16_value(&[0x34], &P).unwrap(), Value::Null);
        assert_eq!(i16_value(&[0xFF, 0xFF], &P).unwrap(), Value::Int(-1));
        assert_eq!(u32_value(&[1, 0, 0], &P).unwrap(), Value::Null);
        assert_eq!(u32_value(&[1, 0, 0, 0], &P).unwrap(), Value::Int(1));
    }

    #[test]
    fn test_le_int_any_width() {
        assert_eq!(le_int(&[0x10, 0x27, 0, 0, 0], &P).unwrap(), Value::Int(10_000));
        assert_eq!(le_int(&[], &P).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_strict_tuples() {
        assert_eq!(version(b"A2", &P).unwrap(), Value::Text("A.2".into()));
        assert!(matches!(version(b"A", &P), Err(KkmError::ProtocolViolation(_))));
        assert_eq!(
            date(&[31, 12, 17], &P).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2017, 12, 31).unwrap())
        );
        assert!(date(&[31, 2, 17], &P).is_err());
        assert_eq!(
            time(&[23, 59, 1], &P).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap())
        );
    }

    #[test]
    fn test_invalid_rev_date_is_epoch() {
        assert_eq!(
            rev_date(&[0, 0, 0], &P).unwrap(),
            Value::Date(NaiveDate::default())
        );
        assert_eq!(
            date_time(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF], &P).unwrap(),
            Value::DateTime(NaiveDateTime::default())
        );
        let ok = date_time(&[18, 3, 9, 14, 30], &P).unwrap();
        assert_eq!(
            ok,
            Value::DateTime(
                NaiveDate::from_ymd_opt(2018, 3, 9)
                    .unwrap()
                    .and_hms_opt(14, 30, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_fr_flags_all_without_model() {
        // bit 0 = journal roll, bit 1 = receipt roll
        let v = fr_flags(&[0b0000_0011, 0x00], &P).unwrap();
        assert_eq!(v.flag("journal_roll"), Some(true));
        assert_eq!(v.flag("receipt_roll"), Some(true));
        assert_eq!(v.flag("cash_drawer"), Some(false));
        match v {
            Value::Flags(f) => assert_eq!(f.len(), 16),
            other => panic!("expected flags, got {other:?}"),
        }
    }

    #[test]
    fn test_fr_flags_filtered_by_model() {
        let profile = DeviceProfile::new(Some(9));
        let v = fr_flags(&[0xFF, 0xFF], &profile).unwrap();
        assert_eq!(v.flag("case_cover"), None);
        assert_eq!(v.flag("journal_roll"), None);
        assert_eq!(v.flag("cash_drawer"), Some(true));
        assert_eq!(v.flag("slip_upper_sensor"), Some(true));

        let frk = fr_flags(&[0xFF, 0xFF], &DeviceProfile::new(Some(4))).unwrap();
        assert_eq!(frk.flag("journal_roll"), Some(true));
        assert_eq!(frk.flag("slip_lower_sensor"), None);
    }

    #[test]
    fn test_mode_nibbles() {
        let m = Mode::from_code(0x18);
        assert_eq!(m.state(), (8, 1));
        assert_eq!(m.message(), "Open document: Purchase");
        let closed = Mode::from_code(0x04);
        assert_eq!(closed.state(), (4, 0));
        assert_eq!(closed.message(), "Shift closed");
    }

    #[test]
    fn test_submode() {
        assert!(SubMode::from_code(0).is_idle());
        assert_eq!(SubMode::from_code(3).state, SubMode::AWAITING_CONTINUE);
        assert_eq!(SubMode::from_code(9).description, "Unknown submode");
    }

    #[test]
    fn test_byte_timeout_ranges() {
        let ms = |c: u8| match byte_timeout(&[c], &P).unwrap() {
            Value::Duration(d) => d.as_millis(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(ms(100), 100);
        assert_eq!(ms(151), 300);
        assert_eq!(ms(250), 30_000);
    }

    #[test]
    fn test_inn() {
        assert_eq!(inn(&[0xFF; 6], &P).unwrap(), Value::Int(-1));
        assert_eq!(inn(&[0, 0, 0, 0, 0x01, 0x00], &P).unwrap(), Value::Int(256));
    }

    #[test]
    fn test_field_min_max_map() {
        let v = field_min_max(&[2, 0x01, 0x00, 0xFF, 0x00], &P).unwrap();
        assert_eq!(
            v,
            Value::Map(vec![
                ("byte_count", Value::Int(2)),
                ("min_value", Value::Int(1)),
                ("max_value", Value::Int(255)),
            ])
        );
    }

    #[test]
    fn test_fs_state_labels() {
        assert_eq!(fs_shift_state(&[1], &P).unwrap(), Value::Label("shift open"));
        assert!(fs_shift_state(&[7], &P).is_err());
        assert_eq!(
            fs_current_document(&[0x42], &P).unwrap(),
            Value::Label("unknown document type")
        );
        let life = fs_life_state(&[0b0011], &P).unwrap();
        assert_eq!(life.flag("fs_configured"), Some(true));
        assert_eq!(life.flag("fiscal_mode_open"), Some(true));
        assert_eq!(life.flag("fiscal_mode_closed"), Some(false));
    }

    #[test]
    fn test_value_serializes_to_json() {
        let flags = fp_flags(&[0b1000_0000], &P).unwrap();
        let json = serde_json::to_value(&flags).unwrap();
        assert_eq!(json["fp1"], serde_json::json!(true));
        assert_eq!(json["fp2"], serde_json::json!(false));

        let d = serde_json::to_value(Value::Duration(Duration::from_millis(450))).unwrap();
        assert_eq!(d, serde_json::json!(450));
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), serde_json::Value::Null);
    }
}
