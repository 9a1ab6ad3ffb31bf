//! Command table: code, name and response schema of every command the
//! driver knows.
//!
//! Field byte offsets index the payload *after* the command code, so offset
//! 0 is the error byte for commands that carry one. The table is built once
//! on first use and shared for the life of the process.

use super::values::{self as v, Decoder};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Name of the reserved error-code field.
pub const ERROR_CODE: &str = "error_code";
/// Name of the operator-number field most responses carry at offset 1.
pub const OPERATOR: &str = "operator";

/// Half-open byte range; `end: None` runs to the end of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl ByteRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub const fn from(start: usize) -> Self {
        Self { start, end: None }
    }

    /// The part of `bytes` this range covers; out-of-bounds yields an empty
    /// (or shortened) slice, never a panic.
    pub fn slice<'a>(&self, bytes: &'a [u8]) -> &'a [u8] {
        let len = bytes.len();
        let start = self.start.min(len);
        let end = self.end.map_or(len, |e| e.min(len)).max(start);
        &bytes[start..end]
    }
}

/// One response field.
#[derive(Clone)]
pub struct FieldSpec {
    /// Concatenated in declared order.
    pub ranges: Vec<ByteRange>,
    /// `None` stores the raw bytes.
    pub decode: Option<Decoder>,
    /// `None` merges the decoded sub-map into the response.
    pub name: Option<&'static str>,
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("ranges", &self.ranges)
            .field("decoded", &self.decode.is_some())
            .field("name", &self.name)
            .finish()
    }
}

impl FieldSpec {
    pub fn new(name: &'static str, start: usize, end: usize, decode: Decoder) -> Self {
        Self {
            ranges: vec![ByteRange::new(start, end)],
            decode: Some(decode),
            name: Some(name),
        }
    }

    /// Undecoded bytes.
    pub fn raw(name: &'static str, range: ByteRange) -> Self {
        Self {
            ranges: vec![range],
            decode: None,
            name: Some(name),
        }
    }

    /// Decoded field running to the end of the payload.
    pub fn tail(name: &'static str, start: usize, decode: Decoder) -> Self {
        Self {
            ranges: vec![ByteRange::from(start)],
            decode: Some(decode),
            name: Some(name),
        }
    }

    /// Field assembled from several disjoint ranges.
    pub fn multi(name: &'static str, ranges: &[ByteRange], decode: Decoder) -> Self {
        Self {
            ranges: ranges.to_vec(),
            decode: Some(decode),
            name: Some(name),
        }
    }

    /// Unnamed trailing block whose decoder yields a map.
    pub fn merged(start: usize, decode: Decoder) -> Self {
        Self {
            ranges: vec![ByteRange::from(start)],
            decode: Some(decode),
            name: None,
        }
    }

    /// Bytes covered by this field, concatenated.
    pub fn extract(&self, payload: &[u8]) -> Vec<u8> {
        self.ranges
            .iter()
            .flat_map(|r| r.slice(payload).iter().copied())
            .collect()
    }
}

/// One command and its response schema.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub code: u16,
    pub name: &'static str,
    /// Response byte 0 is an error code.
    pub error_byte: bool,
    pub fields: Vec<FieldSpec>,
}

impl CommandSpec {
    /// Command whose response starts with the error byte.
    pub fn new(code: u16, name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            code,
            name,
            error_byte: true,
            fields,
        }
    }

    /// Command whose response has no leading error byte.
    pub fn without_error_byte(code: u16, name: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self {
            code,
            name,
            error_byte: false,
            fields,
        }
    }
}

/// Code-indexed command table.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    specs: BTreeMap<u16, CommandSpec>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a command.
    pub fn register(&mut self, spec: CommandSpec) {
        self.specs.insert(spec.code, spec);
    }

    pub fn get(&self, code: u16) -> Option<&CommandSpec> {
        self.specs.get(&code)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.specs.contains_key(&code)
    }

    pub fn name(&self, code: u16) -> Option<&'static str> {
        self.get(code).map(|s| s.name)
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.specs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// The built-in table for the current firmware family.
    pub fn builtin() -> &'static CommandRegistry {
        static REGISTRY: OnceLock<CommandRegistry> = OnceLock::new();
        REGISTRY.get_or_init(build)
    }
}

fn operator() -> FieldSpec {
    FieldSpec::new(OPERATOR, 1, 2, v::u8_value)
}

/// Error byte plus operator number, nothing else.
fn ack_only(code: u16, name: &'static str) -> CommandSpec {
    CommandSpec::new(code, name, vec![operator()])
}

fn bare(code: u16, name: &'static str) -> CommandSpec {
    CommandSpec::new(code, name, vec![])
}

fn fiscal_receipt(code: u16, name: &'static str, number: &'static str) -> CommandSpec {
    CommandSpec::new(
        code,
        name,
        vec![
            FieldSpec::new(number, 1, 3, v::u16_value),
            FieldSpec::new("fiscal_document_number", 3, 7, v::u32_value),
            FieldSpec::new("fiscal_sign", 7, 11, v::u32_value),
        ],
    )
}

fn build() -> CommandRegistry {
    let mut r = CommandRegistry::new();

    r.register(CommandSpec::new(
        0x10,
        "Short status request",
        vec![
            operator(),
            FieldSpec::new("fr_flags", 2, 4, v::fr_flags),
            FieldSpec::new("mode", 4, 5, v::mode),
            FieldSpec::new("submode", 5, 6, v::submode),
            // two-byte count split across offsets 11 and 6
            FieldSpec::multi(
                "check_operations",
                &[ByteRange::new(11, 12), ByteRange::new(6, 7)],
                v::u16_value,
            ),
            FieldSpec::new("battery_voltage", 7, 8, v::u8_value),
            FieldSpec::new("power_voltage", 8, 9, v::u8_value),
            FieldSpec::new("fp_error_code", 9, 10, v::u8_value),
            FieldSpec::new("eklz_error_code", 10, 11, v::u8_value),
            FieldSpec::raw("reserved", ByteRange::new(12, 15)),
        ],
    ));
    r.register(CommandSpec::new(
        0x11,
        "Status request",
        vec![
            operator(),
            FieldSpec::new("fr_firmware_version", 2, 4, v::version),
            FieldSpec::new("fr_firmware_build", 4, 6, v::u16_value),
            FieldSpec::new("fr_firmware_date", 6, 9, v::date),
            FieldSpec::new("hall_number", 9, 10, v::u8_value),
            FieldSpec::new("document_number", 10, 12, v::u16_value),
            FieldSpec::new("fr_flags", 12, 14, v::fr_flags),
            FieldSpec::new("mode", 14, 15, v::mode),
            FieldSpec::new("submode", 15, 16, v::submode),
            FieldSpec::new("port", 16, 17, v::u8_value),
            FieldSpec::new("fp_firmware_version", 17, 19, v::version),
            FieldSpec::new("fp_firmware_build", 19, 21, v::u16_value),
            FieldSpec::new("fp_firmware_date", 21, 24, v::date),
            FieldSpec::new("date", 24, 27, v::date),
            FieldSpec::new("time", 27, 30, v::time),
            FieldSpec::new("fp_flags", 30, 31, v::fp_flags),
            FieldSpec::new("serial_number", 31, 35, v::u32_value),
            FieldSpec::new("last_closed_shift", 35, 37, v::u16_value),
            FieldSpec::new("free_fp_records", 37, 39, v::u16_value),
            FieldSpec::new("registrations", 39, 40, v::u8_value),
            FieldSpec::new("registrations_left", 40, 41, v::u8_value),
            FieldSpec::new("inn", 41, 47, v::inn),
        ],
    ));
    r.register(ack_only(0x13, "Beep"));
    r.register(bare(0x14, "Set exchange parameters"));
    r.register(CommandSpec::new(
        0x15,
        "Read exchange parameters",
        vec![
            FieldSpec::new("baud_rate", 1, 2, v::baud_rate),
            FieldSpec::new("byte_timeout", 2, 3, v::byte_timeout),
        ],
    ));
    r.register(bare(0x16, "Technological reset"));
    r.register(ack_only(0x17, "Print string"));
    r.register(ack_only(0x19, "Test run"));
    r.register(CommandSpec::new(
        0x1A,
        "Cash register request",
        vec![operator(), FieldSpec::new("value", 2, 8, v::le_int)],
    ));
    r.register(CommandSpec::new(
        0x1B,
        "Operation register request",
        vec![operator(), FieldSpec::new("value", 2, 4, v::u16_value)],
    ));
    r.register(bare(0x1E, "Write table"));
    r.register(CommandSpec::new(
        0x1F,
        "Read table",
        vec![FieldSpec::raw("value", ByteRange::from(1))],
    ));
    r.register(bare(0x21, "Set time"));
    r.register(bare(0x22, "Set date"));
    r.register(bare(0x23, "Confirm date"));
    r.register(ack_only(0x25, "Cut"));
    r.register(ack_only(0x28, "Open cash drawer"));
    r.register(ack_only(0x29, "Feed"));
    r.register(ack_only(0x2B, "Interrupt test run"));
    r.register(CommandSpec::new(
        0x2D,
        "Table structure request",
        vec![
            FieldSpec::new("table_name", 1, 41, v::cp1251),
            FieldSpec::new("rows", 41, 43, v::u16_value),
            FieldSpec::new("fields", 43, 44, v::u8_value),
        ],
    ));
    r.register(CommandSpec::new(
        0x2E,
        "Field structure request",
        vec![
            FieldSpec::new("field_name", 1, 41, v::cp1251),
            FieldSpec::new("field_type", 41, 42, v::table_field_type),
            FieldSpec::merged(42, v::field_min_max),
        ],
    ));
    r.register(ack_only(0x40, "X report"));
    r.register(ack_only(0x41, "Z report"));
    r.register(CommandSpec::new(
        0x50,
        "Cash income",
        vec![
            operator(),
            FieldSpec::tail("document_number", 2, v::u16_value),
        ],
    ));
    r.register(CommandSpec::new(
        0x51,
        "Cash outcome",
        vec![
            operator(),
            FieldSpec::tail("document_number", 2, v::u16_value),
        ],
    ));
    r.register(ack_only(0x80, "Sale"));
    r.register(ack_only(0x82, "Return sale"));
    r.register(CommandSpec::new(
        0x85,
        "Close check",
        vec![operator(), FieldSpec::new("change", 2, 7, v::le_int)],
    ));
    r.register(ack_only(0x86, "Discount"));
    r.register(ack_only(0x87, "Surcharge"));
    r.register(ack_only(0x88, "Cancel check"));
    r.register(ack_only(0x8C, "Repeat document"));
    r.register(ack_only(0x8D, "Open check"));
    r.register(ack_only(0xB0, "Continue print"));
    r.register(ack_only(0xC0, "Load graphics"));
    r.register(ack_only(0xC1, "Print graphics"));
    r.register(ack_only(0xC2, "Print barcode"));
    r.register(bare(0xE0, "Open shift"));
    r.register(CommandSpec::new(
        0xFC,
        "Get device type",
        vec![
            FieldSpec::new("device_type", 1, 2, v::u8_value),
            FieldSpec::new("device_subtype", 2, 3, v::u8_value),
            FieldSpec::new("protocol_version", 3, 4, v::u8_value),
            FieldSpec::new("protocol_subversion", 4, 5, v::u8_value),
            FieldSpec::new("model", 5, 6, v::u8_value),
            FieldSpec::new("language", 6, 7, v::u8_value),
            FieldSpec::tail("device_name", 7, v::cp1251),
        ],
    ));

    r.register(CommandSpec::new(
        0xFF01,
        "FS status request",
        vec![
            FieldSpec::new("life_state", 1, 2, v::fs_life_state),
            FieldSpec::new("current_document", 2, 3, v::fs_current_document),
            FieldSpec::new("document_data", 3, 4, v::fs_document_data),
            FieldSpec::new("shift_state", 4, 5, v::fs_shift_state),
            FieldSpec::new("warning_flags", 5, 6, v::fs_warning_flags),
            FieldSpec::new("date_time", 6, 11, v::date_time),
            FieldSpec::raw("fs_number", ByteRange::new(11, 27)),
            FieldSpec::new("last_document_number", 27, 31, v::u32_value),
        ],
    ));
    r.register(CommandSpec::new(
        0xFF03,
        "FS expiration request",
        vec![
            FieldSpec::new("expires", 1, 4, v::rev_date),
            FieldSpec::new("registrations_left", 4, 5, v::u8_value),
            FieldSpec::new("registrations_done", 5, 6, v::u8_value),
        ],
    ));
    r.register(bare(0xFF08, "Cancel FS document"));
    r.register(CommandSpec::new(
        0xFF0A,
        "Find fiscal document by number",
        vec![
            FieldSpec::new("document_type", 1, 2, v::u8_value),
            FieldSpec::new("ofd_receipt_received", 2, 3, v::u8_value),
            FieldSpec::raw("document_data", ByteRange::from(3)),
        ],
    ));
    r.register(fiscal_receipt(0xFF0B, "Open FS shift", "shift_number"));
    r.register(bare(0xFF0C, "Send TLV structure"));
    r.register(bare(0xFF35, "Begin correction check"));
    r.register(fiscal_receipt(0xFF36, "Build correction check", "check_number"));
    r.register(CommandSpec::new(
        0xFF38,
        "Build settlement status report",
        vec![
            FieldSpec::new("fiscal_document_number", 1, 5, v::u32_value),
            FieldSpec::new("fiscal_sign", 5, 9, v::u32_value),
            FieldSpec::new("unconfirmed_documents", 9, 13, v::u32_value),
            FieldSpec::new("first_unconfirmed_date", 13, 16, v::rev_date),
        ],
    ));
    r.register(CommandSpec::new(
        0xFF39,
        "Information exchange status",
        vec![
            FieldSpec::new("exchange_status", 1, 2, v::info_exchange_status),
            FieldSpec::new("message_read_state", 2, 3, v::u8_value),
            FieldSpec::new("ofd_message_count", 3, 5, v::u16_value),
            FieldSpec::new("first_ofd_document_number", 5, 9, v::u32_value),
            FieldSpec::new("first_ofd_document_date_time", 9, 14, v::date_time),
        ],
    ));
    r.register(CommandSpec::new(
        0xFF3F,
        "Unconfirmed documents count",
        vec![FieldSpec::new("unconfirmed_documents", 1, 3, v::u16_value)],
    ));
    r.register(CommandSpec::new(
        0xFF40,
        "Current shift parameters",
        vec![
            FieldSpec::new("shift_state", 1, 2, v::fs_shift_state),
            FieldSpec::new("shift_number", 2, 4, v::u16_value),
            FieldSpec::new("check_number", 4, 6, v::u16_value),
        ],
    ));
    r.register(bare(0xFF41, "Begin shift opening"));
    r.register(bare(0xFF42, "Begin shift closing"));
    r.register(fiscal_receipt(0xFF43, "Close FS shift", "shift_number"));

    r
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_command_family() {
        let reg = CommandRegistry::builtin();
        for code in [
            0x10u16, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21,
            0x22, 0x23, 0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82,
            0x85, 0x86, 0x87, 0x88, 0x8C, 0x8D, 0xB0, 0xC0, 0xC1, 0xC2, 0xE0, 0xFC, 0xFF01,
            0xFF03, 0xFF08, 0xFF0A, 0xFF0B, 0xFF0C, 0xFF35, 0xFF36, 0xFF38, 0xFF39, 0xFF3F,
            0xFF40, 0xFF41, 0xFF42, 0xFF43,
        ] {
            assert!(reg.contains(code), "missing 0x{code:04X}");
        }
        assert_eq!(reg.len(), 54);
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(std::ptr::eq(
            CommandRegistry::builtin(),
            CommandRegistry::builtin()
        ));
    }

    #[test]
    fn test_byte_range_out_of_bounds() {
        let data = [1u8, 2, 3];
        assert_eq!(ByteRange::new(1, 2).slice(&data), &[2]);
        assert_eq!(ByteRange::new(2, 10).slice(&data), &[3]);
        assert!(ByteRange::new(5, 8).slice(&data).is_empty());
        assert_eq!(ByteRange::from(1).slice(&data), &[2, 3]);
    }

    #[test]
    fn test_multi_range_concatenates_in_order() {
        let field = FieldSpec::multi(
            "x",
            &[ByteRange::new(3, 4), ByteRange::new(0, 1)],
            v::u16_value,
        );
        assert_eq!(field.extract(&[0xAA, 0, 0, 0xBB]), vec![0xBB, 0xAA]);
        // missing high byte leaves a one-byte chunk
        assert_eq!(field.extract(&[0xAA]), vec![0xAA]);
    }

    #[test]
    fn test_every_command_has_error_byte() {
        let reg = CommandRegistry::builtin();
        assert!(reg.codes().all(|c| reg.get(c).is_some_and(|s| s.error_byte)));
    }
}
