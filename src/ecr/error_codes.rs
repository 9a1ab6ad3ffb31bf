//! Device error-code messages.
//!
//! One flat table covers the fiscal-memory, register and EKLZ ranges. Newer
//! fiscal-storage firmware reuses some low codes with different meanings;
//! without a reliable way to tell the two apart the legacy wording is kept.

/// Message for codes the table does not know.
pub const UNKNOWN: &str = "Unknown error";

/// Human-readable message for a device error code. Never fails.
pub fn message(code: u8) -> &'static str {
    match code {
        0x00 => "No error",
        0x01 => "Fiscal memory 1, fiscal memory 2 or clock failure",
        0x02 => "Fiscal memory 1 missing",
        0x03 => "Fiscal memory 2 missing",
        0x04 => "Invalid parameters in fiscal memory command",
        0x05 => "No requested data",
        0x06 => "Fiscal memory is in data output mode",
        0x07 => "Invalid parameters for this fiscal memory implementation",
        0x08 => "Command not supported by this fiscal memory implementation",
        0x09 => "Invalid command length",
        0x0A => "Data is not BCD",
        0x0B => "Fiscal memory cell failure while writing total",
        0x11 => "License not entered",
        0x12 => "Serial number already entered",
        0x13 => "Current date is earlier than last fiscal memory record",
        0x14 => "Fiscal memory shift totals area full",
        0x15 => "Shift already open",
        0x16 => "Shift not open",
        0x17 => "First shift number greater than last shift number",
        0x18 => "First shift date later than last shift date",
        0x19 => "No data in fiscal memory",
        0x1A => "Fiscal memory re-registration area full",
        0x1B => "Serial number not entered",
        0x1C => "Damaged record in the requested range",
        0x1D => "Last shift totals record damaged",
        0x1E => "Fiscal memory re-registration area overflow",
        0x1F => "Register memory missing",
        0x20 => "Cash register overflow on addition",
        0x21 => "Subtracted amount exceeds cash register contents",
        0x22 => "Invalid date",
        0x23 => "No activation record",
        0x24 => "Activation area full",
        0x25 => "No activation with the requested number",
        0x26 => "Amount tendered is less than check total",
        0x2B => "Previous command cannot be cancelled",
        0x2C => "Register already cleared (repeated clearing impossible)",
        0x2D => "Department check amount less than void amount",
        0x2E => "Not enough cash in register for payout",
        0x2F => "Shift discount accumulation overflow",
        0x30 => "Register locked, waiting for tax inspector password",
        0x32 => "General clearing required",
        0x33 => "Invalid command parameters",
        0x34 => "No data",
        0x35 => "Parameter invalid for current settings",
        0x36 => "Invalid parameters for this register implementation",
        0x37 => "Command not supported by this register implementation",
        0x38 => "ROM error",
        0x39 => "Internal register firmware error",
        0x3A => "Shift surcharge accumulation overflow",
        0x3B => "Shift accumulation overflow",
        0x3C => "Shift open, operation impossible (EKLZ: invalid registration number)",
        0x3D => "Shift not open, operation impossible",
        0x3E => "Shift department accumulation overflow",
        0x40 => "Discount range overflow",
        0x41 => "Cash payment range overflow",
        0x42 => "Payment type 2 range overflow",
        0x43 => "Payment type 3 range overflow",
        0x44 => "Payment type 4 range overflow",
        0x45 => "Sum of all payments less than check total",
        0x46 => "Not enough cash in drawer",
        0x47 => "Shift tax accumulation overflow",
        0x48 => "Check total overflow",
        0x49 => "Operation impossible in open check of this type",
        0x4A => "Check open, operation impossible",
        0x4B => "Check buffer overflow",
        0x4C => "Shift tax turnover accumulation overflow",
        0x4D => "Cashless payment exceeds check total",
        0x4E => "Shift exceeded 24 hours",
        0x4F => "Invalid password",
        0x50 => "Previous command still printing",
        0x51 => "Shift cash accumulation overflow",
        0x52 => "Shift payment type 2 accumulation overflow",
        0x53 => "Shift payment type 3 accumulation overflow",
        0x54 => "Shift payment type 4 accumulation overflow",
        0x55 => "Check closed, operation impossible",
        0x56 => "No document to repeat",
        0x57 => "EKLZ: closed shift count does not match fiscal memory",
        0x58 => "Waiting for continue-print command",
        0x59 => "Document opened by another operator",
        0x5A => "Discount exceeds check accumulation",
        0x5B => "Surcharge range overflow",
        0x5C => "24V supply voltage low",
        0x5D => "Table not defined",
        0x5E => "Invalid operation",
        0x5F => "Negative check total",
        0x60 => "Multiplication overflow",
        0x61 => "Price range overflow",
        0x62 => "Quantity range overflow",
        0x63 => "Department range overflow",
        0x64 => "Fiscal memory missing",
        0x65 => "Not enough money in department",
        0x66 => "Department money overflow",
        0x67 => "Fiscal memory communication error",
        0x68 => "Not enough money in tax turnover",
        0x69 => "Tax turnover money overflow",
        0x6A => "Power failure during I2C response",
        0x6B => "No receipt tape",
        0x6C => "No control tape",
        0x6D => "Not enough money for tax",
        0x6E => "Tax money overflow",
        0x6F => "Shift payout overflow",
        0x70 => "Fiscal memory overflow",
        0x71 => "Cutter error",
        0x72 => "Command not supported in this submode",
        0x73 => "Command not supported in this mode",
        0x74 => "RAM error",
        0x75 => "Power failure",
        0x76 => "Printer error: no tachometer pulses",
        0x77 => "Printer error: no sensor signal",
        0x78 => "Firmware replaced",
        0x79 => "Fiscal memory replaced",
        0x7A => "Field is not editable",
        0x7B => "Hardware error",
        0x7C => "Date mismatch",
        0x7D => "Invalid date format",
        0x7E => "Invalid value in length field",
        0x7F => "Check total range overflow",
        0x80..=0x83 => "Fiscal memory communication error",
        0x84 => "Cash overflow",
        0x85 => "Shift sales overflow",
        0x86 => "Shift purchases overflow",
        0x87 => "Shift sale returns overflow",
        0x88 => "Shift purchase returns overflow",
        0x89 => "Shift cash-in overflow",
        0x8A => "Check surcharge overflow",
        0x8B => "Check discount overflow",
        0x8C => "Negative check surcharge total",
        0x8D => "Negative check discount total",
        0x8E => "Zero check total",
        0x8F => "Register not fiscalized",
        0x90 => "Field exceeds size set in settings",
        0x91 => "Print field boundary exceeded for current font settings",
        0x92 => "Overlapping fields",
        0x93 => "RAM recovery succeeded",
        0x94 => "Check operation limit exhausted",
        0xA0 => "EKLZ communication error",
        0xA1 => "EKLZ missing",
        0xA2 => "EKLZ: invalid command format or parameter",
        0xA3 => "Invalid EKLZ state",
        0xA4 => "EKLZ failure",
        0xA5 => "EKLZ crypto-processor failure",
        0xA6 => "EKLZ time resource exhausted",
        0xA7 => "EKLZ full",
        0xA8 => "EKLZ: invalid date and time",
        0xA9 => "EKLZ: no requested data",
        0xAA => "EKLZ overflow (negative document total)",
        0xB0 => "EKLZ: quantity parameter overflow",
        0xB1 => "EKLZ: amount parameter overflow",
        0xB2 => "EKLZ: already activated",
        0xC0 => "Date and time control (confirm date and time)",
        0xC1 => "EKLZ: daily report with clearing cannot be interrupted",
        0xC2 => "Power supply overvoltage",
        0xC3 => "Check total does not match EKLZ",
        0xC4 => "Shift number mismatch",
        0xC5 => "Slip document buffer empty",
        0xC6 => "Slip document missing",
        0xC7 => "Field is not editable in this mode",
        0xC8 => "No tachometer sensor pulses",
        _ => UNKNOWN,
    }
}
