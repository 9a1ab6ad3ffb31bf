//! Typed operation surface for one register.
//!
//! A [`Device`] owns the link [`Protocol`] for its line and the
//! [`DeviceVariant`] that decides which operations are available. Every
//! operation checks the variant first, validates its arguments next and
//! only then talks to the hardware, so a rejected call never writes a byte.

use super::decoder::{DecodedResponse, Response};
use super::operations::Operation;
use super::protocol::Protocol;
use super::tlv::FiscalTags;
use super::values::{le_uint, DeviceProfile, SubMode, Value};
use super::variants::{variant_by_name, DeviceVariant, Tapes, ALL_COMMANDS};
use crate::config::{baud_to_code, ConnectionConfig, DEFAULT_ADMIN_PASSWORD, DEFAULT_CASHIER_PASSWORD};
use crate::error::{relabel, DeviceErrorKind, KkmError, Result};
use crate::text::{decode_cp1251, encode_cp1251, pad_text, strip_nul};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Width of item and check texts.
pub const ITEM_TEXT_LEN: usize = 40;
/// Largest value of a 5-byte money or quantity parameter.
pub const MAX_AMOUNT: u64 = (1 << 40) - 1;
/// Pause between status polls while a document prints.
pub const WAIT_INTERVAL: Duration = Duration::from_millis(10);

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

/// Document type for [`Device::open_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Sale = 0,
    Purchase = 1,
    SaleReturn = 2,
    PurchaseReturn = 3,
}

/// One registered item. Quantity is in thousandths, price in minor units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemLine {
    pub text: String,
    pub quantity: u64,
    pub price: u64,
    pub department: u8,
    pub taxes: [u8; 4],
}

/// Payments and adjustments applied when a check is closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckClosing {
    pub cash: u64,
    pub payment_type2: u64,
    pub payment_type3: u64,
    pub payment_type4: u64,
    /// Negative for a discount, positive for an allowance, in percent
    /// hundredths.
    pub discount: i16,
    pub taxes: [u8; 4],
    pub text: String,
}

/// Settings-table cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableValue {
    Int(u64),
    Text(String),
}

/// How [`Device::read_table`] should interpret the returned cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableValueKind {
    Int,
    Text,
}

fn amount(value: u64, what: &str) -> Result<[u8; 5]> {
    if value > MAX_AMOUNT {
        return Err(KkmError::Argument(format!(
            "{what} {value} does not fit in 5 bytes"
        )));
    }
    let b = value.to_le_bytes();
    Ok([b[0], b[1], b[2], b[3], b[4]])
}

/// Shortest little-endian encoding, at least one byte.
fn minimal_le(value: u64) -> Vec<u8> {
    let n = (((64 - value.leading_zeros()) + 7) / 8).max(1) as usize;
    value.to_le_bytes()[..n].to_vec()
}

fn device_year(year: i32) -> Result<u8> {
    u8::try_from(year - 2000)
        .map_err(|_| KkmError::Argument(format!("year {year} outside 2000..=2255")))
}

fn tape_bits(tapes: Tapes) -> u8 {
    (tapes.control as u8) | (tapes.cash as u8) << 1 | (tapes.skid as u8) << 2
}

// ---------------------------------------------------------------------------
// Device
// ---------------------------------------------------------------------------

pub struct Device {
    protocol: Protocol,
    variant: &'static DeviceVariant,
    password: u32,
    admin_password: u32,
    info: Option<DecodedResponse>,
    wait_interval: Duration,
}

impl Device {
    pub fn new(protocol: Protocol, variant: &'static DeviceVariant) -> Self {
        Self {
            protocol,
            variant,
            password: DEFAULT_CASHIER_PASSWORD,
            admin_password: DEFAULT_ADMIN_PASSWORD,
            info: None,
            wait_interval: WAIT_INTERVAL,
        }
    }

    /// Serial device for a configuration. No variant name means every
    /// registered command is allowed.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let variant = match config.variant.as_deref() {
            Some(name) => variant_by_name(name)
                .ok_or_else(|| KkmError::Config(format!("unknown device variant '{name}'")))?,
            None => &ALL_COMMANDS,
        };
        let protocol = Protocol::from_config(config)?;
        Ok(Self::new(protocol, variant).with_passwords(config.password, config.admin_password))
    }

    pub fn with_passwords(mut self, password: u32, admin_password: u32) -> Self {
        self.password = password;
        self.admin_password = admin_password;
        self
    }

    pub fn set_wait_interval(&mut self, interval: Duration) {
        self.wait_interval = interval;
    }

    pub fn variant(&self) -> &'static DeviceVariant {
        self.variant
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.variant.supports(op)
    }

    pub fn is_connected(&self) -> bool {
        self.protocol.is_connected()
    }

    /// Last identify response, if any.
    pub fn info(&self) -> Option<&DecodedResponse> {
        self.info.as_ref()
    }

    /// Device name reported by the firmware.
    pub fn name(&self) -> Option<&str> {
        self.info.as_ref().and_then(|i| i.text("device_name"))
    }

    pub fn protocol_mut(&mut self) -> &mut Protocol {
        &mut self.protocol
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Connect, then identify the model when the variant can.
    pub fn connect(&mut self) -> Result<()> {
        self.protocol.connect()?;
        if self.supports(Operation::Model) {
            if let Err(e) = self.identify() {
                if let Err(close) = self.protocol.disconnect() {
                    debug!("Closing after failed identify: {close}");
                }
                return Err(e);
            }
        }
        info!(
            "Device {} ready ({})",
            self.name().unwrap_or("unidentified"),
            self.variant.name
        );
        Ok(())
    }

    /// Drop the connection and connect again.
    pub fn reconnect(&mut self) -> Result<()> {
        self.protocol.disconnect()?;
        self.connect()
    }

    pub fn disconnect(&mut self) -> Result<()> {
        self.protocol.disconnect()
    }

    /// Request the device type (0xFC) and switch decoding to its model.
    pub fn identify(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::Model)?;
        let info = self.protocol.send_command(0xFC, &[])?.into_fields()?;
        let model = info.int("model").and_then(|m| u8::try_from(m).ok());
        self.protocol.set_profile(DeviceProfile::new(model));
        debug!("Identified model {model:?}");
        self.info = Some(info.clone());
        Ok(info)
    }

    // -----------------------------------------------------------------------
    // Dispatch helpers
    // -----------------------------------------------------------------------

    fn require(&self, op: Operation) -> Result<()> {
        if self.variant.supports(op) {
            Ok(())
        } else {
            Err(KkmError::Unsupported {
                operation: op.name(),
                variant: self.variant.name,
            })
        }
    }

    fn issue(&mut self, op: Operation, password: u32, params: &[u8]) -> Result<DecodedResponse> {
        let code = op.code().ok_or(KkmError::Unsupported {
            operation: op.name(),
            variant: self.variant.name,
        })?;
        debug!("{} (0x{:02X})", op.name(), code);
        self.protocol.command(code, password, params)?.into_fields()
    }

    fn cashier(&mut self, op: Operation, params: &[u8]) -> Result<DecodedResponse> {
        self.require(op)?;
        self.issue(op, self.password, params)
    }

    fn admin(&mut self, op: Operation, params: &[u8]) -> Result<DecodedResponse> {
        self.require(op)?;
        self.issue(op, self.admin_password, params)
    }

    /// Issue a validated command, then wait for the printer to go idle.
    fn printing(&mut self, op: Operation, password: u32, params: &[u8]) -> Result<DecodedResponse> {
        let result = self.issue(op, password, params)?;
        self.wait_printing()?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Short status (0x10).
    pub fn state(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::State, &[])
    }

    /// Full status (0x11).
    pub fn full_state(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::FullState, &[])
    }

    /// Poll status until the printer is idle. A register waiting for the
    /// continue-print command gets one; any error ends the wait.
    pub fn wait_printing(&mut self) -> Result<()> {
        loop {
            std::thread::sleep(self.wait_interval);
            let status = self.issue(Operation::State, self.password, &[])?;
            let submode = status.submode().ok_or_else(|| {
                KkmError::ProtocolViolation("short status without submode".into())
            })?;
            match submode.state {
                SubMode::PAPER_PRESENT => return Ok(()),
                SubMode::AWAITING_CONTINUE => {
                    debug!("Printer awaiting continue, sending 0xB0");
                    self.issue(Operation::ContinuePrint, self.admin_password, &[])?;
                }
                _ => {}
            }
        }
    }

    // -----------------------------------------------------------------------
    // Service
    // -----------------------------------------------------------------------

    pub fn beep(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::Beep, &[])
    }

    /// Program the exchange speed of a device port. `timeout_code` is the
    /// raw byte-receive timeout code.
    pub fn set_exchange_params(
        &mut self,
        port: u8,
        baud_rate: u32,
        timeout_code: u8,
    ) -> Result<DecodedResponse> {
        self.require(Operation::SetExchangeParams)?;
        let code = baud_to_code(baud_rate)
            .ok_or_else(|| KkmError::Argument(format!("unsupported baud rate {baud_rate}")))?;
        self.issue(
            Operation::SetExchangeParams,
            self.admin_password,
            &[port, code, timeout_code],
        )
    }

    pub fn read_exchange_params(&mut self, port: u8) -> Result<DecodedResponse> {
        self.admin(Operation::ReadExchangeParams, &[port])
    }

    /// Technological reset (0x16). Sent without a password.
    pub fn technological_reset(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::TechnologicalReset)?;
        self.protocol.send_command(0x16, &[])?.into_fields()
    }

    pub fn test_start(&mut self, minutes: u8) -> Result<DecodedResponse> {
        self.cashier(Operation::TestStart, &[minutes])
    }

    pub fn test_stop(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::TestStop, &[])
    }

    pub fn request_monetary_register(&mut self, num: u8) -> Result<DecodedResponse> {
        self.cashier(Operation::RequestMonetaryRegister, &[num])
    }

    pub fn request_operational_register(&mut self, num: u8) -> Result<DecodedResponse> {
        self.cashier(Operation::RequestOperationalRegister, &[num])
    }

    // -----------------------------------------------------------------------
    // Settings tables
    // -----------------------------------------------------------------------

    pub fn write_table(
        &mut self,
        table: u8,
        row: u16,
        field: u8,
        value: &TableValue,
    ) -> Result<DecodedResponse> {
        self.require(Operation::WriteTable)?;
        let mut params = vec![table];
        params.extend_from_slice(&row.to_le_bytes());
        params.push(field);
        match value {
            TableValue::Int(v) => params.extend(minimal_le(*v)),
            TableValue::Text(s) => params.extend(encode_cp1251(s)),
        }
        self.issue(Operation::WriteTable, self.admin_password, &params)
    }

    pub fn read_table(
        &mut self,
        table: u8,
        row: u16,
        field: u8,
        kind: TableValueKind,
    ) -> Result<TableValue> {
        self.require(Operation::ReadTable)?;
        let mut params = vec![table];
        params.extend_from_slice(&row.to_le_bytes());
        params.push(field);
        let r = self.issue(Operation::ReadTable, self.admin_password, &params)?;
        let raw = match r.get("value") {
            Some(Value::Bytes(b)) => b.as_slice(),
            _ => &[],
        };
        Ok(match kind {
            TableValueKind::Int => TableValue::Int(le_uint(raw)),
            TableValueKind::Text => TableValue::Text(decode_cp1251(strip_nul(raw))),
        })
    }

    pub fn request_table_structure(&mut self, table: u8) -> Result<DecodedResponse> {
        self.admin(Operation::RequestTableStructure, &[table])
    }

    pub fn request_field_structure(&mut self, table: u8, field: u8) -> Result<DecodedResponse> {
        self.admin(Operation::RequestFieldStructure, &[table, field])
    }

    // -----------------------------------------------------------------------
    // Clock
    // -----------------------------------------------------------------------

    pub fn set_time(&mut self, time: NaiveTime) -> Result<DecodedResponse> {
        self.admin(
            Operation::SetTime,
            &[time.hour() as u8, time.minute() as u8, time.second() as u8],
        )
    }

    pub fn set_date(&mut self, date: NaiveDate) -> Result<DecodedResponse> {
        self.require(Operation::SetDate)?;
        let params = [date.day() as u8, date.month() as u8, device_year(date.year())?];
        self.issue(Operation::SetDate, self.admin_password, &params)
    }

    pub fn confirm_date(&mut self, date: NaiveDate) -> Result<DecodedResponse> {
        self.require(Operation::ConfirmDate)?;
        let params = [date.day() as u8, date.month() as u8, device_year(date.year())?];
        self.issue(Operation::ConfirmDate, self.admin_password, &params)
    }

    /// Set time, set date and confirm the date.
    pub fn set_datetime(&mut self, datetime: NaiveDateTime) -> Result<()> {
        self.require(Operation::SetDateTime)?;
        device_year(datetime.year())?;
        self.set_time(datetime.time())?;
        self.set_date(datetime.date())?;
        self.confirm_date(datetime.date())?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Printer
    // -----------------------------------------------------------------------

    /// Print one line, cut to the variant's line width.
    pub fn print_string(&mut self, text: &str, tapes: Tapes) -> Result<DecodedResponse> {
        self.require(Operation::PrintString)?;
        let line: String = text.chars().take(self.variant.max_text_len).collect();
        let mut params = vec![tape_bits(Tapes { skid: false, ..tapes })];
        params.extend(encode_cp1251(&line));
        self.printing(Operation::PrintString, self.password, &params)
    }

    /// Print a separator filling the whole line.
    pub fn print_line(&mut self, symbol: char, tapes: Tapes) -> Result<DecodedResponse> {
        self.require(Operation::PrintLine)?;
        let line: String = std::iter::repeat(symbol)
            .take(self.variant.max_text_len)
            .collect();
        self.print_string(&line, tapes)
    }

    pub fn cut(&mut self, partial: bool) -> Result<DecodedResponse> {
        self.cashier(Operation::Cut, &[partial as u8])
    }

    pub fn open_drawer(&mut self, drawer: u8) -> Result<DecodedResponse> {
        self.cashier(Operation::OpenDrawer, &[drawer])
    }

    /// Feed `count` lines on the selected tapes.
    pub fn feed(&mut self, count: u32, tapes: Tapes) -> Result<DecodedResponse> {
        self.require(Operation::Feed)?;
        let count = u8::try_from(count)
            .map_err(|_| KkmError::Argument(format!("feed count {count} exceeds 255")))?;
        self.issue(Operation::Feed, self.password, &[tape_bits(tapes), count])
    }

    pub fn load_graphics(&mut self, line: u8, data: &[u8]) -> Result<DecodedResponse> {
        let mut params = vec![line];
        params.extend_from_slice(data);
        self.cashier(Operation::LoadGraphics, &params)
    }

    pub fn print_graphics(&mut self, start_line: u8, end_line: u8) -> Result<DecodedResponse> {
        self.require(Operation::PrintGraphics)?;
        if start_line > end_line {
            return Err(KkmError::Argument(format!(
                "graphics range {start_line}..{end_line} is reversed"
            )));
        }
        self.issue(Operation::PrintGraphics, self.password, &[start_line, end_line])
    }

    pub fn print_barcode(&mut self, number: u64) -> Result<DecodedResponse> {
        self.require(Operation::PrintBarcode)?;
        let params = amount(number, "barcode")?;
        self.printing(Operation::PrintBarcode, self.password, &params)
    }

    pub fn continue_print(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::ContinuePrint)?;
        self.printing(Operation::ContinuePrint, self.admin_password, &[])
    }

    pub fn repeat(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::Repeat)?;
        self.printing(Operation::Repeat, self.password, &[])
    }

    // -----------------------------------------------------------------------
    // Reports and cash
    // -----------------------------------------------------------------------

    /// Daily report without closing the shift.
    pub fn x_report(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::XReport)?;
        self.printing(Operation::XReport, self.admin_password, &[])
    }

    /// Daily report closing the shift.
    pub fn z_report(&mut self) -> Result<DecodedResponse> {
        self.require(Operation::ZReport)?;
        self.printing(Operation::ZReport, self.admin_password, &[])
    }

    pub fn income(&mut self, cash: u64) -> Result<DecodedResponse> {
        self.require(Operation::Income)?;
        let params = amount(cash, "cash")?;
        self.printing(Operation::Income, self.password, &params)
    }

    pub fn outcome(&mut self, cash: u64) -> Result<DecodedResponse> {
        self.require(Operation::Outcome)?;
        let params = amount(cash, "cash")?;
        self.printing(Operation::Outcome, self.password, &params)
    }

    pub fn open_shift(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::OpenShift, &[])
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    pub fn open_check(&mut self, check_type: CheckType) -> Result<DecodedResponse> {
        relabel(
            self.cashier(Operation::OpenCheck, &[check_type as u8]),
            DeviceErrorKind::OpenCheck,
        )
    }

    fn item_params(item: &ItemLine) -> Result<Vec<u8>> {
        let mut params = Vec::with_capacity(55);
        params.extend(amount(item.quantity, "quantity")?);
        params.extend(amount(item.price, "price")?);
        params.push(item.department);
        params.extend(item.taxes);
        params.extend(pad_text(&item.text, ITEM_TEXT_LEN));
        Ok(params)
    }

    pub fn sale(&mut self, item: &ItemLine) -> Result<DecodedResponse> {
        self.require(Operation::Sale)?;
        let params = Self::item_params(item)?;
        relabel(
            self.issue(Operation::Sale, self.password, &params),
            DeviceErrorKind::ItemSale,
        )
    }

    pub fn return_sale(&mut self, item: &ItemLine) -> Result<DecodedResponse> {
        self.require(Operation::ReturnSale)?;
        let params = Self::item_params(item)?;
        self.issue(Operation::ReturnSale, self.password, &params)
    }

    pub fn close_check(&mut self, closing: &CheckClosing) -> Result<DecodedResponse> {
        self.require(Operation::CloseCheck)?;
        let mut params = Vec::with_capacity(67);
        params.extend(amount(closing.cash, "cash")?);
        params.extend(amount(closing.payment_type2, "payment type 2")?);
        params.extend(amount(closing.payment_type3, "payment type 3")?);
        params.extend(amount(closing.payment_type4, "payment type 4")?);
        params.extend(closing.discount.to_le_bytes());
        params.extend(closing.taxes);
        params.extend(pad_text(&closing.text, ITEM_TEXT_LEN));
        let result = relabel(
            self.issue(Operation::CloseCheck, self.password, &params),
            DeviceErrorKind::CloseCheck,
        )?;
        self.wait_printing()?;
        Ok(result)
    }

    fn adjustment(
        &mut self,
        op: Operation,
        sum: u64,
        taxes: [u8; 4],
        text: &str,
    ) -> Result<DecodedResponse> {
        self.require(op)?;
        let mut params = Vec::with_capacity(49);
        params.extend(amount(sum, "sum")?);
        params.extend(taxes);
        params.extend(pad_text(text, ITEM_TEXT_LEN));
        self.issue(op, self.password, &params)
    }

    pub fn discount(&mut self, sum: u64, taxes: [u8; 4], text: &str) -> Result<DecodedResponse> {
        self.adjustment(Operation::Discount, sum, taxes, text)
    }

    pub fn allowance(&mut self, sum: u64, taxes: [u8; 4], text: &str) -> Result<DecodedResponse> {
        self.adjustment(Operation::Allowance, sum, taxes, text)
    }

    pub fn cancel_check(&mut self) -> Result<DecodedResponse> {
        self.cashier(Operation::CancelCheck, &[])
    }

    // -----------------------------------------------------------------------
    // Fiscal storage
    // -----------------------------------------------------------------------

    pub fn fs_state(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsState, &[])
    }

    pub fn fs_expiration(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsExpiration, &[])
    }

    pub fn fs_cancel_document(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsCancelDocument, &[])
    }

    pub fn fs_find_document(&mut self, number: u32) -> Result<DecodedResponse> {
        self.admin(Operation::FsFindDocument, &number.to_le_bytes())
    }

    pub fn fs_open_shift(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsOpenShift, &[])
    }

    /// Attach TLV requisites to the open document.
    pub fn fs_send_tlv(&mut self, tags: &FiscalTags) -> Result<DecodedResponse> {
        self.require(Operation::FsSendTlv)?;
        if tags.is_empty() {
            return Err(KkmError::Argument("no TLV records to send".into()));
        }
        self.issue(Operation::FsSendTlv, self.admin_password, tags.as_bytes())
    }

    pub fn fs_begin_correction(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsBeginCorrection, &[])
    }

    pub fn fs_build_correction(&mut self, total: u64, kind: u8) -> Result<DecodedResponse> {
        self.require(Operation::FsBuildCorrection)?;
        let mut params = amount(total, "total")?.to_vec();
        params.push(kind);
        self.issue(Operation::FsBuildCorrection, self.admin_password, &params)
    }

    pub fn fs_settlement_report(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsSettlementReport, &[])
    }

    pub fn fs_exchange_status(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsExchangeStatus, &[])
    }

    pub fn fs_unconfirmed_count(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsUnconfirmedCount, &[])
    }

    pub fn fs_shift_params(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsShiftParams, &[])
    }

    pub fn fs_begin_open_shift(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsBeginOpenShift, &[])
    }

    pub fn fs_begin_close_shift(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsBeginCloseShift, &[])
    }

    pub fn fs_close_shift(&mut self) -> Result<DecodedResponse> {
        self.admin(Operation::FsCloseShift, &[])
    }

    /// Any registered command the variant accepts, with the cashier password.
    pub fn raw_command(&mut self, code: u16, params: &[u8]) -> Result<Response> {
        if !self.variant.accepts_code(code) {
            return Err(KkmError::Unsupported {
                operation: "raw_command",
                variant: self.variant.name,
            });
        }
        self.protocol.command(code, self.password, params)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecr::frame::{self, ACK, NAK, STX};
    use crate::ecr::transport::mock::ScriptedTransport;
    use crate::ecr::variants::{SHTRIH_COMBO_FR_K, SHTRIH_FR_01F, SHTRIH_FR_K};
    use std::sync::{Arc, Mutex};

    type Written = Arc<Mutex<Vec<Vec<u8>>>>;

    /// Script entries for one command: handshake, acknowledged response,
    /// and the host's closing ACK.
    fn reply(payload: &[u8]) -> Vec<Vec<u8>> {
        let mut framed = vec![ACK, STX, payload.len() as u8];
        framed.extend_from_slice(payload);
        framed.push(frame::lrc(&framed[2..]));
        vec![vec![NAK], framed, vec![]]
    }

    fn status(submode: u8) -> Vec<Vec<u8>> {
        reply(&[0x10, 0x00, 0x01, 0x00, 0x00, 0x04, submode])
    }

    fn ok(code: u8) -> Vec<Vec<u8>> {
        reply(&[code, 0x00, 0x01])
    }

    fn model_reply(model: u8, name: &str) -> Vec<Vec<u8>> {
        let mut payload = vec![0xFC, 0x00, 0x00, 0x00, 0x01, 0x0B, model, 0x00];
        payload.extend(encode_cp1251(name));
        reply(&payload)
    }

    /// Connected device; `connect` consumes the leading handshake and, when
    /// the variant identifies, a model reply.
    fn device(variant: &'static DeviceVariant, rest: Vec<Vec<Vec<u8>>>) -> (Device, Written) {
        let mut script = vec![vec![NAK]];
        script.extend(model_reply(4, "ШТРИХ-ФР-К"));
        for r in rest {
            script.extend(r);
        }
        let t = ScriptedTransport::new(script);
        let written = t.written();
        let mut d = Device::new(Protocol::new(Box::new(t)), variant);
        d.set_wait_interval(Duration::ZERO);
        d.connect().unwrap();
        (d, written)
    }

    fn frames(w: &Written) -> Vec<Vec<u8>> {
        w.lock()
            .unwrap()
            .iter()
            .filter(|b| b.first() == Some(&STX))
            .cloned()
            .collect()
    }

    #[test]
    fn test_connect_identifies_model() {
        let (d, w) = device(&SHTRIH_FR_K, vec![]);
        assert_eq!(d.name(), Some("ШТРИХ-ФР-К"));
        assert_eq!(d.protocol.profile().model, Some(4));
        assert_eq!(frames(&w), vec![frame::encode(0xFC, None, &[]).unwrap()]);
    }

    #[test]
    fn test_failed_identify_closes_link() {
        let mut script = vec![vec![NAK]];
        script.extend(reply(&[0xFC, 0x01]));
        let t = ScriptedTransport::new(script);
        let mut d = Device::new(Protocol::new(Box::new(t)), &SHTRIH_FR_K);
        let err = d.connect().unwrap_err();
        assert_eq!(err.device_error().unwrap().code, 0x01);
        assert!(!d.is_connected());
        assert!(!d.protocol.is_connected());
        assert!(d.info().is_none());
    }

    #[test]
    fn test_unsupported_rejected_before_io() {
        let t = ScriptedTransport::new(Vec::<Vec<u8>>::new());
        let w = t.written();
        let mut d = Device::new(Protocol::new(Box::new(t)), &SHTRIH_FR_K);
        let err = d.open_shift().unwrap_err();
        assert!(matches!(
            err,
            KkmError::Unsupported {
                operation: "open_shift",
                variant: "Shtrih-FR-K"
            }
        ));
        assert!(d.fs_state().is_err());
        assert!(w.lock().unwrap().is_empty());
    }

    #[test]
    fn test_feed_count_validated_before_io() {
        let (mut d, w) = device(&SHTRIH_FR_K, vec![]);
        let before = w.lock().unwrap().len();
        let err = d.feed(300, Tapes::new(false, true, false)).unwrap_err();
        assert!(matches!(err, KkmError::Argument(_)));
        assert_eq!(w.lock().unwrap().len(), before);
    }

    #[test]
    fn test_feed_encoding() {
        let (mut d, w) = device(&SHTRIH_FR_K, vec![ok(0x29)]);
        d.feed(3, Tapes::new(true, false, true)).unwrap();
        let sent = frames(&w).pop().unwrap();
        assert_eq!(sent, frame::encode(0x29, Some(1), &[0b101, 3]).unwrap());
    }

    #[test]
    fn test_print_string_waits_and_continues() {
        let (mut d, w) = device(
            &SHTRIH_FR_K,
            vec![ok(0x17), status(5), status(3), ok(0xB0), status(0)],
        );
        let text = "x".repeat(50);
        d.print_string(&text, Tapes::new(true, true, false)).unwrap();

        let sent = frames(&w);
        let codes: Vec<u8> = sent.iter().map(|f| f[2]).collect();
        assert_eq!(codes, vec![0xFC, 0x17, 0x10, 0x10, 0xB0, 0x10]);
        // flags + 36 characters
        assert_eq!(sent[1][1] as usize, 1 + 4 + 1 + 36);
        assert_eq!(sent[1][7], 0b11);
        // continue-print uses the admin password
        assert_eq!(&sent[4][3..7], &30u32.to_le_bytes());
    }

    #[test]
    fn test_wait_printing_propagates_errors() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![ok(0x40), reply(&[0x10, 0x50, 0x01])]);
        let err = d.x_report().unwrap_err();
        assert_eq!(err.device_error().unwrap().code, 0x50);
    }

    #[test]
    fn test_print_line_fills_width() {
        let (mut d, w) = device(&SHTRIH_COMBO_FR_K, vec![ok(0x17), status(0)]);
        d.print_line('=', Tapes::new(false, true, false)).unwrap();
        let sent = frames(&w);
        let body = &sent[1][8..sent[1].len() - 1];
        assert_eq!(body.len(), 48);
        assert!(body.iter().all(|&b| b == b'='));
    }

    #[test]
    fn test_sale_error_relabeled() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![reply(&[0x80, 0x4A, 0x01])]);
        let item = ItemLine {
            text: "Хлеб".into(),
            quantity: 1000,
            price: 4500,
            ..ItemLine::default()
        };
        let err = d.sale(&item).unwrap_err();
        let dev = err.device_error().unwrap();
        assert_eq!(dev.code, 0x4A);
        assert_eq!(dev.kind, DeviceErrorKind::ItemSale);
    }

    #[test]
    fn test_sale_encoding() {
        let (mut d, w) = device(&SHTRIH_FR_K, vec![ok(0x80)]);
        let item = ItemLine {
            text: "Milk".into(),
            quantity: 2000,
            price: 0x0102,
            department: 1,
            taxes: [1, 0, 0, 0],
        };
        d.sale(&item).unwrap();
        let sent = frames(&w).pop().unwrap();
        let params = &sent[7..sent.len() - 1];
        assert_eq!(params.len(), 55);
        assert_eq!(&params[..5], &[0xD0, 0x07, 0, 0, 0]);
        assert_eq!(&params[5..10], &[0x02, 0x01, 0, 0, 0]);
        assert_eq!(params[10], 1);
        assert_eq!(&params[15..19], b"Milk");
        assert_eq!(params[19], 0);
    }

    #[test]
    fn test_amount_overflow_is_argument_error() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![]);
        let err = d.income(MAX_AMOUNT + 1).unwrap_err();
        assert!(matches!(err, KkmError::Argument(_)));
    }

    #[test]
    fn test_close_check_relabels_and_waits() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![reply(&[0x85, 0x45, 0x01])]);
        let err = d.close_check(&CheckClosing::default()).unwrap_err();
        assert_eq!(err.device_error().unwrap().kind, DeviceErrorKind::CloseCheck);

        let mut change = vec![0x85, 0x00, 0x01];
        change.extend_from_slice(&[0x10, 0x27, 0, 0, 0]);
        let (mut d, _) = device(&SHTRIH_FR_K, vec![reply(&change), status(0)]);
        let r = d
            .close_check(&CheckClosing {
                cash: 20_000,
                ..CheckClosing::default()
            })
            .unwrap();
        assert_eq!(r.int("change"), Some(10_000));
    }

    #[test]
    fn test_open_check_relabeled() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![reply(&[0x8D, 0x4A, 0x01])]);
        let err = d.open_check(CheckType::SaleReturn).unwrap_err();
        assert_eq!(err.device_error().unwrap().kind, DeviceErrorKind::OpenCheck);
    }

    #[test]
    fn test_set_datetime_issues_three_commands() {
        let (mut d, w) = device(&SHTRIH_FR_K, vec![ok(0x21), ok(0x22), ok(0x23)]);
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        d.set_datetime(dt).unwrap();
        let sent = frames(&w);
        assert_eq!(&sent[1][7..10], &[14, 5, 0]);
        assert_eq!(&sent[2][7..10], &[9, 3, 24]);
        assert_eq!(sent[3][2], 0x23);
    }

    #[test]
    fn test_date_out_of_range() {
        let (mut d, _) = device(&SHTRIH_FR_K, vec![]);
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert!(matches!(d.set_date(date), Err(KkmError::Argument(_))));
    }

    #[test]
    fn test_read_table_text_and_int() {
        let mut text = vec![0x1F, 0x00];
        text.extend(crate::text::pad_text("ООО Ромашка", 10));
        let (mut d, w) = device(
            &SHTRIH_FR_K,
            vec![reply(&text), reply(&[0x1F, 0x00, 0x0F, 0x27])],
        );
        let v = d.read_table(18, 1, 7, TableValueKind::Text).unwrap();
        assert_eq!(v, TableValue::Text("ООО Ромашка".chars().take(10).collect()));
        let v = d.read_table(1, 1, 1, TableValueKind::Int).unwrap();
        assert_eq!(v, TableValue::Int(9999));
        let sent = frames(&w);
        assert_eq!(&sent[1][7..11], &[18, 1, 0, 7]);
    }

    #[test]
    fn test_write_table_minimal_int() {
        let (mut d, w) = device(&SHTRIH_FR_K, vec![reply(&[0x1E, 0x00])]);
        d.write_table(1, 2, 3, &TableValue::Int(0x0100)).unwrap();
        let sent = frames(&w).pop().unwrap();
        assert_eq!(&sent[7..sent.len() - 1], &[1, 2, 0, 3, 0x00, 0x01]);
        assert_eq!(minimal_le(0), vec![0]);
    }

    #[test]
    fn test_fs_send_tlv() {
        let (mut d, w) = device(&SHTRIH_FR_01F, vec![reply(&[0xFF, 0x0C, 0x00])]);
        assert!(matches!(
            d.fs_send_tlv(&FiscalTags::new()),
            Err(KkmError::Argument(_))
        ));
        let tags = FiscalTags::from_pairs([(crate::ecr::tlv::CASHIER, "Ivanov")]).unwrap();
        d.fs_send_tlv(&tags).unwrap();
        let sent = frames(&w).pop().unwrap();
        assert_eq!(&sent[2..4], &[0xFF, 0x0C]);
        assert_eq!(&sent[8..sent.len() - 1], tags.as_bytes());
    }

    #[test]
    fn test_fs_close_shift_not_on_fr_01f() {
        let (mut d, _) = device(&SHTRIH_FR_01F, vec![]);
        assert!(d.supports(Operation::FsState));
        assert!(matches!(
            d.fs_close_shift(),
            Err(KkmError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_from_config_unknown_variant() {
        let mut cfg = ConnectionConfig::new("/dev/ttyS0", 9600);
        cfg.variant = Some("Shtrih-Unknown".into());
        assert!(matches!(Device::from_config(&cfg), Err(KkmError::Config(_))));
        cfg.variant = Some("Shtrih-M-01F".into());
        let d = Device::from_config(&cfg).unwrap();
        assert_eq!(d.variant().max_text_len, 48);
        assert!(!d.is_connected());
    }
}
