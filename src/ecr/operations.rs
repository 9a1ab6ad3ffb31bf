//! Device operations and the relations between them.

use super::composer::Primitive;
use serde::Serialize;

/// Everything a [`Device`](super::device::Device) can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    State,
    FullState,
    Beep,
    SetExchangeParams,
    ReadExchangeParams,
    TechnologicalReset,
    PrintString,
    PrintLine,
    TestStart,
    RequestMonetaryRegister,
    RequestOperationalRegister,
    WriteTable,
    ReadTable,
    SetTime,
    SetDate,
    ConfirmDate,
    SetDateTime,
    Cut,
    OpenDrawer,
    Feed,
    TestStop,
    RequestTableStructure,
    RequestFieldStructure,
    XReport,
    ZReport,
    Income,
    Outcome,
    Sale,
    ReturnSale,
    CloseCheck,
    Discount,
    Allowance,
    CancelCheck,
    Repeat,
    OpenCheck,
    ContinuePrint,
    LoadGraphics,
    PrintGraphics,
    PrintBarcode,
    OpenShift,
    Model,
    WaitPrinting,
    FsState,
    FsExpiration,
    FsCancelDocument,
    FsFindDocument,
    FsOpenShift,
    FsSendTlv,
    FsBeginCorrection,
    FsBuildCorrection,
    FsSettlementReport,
    FsExchangeStatus,
    FsUnconfirmedCount,
    FsShiftParams,
    FsBeginOpenShift,
    FsBeginCloseShift,
    FsCloseShift,
}

use Operation::*;

const PRINTS: &[Operation] = &[WaitPrinting];

/// The operation graph.
pub static OPERATIONS: &[Primitive<Operation>] = &[
    Primitive::new(State, Some(0x10)),
    Primitive::new(FullState, Some(0x11)),
    Primitive::new(Beep, Some(0x13)),
    Primitive::new(SetExchangeParams, Some(0x14)),
    Primitive::new(ReadExchangeParams, Some(0x15)),
    Primitive::new(TechnologicalReset, Some(0x16)),
    Primitive::new(PrintString, Some(0x17))
        .depends(PRINTS)
        .related(&[PrintLine]),
    Primitive::new(PrintLine, None),
    Primitive::new(TestStart, Some(0x19)),
    Primitive::new(RequestMonetaryRegister, Some(0x1A)),
    Primitive::new(RequestOperationalRegister, Some(0x1B)),
    Primitive::new(WriteTable, Some(0x1E)),
    Primitive::new(ReadTable, Some(0x1F)),
    Primitive::new(SetTime, Some(0x21)),
    Primitive::new(SetDate, Some(0x22)),
    Primitive::new(ConfirmDate, Some(0x23)),
    Primitive::new(SetDateTime, None).requires(&[SetTime, SetDate, ConfirmDate]),
    Primitive::new(Cut, Some(0x25)),
    Primitive::new(OpenDrawer, Some(0x28)),
    Primitive::new(Feed, Some(0x29)),
    Primitive::new(TestStop, Some(0x2B)),
    Primitive::new(RequestTableStructure, Some(0x2D)),
    Primitive::new(RequestFieldStructure, Some(0x2E)),
    Primitive::new(XReport, Some(0x40)).depends(PRINTS),
    Primitive::new(ZReport, Some(0x41)).depends(PRINTS),
    Primitive::new(Income, Some(0x50)).depends(PRINTS),
    Primitive::new(Outcome, Some(0x51)).depends(PRINTS),
    Primitive::new(Sale, Some(0x80)),
    Primitive::new(ReturnSale, Some(0x82)),
    Primitive::new(CloseCheck, Some(0x85)).depends(PRINTS),
    Primitive::new(Discount, Some(0x86)),
    Primitive::new(Allowance, Some(0x87)),
    Primitive::new(CancelCheck, Some(0x88)),
    Primitive::new(Repeat, Some(0x8C)).depends(PRINTS),
    Primitive::new(OpenCheck, Some(0x8D)),
    Primitive::new(ContinuePrint, Some(0xB0)).depends(PRINTS),
    Primitive::new(LoadGraphics, Some(0xC0)),
    Primitive::new(PrintGraphics, Some(0xC1)),
    Primitive::new(PrintBarcode, Some(0xC2)).depends(PRINTS),
    Primitive::new(OpenShift, Some(0xE0)),
    Primitive::new(Model, Some(0xFC)),
    // polls state and issues continue-print itself
    Primitive::new(WaitPrinting, None),
    Primitive::new(FsState, Some(0xFF01)),
    Primitive::new(FsExpiration, Some(0xFF03)),
    Primitive::new(FsCancelDocument, Some(0xFF08)),
    Primitive::new(FsFindDocument, Some(0xFF0A)),
    Primitive::new(FsOpenShift, Some(0xFF0B)),
    Primitive::new(FsSendTlv, Some(0xFF0C)),
    Primitive::new(FsBeginCorrection, Some(0xFF35)),
    Primitive::new(FsBuildCorrection, Some(0xFF36)),
    Primitive::new(FsSettlementReport, Some(0xFF38)),
    Primitive::new(FsExchangeStatus, Some(0xFF39)),
    Primitive::new(FsUnconfirmedCount, Some(0xFF3F)),
    Primitive::new(FsShiftParams, Some(0xFF40)),
    Primitive::new(FsBeginOpenShift, Some(0xFF41)),
    Primitive::new(FsBeginCloseShift, Some(0xFF42)),
    Primitive::new(FsCloseShift, Some(0xFF43)),
];

impl Operation {
    fn primitive(self) -> Option<&'static Primitive<Operation>> {
        OPERATIONS.iter().find(|p| p.id == self)
    }

    /// Wire command this operation issues directly.
    pub fn code(self) -> Option<u16> {
        self.primitive().and_then(|p| p.code)
    }

    pub fn from_code(code: u16) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|p| p.code == Some(code))
            .map(|p| p.id)
    }

    /// Snake-case name, as used in logs and `Unsupported` errors.
    pub fn name(self) -> &'static str {
        match self {
            State => "state",
            FullState => "full_state",
            Beep => "beep",
            SetExchangeParams => "set_exchange_params",
            ReadExchangeParams => "read_exchange_params",
            TechnologicalReset => "technological_reset",
            PrintString => "print_string",
            PrintLine => "print_line",
            TestStart => "test_start",
            RequestMonetaryRegister => "request_monetary_register",
            RequestOperationalRegister => "request_operational_register",
            WriteTable => "write_table",
            ReadTable => "read_table",
            SetTime => "set_time",
            SetDate => "set_date",
            ConfirmDate => "confirm_date",
            SetDateTime => "set_datetime",
            Cut => "cut",
            OpenDrawer => "open_drawer",
            Feed => "feed",
            TestStop => "test_stop",
            RequestTableStructure => "request_table_structure",
            RequestFieldStructure => "request_field_structure",
            XReport => "x_report",
            ZReport => "z_report",
            Income => "income",
            Outcome => "outcome",
            Sale => "sale",
            ReturnSale => "return_sale",
            CloseCheck => "close_check",
            Discount => "discount",
            Allowance => "allowance",
            CancelCheck => "cancel_check",
            Repeat => "repeat",
            OpenCheck => "open_check",
            ContinuePrint => "continue_print",
            LoadGraphics => "load_graphics",
            PrintGraphics => "print_graphics",
            PrintBarcode => "print_barcode",
            OpenShift => "open_shift",
            Model => "model",
            WaitPrinting => "wait_printing",
            FsState => "fs_state",
            FsExpiration => "fs_expiration",
            FsCancelDocument => "fs_cancel_document",
            FsFindDocument => "fs_find_document",
            FsOpenShift => "fs_open_shift",
            FsSendTlv => "fs_send_tlv",
            FsBeginCorrection => "fs_begin_correction",
            FsBuildCorrection => "fs_build_correction",
            FsSettlementReport => "fs_settlement_report",
            FsExchangeStatus => "fs_exchange_status",
            FsUnconfirmedCount => "fs_unconfirmed_count",
            FsShiftParams => "fs_shift_params",
            FsBeginOpenShift => "fs_begin_open_shift",
            FsBeginCloseShift => "fs_begin_close_shift",
            FsCloseShift => "fs_close_shift",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecr::composer::{detect_cycle, resolve};
    use crate::ecr::registry::CommandRegistry;
    use std::collections::BTreeSet;

    #[test]
    fn test_graph_is_acyclic() {
        assert_eq!(detect_cycle(OPERATIONS), None);
    }

    #[test]
    fn test_every_command_has_one_operation() {
        let reg = CommandRegistry::builtin();
        for code in reg.codes() {
            let ops: Vec<_> = OPERATIONS.iter().filter(|p| p.code == Some(code)).collect();
            assert_eq!(ops.len(), 1, "0x{code:04X}");
        }
        for p in OPERATIONS {
            if let Some(code) = p.code {
                assert!(reg.contains(code), "{} has no schema", p.id.name());
            }
        }
    }

    #[test]
    fn test_ids_unique() {
        let ids: BTreeSet<_> = OPERATIONS.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), OPERATIONS.len());
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(Operation::from_code(0x10), Some(State));
        assert_eq!(Operation::from_code(0xFF43), Some(FsCloseShift));
        assert_eq!(WaitPrinting.code(), None);
        assert_eq!(CloseCheck.code(), Some(0x85));
    }

    #[test]
    fn test_print_string_pulls_wrapper_and_helper() {
        let set = resolve(&[0x17], OPERATIONS);
        assert!(set.contains(PrintString));
        assert!(set.contains(PrintLine));
        assert!(set.contains(WaitPrinting));
        assert!(!set.contains(State));
    }

    #[test]
    fn test_set_datetime_needs_all_three() {
        assert!(!resolve(&[0x21, 0x22], OPERATIONS).contains(SetDateTime));
        assert!(resolve(&[0x21, 0x22, 0x23], OPERATIONS).contains(SetDateTime));
    }

    #[test]
    fn test_names_are_snake_case() {
        for p in OPERATIONS {
            let json = serde_json::to_value(p.id).unwrap();
            assert_eq!(json, serde_json::json!(p.id.name()));
        }
    }
}
