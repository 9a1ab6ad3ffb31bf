//! Device variants.
//!
//! A variant is plain data: the wire commands a model accepts and its
//! formatting limits. The operation set is resolved from the command list
//! the first time it is asked for and reused afterwards.

use super::composer::{self, FinalCommandSet};
use super::operations::{Operation, OPERATIONS};
use super::registry::CommandRegistry;
use crate::config::DEFAULT_BAUD_RATE;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;

/// Paper tapes a model prints on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Tapes {
    pub control: bool,
    pub cash: bool,
    pub skid: bool,
}

impl Tapes {
    pub const fn new(control: bool, cash: bool, skid: bool) -> Self {
        Self {
            control,
            cash,
            skid,
        }
    }
}

#[derive(Debug)]
pub struct DeviceVariant {
    pub name: &'static str,
    pub default_baud: u32,
    pub default_timeout: Duration,
    /// Characters per printed line.
    pub max_text_len: usize,
    pub tapes: Tapes,
    pub fiscal_storage: bool,
    /// Wire commands the firmware accepts. Empty means every registered
    /// command.
    supported: &'static [u16],
    resolved: OnceLock<FinalCommandSet<Operation>>,
}

impl DeviceVariant {
    const fn new(
        name: &'static str,
        supported: &'static [u16],
        max_text_len: usize,
        tapes: Tapes,
        fiscal_storage: bool,
    ) -> Self {
        Self {
            name,
            default_baud: DEFAULT_BAUD_RATE,
            default_timeout: Duration::from_secs(3),
            max_text_len,
            tapes,
            fiscal_storage,
            supported,
            resolved: OnceLock::new(),
        }
    }

    pub fn supported_codes(&self) -> Vec<u16> {
        if self.supported.is_empty() {
            CommandRegistry::builtin().codes().collect()
        } else {
            self.supported.to_vec()
        }
    }

    pub fn accepts_code(&self, code: u16) -> bool {
        if self.supported.is_empty() {
            CommandRegistry::builtin().contains(code)
        } else {
            self.supported.contains(&code)
        }
    }

    /// Every operation this variant can perform.
    pub fn commands(&self) -> &FinalCommandSet<Operation> {
        self.resolved.get_or_init(|| {
            let set = composer::resolve(&self.supported_codes(), OPERATIONS);
            info!("Variant {} resolved to {} operations", self.name, set.len());
            set
        })
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.commands().contains(op)
    }
}

// ---------------------------------------------------------------------------
// Command lists
// ---------------------------------------------------------------------------

const FR_K: &[u16] = &[
    0x10, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21, 0x22, 0x23,
    0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82, 0x85, 0x86, 0x87,
    0x88, 0x8C, 0x8D, 0xB0, 0xC2, 0xFC,
];

const COMBO_FR_K: &[u16] = &[
    0x10, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21, 0x22, 0x23,
    0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82, 0x85, 0x86, 0x87,
    0x88, 0x8C, 0x8D, 0xB0, 0xC0, 0xC1, 0xC2, 0xE0, 0xFC,
];

const LIGHT_PTK: &[u16] = &[
    0x10, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21, 0x22, 0x23,
    0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82, 0x85, 0x86, 0x87,
    0x88, 0x8C, 0x8D, 0xB0, 0xC0, 0xC1, 0xC2, 0xFC,
];

const K950: &[u16] = &[
    0x10, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21, 0x22, 0x23,
    0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82, 0x85, 0x86, 0x87,
    0x88, 0x8C, 0x8D, 0xB0, 0xFC,
];

const FR_01F: &[u16] = &[
    0x10, 0x11, 0x13, 0x14, 0x15, 0x16, 0x17, 0x19, 0x1A, 0x1B, 0x1E, 0x1F, 0x21, 0x22, 0x23,
    0x25, 0x28, 0x29, 0x2B, 0x2D, 0x2E, 0x40, 0x41, 0x50, 0x51, 0x80, 0x82, 0x85, 0x86, 0x87,
    0x88, 0x8C, 0x8D, 0xB0, 0xC0, 0xC1, 0xC2, 0xE0, 0xFC, 0xFF01, 0xFF03, 0xFF08, 0xFF0A,
    0xFF0C, 0xFF35, 0xFF36, 0xFF38, 0xFF39, 0xFF3F, 0xFF40, 0xFF41, 0xFF42,
];

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

pub static SHTRIH_FR_K: DeviceVariant =
    DeviceVariant::new("Shtrih-FR-K", FR_K, 36, Tapes::new(true, true, false), false);
pub static SHTRIH_COMBO_FR_K: DeviceVariant = DeviceVariant::new(
    "Shtrih-Combo-FR-K",
    COMBO_FR_K,
    48,
    Tapes::new(false, true, true),
    false,
);
pub static SHTRIH_LIGHT_PTK: DeviceVariant = DeviceVariant::new(
    "Shtrih-Light-PTK",
    LIGHT_PTK,
    36,
    Tapes::new(false, true, false),
    false,
);
pub static SHTRIH_950K: DeviceVariant = DeviceVariant::new(
    "Shtrih-950K",
    K950,
    40,
    Tapes::new(false, true, true),
    false,
);
pub static SHTRIH_FR_PTK: DeviceVariant =
    DeviceVariant::new("Shtrih-FR-PTK", FR_K, 36, Tapes::new(true, true, false), false);
pub static SHTRIH_COMBO_PTK: DeviceVariant = DeviceVariant::new(
    "Shtrih-Combo-PTK",
    COMBO_FR_K,
    48,
    Tapes::new(false, true, true),
    false,
);

const FS_TAPES: Tapes = Tapes::new(false, true, false);

pub static SHTRIH_FR_01F: DeviceVariant =
    DeviceVariant::new("Shtrih-FR-01F", FR_01F, 36, FS_TAPES, true);
pub static SHTRIH_ONLINE: DeviceVariant =
    DeviceVariant::new("Shtrih-OnLine", FR_01F, 36, FS_TAPES, true);
pub static SHTRIH_M_01F: DeviceVariant =
    DeviceVariant::new("Shtrih-M-01F", FR_01F, 48, FS_TAPES, true);
pub static SHTRIH_M_02F: DeviceVariant =
    DeviceVariant::new("Shtrih-M-02F", FR_01F, 48, FS_TAPES, true);
pub static SHTRIH_LIGHT_01F: DeviceVariant =
    DeviceVariant::new("Shtrih-Light-01F", FR_01F, 32, FS_TAPES, true);
pub static SHTRIH_LIGHT_02F: DeviceVariant =
    DeviceVariant::new("Shtrih-Light-02F", FR_01F, 32, FS_TAPES, true);
pub static SHTRIH_MINI_01F: DeviceVariant =
    DeviceVariant::new("Shtrih-Mini-01F", FR_01F, 50, FS_TAPES, true);
pub static RETAIL_01F: DeviceVariant =
    DeviceVariant::new("Retail-01F", FR_01F, 42, FS_TAPES, true);

/// Every registered command, for registers of unknown model.
pub static ALL_COMMANDS: DeviceVariant = DeviceVariant::new(
    "All commands",
    &[],
    40,
    Tapes::new(false, false, false),
    false,
);

static VARIANTS: [&DeviceVariant; 15] = [
    &SHTRIH_FR_K,
    &SHTRIH_COMBO_FR_K,
    &SHTRIH_LIGHT_PTK,
    &SHTRIH_950K,
    &SHTRIH_FR_PTK,
    &SHTRIH_COMBO_PTK,
    &SHTRIH_FR_01F,
    &SHTRIH_ONLINE,
    &SHTRIH_M_01F,
    &SHTRIH_M_02F,
    &SHTRIH_LIGHT_01F,
    &SHTRIH_LIGHT_02F,
    &SHTRIH_MINI_01F,
    &RETAIL_01F,
    &ALL_COMMANDS,
];

pub fn all_variants() -> &'static [&'static DeviceVariant] {
    &VARIANTS
}

/// Case-insensitive lookup by variant name.
pub fn variant_by_name(name: &str) -> Option<&'static DeviceVariant> {
    VARIANTS
        .iter()
        .copied()
        .find(|v| v.name.eq_ignore_ascii_case(name.trim()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_fifteen_named_variants() {
        let names: BTreeSet<_> = all_variants().iter().map(|v| v.name).collect();
        assert_eq!(names.len(), 15);
    }

    #[test]
    fn test_lookup_by_name() {
        let v = variant_by_name("shtrih-m-02f").unwrap();
        assert_eq!(v.max_text_len, 48);
        assert!(v.fiscal_storage);
        assert!(variant_by_name("Shtrih-Nope").is_none());
    }

    #[test]
    fn test_fr_k_has_no_graphics_or_fs() {
        let v = &SHTRIH_FR_K;
        assert!(v.supports(Operation::PrintBarcode));
        assert!(!v.supports(Operation::LoadGraphics));
        assert!(!v.supports(Operation::OpenShift));
        assert!(!v.supports(Operation::FsState));
        assert_eq!(v.tapes, Tapes::new(true, true, false));
    }

    #[test]
    fn test_950k_lacks_barcode() {
        assert!(!SHTRIH_950K.supports(Operation::PrintBarcode));
        assert!(SHTRIH_950K.supports(Operation::CloseCheck));
    }

    #[test]
    fn test_helpers_and_composites_resolved() {
        for v in all_variants() {
            assert!(v.supports(Operation::WaitPrinting), "{}", v.name);
            assert!(v.supports(Operation::PrintLine), "{}", v.name);
            assert!(v.supports(Operation::SetDateTime), "{}", v.name);
        }
    }

    #[test]
    fn test_fs_variants_share_command_set() {
        assert_eq!(SHTRIH_FR_01F.commands(), RETAIL_01F.commands());
        assert!(SHTRIH_MINI_01F.supports(Operation::FsSendTlv));
        assert!(!SHTRIH_MINI_01F.supports(Operation::FsCloseShift));
    }

    #[test]
    fn test_all_commands_covers_registry() {
        let reg = CommandRegistry::builtin();
        for code in reg.codes() {
            assert!(ALL_COMMANDS.accepts_code(code));
            let op = Operation::from_code(code).unwrap();
            assert!(ALL_COMMANDS.supports(op), "{}", op.name());
        }
    }

    #[test]
    fn test_resolution_memoized() {
        let a = SHTRIH_LIGHT_PTK.commands() as *const _;
        let b = SHTRIH_LIGHT_PTK.commands() as *const _;
        assert_eq!(a, b);
    }
}
