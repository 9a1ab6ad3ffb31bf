//! ECR (Electronic Cash Register) module.
//!
//! Link protocol, command registry and typed operations for Shtrih-family
//! fiscal registers. Layers, leaves first: [`frame`] and [`error_codes`],
//! [`registry`] and [`decoder`], [`protocol`] over a [`transport`], then the
//! capability side ([`composer`], [`operations`], [`variants`]) that
//! [`device`] dispatches through.

pub mod composer;
pub mod decoder;
pub mod device;
pub mod error_codes;
pub mod frame;
pub mod operations;
pub mod protocol;
pub mod registry;
pub mod tlv;
pub mod transport;
pub mod values;
pub mod variants;

pub use decoder::{DecodedResponse, Response};
pub use device::Device;
pub use operations::Operation;
pub use protocol::Protocol;
pub use variants::DeviceVariant;
