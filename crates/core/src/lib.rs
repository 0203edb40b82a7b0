//! `volterp-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod id;
pub mod money;

pub use id::{CustomerId, DeliveryNoteId, InvoiceId, ProductCode, ProductId};
pub use money::{CURRENCY_SCALE, QUANTITY_SCALE, round_currency, round_quantity};
