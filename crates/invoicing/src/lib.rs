//! Invoicing domain module (lifecycle, dunning, price checks).
//!
//! This crate contains business rules for invoices and receivables,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). Every rule takes an explicit evaluation instant so behaviour is
//! testable without a clock.

pub mod delivery;
pub mod discrepancy;
pub mod dunning;
pub mod invoice;

pub use delivery::{DeliveryItem, DeliveryNote, DeliveryNoteStatus};
pub use discrepancy::{PriceDiscrepancy, annotate_price_discrepancies};
pub use dunning::{DunningAction, DunningPolicy, DunningStep, compute_dunning_action};
pub use invoice::{
    Invoice, InvoiceDirection, InvoiceLine, InvoiceStatus, InvoicingError, classify_status,
};
