//! In-memory Catalog/Ledger store.
//!
//! The domain crates only read snapshots through narrow seams; this crate
//! supplies the collaborator behind those seams. Intended for tests and
//! embedding. Not optimized for performance; any relational or document
//! store satisfying the same invariants can replace it.

use thiserror::Error;

use volterp_catalog::CatalogError;
use volterp_core::DeliveryNoteId;
use volterp_invoicing::InvoicingError;

pub mod catalog;
pub mod ledger;

pub use catalog::InMemoryCatalog;
pub use ledger::InMemoryLedger;

/// Store-level error: domain failures pass through, plus the handful of
/// conditions only the store can detect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Invoicing(#[from] InvoicingError),

    #[error("delivery note not found: {0}")]
    DeliveryNoteNotFound(DeliveryNoteId),

    #[error("delivery note {0} is already invoiced")]
    DeliveryNoteAlreadyInvoiced(DeliveryNoteId),

    #[error("store lock poisoned")]
    LockPoisoned,
}
