use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use volterp_core::{ProductCode, ProductId};

/// Catalog-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The referenced product does not exist in the catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A composite product directly or transitively references itself.
    /// Carries the product id that closes the cycle.
    #[error("cyclic bill of materials at product {0}")]
    CyclicBillOfMaterials(ProductId),

    /// A requested or component quantity was not strictly positive.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(Decimal),

    /// The catalog store could not serve the read (e.g. poisoned lock).
    #[error("catalog store unavailable: {0}")]
    Store(String),
}

/// A sellable catalog item.
///
/// A composite product is a virtual/assembled item: its own `stock_qty` is
/// not authoritative, availability derives from its components (see
/// [`crate::bom::effective_availability`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub code: ProductCode,
    pub name: String,
    pub category: String,
    /// Unit price at currency scale (two decimal places).
    pub unit_price: Decimal,
    pub stock_qty: i64,
    pub supplier: Option<String>,
    /// Unit of measure (e.g. "ks", "m", "súprava").
    pub unit: String,
    pub description: Option<String>,
    pub is_composite: bool,
}

impl Product {
    pub fn is_leaf(&self) -> bool {
        !self.is_composite
    }
}

/// Directed edge of the component graph: `parent` needs `quantity` of
/// `component` per unit. Quantities are scale-3 decimals and may be
/// fractional (e.g. 0.33 of a 3m bar per metre of run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEdge {
    pub parent: ProductId,
    pub component: ProductId,
    pub quantity: Decimal,
}

impl ComponentEdge {
    pub fn new(parent: ProductId, component: ProductId, quantity: Decimal) -> Self {
        Self {
            parent,
            component,
            quantity,
        }
    }
}
