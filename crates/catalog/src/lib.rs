//! Catalog domain module (products and composite-product resolution).
//!
//! This crate contains the product model and the bill-of-materials resolver,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod bom;
pub mod product;

pub use bom::{BillOfMaterials, BomLine, ProductSource, effective_availability, resolve_bom};
pub use product::{CatalogError, ComponentEdge, Product};
