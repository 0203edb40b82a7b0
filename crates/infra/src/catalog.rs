//! In-memory product catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use tracing::debug;

use volterp_catalog::{CatalogError, ComponentEdge, Product, ProductSource};
use volterp_core::{ProductCode, ProductId};

use crate::StoreError;

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    /// Component edges keyed by owning parent, in insertion order.
    components: HashMap<ProductId, Vec<ComponentEdge>>,
}

/// In-memory catalog store.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product record.
    pub fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state.products.insert(product.id, product);
        Ok(())
    }

    /// Attach a component edge to its parent.
    ///
    /// Both endpoints must already exist and the quantity must be strictly
    /// positive. Acyclicity is enforced by the resolver, which is the single
    /// authority on cycles.
    pub fn add_component(&self, edge: ComponentEdge) -> Result<(), StoreError> {
        if edge.quantity <= Decimal::ZERO {
            return Err(CatalogError::InvalidQuantity(edge.quantity).into());
        }

        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        for endpoint in [edge.parent, edge.component] {
            if !state.products.contains_key(&endpoint) {
                return Err(CatalogError::ProductNotFound(endpoint).into());
            }
        }
        state.components.entry(edge.parent).or_default().push(edge);
        Ok(())
    }

    /// Remove a product and cascade-delete the component edges it owns.
    ///
    /// Edges from other parents pointing at the removed product are left in
    /// place; the resolver surfaces them as `ProductNotFound`.
    pub fn remove_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        if state.products.remove(&id).is_none() {
            return Err(CatalogError::ProductNotFound(id).into());
        }
        state.components.remove(&id);
        debug!(%id, "removed product and its component edges");
        Ok(())
    }

    /// Look a product up by its human-facing code.
    pub fn product_by_code(&self, code: &ProductCode) -> Result<Option<Product>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.products.values().find(|p| &p.code == code).cloned())
    }
}

impl ProductSource for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
        let state = self
            .state
            .read()
            .map_err(|_| CatalogError::Store("lock poisoned".to_string()))?;
        Ok(state.products.get(&id).cloned())
    }

    fn components(&self, parent: ProductId) -> Result<Vec<ComponentEdge>, CatalogError> {
        let state = self
            .state
            .read()
            .map_err(|_| CatalogError::Store("lock poisoned".to_string()))?;
        Ok(state.components.get(&parent).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn product(id: i32, code: &str, is_composite: bool) -> Product {
        Product {
            id: ProductId::new(id),
            code: ProductCode::from(code),
            name: code.to_string(),
            category: "test".to_string(),
            unit_price: dec!(1.00),
            stock_qty: 10,
            supplier: None,
            unit: "ks".to_string(),
            description: None,
            is_composite,
        }
    }

    #[test]
    fn component_edges_require_known_endpoints() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_product(product(1, "KIT", true)).unwrap();

        let err = catalog
            .add_component(ComponentEdge::new(
                ProductId::new(1),
                ProductId::new(2),
                dec!(1),
            ))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Catalog(CatalogError::ProductNotFound(ProductId::new(2)))
        );
    }

    #[test]
    fn component_edges_require_positive_quantity() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_product(product(1, "KIT", true)).unwrap();
        catalog.upsert_product(product(2, "PART", false)).unwrap();

        let err = catalog
            .add_component(ComponentEdge::new(
                ProductId::new(1),
                ProductId::new(2),
                dec!(0),
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Catalog(CatalogError::InvalidQuantity(_))
        ));
    }

    #[test]
    fn removing_a_parent_cascades_its_edges() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_product(product(1, "KIT", true)).unwrap();
        catalog.upsert_product(product(2, "PART", false)).unwrap();
        catalog
            .add_component(ComponentEdge::new(
                ProductId::new(1),
                ProductId::new(2),
                dec!(2),
            ))
            .unwrap();

        catalog.remove_product(ProductId::new(1)).unwrap();
        assert!(catalog.product(ProductId::new(1)).unwrap().is_none());
        assert!(catalog.components(ProductId::new(1)).unwrap().is_empty());
        // The child itself survives.
        assert!(catalog.product(ProductId::new(2)).unwrap().is_some());
    }

    #[test]
    fn lookup_by_code_finds_the_product() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert_product(product(5, "KZL300x60/3", false)).unwrap();

        let found = catalog
            .product_by_code(&ProductCode::from("KZL300x60/3"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, ProductId::new(5));
        assert!(
            catalog
                .product_by_code(&ProductCode::from("MISSING"))
                .unwrap()
                .is_none()
        );
    }
}
