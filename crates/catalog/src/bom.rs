//! Bill-of-materials resolution for composite products.
//!
//! A composite product is defined by quantity-weighted component edges to
//! other products, which may themselves be composite. The resolver flattens
//! that graph into leaf products only, scaling and aggregating quantities.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use volterp_core::{ProductCode, ProductId, round_currency};

use crate::product::{CatalogError, ComponentEdge, Product};

/// Seam to the catalog store. Implementations supply product records and
/// component edges; the resolver never writes.
pub trait ProductSource {
    fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError>;

    /// Component edges owned by `parent`, in stored order.
    fn components(&self, parent: ProductId) -> Result<Vec<ComponentEdge>, CatalogError>;
}

/// Defensive recursion cap. The on-path check catches true cycles; this
/// bounds the damage if a source ever returns an unexpectedly deep graph.
const MAX_BOM_DEPTH: usize = 32;

/// One leaf row of a flattened bill of materials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomLine {
    pub product_id: ProductId,
    pub code: ProductCode,
    /// Total required quantity, summed across every path reaching this leaf.
    /// Kept at full decimal precision so scaling stays exact.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// `quantity * unit_price`, rounded to currency scale. Rounding happens
    /// only here, never mid-computation.
    pub line_total: Decimal,
}

/// Flattened bill of materials for a requested product and quantity.
///
/// Line order is first-encounter order of the depth-first walk: stable and
/// reproducible for identical input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfMaterials {
    pub lines: Vec<BomLine>,
    /// Sum of the rounded line totals.
    pub grand_total: Decimal,
}

impl BillOfMaterials {
    /// Total quantity accumulated for a given leaf, if present.
    pub fn quantity_of(&self, id: ProductId) -> Option<Decimal> {
        self.lines
            .iter()
            .find(|l| l.product_id == id)
            .map(|l| l.quantity)
    }
}

/// Expand `product_id` into leaf products only, scaled by `quantity`.
///
/// Requesting a non-composite product yields a single line (the product
/// itself), so the operation is total over the whole catalog. The same leaf
/// reached via multiple branches has its quantities summed. Pure read: stock
/// is never touched.
pub fn resolve_bom<S: ProductSource>(
    source: &S,
    product_id: ProductId,
    quantity: Decimal,
) -> Result<BillOfMaterials, CatalogError> {
    if quantity <= Decimal::ZERO {
        return Err(CatalogError::InvalidQuantity(quantity));
    }

    let mut acc = Accumulator::default();
    let mut path = Vec::new();
    expand(source, product_id, quantity, &mut path, &mut acc)?;

    let lines: Vec<BomLine> = acc
        .leaves
        .into_iter()
        .map(|leaf| BomLine {
            product_id: leaf.product_id,
            code: leaf.code,
            quantity: leaf.quantity,
            unit_price: leaf.unit_price,
            line_total: round_currency(leaf.quantity * leaf.unit_price),
        })
        .collect();

    let grand_total = lines.iter().map(|l| l.line_total).sum();
    debug!(%product_id, %quantity, lines = lines.len(), %grand_total, "resolved bill of materials");

    Ok(BillOfMaterials { lines, grand_total })
}

struct LeafTotal {
    product_id: ProductId,
    code: ProductCode,
    quantity: Decimal,
    unit_price: Decimal,
}

#[derive(Default)]
struct Accumulator {
    /// Running totals in first-encounter order.
    leaves: Vec<LeafTotal>,
    index: HashMap<ProductId, usize>,
}

impl Accumulator {
    fn add(&mut self, leaf: &Product, quantity: Decimal) {
        match self.index.get(&leaf.id) {
            Some(&i) => self.leaves[i].quantity += quantity,
            None => {
                self.index.insert(leaf.id, self.leaves.len());
                self.leaves.push(LeafTotal {
                    product_id: leaf.id,
                    code: leaf.code.clone(),
                    quantity,
                    unit_price: leaf.unit_price,
                });
            }
        }
    }
}

fn expand<S: ProductSource>(
    source: &S,
    product_id: ProductId,
    quantity: Decimal,
    path: &mut Vec<ProductId>,
    acc: &mut Accumulator,
) -> Result<(), CatalogError> {
    // Cycle check is path-local: the same leaf may legitimately recur under
    // independent branches, so a global visited set would be wrong.
    if path.contains(&product_id) || path.len() >= MAX_BOM_DEPTH {
        return Err(CatalogError::CyclicBillOfMaterials(product_id));
    }

    let product = source
        .product(product_id)?
        .ok_or(CatalogError::ProductNotFound(product_id))?;

    if product.is_leaf() {
        acc.add(&product, quantity);
        return Ok(());
    }

    path.push(product_id);
    for edge in source.components(product_id)? {
        if edge.quantity <= Decimal::ZERO {
            return Err(CatalogError::InvalidQuantity(edge.quantity));
        }
        expand(source, edge.component, quantity * edge.quantity, path, acc)?;
    }
    path.pop();
    Ok(())
}

/// Effective availability of a product in whole sellable units.
///
/// A leaf answers with its own `stock_qty`. A composite answers with the
/// bottleneck across its flattened components:
/// `min(floor(leaf_stock / required_qty_per_unit))`. A composite with no
/// components has nothing to assemble from and reports zero.
pub fn effective_availability<S: ProductSource>(
    source: &S,
    product_id: ProductId,
) -> Result<i64, CatalogError> {
    let product = source
        .product(product_id)?
        .ok_or(CatalogError::ProductNotFound(product_id))?;

    if product.is_leaf() {
        return Ok(product.stock_qty);
    }

    let bom = resolve_bom(source, product_id, Decimal::ONE)?;
    let mut bottleneck: Option<i64> = None;
    for line in &bom.lines {
        let leaf = source
            .product(line.product_id)?
            .ok_or(CatalogError::ProductNotFound(line.product_id))?;
        let buildable = (Decimal::from(leaf.stock_qty) / line.quantity)
            .floor()
            .to_i64()
            .unwrap_or(i64::MAX);
        bottleneck = Some(match bottleneck {
            Some(current) => current.min(buildable),
            None => buildable,
        });
    }
    Ok(bottleneck.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    /// In-memory fixture source backed by plain maps.
    #[derive(Default)]
    struct MapSource {
        products: HashMap<ProductId, Product>,
        components: HashMap<ProductId, Vec<ComponentEdge>>,
    }

    impl MapSource {
        fn leaf(&mut self, id: i32, code: &str, price: Decimal, stock: i64) -> ProductId {
            self.insert(id, code, price, stock, false)
        }

        fn composite(&mut self, id: i32, code: &str, price: Decimal) -> ProductId {
            self.insert(id, code, price, 0, true)
        }

        fn insert(
            &mut self,
            id: i32,
            code: &str,
            price: Decimal,
            stock: i64,
            is_composite: bool,
        ) -> ProductId {
            let id = ProductId::new(id);
            self.products.insert(
                id,
                Product {
                    id,
                    code: ProductCode::from(code),
                    name: code.to_string(),
                    category: "test".to_string(),
                    unit_price: price,
                    stock_qty: stock,
                    supplier: None,
                    unit: "ks".to_string(),
                    description: None,
                    is_composite,
                },
            );
            id
        }

        fn edge(&mut self, parent: ProductId, component: ProductId, quantity: Decimal) {
            self.components
                .entry(parent)
                .or_default()
                .push(ComponentEdge::new(parent, component, quantity));
        }
    }

    impl ProductSource for MapSource {
        fn product(&self, id: ProductId) -> Result<Option<Product>, CatalogError> {
            Ok(self.products.get(&id).cloned())
        }

        fn components(&self, parent: ProductId) -> Result<Vec<ComponentEdge>, CatalogError> {
            Ok(self.components.get(&parent).cloned().unwrap_or_default())
        }
    }

    /// Tray-per-metre kit modelled on real catalog data: 0.33 of a 3m tray,
    /// two threaded rods, two couplers, a pinch of small fixings.
    fn tray_kit(source: &mut MapSource) -> ProductId {
        let tray = source.leaf(1, "KZL100x60/3", dec!(18.90), 250);
        let rod = source.leaf(2, "ZM8x1000", dec!(1.85), 1200);
        let coupler = source.leaf(3, "SKM8", dec!(0.45), 3000);
        let kit = source.composite(10, "KOMP-ZLB100-STR-1M", dec!(42.00));
        source.edge(kit, tray, dec!(0.33));
        source.edge(kit, rod, dec!(2));
        source.edge(kit, coupler, dec!(2));
        kit
    }

    #[test]
    fn leaf_product_resolves_to_itself() {
        let mut source = MapSource::default();
        let tray = source.leaf(1, "KZL100x60/3", dec!(18.90), 250);

        let bom = resolve_bom(&source, tray, dec!(4)).unwrap();
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.lines[0].product_id, tray);
        assert_eq!(bom.lines[0].quantity, dec!(4));
        assert_eq!(bom.lines[0].line_total, dec!(75.60));
        assert_eq!(bom.grand_total, dec!(75.60));
    }

    #[test]
    fn composite_scales_component_quantities() {
        let mut source = MapSource::default();
        let kit = tray_kit(&mut source);

        let bom = resolve_bom(&source, kit, dec!(10)).unwrap();
        assert_eq!(bom.lines.len(), 3);
        // First-encounter order: tray, rod, coupler.
        assert_eq!(bom.lines[0].code, ProductCode::from("KZL100x60/3"));
        assert_eq!(bom.lines[0].quantity, dec!(3.30));
        assert_eq!(bom.lines[0].line_total, dec!(62.37));
        assert_eq!(bom.lines[1].quantity, dec!(20));
        assert_eq!(bom.lines[2].quantity, dec!(20));
        assert_eq!(bom.grand_total, dec!(62.37) + dec!(37.00) + dec!(9.00));
    }

    #[test]
    fn shared_leaf_across_branches_sums_quantities() {
        let mut source = MapSource::default();
        let screw = source.leaf(1, "SKM8", dec!(0.45), 3000);
        let bracket = source.composite(2, "SUB-A", dec!(5.00));
        let anchor = source.composite(3, "SUB-B", dec!(7.00));
        let kit = source.composite(4, "KIT", dec!(20.00));
        source.edge(bracket, screw, dec!(4));
        source.edge(anchor, screw, dec!(6));
        source.edge(kit, bracket, dec!(1));
        source.edge(kit, anchor, dec!(2));

        let bom = resolve_bom(&source, kit, dec!(1)).unwrap();
        // 1*4 via the bracket + 2*6 via the anchor: summed, not overwritten.
        assert_eq!(bom.lines.len(), 1);
        assert_eq!(bom.quantity_of(screw), Some(dec!(16)));
    }

    #[test]
    fn multi_level_bundles_multiply_along_the_path() {
        let mut source = MapSource::default();
        let wire = source.leaf(1, "CYKY-3x1.5", dec!(0.95), 10_000);
        let harness = source.composite(2, "HARNESS", dec!(12.00));
        let cabinet = source.composite(3, "CABINET", dec!(300.00));
        source.edge(harness, wire, dec!(2.5));
        source.edge(cabinet, harness, dec!(4));

        let bom = resolve_bom(&source, cabinet, dec!(2)).unwrap();
        assert_eq!(bom.quantity_of(wire), Some(dec!(20)));
    }

    #[test]
    fn direct_cycle_is_reported_not_recursed() {
        let mut source = MapSource::default();
        let a = source.composite(1, "A", dec!(1.00));
        let b = source.composite(2, "B", dec!(1.00));
        source.edge(a, b, dec!(1));
        source.edge(b, a, dec!(1));

        let err = resolve_bom(&source, a, dec!(1)).unwrap_err();
        assert_eq!(err, CatalogError::CyclicBillOfMaterials(a));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut source = MapSource::default();
        let a = source.composite(1, "A", dec!(1.00));
        source.edge(a, a, dec!(1));

        let err = resolve_bom(&source, a, dec!(1)).unwrap_err();
        assert_eq!(err, CatalogError::CyclicBillOfMaterials(a));
    }

    #[test]
    fn repeated_leaf_is_not_mistaken_for_a_cycle() {
        let mut source = MapSource::default();
        let screw = source.leaf(1, "SKM8", dec!(0.45), 3000);
        let left = source.composite(2, "L", dec!(1.00));
        let right = source.composite(3, "R", dec!(1.00));
        let kit = source.composite(4, "KIT", dec!(2.00));
        source.edge(left, screw, dec!(1));
        source.edge(right, screw, dec!(1));
        source.edge(kit, left, dec!(1));
        source.edge(kit, right, dec!(1));

        assert!(resolve_bom(&source, kit, dec!(1)).is_ok());
    }

    #[test]
    fn depth_cap_stops_a_runaway_chain() {
        let mut source = MapSource::default();
        // Chain of 40 composites ending in a leaf: deeper than the cap.
        let leaf = source.leaf(1000, "LEAF", dec!(1.00), 1);
        let mut child = leaf;
        for i in (1..=40).rev() {
            let parent = source.composite(i, &format!("C{i}"), dec!(1.00));
            source.edge(parent, child, dec!(1));
            child = parent;
        }

        let err = resolve_bom(&source, child, dec!(1)).unwrap_err();
        assert!(matches!(err, CatalogError::CyclicBillOfMaterials(_)));
    }

    #[test]
    fn unknown_product_is_an_error() {
        let source = MapSource::default();
        let err = resolve_bom(&source, ProductId::new(99), dec!(1)).unwrap_err();
        assert_eq!(err, CatalogError::ProductNotFound(ProductId::new(99)));
    }

    #[test]
    fn unknown_component_is_an_error_not_a_partial_result() {
        let mut source = MapSource::default();
        let kit = source.composite(1, "KIT", dec!(1.00));
        let real = source.leaf(2, "REAL", dec!(1.00), 10);
        source.edge(kit, real, dec!(1));
        source.edge(kit, ProductId::new(77), dec!(1));

        let err = resolve_bom(&source, kit, dec!(1)).unwrap_err();
        assert_eq!(err, CatalogError::ProductNotFound(ProductId::new(77)));
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        let mut source = MapSource::default();
        let tray = source.leaf(1, "KZL100x60/3", dec!(18.90), 250);

        assert_eq!(
            resolve_bom(&source, tray, Decimal::ZERO).unwrap_err(),
            CatalogError::InvalidQuantity(Decimal::ZERO)
        );
        assert_eq!(
            resolve_bom(&source, tray, dec!(-3)).unwrap_err(),
            CatalogError::InvalidQuantity(dec!(-3))
        );
    }

    #[test]
    fn line_totals_round_only_at_the_end() {
        let mut source = MapSource::default();
        let bar = source.leaf(1, "BAR", dec!(32.50), 100);
        let kit = source.composite(2, "KIT", dec!(11.00));
        source.edge(kit, bar, dec!(0.333));

        let bom = resolve_bom(&source, kit, dec!(1)).unwrap();
        // 0.333 * 32.50 = 10.8225 -> 10.82 only when the line is produced.
        assert_eq!(bom.lines[0].quantity, dec!(0.333));
        assert_eq!(bom.lines[0].line_total, dec!(10.82));
    }

    #[test]
    fn resolution_order_is_reproducible() {
        let mut source = MapSource::default();
        let kit = tray_kit(&mut source);

        let first = resolve_bom(&source, kit, dec!(3)).unwrap();
        let second = resolve_bom(&source, kit, dec!(3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn effective_availability_takes_the_component_bottleneck() {
        let mut source = MapSource::default();
        let kit = tray_kit(&mut source);

        // tray: 250 / 0.33 -> 757, rod: 1200 / 2 -> 600, coupler: 3000 / 2 -> 1500.
        assert_eq!(effective_availability(&source, kit).unwrap(), 600);
    }

    #[test]
    fn effective_availability_of_a_leaf_is_its_stock() {
        let mut source = MapSource::default();
        let tray = source.leaf(1, "KZL100x60/3", dec!(18.90), 250);
        assert_eq!(effective_availability(&source, tray).unwrap(), 250);
    }

    #[test]
    fn empty_composite_has_nothing_to_assemble() {
        let mut source = MapSource::default();
        let kit = source.composite(1, "KIT", dec!(10.00));
        assert_eq!(effective_availability(&source, kit).unwrap(), 0);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        /// Quantities at the stored scale (three decimal places), > 0.
        fn quantity() -> impl Strategy<Value = Decimal> {
            (1i64..=1_000_000).prop_map(|millis| Decimal::new(millis, 3))
        }

        proptest! {
            /// Property: resolution is linear in the requested quantity.
            #[test]
            fn doubling_the_request_doubles_every_leaf(q in quantity()) {
                let mut source = MapSource::default();
                let kit = tray_kit(&mut source);

                let single = resolve_bom(&source, kit, q).unwrap();
                let double = resolve_bom(&source, kit, q * dec!(2)).unwrap();

                prop_assert_eq!(single.lines.len(), double.lines.len());
                for (a, b) in single.lines.iter().zip(double.lines.iter()) {
                    prop_assert_eq!(a.product_id, b.product_id);
                    prop_assert_eq!(a.quantity * dec!(2), b.quantity);
                }
            }

            /// Property: a leaf always resolves to exactly itself.
            #[test]
            fn leaf_resolution_is_identity(q in quantity()) {
                let mut source = MapSource::default();
                let tray = source.leaf(1, "KZL100x60/3", dec!(18.90), 250);

                let bom = resolve_bom(&source, tray, q).unwrap();
                prop_assert_eq!(bom.lines.len(), 1);
                prop_assert_eq!(bom.lines[0].quantity, q);
                prop_assert_eq!(
                    bom.lines[0].line_total,
                    round_currency(q * dec!(18.90))
                );
            }
        }
    }
}
