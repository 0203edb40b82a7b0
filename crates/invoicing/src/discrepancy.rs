//! Price-discrepancy check for received invoices.
//!
//! Supplier invoices are compared line by line against the unit prices that
//! were ordered/quoted. A mismatch is advisory: the invoice still enters the
//! normal lifecycle, annotated so a human can chase the difference.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use volterp_core::{ProductCode, ProductId, round_currency};

use crate::invoice::InvoiceLine;

/// Advisory annotation for one mismatched line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDiscrepancy {
    pub product_id: ProductId,
    pub code: ProductCode,
    pub ordered_price: Decimal,
    pub invoiced_price: Decimal,
    /// Signed per-unit difference, `invoiced - ordered`.
    pub unit_diff: Decimal,
    /// Signed per-line difference at currency scale.
    pub line_diff: Decimal,
}

/// Flag every line whose invoiced unit price differs from the quoted one.
///
/// Lines with no quoted price on file are skipped (nothing to compare
/// against); matching lines produce no annotation.
pub fn annotate_price_discrepancies(
    lines: &[InvoiceLine],
    quoted: &HashMap<ProductId, Decimal>,
) -> Vec<PriceDiscrepancy> {
    lines
        .iter()
        .filter_map(|line| {
            let ordered = *quoted.get(&line.product_id)?;
            if line.unit_price == ordered {
                return None;
            }
            let unit_diff = line.unit_price - ordered;
            Some(PriceDiscrepancy {
                product_id: line.product_id,
                code: line.code.clone(),
                ordered_price: ordered,
                invoiced_price: line.unit_price,
                unit_diff,
                line_diff: round_currency(unit_diff * line.quantity),
            })
        })
        .collect()
}
