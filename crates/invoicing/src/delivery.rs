//! Delivery notes — the usual origin of an issued invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use volterp_core::{CustomerId, DeliveryNoteId, ProductCode, ProductId, round_currency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryNoteStatus {
    Pending,
    Invoiced,
    Completed,
}

/// One delivered item, priced at delivery time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub product_id: ProductId,
    pub code: ProductCode,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub id: DeliveryNoteId,
    pub number: String,
    pub customer_id: CustomerId,
    pub status: DeliveryNoteStatus,
    pub items: Vec<DeliveryItem>,
    pub date: DateTime<Utc>,
}

impl DeliveryNote {
    /// Net total of the note, sum of rounded item amounts.
    pub fn total_amount(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| round_currency(item.quantity * item.unit_price))
            .sum()
    }
}
