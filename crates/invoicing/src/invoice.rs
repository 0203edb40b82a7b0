use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use volterp_core::{CustomerId, DeliveryNoteId, InvoiceId, ProductCode, ProductId, round_currency};

use crate::delivery::DeliveryNote;

/// Invoicing-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvoicingError {
    /// The referenced invoice does not exist in the ledger.
    #[error("invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// The evaluation instant precedes the invoice's creation.
    #[error("evaluation instant {instant} precedes invoice creation at {created_at}")]
    InvalidEvaluationInstant {
        instant: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },

    /// A payment is already recorded; `paid_at` is set exactly once.
    #[error("payment already recorded for invoice {0}")]
    PaymentAlreadyRecorded(InvoiceId),

    /// A lifecycle transition was requested from the wrong state.
    #[error("invoice {id} cannot transition from {from:?}")]
    InvalidTransition { id: InvoiceId, from: InvoiceStatus },
}

/// Invoice status lifecycle: `Draft → Sent → {Paid, Overdue}`, with
/// `Overdue → Paid` still possible (late payment wins). `Viewed` is
/// informational and never load-bearing for dunning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Paid,
    Overdue,
}

/// Whether we issued the invoice or received it from a supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceDirection {
    Issued,
    Received,
}

/// One invoice line. `note` carries advisory annotations such as a price
/// discrepancy against the quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: ProductId,
    pub code: ProductCode,
    /// Quantity at scale 3.
    pub quantity: Decimal,
    /// Unit price at currency scale.
    pub unit_price: Decimal,
    pub note: Option<String>,
}

impl InvoiceLine {
    /// Line amount rounded to currency scale.
    pub fn line_total(&self) -> Decimal {
        round_currency(self.quantity * self.unit_price)
    }
}

/// Invoice snapshot as supplied by the ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub customer_id: CustomerId,
    pub direction: InvoiceDirection,
    pub amount: Decimal,
    pub vat_amount: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: InvoiceStatus,
    /// External payment-provider identifier. Stored only; no processing.
    pub payment_ref: Option<String>,
    pub delivery_note_id: Option<DeliveryNoteId>,
    pub lines: Vec<InvoiceLine>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Build a `Draft` invoice from a delivery note's items.
    ///
    /// The net amount is the sum of rounded line totals; VAT is computed on
    /// the net amount at currency scale.
    pub fn draft_from_delivery_note(
        id: InvoiceId,
        number: impl Into<String>,
        note: &DeliveryNote,
        vat_rate: Decimal,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let lines: Vec<InvoiceLine> = note
            .items
            .iter()
            .map(|item| InvoiceLine {
                product_id: item.product_id,
                code: item.code.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                note: None,
            })
            .collect();
        let amount: Decimal = lines.iter().map(InvoiceLine::line_total).sum();
        let vat_amount = round_currency(amount * vat_rate);

        Self {
            id,
            number: number.into(),
            customer_id: note.customer_id,
            direction: InvoiceDirection::Issued,
            amount,
            vat_amount,
            due_date,
            status: InvoiceStatus::Draft,
            payment_ref: None,
            delivery_note_id: Some(note.id),
            lines,
            created_at: now,
            paid_at: None,
        }
    }

    /// `Draft → Sent`. Any other starting state is rejected.
    pub fn mark_sent(&mut self) -> Result<(), InvoicingError> {
        if self.status != InvoiceStatus::Draft {
            return Err(InvoicingError::InvalidTransition {
                id: self.id,
                from: self.status,
            });
        }
        self.status = InvoiceStatus::Sent;
        Ok(())
    }

    /// `Sent → Viewed`. Informational only; other states are left alone and
    /// rejected so callers notice stale reads.
    pub fn mark_viewed(&mut self) -> Result<(), InvoicingError> {
        if self.status != InvoiceStatus::Sent {
            return Err(InvoicingError::InvalidTransition {
                id: self.id,
                from: self.status,
            });
        }
        self.status = InvoiceStatus::Viewed;
        Ok(())
    }

    /// Record an external payment confirmation.
    ///
    /// Sets `paid_at = now` and moves to `Paid` from any state. `paid_at` is
    /// written exactly once: a second confirmation is a conflict, which is
    /// what lets the store apply this as an optimistic
    /// "only if currently null" update.
    pub fn record_payment(
        &mut self,
        payment_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), InvoicingError> {
        if self.paid_at.is_some() {
            return Err(InvoicingError::PaymentAlreadyRecorded(self.id));
        }
        self.paid_at = Some(now);
        self.payment_ref = Some(payment_ref.into());
        self.status = InvoiceStatus::Paid;
        Ok(())
    }
}

/// Classify an invoice's lifecycle state as of `now`.
///
/// This is the single authoritative rule for the derived `Overdue` state:
/// an invoice that has left `Draft` is `Overdue` exactly when
/// `due_date < now` and no payment is recorded. A recorded payment always
/// wins, however late. A stored `Overdue` (or a `Paid` marker without
/// `paid_at`) that no longer satisfies the rule rolls back to `Sent`.
pub fn classify_status(
    invoice: &Invoice,
    now: DateTime<Utc>,
) -> Result<InvoiceStatus, InvoicingError> {
    if now < invoice.created_at {
        return Err(InvoicingError::InvalidEvaluationInstant {
            instant: now,
            created_at: invoice.created_at,
        });
    }

    if invoice.paid_at.is_some() {
        return Ok(InvoiceStatus::Paid);
    }

    Ok(match invoice.status {
        // An unsent invoice is never overdue.
        InvoiceStatus::Draft => InvoiceStatus::Draft,
        stored => {
            if now > invoice.due_date {
                InvoiceStatus::Overdue
            } else if matches!(stored, InvoiceStatus::Overdue | InvoiceStatus::Paid) {
                InvoiceStatus::Sent
            } else {
                stored
            }
        }
    })
}
