//! In-memory invoice ledger.
//!
//! Writes that depend on time or payment state go through the domain rules
//! in `volterp-invoicing`, so the persisted status can never disagree with
//! the derived one.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use volterp_core::{DeliveryNoteId, InvoiceId};
use volterp_invoicing::{
    DeliveryNote, DeliveryNoteStatus, DunningPolicy, DunningStep, Invoice, InvoiceDirection,
    InvoiceStatus, InvoicingError, classify_status, compute_dunning_action,
};

use crate::StoreError;

#[derive(Debug, Default)]
struct LedgerState {
    invoices: HashMap<InvoiceId, Invoice>,
    delivery_notes: HashMap<DeliveryNoteId, DeliveryNote>,
    next_invoice_id: i32,
}

/// In-memory ledger store.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_invoice(&self, invoice: Invoice) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state.next_invoice_id = state.next_invoice_id.max(invoice.id.as_i32());
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    pub fn invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        state
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| InvoicingError::InvoiceNotFound(id).into())
    }

    pub fn upsert_delivery_note(&self, note: DeliveryNote) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        state.delivery_notes.insert(note.id, note);
        Ok(())
    }

    pub fn delivery_note(&self, id: DeliveryNoteId) -> Result<DeliveryNote, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        state
            .delivery_notes
            .get(&id)
            .cloned()
            .ok_or(StoreError::DeliveryNoteNotFound(id))
    }

    /// Recompute and persist the derived status of one invoice as of `now`.
    pub fn refresh_status(&self, id: InvoiceId, now: DateTime<Utc>) -> Result<Invoice, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let invoice = state
            .invoices
            .get_mut(&id)
            .ok_or(InvoicingError::InvoiceNotFound(id))?;
        let status = classify_status(invoice, now)?;
        if invoice.status != status {
            debug!(invoice_id = %id, from = ?invoice.status, to = ?status, "status refreshed");
            invoice.status = status;
        }
        Ok(invoice.clone())
    }

    /// Recompute every stored invoice's status as of `now`; returns how many
    /// records changed. Fails outright if any invoice rejects the instant —
    /// a partial refresh would leave the ledger internally inconsistent.
    pub fn refresh_statuses(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut pending: Vec<(InvoiceId, InvoiceStatus)> = Vec::new();
        for invoice in state.invoices.values() {
            let status = classify_status(invoice, now)?;
            if invoice.status != status {
                pending.push((invoice.id, status));
            }
        }
        for (id, status) in &pending {
            if let Some(invoice) = state.invoices.get_mut(id) {
                invoice.status = *status;
            }
        }
        if !pending.is_empty() {
            info!(changed = pending.len(), "ledger statuses refreshed");
        }
        Ok(pending.len())
    }

    /// Record an external payment confirmation against an invoice.
    ///
    /// The write is conditional on `paid_at` being unset, so concurrent
    /// confirmations cannot double-apply; the loser gets
    /// `PaymentAlreadyRecorded`.
    pub fn record_payment(
        &self,
        id: InvoiceId,
        payment_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let invoice = state
            .invoices
            .get_mut(&id)
            .ok_or(InvoicingError::InvoiceNotFound(id))?;
        invoice.record_payment(payment_ref, now)?;
        info!(invoice_id = %id, paid_at = %now, "payment recorded");
        Ok(invoice.clone())
    }

    /// Issued invoices that classify as overdue at `now`, ordered by id.
    pub fn overdue_invoices(&self, now: DateTime<Utc>) -> Result<Vec<Invoice>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut overdue: Vec<Invoice> = Vec::new();
        for invoice in state.invoices.values() {
            if invoice.direction == InvoiceDirection::Issued
                && classify_status(invoice, now)? == InvoiceStatus::Overdue
            {
                overdue.push(invoice.clone());
            }
        }
        overdue.sort_by_key(|i| i.id.as_i32());
        Ok(overdue)
    }

    /// Dunning steps currently due across the ledger, ordered by invoice id.
    /// Pure computation over snapshots; dispatching the reminders is the
    /// caller's responsibility.
    pub fn dunning_queue(
        &self,
        now: DateTime<Utc>,
        policy: &DunningPolicy,
    ) -> Result<Vec<DunningStep>, StoreError> {
        let mut steps: Vec<DunningStep> = Vec::new();
        for invoice in self.overdue_invoices(now)? {
            if let Some(step) = compute_dunning_action(&invoice, now, policy)? {
                steps.push(step);
            }
        }
        Ok(steps)
    }

    /// Turn a pending delivery note into a draft invoice.
    ///
    /// Assigns the next invoice id, persists the draft and flips the note to
    /// `Invoiced`. A note can be invoiced once.
    pub fn invoice_delivery_note(
        &self,
        note_id: DeliveryNoteId,
        number: impl Into<String>,
        vat_rate: Decimal,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Invoice, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        let note = state
            .delivery_notes
            .get(&note_id)
            .ok_or(StoreError::DeliveryNoteNotFound(note_id))?;
        if note.status != DeliveryNoteStatus::Pending {
            return Err(StoreError::DeliveryNoteAlreadyInvoiced(note_id));
        }

        let invoice_id = InvoiceId::new(state.next_invoice_id + 1);
        let invoice =
            Invoice::draft_from_delivery_note(invoice_id, number, note, vat_rate, due_date, now);

        state.next_invoice_id = invoice_id.as_i32();
        if let Some(note) = state.delivery_notes.get_mut(&note_id) {
            note.status = DeliveryNoteStatus::Invoiced;
        }
        state.invoices.insert(invoice.id, invoice.clone());
        info!(%invoice_id, %note_id, amount = %invoice.amount, "delivery note invoiced");
        Ok(invoice)
    }

    /// Persist a `Draft → Sent` transition.
    pub fn send_invoice(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let invoice = state
            .invoices
            .get_mut(&id)
            .ok_or(InvoicingError::InvoiceNotFound(id))?;
        invoice.mark_sent()?;
        Ok(invoice.clone())
    }
}
