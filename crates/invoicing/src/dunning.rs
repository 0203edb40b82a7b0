//! Dunning: reminder escalation against unpaid, overdue invoices.
//!
//! The schedule is pure policy. Computing the due step never sends anything
//! and never mutates the invoice; dispatching reminders or blocking the
//! customer is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use volterp_core::InvoiceId;

use crate::invoice::{Invoice, InvoiceStatus, InvoicingError, classify_status};

/// Day thresholds for the reminder ladder. These are policy constants, not
/// invariants: tune per deployment. Defaults follow the established practice
/// of reminders at 1/7/14 days overdue with 3 grace days before blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DunningPolicy {
    pub first_reminder_days: i64,
    pub second_reminder_days: i64,
    pub final_reminder_days: i64,
    /// Grace period after the final reminder before the customer is blocked
    /// for new orders.
    pub block_grace_days: i64,
}

impl Default for DunningPolicy {
    fn default() -> Self {
        Self {
            first_reminder_days: 1,
            second_reminder_days: 7,
            final_reminder_days: 14,
            block_grace_days: 3,
        }
    }
}

impl DunningPolicy {
    /// Days overdue at which the block escalation kicks in.
    pub fn block_after_days(&self) -> i64 {
        self.final_reminder_days + self.block_grace_days
    }
}

/// Action due for an overdue invoice. Reminders carry a numeric level;
/// blocking is terminal and has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DunningAction {
    FirstReminder,
    SecondReminder,
    FinalReminder,
    BlockCustomer,
}

impl DunningAction {
    pub fn level(&self) -> Option<u8> {
        match self {
            DunningAction::FirstReminder => Some(1),
            DunningAction::SecondReminder => Some(2),
            DunningAction::FinalReminder => Some(3),
            DunningAction::BlockCustomer => None,
        }
    }

    /// Rank on the escalation ladder; strictly increases with severity.
    pub fn rank(&self) -> u8 {
        match self {
            DunningAction::FirstReminder => 1,
            DunningAction::SecondReminder => 2,
            DunningAction::FinalReminder => 3,
            DunningAction::BlockCustomer => 4,
        }
    }
}

/// The dunning step due for an invoice at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DunningStep {
    pub invoice_id: InvoiceId,
    pub days_overdue: i64,
    pub action: DunningAction,
}

/// Compute the dunning step due for `invoice` as of `now`.
///
/// Returns `None` unless the invoice classifies as `Overdue` and at least one
/// whole day has elapsed past the due date. Days overdue are floored (partial
/// days never round up) and thresholds are inclusive, so an invoice due on
/// the 23rd yields level 1 at midnight on the 24th. Idempotent: identical
/// inputs produce identical output.
pub fn compute_dunning_action(
    invoice: &Invoice,
    now: DateTime<Utc>,
    policy: &DunningPolicy,
) -> Result<Option<DunningStep>, InvoicingError> {
    if classify_status(invoice, now)? != InvoiceStatus::Overdue {
        return Ok(None);
    }

    // Positive because Overdue implies now > due_date; num_days truncates,
    // which is floor for positive durations.
    let days_overdue = (now - invoice.due_date).num_days();

    let action = if days_overdue >= policy.block_after_days() {
        DunningAction::BlockCustomer
    } else if days_overdue >= policy.final_reminder_days {
        DunningAction::FinalReminder
    } else if days_overdue >= policy.second_reminder_days {
        DunningAction::SecondReminder
    } else if days_overdue >= policy.first_reminder_days {
        DunningAction::FirstReminder
    } else {
        return Ok(None);
    };

    debug!(invoice_id = %invoice.id, days_overdue, ?action, "dunning step due");
    Ok(Some(DunningStep {
        invoice_id: invoice.id,
        days_overdue,
        action,
    }))
}
