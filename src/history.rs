//! Per-SubAdmin transfer history.
//!
//! Entries are appended inside the same transaction that moves the money and
//! are never edited or removed afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One transfer issued by a SubAdmin. Negative `amount` means outflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub amount: f64,
    /// Username of the User the funds went to.
    pub recipient: String,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn outflow(amount: f64, recipient: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            amount: -amount,
            recipient: recipient.into(),
            at,
        }
    }
}

/// Entries sorted newest-first for display.
pub fn newest_first(entries: &[HistoryEntry]) -> Vec<HistoryEntry> {
    let mut out = entries.to_vec();
    out.sort_by(|a, b| b.at.cmp(&a.at));
    out
}

/// Total amount ever credited out, derived as the sum of absolute values.
pub fn total_credited(entries: &[HistoryEntry]) -> f64 {
    entries.iter().map(|e| e.amount.abs()).sum()
}
