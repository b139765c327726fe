//! Stable fill ordering for deterministic processing.

use crate::domain::{LegFill, NormalizedTransaction};
use chrono::NaiveDate;

/// Ordering key applied to raw transactions before fills are built.
///
/// Ordering: activity -> process -> settle -> code priority -> input index.
/// On identical dates opening codes sort ahead of closing codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionOrderingKey {
    pub activity_date: NaiveDate,
    pub process_date: NaiveDate,
    pub settle_date: NaiveDate,
    pub priority: u8,
    pub input_index: usize,
}

impl TransactionOrderingKey {
    pub fn new(txn: &NormalizedTransaction, input_index: usize) -> Self {
        TransactionOrderingKey {
            activity_date: txn.activity_date,
            process_date: txn.process_or_activity(),
            settle_date: txn.settle_or_activity(),
            priority: txn.trans_code.priority(),
            input_index,
        }
    }
}

/// Chronological key of a built fill.
///
/// Ordering: activity -> process -> settle -> sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FillSortKey {
    pub activity_date: NaiveDate,
    pub process_date: NaiveDate,
    pub settle_date: NaiveDate,
    pub sequence: usize,
}

impl FillSortKey {
    pub fn from_fill(fill: &LegFill) -> Self {
        let txn = &fill.transaction;
        FillSortKey {
            activity_date: txn.activity_date,
            process_date: txn.process_or_activity(),
            settle_date: txn.settle_or_activity(),
            sequence: fill.sequence,
        }
    }

    /// Returns true if fill_a should come before fill_b.
    pub fn should_come_before(fill_a: &LegFill, fill_b: &LegFill) -> bool {
        Self::from_fill(fill_a) < Self::from_fill(fill_b)
    }
}

/// Sort transactions into processing order, returning `(input_index, txn)` pairs.
pub fn order_transactions(
    transactions: &[NormalizedTransaction],
) -> Vec<(usize, &NormalizedTransaction)> {
    let mut indexed: Vec<(usize, &NormalizedTransaction)> =
        transactions.iter().enumerate().collect();
    indexed.sort_by_cached_key(|(index, txn)| TransactionOrderingKey::new(txn, *index));
    indexed
}

/// Sort fills deterministically.
pub fn sort_fills_deterministic(fills: &mut [LegFill]) {
    fills.sort_by_key(FillSortKey::from_fill);
}
