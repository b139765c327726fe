//! Normalized option transactions as handed over by the normalization layer.

use crate::domain::{AccountKey, Action, Decimal, OptionType, TransCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single normalized option transaction line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub activity_date: NaiveDate,
    pub process_date: Option<NaiveDate>,
    pub settle_date: Option<NaiveDate>,
    pub instrument: String,
    pub description: String,
    pub trans_code: TransCode,
    /// Number of contracts, always positive.
    pub quantity: u32,
    /// Price per share of the contract.
    pub price: Decimal,
    /// Signed cash amount net of fees, when the broker reports one.
    pub amount: Option<Decimal>,
    pub strike: Decimal,
    pub option_type: OptionType,
    pub expiration: NaiveDate,
    pub action: Action,
    /// Original row fields kept for traceability.
    #[serde(default)]
    pub raw: BTreeMap<String, String>,
}

impl NormalizedTransaction {
    pub fn process_or_activity(&self) -> NaiveDate {
        self.process_date.unwrap_or(self.activity_date)
    }

    pub fn settle_or_activity(&self) -> NaiveDate {
        self.settle_date.unwrap_or(self.activity_date)
    }
}

/// A normalized transaction reconstituted from storage together with its account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub account: AccountKey,
    pub transaction: NormalizedTransaction,
}

impl StoredTransaction {
    pub fn new(account: AccountKey, transaction: NormalizedTransaction) -> Self {
        Self {
            account,
            transaction,
        }
    }
}
