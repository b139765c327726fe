//! Option contract identity.

use crate::domain::{Decimal, NormalizedTransaction, OptionType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const DISPLAY_PREFIXES: [&str; 4] = [
    "Option Expiration for ",
    "Option Assignment for ",
    "Option Exercise for ",
    "Assignment of ",
];

/// Identifies a single option contract (symbol/expiration/type/strike).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LegContract {
    /// Synthetic id, e.g. `TMC-2025-10-17-C-700`.
    pub leg_id: String,
    pub symbol: String,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
    pub display_name: String,
}

impl LegContract {
    pub fn new(
        symbol: &str,
        expiration: NaiveDate,
        option_type: OptionType,
        strike: Decimal,
        description: &str,
    ) -> Self {
        let symbol = symbol.trim().to_uppercase();
        let leg_id = Self::compute_leg_id(&symbol, expiration, option_type, strike);
        LegContract {
            leg_id,
            symbol,
            expiration,
            option_type,
            strike,
            display_name: normalize_display(description),
        }
    }

    /// Derive contract metadata from a normalized transaction.
    pub fn from_transaction(txn: &NormalizedTransaction) -> Self {
        Self::new(
            &txn.instrument,
            txn.expiration,
            txn.option_type,
            txn.strike,
            &txn.description,
        )
    }

    /// Pure function of the normalized contract fields.
    ///
    /// The strike is rounded half-up to cents so `7`, `7.0` and `7.004` share an id.
    pub fn compute_leg_id(
        symbol: &str,
        expiration: NaiveDate,
        option_type: OptionType,
        strike: Decimal,
    ) -> String {
        format!(
            "{}-{}-{}-{}",
            symbol,
            expiration.format("%Y-%m-%d"),
            option_type.code(),
            strike_to_cents(strike)
        )
    }

    /// Non-negative number of days from `as_of` to expiration.
    pub fn days_to_expiration(&self, as_of: NaiveDate) -> i64 {
        (self.expiration - as_of).num_days().max(0)
    }
}

/// Convert a strike price to an integer number of cents.
pub fn strike_to_cents(strike: Decimal) -> i128 {
    // Quantized values carry scale 2, so the mantissa is the cent count.
    strike.to_cents_half_up().inner().mantissa()
}

/// Strip broker-specific prefixes from contract descriptions.
fn normalize_display(description: &str) -> String {
    let cleaned = description.trim();
    for prefix in DISPLAY_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            return rest.trim().to_string();
        }
    }
    cleaned.to_string()
}
