//! Pure computation engine(s) for deterministic lot matching.

use crate::domain::{AccountKey, LegFill};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod aggregate;
pub mod batch;
pub mod lot;
pub mod matcher;
pub mod portion;

pub use aggregate::{build_leg_fills, group_fills_by_account, partition_by_account};
pub use batch::{match_legs, match_legs_with_errors, LegMatchFailure, MatchOutcome};
pub use lot::{Direction, LotStatus, MatchedLeg, MatchedLegLot, MIXED_RESOLUTION, NO_RESOLUTION};
pub use matcher::{match_leg_fills, LegMatcher};
pub use portion::LotFillPortion;

/// Identifies one leg: an account plus a contract.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LegKey {
    pub account_name: String,
    pub account_number: Option<String>,
    pub leg_id: String,
}

impl LegKey {
    pub fn new(account: &AccountKey, leg_id: &str) -> Self {
        LegKey {
            account_name: account.name.clone(),
            account_number: account.number.clone(),
            leg_id: leg_id.to_string(),
        }
    }

    pub fn for_fill(fill: &LegFill) -> Self {
        Self::new(&fill.account, &fill.contract.leg_id)
    }

    pub fn account(&self) -> AccountKey {
        AccountKey {
            name: self.account_name.clone(),
            number: self.account_number.clone(),
        }
    }
}

impl fmt::Display for LegKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} • {}", self.account(), self.leg_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error(
        "closing fill {fill_key} on {leg_id} has {unmatched_quantity} contract(s) without a corresponding open {direction} position"
    )]
    MatchingImpossible {
        leg_id: String,
        direction: Direction,
        fill_key: String,
        unmatched_quantity: u32,
    },
}
