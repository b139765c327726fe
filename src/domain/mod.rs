//! Domain types and determinism layer for option lot matching.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Domain primitives: AccountKey, OptionType, Action, TransCode
//! - Normalized transactions, contract identity and the LegFill model
//! - Stable ordering keys for deterministic processing

pub mod contract;
pub mod decimal;
pub mod fill;
pub mod ordering;
pub mod primitives;
pub mod transaction;

pub use contract::{strike_to_cents, LegContract};
pub use decimal::Decimal;
pub use fill::{compute_signed_quantity, LegFill, CONTRACT_MULTIPLIER};
pub use ordering::{order_transactions, sort_fills_deterministic, FillSortKey, TransactionOrderingKey};
pub use primitives::{AccountKey, Action, CodeKind, OptionType, TransCode};
pub use transaction::{NormalizedTransaction, StoredTransaction};
