//! Matched lots and the per-leg read model.

use crate::domain::{AccountKey, Decimal, LegContract};
use crate::engine::LotFillPortion;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Label used while a leg is open or has nothing to report.
pub const NO_RESOLUTION: &str = "--";
/// Label used when lots closed via different mechanisms.
pub const MIXED_RESOLUTION: &str = "Mixed";

/// Side of an opened lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction opened by a fill with this signed quantity.
    pub fn of_signed(signed_quantity: i64) -> Self {
        if signed_quantity > 0 {
            Direction::Long
        } else {
            Direction::Short
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn sign(&self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Open,
    Closed,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Open => "open",
            LotStatus::Closed => "closed",
        }
    }
}

/// A FIFO-matched lot derived from opening and closing fills.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLegLot {
    pub contract: LegContract,
    pub account: AccountKey,
    pub direction: Direction,
    pub quantity: u32,
    pub open_portions: Vec<LotFillPortion>,
    pub close_portions: Vec<LotFillPortion>,
    pub opened_at: NaiveDate,
    pub closed_at: Option<NaiveDate>,
    pub status: LotStatus,
    pub open_premium: Decimal,
    pub close_premium: Decimal,
    pub total_fees: Decimal,
    /// `open_premium + close_premium` once closed; `None` while open.
    pub realized_premium: Option<Decimal>,
}

impl MatchedLegLot {
    pub fn is_open(&self) -> bool {
        self.status == LotStatus::Open
    }

    pub fn is_closed(&self) -> bool {
        self.status == LotStatus::Closed
    }

    pub fn open_fees(&self) -> Decimal {
        self.open_portions.iter().map(|p| p.fees).sum::<Decimal>().to_cents()
    }

    pub fn close_fees(&self) -> Decimal {
        self.close_portions.iter().map(|p| p.fees).sum::<Decimal>().to_cents()
    }

    /// Premium collected (positive) or paid (negative) to open.
    pub fn open_credit_gross(&self) -> Decimal {
        self.open_premium
    }

    pub fn open_credit_net(&self) -> Decimal {
        (self.open_premium - self.open_fees()).to_cents()
    }

    /// Debit paid to close; zero unless the lot closed for a net debit.
    pub fn close_cost(&self) -> Decimal {
        if self.is_closed() && self.close_premium.is_negative() {
            (-self.close_premium).to_cents()
        } else {
            Decimal::zero_cents()
        }
    }

    /// Close debit including closing fees; zero when there was no debit.
    pub fn close_cost_total(&self) -> Decimal {
        let cost = self.close_cost();
        if cost.is_positive() {
            (cost + self.close_fees()).to_cents()
        } else {
            Decimal::zero_cents()
        }
    }

    pub fn close_quantity(&self) -> u32 {
        self.close_portions.iter().map(|p| p.quantity).sum()
    }

    pub fn credit_remaining(&self) -> Decimal {
        if self.is_open() {
            self.open_premium
        } else {
            Decimal::zero_cents()
        }
    }

    pub fn quantity_remaining(&self) -> u32 {
        if self.is_open() {
            self.quantity
        } else {
            0
        }
    }

    /// Realized premium net of every fee on the lot; `None` while open.
    pub fn net_premium(&self) -> Option<Decimal> {
        self.realized_premium
            .map(|realized| (realized - self.total_fees).to_cents())
    }

    /// How this lot was closed, or `None` while open.
    pub fn resolution(&self) -> Option<String> {
        let labels: BTreeSet<&str> = self
            .close_portions
            .iter()
            .map(|p| p.fill.trans_code().close_label())
            .collect();
        match labels.len() {
            0 => None,
            1 => labels.into_iter().next().map(str::to_string),
            _ => Some(MIXED_RESOLUTION.to_string()),
        }
    }
}

/// All FIFO lots for a single contract/account combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLeg {
    pub contract: LegContract,
    pub account: AccountKey,
    pub lots: Vec<MatchedLegLot>,
    /// Signed open contracts: positive long, negative short.
    pub net_contracts: i64,
    pub open_quantity: u32,
    pub realized_premium: Decimal,
    pub open_premium: Decimal,
    pub total_fees: Decimal,
}

impl MatchedLeg {
    pub fn is_open(&self) -> bool {
        self.open_quantity != 0
    }

    pub fn days_to_expiration(&self, as_of: NaiveDate) -> i64 {
        self.contract.days_to_expiration(as_of)
    }

    pub fn opened_at(&self) -> Option<NaiveDate> {
        self.lots.iter().map(|lot| lot.opened_at).min()
    }

    pub fn closed_at(&self) -> Option<NaiveDate> {
        self.lots.iter().filter_map(|lot| lot.closed_at).max()
    }

    pub fn opened_quantity(&self) -> u32 {
        self.lots.iter().map(|lot| lot.quantity).sum()
    }

    pub fn closed_quantity(&self) -> u32 {
        self.lots
            .iter()
            .filter(|lot| lot.is_closed())
            .map(|lot| lot.quantity)
            .sum()
    }

    pub fn open_credit_gross(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.open_premium).sum::<Decimal>().to_cents()
    }

    pub fn close_cost(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.close_cost()).sum::<Decimal>().to_cents()
    }

    pub fn open_fees(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.open_fees()).sum::<Decimal>().to_cents()
    }

    pub fn close_fees(&self) -> Decimal {
        self.lots.iter().map(|lot| lot.close_fees()).sum::<Decimal>().to_cents()
    }

    /// Realized premium net of all fees on the leg.
    pub fn net_premium(&self) -> Decimal {
        (self.realized_premium - self.total_fees).to_cents()
    }

    /// Closing mechanism across closed lots: a single label, `Mixed`, or `--` while open.
    pub fn resolution(&self) -> String {
        if self.is_open() {
            return NO_RESOLUTION.to_string();
        }

        let labels: BTreeSet<String> = self
            .lots
            .iter()
            .filter(|lot| lot.is_closed())
            .filter_map(MatchedLegLot::resolution)
            .collect();

        match labels.len() {
            0 => NO_RESOLUTION.to_string(),
            1 => labels
                .into_iter()
                .next()
                .unwrap_or_else(|| NO_RESOLUTION.to_string()),
            _ => MIXED_RESOLUTION.to_string(),
        }
    }
}
