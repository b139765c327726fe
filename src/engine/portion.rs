//! Quantity-weighted slices of a fill's premium and fees.

use crate::domain::{Decimal, LegFill};
use chrono::NaiveDate;
use std::sync::Arc;

/// A quantity slice of a [`LegFill`].
///
/// Premium and fees are carried at cents; splitting never leaks a cent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotFillPortion {
    pub fill: Arc<LegFill>,
    pub quantity: u32,
    pub premium: Decimal,
    pub fees: Decimal,
}

impl LotFillPortion {
    /// Portion covering `quantity` contracts of `fill`, pro-rated from its premium and fees.
    ///
    /// # Panics
    /// Panics if `quantity` is zero or exceeds the fill quantity.
    pub fn from_fill(fill: Arc<LegFill>, quantity: u32) -> Self {
        let total = fill.quantity();
        assert!(
            quantity > 0 && quantity <= total,
            "portion quantity {} must be between 1 and the fill quantity {}",
            quantity,
            total
        );
        let premium = fill.effective_premium().prorate(quantity, total);
        let fees = fill.fees().prorate(quantity, total);
        LotFillPortion {
            fill,
            quantity,
            premium,
            fees,
        }
    }

    /// Whole-fill portion.
    pub fn whole(fill: Arc<LegFill>) -> Self {
        let quantity = fill.quantity();
        Self::from_fill(fill, quantity)
    }

    pub fn activity_date(&self) -> NaiveDate {
        self.fill.activity_date()
    }

    /// Split off `quantity` contracts, returning the head and the remainder (if any).
    ///
    /// The remainder is `original - head`, so `head + remainder == self` to the cent.
    ///
    /// # Panics
    /// Panics if `quantity` is zero or exceeds this portion's quantity.
    pub fn split(&self, quantity: u32) -> (LotFillPortion, Option<LotFillPortion>) {
        assert!(
            quantity > 0 && quantity <= self.quantity,
            "split quantity {} must be between 1 and the existing quantity {}",
            quantity,
            self.quantity
        );

        let head = LotFillPortion {
            fill: Arc::clone(&self.fill),
            quantity,
            premium: self.premium.prorate(quantity, self.quantity),
            fees: self.fees.prorate(quantity, self.quantity),
        };

        let remaining = self.quantity - quantity;
        if remaining == 0 {
            return (head, None);
        }

        let remainder = LotFillPortion {
            fill: Arc::clone(&self.fill),
            quantity: remaining,
            premium: (self.premium - head.premium).to_cents(),
            fees: (self.fees - head.fees).to_cents(),
        };
        (head, Some(remainder))
    }
}
