//! FIFO lot matching for a single leg.

use crate::domain::{AccountKey, CodeKind, Decimal, LegContract, LegFill};
use crate::engine::{Direction, LotFillPortion, LotStatus, MatchError, MatchedLeg, MatchedLegLot};
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::sync::Arc;

/// Mutable lot under construction. Never leaves the matcher.
#[derive(Debug, Clone)]
struct LotBuilder {
    direction: Direction,
    opened_at: NaiveDate,
    open_portions: Vec<LotFillPortion>,
    close_portions: Vec<LotFillPortion>,
}

impl LotBuilder {
    fn new(direction: Direction, opening: LotFillPortion) -> Self {
        Self {
            direction,
            opened_at: opening.activity_date(),
            open_portions: vec![opening],
            close_portions: Vec::new(),
        }
    }

    fn quantity(&self) -> u32 {
        self.open_portions.iter().map(|p| p.quantity).sum()
    }

    /// Split into a builder holding the oldest `quantity` contracts and the remainder.
    ///
    /// # Panics
    /// Panics if `quantity` is zero or exceeds the builder quantity.
    fn split(self, quantity: u32) -> (LotBuilder, Option<LotBuilder>) {
        let available = self.quantity();
        assert!(
            quantity > 0 && quantity <= available,
            "split quantity {} must be between 1 and the current quantity {}",
            quantity,
            available
        );

        let mut remaining = quantity;
        let mut matched = Vec::new();
        let mut leftover = Vec::new();

        for portion in self.open_portions {
            if remaining == 0 {
                leftover.push(portion);
                continue;
            }
            let take = portion.quantity.min(remaining);
            let (head, tail) = portion.split(take);
            matched.push(head);
            if let Some(tail) = tail {
                leftover.push(tail);
            }
            remaining -= take;
        }

        let earliest = |portions: &[LotFillPortion]| {
            portions
                .iter()
                .map(LotFillPortion::activity_date)
                .min()
                .unwrap_or(self.opened_at)
        };

        let head = LotBuilder {
            direction: self.direction,
            opened_at: earliest(&matched),
            open_portions: matched,
            close_portions: Vec::new(),
        };
        if leftover.is_empty() {
            return (head, None);
        }
        let rest = LotBuilder {
            direction: self.direction,
            opened_at: earliest(&leftover),
            open_portions: leftover,
            close_portions: Vec::new(),
        };
        (head, Some(rest))
    }

    fn freeze(self, contract: &LegContract, account: &AccountKey, status: LotStatus) -> MatchedLegLot {
        let quantity = self.quantity();
        let open_premium = self.open_portions.iter().map(|p| p.premium).sum::<Decimal>();
        let close_premium = self.close_portions.iter().map(|p| p.premium).sum::<Decimal>();
        let total_fees = self
            .open_portions
            .iter()
            .chain(self.close_portions.iter())
            .map(|p| p.fees)
            .sum::<Decimal>();
        let closed_at = self
            .close_portions
            .iter()
            .map(LotFillPortion::activity_date)
            .max();
        let realized_premium = match status {
            LotStatus::Closed => Some((open_premium + close_premium).to_cents()),
            LotStatus::Open => None,
        };

        MatchedLegLot {
            contract: contract.clone(),
            account: account.clone(),
            direction: self.direction,
            quantity,
            open_portions: self.open_portions,
            close_portions: self.close_portions,
            opened_at: self.opened_at,
            closed_at,
            status,
            open_premium: open_premium.to_cents(),
            close_premium: close_premium.to_cents(),
            total_fees: total_fees.to_cents(),
            realized_premium,
        }
    }
}

/// FIFO lot matcher for one (account, contract) leg.
///
/// Fills must be fed in chronological order; a close always consumes the
/// oldest open lot of the direction it closes.
pub struct LegMatcher {
    contract: LegContract,
    account: AccountKey,
    long_queue: VecDeque<LotBuilder>,
    short_queue: VecDeque<LotBuilder>,
    // Directions in the order their queues were first used.
    touched: Vec<Direction>,

    // Outputs accumulated during processing.
    lots: Vec<MatchedLegLot>,
}

impl LegMatcher {
    pub fn new(contract: LegContract, account: AccountKey) -> Self {
        Self {
            contract,
            account,
            long_queue: VecDeque::new(),
            short_queue: VecDeque::new(),
            touched: Vec::with_capacity(2),
            lots: Vec::new(),
        }
    }

    fn queue_mut(&mut self, direction: Direction) -> &mut VecDeque<LotBuilder> {
        if !self.touched.contains(&direction) {
            self.touched.push(direction);
        }
        match direction {
            Direction::Long => &mut self.long_queue,
            Direction::Short => &mut self.short_queue,
        }
    }

    /// Process a single fill, opening a lot or closing the oldest open lots.
    pub fn process_fill(&mut self, fill: Arc<LegFill>) -> Result<(), MatchError> {
        let direction = Direction::of_signed(fill.signed_quantity);
        let portion = LotFillPortion::whole(Arc::clone(&fill));

        match fill.code_kind() {
            CodeKind::Opening => {
                self.queue_mut(direction)
                    .push_back(LotBuilder::new(direction, portion));
                Ok(())
            }
            CodeKind::Closing => self.consume_closing(direction.opposite(), portion),
            CodeKind::Unclassified => {
                tracing::warn!(
                    leg_id = %self.contract.leg_id,
                    trans_code = %fill.trans_code(),
                    fill_key = %fill.fill_key,
                    "unclassified fill treated as closing"
                );
                self.consume_closing(direction.opposite(), portion)
            }
        }
    }

    fn consume_closing(
        &mut self,
        target: Direction,
        closing: LotFillPortion,
    ) -> Result<(), MatchError> {
        let mut remaining = Some(closing);

        while let Some(close_portion) = remaining.take() {
            let Some(builder) = self.queue_mut(target).pop_front() else {
                return Err(MatchError::MatchingImpossible {
                    leg_id: self.contract.leg_id.clone(),
                    direction: target,
                    fill_key: close_portion.fill.fill_key.clone(),
                    unmatched_quantity: close_portion.quantity,
                });
            };

            let take = builder.quantity().min(close_portion.quantity);
            let (mut matched, rest) = builder.split(take);
            let (used, leftover) = close_portion.split(take);

            matched.close_portions.push(used);
            let lot = matched.freeze(&self.contract, &self.account, LotStatus::Closed);
            self.lots.push(lot);

            if let Some(rest) = rest {
                self.queue_mut(target).push_front(rest);
            }
            remaining = leftover;
        }

        Ok(())
    }

    /// Freeze remaining builders as open lots and roll the leg up.
    ///
    /// Open lots are emitted queue by queue, in first-touched order.
    pub fn finish(mut self) -> MatchedLeg {
        for direction in std::mem::take(&mut self.touched) {
            let queue = std::mem::take(self.queue_mut(direction));
            for builder in queue {
                let lot = builder.freeze(&self.contract, &self.account, LotStatus::Open);
                self.lots.push(lot);
            }
        }

        let open_lots = || self.lots.iter().filter(|lot| lot.is_open());
        let net_contracts: i64 = open_lots()
            .map(|lot| lot.direction.sign() * i64::from(lot.quantity))
            .sum();
        let open_quantity: u32 = open_lots().map(|lot| lot.quantity).sum();
        let open_premium = open_lots().map(|lot| lot.open_premium).sum::<Decimal>().to_cents();
        let realized_premium = self
            .lots
            .iter()
            .filter_map(|lot| lot.realized_premium)
            .sum::<Decimal>()
            .to_cents();
        let total_fees = self
            .lots
            .iter()
            .map(|lot| lot.total_fees)
            .sum::<Decimal>()
            .to_cents();

        MatchedLeg {
            contract: self.contract,
            account: self.account,
            lots: self.lots,
            net_contracts,
            open_quantity,
            realized_premium,
            open_premium,
            total_fees,
        }
    }
}

/// Return FIFO-matched lots for a single contract/account combination.
///
/// Fills are re-sorted by their chronological key before matching.
///
/// # Panics
/// Panics if `fills` is empty.
pub fn match_leg_fills(fills: &[LegFill]) -> Result<MatchedLeg, MatchError> {
    let first = fills
        .first()
        .expect("match_leg_fills requires at least one fill");

    let mut ordered: Vec<Arc<LegFill>> = fills.iter().cloned().map(Arc::new).collect();
    ordered.sort_by_key(|fill| fill.sort_key());

    let mut matcher = LegMatcher::new(first.contract.clone(), first.account.clone());
    for fill in ordered {
        matcher.process_fill(fill)?;
    }
    Ok(matcher.finish())
}
