//! End-to-end FIFO matching over normalized transactions.
//!
//! Covers the lifecycle scenarios (short/long cycles, partial closes,
//! assignment, expiration), batch isolation, and conservation properties.

use chrono::NaiveDate;
use optlots::domain::{
    compute_signed_quantity, AccountKey, Action, Decimal, NormalizedTransaction, OptionType,
    TransCode,
};
use optlots::engine::{
    build_leg_fills, match_leg_fills, match_legs, match_legs_with_errors, Direction, LegKey,
    LotStatus, MatchError, MatchedLeg, MatchedLegLot,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

struct Txn {
    activity_date: NaiveDate,
    description: &'static str,
    trans_code: &'static str,
    quantity: u32,
    price: &'static str,
    amount: &'static str,
    option_type: OptionType,
    strike: &'static str,
}

impl Txn {
    fn call(
        activity_date: NaiveDate,
        trans_code: &'static str,
        quantity: u32,
        price: &'static str,
        amount: &'static str,
    ) -> Self {
        Txn {
            activity_date,
            description: "TMC 10/17/2025 Call $7.00",
            trans_code,
            quantity,
            price,
            amount,
            option_type: OptionType::Call,
            strike: "7.00",
        }
    }

    fn described(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    fn build(self) -> NormalizedTransaction {
        let trans_code = TransCode::parse(self.trans_code);
        let action = match trans_code {
            TransCode::Sto | TransCode::Stc => Action::Sell,
            _ => Action::Buy,
        };
        NormalizedTransaction {
            activity_date: self.activity_date,
            process_date: Some(self.activity_date),
            settle_date: Some(self.activity_date),
            instrument: "TMC".to_string(),
            description: self.description.to_string(),
            trans_code,
            quantity: self.quantity,
            price: d(self.price),
            amount: Some(d(self.amount)),
            strike: d(self.strike),
            option_type: self.option_type,
            expiration: date(2025, 10, 17),
            action,
            raw: Default::default(),
        }
    }
}

fn account() -> AccountKey {
    AccountKey::new("Robinhood IRA", Some("RH-12345".to_string()))
}

fn match_single_leg(transactions: Vec<Txn>) -> MatchedLeg {
    let transactions: Vec<NormalizedTransaction> = transactions.into_iter().map(Txn::build).collect();
    let fills = build_leg_fills(&transactions, &account());
    match_leg_fills(&fills).expect("leg should match")
}

fn lot_with_status(leg: &MatchedLeg, status: LotStatus) -> &MatchedLegLot {
    leg.lots
        .iter()
        .find(|lot| lot.status == status)
        .expect("lot with status")
}

fn lot_closed_by<'a>(leg: &'a MatchedLeg, code: TransCode) -> &'a MatchedLegLot {
    leg.lots
        .iter()
        .filter(|lot| lot.is_closed())
        .find(|lot| lot.close_portions.iter().any(|p| *p.fill.trans_code() == code))
        .expect("lot closed by code")
}

#[test]
fn test_complete_short_cycle() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 7), "STO", 2, "1.20", "240"),
        Txn::call(date(2025, 10, 10), "BTC", 2, "0.50", "-100"),
    ]);

    assert_eq!(leg.account.name, "Robinhood IRA");
    assert_eq!(leg.open_quantity, 0);
    assert_eq!(leg.net_contracts, 0);
    assert_eq!(leg.realized_premium, d("140.00"));
    assert_eq!(leg.open_premium, d("0.00"));
    assert_eq!(leg.total_fees, d("0.00"));

    assert_eq!(leg.lots.len(), 1);
    let lot = &leg.lots[0];
    assert_eq!(lot.status, LotStatus::Closed);
    assert_eq!(lot.direction, Direction::Short);
    assert_eq!(lot.quantity, 2);
    assert_eq!(lot.realized_premium, Some(d("140.00")));
    assert_eq!(lot.open_premium, d("240.00"));
    assert_eq!(lot.close_premium, d("-100.00"));
    assert_eq!(lot.close_cost(), d("100.00"));
    assert_eq!(lot.close_cost_total(), d("100.00"));
    assert_eq!(lot.resolution().as_deref(), Some("Buy to close"));

    assert_eq!(leg.opened_at(), Some(date(2025, 10, 7)));
    assert_eq!(leg.closed_at(), Some(date(2025, 10, 10)));
    assert_eq!(leg.resolution(), "Buy to close");
}

#[test]
fn test_partial_close_leaves_open_lot() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 3, "1.00", "300"),
        Txn::call(date(2025, 10, 5), "BTC", 1, "0.30", "-30"),
    ]);

    assert_eq!(leg.open_quantity, 2);
    assert_eq!(leg.net_contracts, -2);
    assert_eq!(leg.realized_premium, d("70.00"));
    assert_eq!(leg.open_premium, d("200.00"));
    assert!(leg.is_open());
    assert_eq!(leg.resolution(), "--");
    assert_eq!(leg.closed_at(), Some(date(2025, 10, 5)));

    let closed = lot_with_status(&leg, LotStatus::Closed);
    assert_eq!(closed.quantity, 1);
    assert_eq!(closed.realized_premium, Some(d("70.00")));

    let open = lot_with_status(&leg, LotStatus::Open);
    assert_eq!(open.quantity, 2);
    assert_eq!(open.open_premium, d("200.00"));
    assert_eq!(open.close_premium, d("0.00"));
    assert_eq!(open.realized_premium, None);
    assert_eq!(open.closed_at, None);
    assert_eq!(open.open_fees(), d("0.00"));
    assert_eq!(open.close_fees(), d("0.00"));
    assert_eq!(open.open_credit_gross(), d("200.00"));
    assert_eq!(open.open_credit_net(), d("200.00"));
    assert_eq!(open.credit_remaining(), d("200.00"));
    assert_eq!(open.quantity_remaining(), 2);
    assert_eq!(open.net_premium(), None);
    assert_eq!(open.resolution(), None);
}

#[test]
fn test_sorts_transactions_before_matching() {
    // Newest first: the expiration precedes the opening trade in input order.
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 17), "OEXP", 1, "0.00", "0")
            .described("Option Expiration for TMC 10/17/2025 Call $7.00"),
        Txn::call(date(2025, 10, 7), "STO", 1, "1.20", "120"),
    ]);

    assert_eq!(leg.lots.len(), 1);
    let lot = &leg.lots[0];
    let open_codes: Vec<&TransCode> = lot.open_portions.iter().map(|p| p.fill.trans_code()).collect();
    let close_codes: Vec<&TransCode> = lot.close_portions.iter().map(|p| p.fill.trans_code()).collect();
    assert_eq!(open_codes, vec![&TransCode::Sto]);
    assert_eq!(close_codes, vec![&TransCode::Oexp]);
    assert_eq!(lot.realized_premium, Some(d("120.00")));
    assert_eq!(leg.realized_premium, d("120.00"));
    assert_eq!(leg.resolution(), "Expiration");
}

#[test]
fn test_match_legs_groups_multiple_contracts() {
    let transactions: Vec<NormalizedTransaction> = vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100"),
        Txn::call(date(2025, 10, 5), "BTC", 1, "0.40", "-40"),
        Txn {
            activity_date: date(2025, 10, 1),
            description: "TMC 10/17/2025 Put $5.00",
            trans_code: "STO",
            quantity: 1,
            price: "1.50",
            amount: "150",
            option_type: OptionType::Put,
            strike: "5.00",
        },
    ]
    .into_iter()
    .map(Txn::build)
    .collect();

    let results = match_legs(build_leg_fills(&transactions, &account())).unwrap();
    assert_eq!(results.len(), 2);

    let short_call = &results[&LegKey::new(&account(), "TMC-2025-10-17-C-700")];
    assert_eq!(short_call.realized_premium, d("60.00"));
    assert_eq!(short_call.open_quantity, 0);

    let short_put = &results[&LegKey::new(&account(), "TMC-2025-10-17-P-500")];
    assert_eq!(short_put.open_quantity, 1);
    assert_eq!(short_put.realized_premium, d("0.00"));
    assert_eq!(short_put.open_premium, d("150.00"));
    assert_eq!(short_put.contract.display_name, "TMC 10/17/2025 Put $5.00");
}

#[test]
fn test_long_position_closure() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 9, 10), "BTO", 1, "0.90", "-90"),
        Txn::call(date(2025, 9, 25), "STC", 1, "1.40", "140"),
    ]);

    assert_eq!(leg.net_contracts, 0);
    assert_eq!(leg.realized_premium, d("50.00"));
    assert_eq!(leg.lots.len(), 1);

    let lot = &leg.lots[0];
    assert_eq!(lot.status, LotStatus::Closed);
    assert_eq!(lot.direction, Direction::Long);
    assert_eq!(lot.realized_premium, Some(d("50.00")));
    assert_eq!(lot.open_fees(), d("0.00"));
    assert_eq!(lot.close_fees(), d("0.00"));
    assert_eq!(lot.open_credit_gross(), d("-90.00"));
    assert_eq!(lot.open_credit_net(), d("-90.00"));
    assert_eq!(lot.close_cost(), d("0.00"));
    assert_eq!(lot.close_cost_total(), d("0.00"));
    assert_eq!(lot.close_quantity(), 1);
    assert_eq!(lot.credit_remaining(), d("0.00"));
    assert_eq!(lot.quantity_remaining(), 0);
    assert_eq!(lot.net_premium(), Some(d("50.00")));
    assert_eq!(leg.resolution(), "Sell to close");
}

#[test]
fn test_portion_premium_follows_quantity_ratio() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 3, "1.00", "300"),
        Txn::call(date(2025, 10, 5), "BTC", 2, "0.30", "-60"),
    ]);

    let closed = lot_with_status(&leg, LotStatus::Closed);
    assert_eq!(closed.quantity, 2);
    assert_eq!(closed.open_premium, d("200.00"));
    assert_eq!(closed.close_premium, d("-60.00"));

    let open = lot_with_status(&leg, LotStatus::Open);
    assert_eq!(open.quantity, 1);
    assert_eq!(open.open_premium, d("100.00"));
}

#[test]
fn test_full_assignment_closure() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 9, 1), "STO", 2, "1.10", "220"),
        Txn::call(date(2025, 10, 17), "OASGN", 2, "0.00", "0")
            .described("Assignment of TMC 10/17/2025 Call $7.00"),
    ]);

    assert_eq!(leg.open_quantity, 0);
    assert_eq!(leg.realized_premium, d("220.00"));
    let lot = &leg.lots[0];
    assert_eq!(lot.status, LotStatus::Closed);
    assert_eq!(lot.realized_premium, Some(d("220.00")));
    assert!(lot.close_portions[0].fill.is_assignment());
    assert_eq!(leg.resolution(), "Assignment");
}

#[test]
fn test_full_expiration_closure() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 9, 1), "STO", 1, "1.20", "120"),
        Txn::call(date(2025, 10, 17), "OEXP", 1, "0.00", "0")
            .described("Option Expiration for TMC 10/17/2025 Call $7.00"),
    ]);

    assert_eq!(leg.open_quantity, 0);
    assert_eq!(leg.realized_premium, d("120.00"));
    assert_eq!(leg.lots[0].realized_premium, Some(d("120.00")));
    assert!(leg.lots[0].close_portions[0].fill.is_expiration());
}

#[test]
fn test_partial_assignment_after_closes() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 9, 1), "STO", 3, "1.05", "315"),
        Txn::call(date(2025, 9, 20), "BTC", 1, "0.40", "-40"),
        Txn::call(date(2025, 10, 17), "OASGN", 2, "0.00", "0")
            .described("Assignment of TMC 10/17/2025 Call $7.00"),
    ]);

    let closed: Vec<&MatchedLegLot> = leg.lots.iter().filter(|lot| lot.is_closed()).collect();
    assert_eq!(closed.len(), 2);

    let btc_lot = lot_closed_by(&leg, TransCode::Btc);
    assert_eq!(btc_lot.quantity, 1);
    assert_eq!(btc_lot.realized_premium, Some(d("65.00")));

    let assign_lot = lot_closed_by(&leg, TransCode::Oasgn);
    assert_eq!(assign_lot.quantity, 2);
    assert_eq!(assign_lot.realized_premium, Some(d("210.00")));
    assert_eq!(leg.open_quantity, 0);
    assert_eq!(leg.resolution(), "Mixed");
}

#[test]
fn test_partial_expiration_after_closes() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 9, 1), "STO", 2, "1.30", "260"),
        Txn::call(date(2025, 9, 20), "BTC", 1, "0.35", "-35"),
        Txn::call(date(2025, 10, 17), "OEXP", 1, "0.00", "0")
            .described("Option Expiration for TMC 10/17/2025 Call $7.00"),
    ]);

    let closed: Vec<&MatchedLegLot> = leg.lots.iter().filter(|lot| lot.is_closed()).collect();
    assert_eq!(closed.len(), 2);
    assert_eq!(lot_closed_by(&leg, TransCode::Btc).realized_premium, Some(d("95.00")));
    assert_eq!(lot_closed_by(&leg, TransCode::Oexp).realized_premium, Some(d("130.00")));
    assert_eq!(leg.open_quantity, 0);
}

#[test]
fn test_short_closed_at_a_loss() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "3.00", "300"),
        Txn::call(date(2025, 10, 8), "BTC", 1, "7.00", "-700"),
    ]);

    assert_eq!(leg.lots.len(), 1);
    let lot = &leg.lots[0];
    assert!(lot.is_closed());
    assert_eq!(lot.realized_premium, Some(d("-400.00")));
    assert_eq!(lot.close_cost(), d("700.00"));
    assert_eq!(leg.close_cost(), d("700.00"));
    assert_eq!(leg.net_premium(), d("-400.00"));
}

#[test]
fn test_partial_close_prorates_open_premium() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 3, "2.00", "600"),
        Txn::call(date(2025, 10, 6), "BTC", 1, "1.00", "-100"),
    ]);

    assert_eq!(leg.lots.len(), 2);
    let closed = lot_with_status(&leg, LotStatus::Closed);
    assert_eq!(closed.quantity, 1);
    assert_eq!(closed.open_premium, d("200.00"));
    assert_eq!(closed.realized_premium, Some(d("100.00")));

    let open = lot_with_status(&leg, LotStatus::Open);
    assert_eq!(open.quantity, 2);
    assert_eq!(open.open_premium, d("400.00"));
    assert_eq!(open.opened_at, date(2025, 10, 1));
}

#[test]
fn test_partial_close_rounds_split_premium_like_ratio() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 6, "0.50", "300.03"),
        Txn::call(date(2025, 10, 6), "BTC", 1, "0.10", "-10"),
    ]);

    let closed = lot_with_status(&leg, LotStatus::Closed);
    assert_eq!(closed.open_premium, d("50.01"));
    let open = lot_with_status(&leg, LotStatus::Open);
    assert_eq!(open.open_premium, d("250.02"));
    assert_eq!(closed.open_premium + open.open_premium, d("300.03"));
}

#[test]
fn test_open_lots_follow_first_touched_direction() {
    let short_first = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100"),
        Txn::call(date(2025, 10, 2), "BTO", 1, "1.10", "-110"),
    ]);
    let directions: Vec<Direction> = short_first.lots.iter().map(|lot| lot.direction).collect();
    assert_eq!(directions, vec![Direction::Short, Direction::Long]);

    let long_first = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "BTO", 1, "1.10", "-110"),
        Txn::call(date(2025, 10, 2), "STO", 1, "1.00", "100"),
    ]);
    let directions: Vec<Direction> = long_first.lots.iter().map(|lot| lot.direction).collect();
    assert_eq!(directions, vec![Direction::Long, Direction::Short]);
}

#[test]
fn test_single_close_spans_two_lots_in_fifo_order() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100"),
        Txn::call(date(2025, 10, 2), "STO", 1, "1.50", "150"),
        Txn::call(date(2025, 10, 9), "BTC", 2, "2.50", "-500"),
    ]);

    assert_eq!(leg.lots.len(), 2);
    let first = &leg.lots[0];
    let second = &leg.lots[1];

    assert!(first.is_closed() && second.is_closed());
    assert_eq!(first.opened_at, date(2025, 10, 1));
    assert_eq!(first.open_premium, d("100.00"));
    assert_eq!(first.close_premium, d("-250.00"));
    assert_eq!(second.opened_at, date(2025, 10, 2));
    assert_eq!(second.open_premium, d("150.00"));
    assert_eq!(second.close_premium, d("-250.00"));

    // Both halves reference the same closing fill.
    assert_eq!(
        first.close_portions[0].fill.fill_key,
        second.close_portions[0].fill.fill_key
    );
    assert_eq!(leg.realized_premium, d("-250.00"));
}

#[test]
fn test_assignment_after_short_closes_the_short() {
    assert_eq!(compute_signed_quantity(&TransCode::Oasgn, 1, -1, Action::Buy), 1);

    let transactions: Vec<NormalizedTransaction> = vec![
        Txn::call(date(2025, 9, 1), "STO", 1, "1.00", "100"),
        Txn::call(date(2025, 10, 17), "OASGN", 1, "0.00", "0"),
    ]
    .into_iter()
    .map(Txn::build)
    .collect();
    let fills = build_leg_fills(&transactions, &account());

    assert_eq!(fills[0].signed_quantity, -1);
    assert_eq!(fills[1].signed_quantity, 1);

    let leg = match_leg_fills(&fills).unwrap();
    assert_eq!(leg.net_contracts, 0);
    assert_eq!(leg.lots[0].direction, Direction::Short);
}

#[test]
fn test_orphan_close_fails_only_its_leg() {
    let transactions: Vec<NormalizedTransaction> = vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100"),
        Txn {
            activity_date: date(2025, 10, 2),
            description: "TMC 10/17/2025 Call $8.00",
            trans_code: "BTC",
            quantity: 1,
            price: "0.50",
            amount: "-50",
            option_type: OptionType::Call,
            strike: "8.00",
        },
    ]
    .into_iter()
    .map(Txn::build)
    .collect();
    let fills = build_leg_fills(&transactions, &account());

    let outcome = match_legs_with_errors(fills.clone());
    assert_eq!(outcome.legs.len(), 1);
    assert!(outcome
        .legs
        .contains_key(&LegKey::new(&account(), "TMC-2025-10-17-C-700")));

    assert_eq!(outcome.failures.len(), 1);
    let failure = &outcome.failures[0];
    assert_eq!(failure.key.leg_id, "TMC-2025-10-17-C-800");
    assert_eq!(failure.fills.len(), 1);
    match &failure.error {
        MatchError::MatchingImpossible {
            direction,
            unmatched_quantity,
            ..
        } => {
            assert_eq!(*direction, Direction::Short);
            assert_eq!(*unmatched_quantity, 1);
        }
    }
    assert!(failure
        .warning()
        .starts_with("Robinhood IRA (RH-12345) • TMC-2025-10-17-C-800 • TMC 10/17/2025 Call $8.00: "));

    let strict = match_legs(fills).unwrap_err();
    assert_eq!(strict.key.leg_id, "TMC-2025-10-17-C-800");
}

#[test]
fn test_quantity_and_premium_are_conserved() {
    // Uneven cents: thirds of $100.00 and a $0.02 fee gap.
    let transactions: Vec<NormalizedTransaction> = vec![
        Txn::call(date(2025, 10, 1), "STO", 3, "0.3334", "100.00"),
        Txn::call(date(2025, 10, 2), "STO", 2, "0.25", "49.98"),
        Txn::call(date(2025, 10, 6), "BTC", 1, "0.10", "-10.01"),
        Txn::call(date(2025, 10, 8), "BTC", 3, "0.11", "-33.03"),
    ]
    .into_iter()
    .map(Txn::build)
    .collect();
    let fills = build_leg_fills(&transactions, &account());
    let leg = match_leg_fills(&fills).unwrap();

    let opened: u32 = leg.lots.iter().map(|lot| lot.quantity).sum();
    assert_eq!(opened, 5);
    let closed_units: u32 = leg.lots.iter().map(|lot| lot.close_quantity()).sum();
    assert_eq!(closed_units, 4);
    assert_eq!(leg.open_quantity, 1);

    let opening_premium: Decimal = fills
        .iter()
        .filter(|f| f.is_opening())
        .map(|f| f.effective_premium())
        .sum();
    let closing_premium: Decimal = fills
        .iter()
        .filter(|f| f.is_closing())
        .map(|f| f.effective_premium())
        .sum();
    let all_fees: Decimal = fills.iter().map(|f| f.fees()).sum();

    let lot_open: Decimal = leg.lots.iter().map(|lot| lot.open_premium).sum();
    let lot_close: Decimal = leg.lots.iter().map(|lot| lot.close_premium).sum();
    let lot_fees: Decimal = leg.lots.iter().map(|lot| lot.total_fees).sum();

    assert_eq!(lot_open, opening_premium);
    assert_eq!(lot_close, closing_premium);
    assert_eq!(lot_fees, all_fees);
    assert_eq!(leg.total_fees, all_fees.to_cents());
}

#[test]
fn test_fifo_closes_oldest_lot_first() {
    let leg = match_single_leg(vec![
        Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100"),
        Txn::call(date(2025, 10, 3), "STO", 1, "2.00", "200"),
        Txn::call(date(2025, 10, 5), "BTC", 1, "0.50", "-50"),
    ]);

    let closed = lot_with_status(&leg, LotStatus::Closed);
    assert_eq!(closed.opened_at, date(2025, 10, 1));
    let open = lot_with_status(&leg, LotStatus::Open);
    assert_eq!(open.opened_at, date(2025, 10, 3));
    assert_eq!(leg.open_premium, d("200.00"));
}

#[test]
fn test_matching_is_deterministic() {
    let build = |order: &[usize]| {
        let all = [
            Txn::call(date(2025, 10, 1), "STO", 2, "1.00", "200"),
            Txn::call(date(2025, 10, 4), "BTC", 1, "0.40", "-40"),
            Txn::call(date(2025, 10, 9), "BTC", 1, "0.20", "-20"),
        ];
        let mut slots: Vec<Option<Txn>> = all.into_iter().map(Some).collect();
        let transactions: Vec<NormalizedTransaction> = order
            .iter()
            .map(|&i| slots[i].take().unwrap().build())
            .collect();
        match_legs_with_errors(build_leg_fills(&transactions, &account()))
    };

    let forward = build(&[0, 1, 2]);
    let again = build(&[0, 1, 2]);
    let reversed = build(&[2, 1, 0]);

    assert_eq!(forward, again);
    let key = LegKey::new(&account(), "TMC-2025-10-17-C-700");
    assert_eq!(forward.legs[&key].lots, reversed.legs[&key].lots);
    assert_eq!(forward.legs[&key].realized_premium, d("140.00"));
}

#[test]
fn test_days_to_expiration() {
    let leg = match_single_leg(vec![Txn::call(date(2025, 10, 1), "STO", 1, "1.00", "100")]);
    assert_eq!(leg.days_to_expiration(date(2025, 10, 7)), 10);
    assert_eq!(leg.days_to_expiration(date(2025, 11, 1)), 0);
}
