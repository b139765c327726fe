use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::domain::Decimal;
use crate::engine::{Direction, LegKey, LotFillPortion, LotStatus, MatchedLeg, MatchedLegLot};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegsQuery {
    pub account: Option<String>,
    pub account_number: Option<String>,
    pub status: Option<String>,
    /// Reference date for `daysToExpiration`; defaults to today in US/Eastern.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusFilter {
    All,
    Open,
    Closed,
}

impl StatusFilter {
    fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("all") => Ok(StatusFilter::All),
            Some("open") => Ok(StatusFilter::Open),
            Some("closed") => Ok(StatusFilter::Closed),
            Some(other) => Err(AppError::BadRequest(format!(
                "status must be all, open, or closed, got {}",
                other
            ))),
        }
    }

    fn accepts(&self, leg: &MatchedLeg) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Open => leg.is_open(),
            StatusFilter::Closed => !leg.is_open(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegsResponse {
    pub legs: Vec<LegDto>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegDto {
    pub leg_id: String,
    pub account_name: String,
    pub account_number: Option<String>,
    pub symbol: String,
    pub display_name: String,
    pub option_type: String,
    pub strike: String,
    pub expiration: NaiveDate,
    pub days_to_expiration: i64,
    pub status: LotStatus,
    pub net_contracts: i64,
    pub open_quantity: u32,
    pub opened_quantity: u32,
    pub closed_quantity: u32,
    pub opened_at: Option<NaiveDate>,
    pub closed_at: Option<NaiveDate>,
    pub open_premium: String,
    pub realized_premium: String,
    pub total_fees: String,
    pub net_premium: String,
    pub open_credit_gross: String,
    pub close_cost: String,
    pub open_fees: String,
    pub close_fees: String,
    pub resolution: String,
    pub lots: Vec<LotDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotDto {
    pub direction: Direction,
    pub status: LotStatus,
    pub quantity: u32,
    pub opened_at: NaiveDate,
    pub closed_at: Option<NaiveDate>,
    pub open_premium: String,
    pub close_premium: String,
    pub total_fees: String,
    pub realized_premium: Option<String>,
    pub net_premium: Option<String>,
    pub open_fees: String,
    pub close_fees: String,
    pub open_credit_gross: String,
    pub open_credit_net: String,
    pub close_cost: String,
    pub close_cost_total: String,
    pub close_quantity: u32,
    pub credit_remaining: String,
    pub quantity_remaining: u32,
    pub resolution: Option<String>,
    pub open_fills: Vec<PortionDto>,
    pub close_fills: Vec<PortionDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortionDto {
    pub fill_key: String,
    pub activity_date: NaiveDate,
    pub trans_code: String,
    pub quantity: u32,
    pub premium: String,
    pub fees: String,
}

fn money(value: Decimal) -> String {
    value.to_fixed_string()
}

impl From<&LotFillPortion> for PortionDto {
    fn from(portion: &LotFillPortion) -> Self {
        PortionDto {
            fill_key: portion.fill.fill_key.clone(),
            activity_date: portion.activity_date(),
            trans_code: portion.fill.trans_code().to_string(),
            quantity: portion.quantity,
            premium: money(portion.premium),
            fees: money(portion.fees),
        }
    }
}

impl From<&MatchedLegLot> for LotDto {
    fn from(lot: &MatchedLegLot) -> Self {
        LotDto {
            direction: lot.direction,
            status: lot.status,
            quantity: lot.quantity,
            opened_at: lot.opened_at,
            closed_at: lot.closed_at,
            open_premium: money(lot.open_premium),
            close_premium: money(lot.close_premium),
            total_fees: money(lot.total_fees),
            realized_premium: lot.realized_premium.map(money),
            net_premium: lot.net_premium().map(money),
            open_fees: money(lot.open_fees()),
            close_fees: money(lot.close_fees()),
            open_credit_gross: money(lot.open_credit_gross()),
            open_credit_net: money(lot.open_credit_net()),
            close_cost: money(lot.close_cost()),
            close_cost_total: money(lot.close_cost_total()),
            close_quantity: lot.close_quantity(),
            credit_remaining: money(lot.credit_remaining()),
            quantity_remaining: lot.quantity_remaining(),
            resolution: lot.resolution(),
            open_fills: lot.open_portions.iter().map(PortionDto::from).collect(),
            close_fills: lot.close_portions.iter().map(PortionDto::from).collect(),
        }
    }
}

impl LegDto {
    fn new(leg: &MatchedLeg, as_of: NaiveDate) -> Self {
        LegDto {
            leg_id: leg.contract.leg_id.clone(),
            account_name: leg.account.name.clone(),
            account_number: leg.account.number.clone(),
            symbol: leg.contract.symbol.clone(),
            display_name: leg.contract.display_name.clone(),
            option_type: leg.contract.option_type.as_str().to_string(),
            strike: money(leg.contract.strike),
            expiration: leg.contract.expiration,
            days_to_expiration: leg.days_to_expiration(as_of),
            status: if leg.is_open() {
                LotStatus::Open
            } else {
                LotStatus::Closed
            },
            net_contracts: leg.net_contracts,
            open_quantity: leg.open_quantity,
            opened_quantity: leg.opened_quantity(),
            closed_quantity: leg.closed_quantity(),
            opened_at: leg.opened_at(),
            closed_at: leg.closed_at(),
            open_premium: money(leg.open_premium),
            realized_premium: money(leg.realized_premium),
            total_fees: money(leg.total_fees),
            net_premium: money(leg.net_premium()),
            open_credit_gross: money(leg.open_credit_gross()),
            close_cost: money(leg.close_cost()),
            open_fees: money(leg.open_fees()),
            close_fees: money(leg.close_fees()),
            resolution: leg.resolution(),
            lots: leg.lots.iter().map(LotDto::from).collect(),
        }
    }
}

fn normalize_filter(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn account_matches(key: &LegKey, account: Option<&str>, account_number: Option<&str>) -> bool {
    account.map_or(true, |name| key.account_name == name)
        && account_number.map_or(true, |number| key.account_number.as_deref() == Some(number))
}

pub async fn get_legs(
    Query(params): Query<LegsQuery>,
    State(state): State<AppState>,
) -> Result<Json<LegsResponse>, AppError> {
    let status = StatusFilter::parse(params.status.as_deref())?;
    let account = normalize_filter(params.account.as_deref());
    let account_number = normalize_filter(params.account_number.as_deref());
    let as_of = params
        .as_of
        .unwrap_or_else(|| eastern_date(Utc::now()));

    let outcome = state.pipeline.run().await?;

    let legs = outcome
        .legs
        .iter()
        .filter(|(key, leg)| account_matches(key, account, account_number) && status.accepts(leg))
        .map(|(_, leg)| LegDto::new(leg, as_of))
        .collect();

    let warnings = outcome
        .failures
        .iter()
        .filter(|failure| account_matches(&failure.key, account, account_number))
        .map(|failure| failure.warning())
        .collect();

    Ok(Json(LegsResponse { legs, warnings }))
}

/// Calendar date on the US options market clock.
fn eastern_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&New_York).date_naive()
}
