//! Batch driver: partitions fills into legs and matches each leg in isolation.

use crate::domain::{sort_fills_deterministic, LegFill};
use crate::engine::{match_leg_fills, LegKey, MatchError, MatchedLeg};
use std::collections::BTreeMap;

/// A leg whose matcher failed, with the fills that were handed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegMatchFailure {
    pub key: LegKey,
    pub error: MatchError,
    pub fills: Vec<LegFill>,
}

impl LegMatchFailure {
    /// One-line warning: `account • leg_id • description: error`.
    pub fn warning(&self) -> String {
        let descriptor = self
            .fills
            .first()
            .map(|fill| fill.transaction.description.as_str())
            .unwrap_or("Unknown");
        format!("{} • {}: {}", self.key, descriptor, self.error)
    }
}

/// Matched legs plus the legs that could not be matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    pub legs: BTreeMap<LegKey, MatchedLeg>,
    pub failures: Vec<LegMatchFailure>,
}

impl MatchOutcome {
    /// Fold another outcome into this one. Keys never collide across accounts.
    pub fn merge(&mut self, other: MatchOutcome) {
        self.legs.extend(other.legs);
        self.failures.extend(other.failures);
        self.failures.sort_by(|a, b| a.key.cmp(&b.key));
    }
}

/// Group fills by account first, then by contract; each group is sorted chronologically.
fn group_leg_fills<I>(fills: I) -> BTreeMap<LegKey, Vec<LegFill>>
where
    I: IntoIterator<Item = LegFill>,
{
    let mut grouped: BTreeMap<LegKey, Vec<LegFill>> = BTreeMap::new();
    for fill in fills {
        grouped.entry(LegKey::for_fill(&fill)).or_default().push(fill);
    }
    for bucket in grouped.values_mut() {
        sort_fills_deterministic(bucket);
    }
    grouped
}

fn match_group(key: &LegKey, bucket: &[LegFill]) -> Result<MatchedLeg, MatchError> {
    let result = match_leg_fills(bucket);
    match &result {
        Ok(leg) => tracing::debug!(
            leg = %key,
            fills = bucket.len(),
            lots = leg.lots.len(),
            "matched leg"
        ),
        Err(err) => tracing::warn!(leg = %key, error = %err, "leg matching failed"),
    }
    result
}

/// Match every leg, capturing per-leg failures instead of aborting the batch.
///
/// A broken leg is reported with its fills; every other leg is still matched.
pub fn match_legs_with_errors<I>(fills: I) -> MatchOutcome
where
    I: IntoIterator<Item = LegFill>,
{
    group_leg_fills(fills)
        .into_iter()
        .map(|(key, bucket)| match match_group(&key, &bucket) {
            Ok(leg) => MatchOutcome {
                legs: BTreeMap::from([(key, leg)]),
                failures: Vec::new(),
            },
            Err(error) => MatchOutcome {
                legs: BTreeMap::new(),
                failures: vec![LegMatchFailure {
                    key,
                    error,
                    fills: bucket,
                }],
            },
        })
        .fold(MatchOutcome::default(), |mut acc, outcome| {
            acc.merge(outcome);
            acc
        })
}

/// Match every leg, failing on the first leg that cannot be matched.
pub fn match_legs<I>(fills: I) -> Result<BTreeMap<LegKey, MatchedLeg>, LegMatchFailure>
where
    I: IntoIterator<Item = LegFill>,
{
    let mut results = BTreeMap::new();
    for (key, bucket) in group_leg_fills(fills) {
        match match_group(&key, &bucket) {
            Ok(leg) => {
                results.insert(key, leg);
            }
            Err(error) => {
                return Err(LegMatchFailure {
                    key,
                    error,
                    fills: bucket,
                })
            }
        }
    }
    Ok(results)
}
