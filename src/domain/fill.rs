//! LegFill: one normalized transaction bound to its contract and account.

use crate::domain::{
    AccountKey, Action, CodeKind, Decimal, FillSortKey, LegContract, NormalizedTransaction,
    TransCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shares per option contract.
pub const CONTRACT_MULTIPLIER: u32 = 100;

/// A single option fill with its signed position impact.
///
/// Built once by the fill aggregator; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegFill {
    /// Stable content hash of this fill.
    pub fill_key: String,
    pub contract: LegContract,
    pub account: AccountKey,
    pub transaction: NormalizedTransaction,
    /// Quantity signed by its effect on the running net position.
    pub signed_quantity: i64,
    /// Position in the account-wide chronological order.
    pub sequence: usize,
}

impl LegFill {
    pub fn new(
        contract: LegContract,
        account: AccountKey,
        transaction: NormalizedTransaction,
        signed_quantity: i64,
        sequence: usize,
    ) -> Self {
        let fill_key = Self::compute_fill_key(&account, &contract, &transaction);
        LegFill {
            fill_key,
            contract,
            account,
            transaction,
            signed_quantity,
            sequence,
        }
    }

    /// Hash of the fields that identify a fill, truncated to 128 bits.
    pub fn compute_fill_key(
        account: &AccountKey,
        contract: &LegContract,
        txn: &NormalizedTransaction,
    ) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, &account.name);
        hash_var(&mut hasher, account.number.as_deref().unwrap_or(""));
        hash_var(&mut hasher, &contract.leg_id);
        hash_var(&mut hasher, &txn.activity_date.to_string());
        hash_var(&mut hasher, &txn.process_or_activity().to_string());
        hash_var(&mut hasher, &txn.settle_or_activity().to_string());
        hash_var(&mut hasher, txn.trans_code.as_str());
        hasher.update(txn.quantity.to_le_bytes());
        hash_var(&mut hasher, &txn.price.to_canonical_string());
        match &txn.amount {
            Some(amount) => hash_var(&mut hasher, &amount.to_canonical_string()),
            None => hash_var(&mut hasher, "-"),
        }
        hash_var(&mut hasher, &txn.description);

        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    pub fn quantity(&self) -> u32 {
        self.transaction.quantity
    }

    pub fn trans_code(&self) -> &TransCode {
        &self.transaction.trans_code
    }

    pub fn code_kind(&self) -> CodeKind {
        self.transaction.trans_code.kind()
    }

    pub fn is_opening(&self) -> bool {
        self.code_kind() == CodeKind::Opening
    }

    pub fn is_closing(&self) -> bool {
        self.code_kind() == CodeKind::Closing
    }

    pub fn is_assignment(&self) -> bool {
        self.transaction.trans_code == TransCode::Oasgn
    }

    pub fn is_expiration(&self) -> bool {
        self.transaction.trans_code == TransCode::Oexp
            || self
                .transaction
                .description
                .to_lowercase()
                .starts_with("option expiration for")
    }

    /// `price × quantity × 100`, quantized to cents.
    pub fn gross_notional(&self) -> Decimal {
        let contracts = Decimal::from(self.quantity()) * Decimal::from(CONTRACT_MULTIPLIER);
        (self.transaction.price * contracts).to_cents()
    }

    /// Signed premium: the broker amount when present, else the notional signed by code.
    pub fn effective_premium(&self) -> Decimal {
        if let Some(amount) = self.transaction.amount {
            return amount;
        }
        let notional = self.gross_notional();
        match self.transaction.trans_code {
            TransCode::Sto | TransCode::Stc => notional,
            _ => -notional,
        }
    }

    /// Fees implied by the gap between gross notional and the reported amount.
    pub fn fees(&self) -> Decimal {
        match self.transaction.amount {
            Some(amount) => (self.gross_notional() - amount.abs()).abs().to_cents(),
            None => Decimal::zero_cents(),
        }
    }

    pub fn activity_date(&self) -> NaiveDate {
        self.transaction.activity_date
    }

    /// Stable chronological sort key.
    pub fn sort_key(&self) -> FillSortKey {
        FillSortKey::from_fill(self)
    }
}

/// Signed quantity delta contributed by a fill given the net position before it.
///
/// Assignment and expiration close whatever side is open; with no prior
/// position an assignment is assumed to close a short and an expiration a long.
pub fn compute_signed_quantity(
    code: &TransCode,
    quantity: u32,
    net_before: i64,
    action: Action,
) -> i64 {
    let quantity = i64::from(quantity);
    match code {
        TransCode::Bto | TransCode::Btc => quantity,
        TransCode::Sto | TransCode::Stc => -quantity,
        TransCode::Oasgn | TransCode::Oexp => {
            if net_before < 0 {
                quantity
            } else if net_before > 0 {
                -quantity
            } else if *code == TransCode::Oasgn {
                quantity
            } else {
                -quantity
            }
        }
        TransCode::Other(_) => quantity * action.sign(),
    }
}
