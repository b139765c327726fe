//! Fill aggregation: normalized transactions to chronologically ordered, signed LegFills.

use crate::domain::{
    compute_signed_quantity, order_transactions, AccountKey, LegContract, LegFill,
    NormalizedTransaction, StoredTransaction,
};
use std::collections::{BTreeMap, HashMap};

/// Convert one account's normalized transactions into LegFills.
///
/// Transactions are ordered first; the running net per contract is then
/// threaded through in that order, since assignment and expiration signs
/// depend on the position before the fill.
pub fn build_leg_fills(transactions: &[NormalizedTransaction], account: &AccountKey) -> Vec<LegFill> {
    let mut running_net: HashMap<String, i64> = HashMap::new();
    let mut fills = Vec::with_capacity(transactions.len());

    for (sequence, (_input_index, txn)) in order_transactions(transactions).into_iter().enumerate() {
        let contract = LegContract::from_transaction(txn);
        let net_before = running_net.get(&contract.leg_id).copied().unwrap_or(0);
        let signed_quantity =
            compute_signed_quantity(&txn.trans_code, txn.quantity, net_before, txn.action);
        running_net.insert(contract.leg_id.clone(), net_before + signed_quantity);

        fills.push(LegFill::new(
            contract,
            account.clone(),
            txn.clone(),
            signed_quantity,
            sequence,
        ));
    }

    fills
}

/// Partition stored transactions by account and build fills for each account.
///
/// Accounts are visited in key order so the output is deterministic.
pub fn group_fills_by_account(stored: &[StoredTransaction]) -> Vec<LegFill> {
    partition_by_account(stored)
        .into_iter()
        .flat_map(|(account, transactions)| build_leg_fills(&transactions, &account))
        .collect()
}

/// Split stored transactions into per-account transaction lists, preserving input order.
pub fn partition_by_account(
    stored: &[StoredTransaction],
) -> BTreeMap<AccountKey, Vec<NormalizedTransaction>> {
    let mut accounts: BTreeMap<AccountKey, Vec<NormalizedTransaction>> = BTreeMap::new();
    for row in stored {
        accounts
            .entry(row.account.clone())
            .or_default()
            .push(row.transaction.clone());
    }
    accounts
}
