//! Mock transaction source for testing without touching the filesystem.

use super::{SourceError, TransactionSource};
use crate::domain::StoredTransaction;
use async_trait::async_trait;

/// Mock source that returns predefined transactions, or a predefined error.
#[derive(Debug, Clone, Default)]
pub struct MockTransactionSource {
    transactions: Vec<StoredTransaction>,
    error: Option<SourceError>,
}

impl MockTransactionSource {
    /// Create a new mock source with no transactions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction to the mock source.
    pub fn with_transaction(mut self, transaction: StoredTransaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Add multiple transactions to the mock source.
    pub fn with_transactions(mut self, transactions: Vec<StoredTransaction>) -> Self {
        self.transactions.extend(transactions);
        self
    }

    /// Make every fetch fail with `error`.
    pub fn with_error(mut self, error: SourceError) -> Self {
        self.error = Some(error);
        self
    }
}

#[async_trait]
impl TransactionSource for MockTransactionSource {
    async fn fetch_transactions(&self) -> Result<Vec<StoredTransaction>, SourceError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.transactions.clone()),
        }
    }
}
