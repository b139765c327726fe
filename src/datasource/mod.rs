//! Transaction source abstraction for loading already-normalized option transactions.

use crate::domain::StoredTransaction;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod file;
pub mod mock;

pub use file::CsvTransactionSource;
pub use mock::MockTransactionSource;

/// Source of normalized transactions, each tagged with its account.
///
/// Implementations return rows in input order; ordering for matching is
/// applied downstream.
#[async_trait]
pub trait TransactionSource: Send + Sync + fmt::Debug {
    /// Load every stored transaction available to this source.
    async fn fetch_transactions(&self) -> Result<Vec<StoredTransaction>, SourceError>;
}

/// Error type for transaction source operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The backing file could not be opened or read.
    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },
    /// The file was readable but a record was malformed.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },
    /// Other error
    #[error("Error: {0}")]
    Other(String),
}
