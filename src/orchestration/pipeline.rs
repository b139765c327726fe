use crate::datasource::{SourceError, TransactionSource};
use crate::domain::StoredTransaction;
use crate::engine::{build_leg_fills, match_legs_with_errors, partition_by_account, MatchOutcome};
use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

/// Loads stored transactions and matches every leg, one blocking task per account.
#[derive(Debug, Clone)]
pub struct LegPipeline {
    source: Arc<dyn TransactionSource>,
}

impl LegPipeline {
    pub fn new(source: Arc<dyn TransactionSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn TransactionSource> {
        &self.source
    }

    /// Fetch from the source and match everything it returns.
    pub async fn run(&self) -> Result<MatchOutcome, PipelineError> {
        let stored = self.source.fetch_transactions().await?;
        Self::match_stored(stored).await
    }

    /// Match already-loaded transactions.
    ///
    /// Accounts never share legs, so each account is matched on its own
    /// blocking task and the outcomes are merged afterwards.
    pub async fn match_stored(
        stored: Vec<StoredTransaction>,
    ) -> Result<MatchOutcome, PipelineError> {
        let accounts = partition_by_account(&stored);
        let account_count = accounts.len();

        let tasks = accounts.into_iter().map(|(account, transactions)| {
            tokio::task::spawn_blocking(move || {
                let fills = build_leg_fills(&transactions, &account);
                tracing::debug!(account = %account, fills = fills.len(), "built leg fills");
                match_legs_with_errors(fills)
            })
        });

        let mut outcome = MatchOutcome::default();
        for result in join_all(tasks).await {
            let account_outcome = result.map_err(|e| PipelineError::Task(e.to_string()))?;
            outcome.merge(account_outcome);
        }

        tracing::info!(
            accounts = account_count,
            legs = outcome.legs.len(),
            failures = outcome.failures.len(),
            "matched legs"
        );
        Ok(outcome)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("matching task failed: {0}")]
    Task(String),
}
