pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{CsvTransactionSource, MockTransactionSource, SourceError, TransactionSource};
pub use domain::{
    AccountKey, Action, Decimal, LegContract, LegFill, NormalizedTransaction, OptionType,
    StoredTransaction, TransCode,
};
pub use engine::{
    match_leg_fills, match_legs, match_legs_with_errors, LegKey, LegMatchFailure, MatchError,
    MatchOutcome, MatchedLeg, MatchedLegLot,
};
pub use error::AppError;
pub use orchestration::{LegPipeline, PipelineError};
