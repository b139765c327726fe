//! Orchestration: loading transactions and driving the matcher across accounts.

pub mod pipeline;

pub use pipeline::{LegPipeline, PipelineError};
