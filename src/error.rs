//! Top-level error type for a pipeline run.
//!
//! Each stage has its own error enum; they convert into [`PipelineError`]
//! via `From`, so `?` works across stage boundaries. Every variant is fatal.

use crate::charts::ChartError;
use crate::config::ConfigError;
use crate::data::{LoaderError, RecodeError};
use crate::geography::{GeoError, GeoJoinError};
use crate::output::OutputError;
use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Loan file error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Recode error: {0}")]
    Recode(#[from] RecodeError),

    #[error("Aggregation error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Boundary file error: {0}")]
    Geo(#[from] GeoError),

    #[error("County join error: {0}")]
    GeoJoin(#[from] GeoJoinError),

    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
