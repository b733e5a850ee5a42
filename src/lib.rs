//! Denial Map - mortgage denial-rate disparities by county
//!
//! Aggregates loan application outcomes per county and applicant ethnicity,
//! joins the rates onto county boundaries and renders choropleth maps.

pub mod charts;
pub mod config;
pub mod data;
pub mod error;
pub mod geography;
pub mod output;
pub mod pipeline;
pub mod stats;

pub use config::{JoinDirection, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineReport};
