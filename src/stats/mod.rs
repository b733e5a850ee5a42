//! Stats module - per-county denial counts and cross-ethnicity comparison

pub(crate) mod aggregator;
mod joiner;

pub use aggregator::{DenialAggregator, DenialCounts, EthnicityCounts, EthnicitySummary};
pub use joiner::DenialJoiner;
