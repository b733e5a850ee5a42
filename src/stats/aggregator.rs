//! Denial Aggregator Module
//! Counts applications and denials per county for each ethnicity.

use crate::data::model::columns::{COUNTY_CODE, DENIED, DENIED_COUNT, ETHNICITY, TOTAL};
use crate::data::{CountyAggregate, Ethnicity};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

/// Totals across every county for one ethnicity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EthnicitySummary {
    pub ethnicity: Ethnicity,
    pub counties: usize,
    pub applications: u64,
    pub denied: u64,
    /// `None` when there were no applications.
    pub pct_denied: Option<f64>,
    /// County with the highest denial rate; ties go to the lowest code.
    pub highest_rate_county: Option<String>,
}

/// Per-county counts for one ethnicity.
#[derive(Debug, Clone)]
pub struct EthnicityCounts {
    pub ethnicity: Ethnicity,
    /// Columns: [county_code, total]
    pub all: DataFrame,
    /// Columns: [county_code, denied_count]
    pub denied: DataFrame,
}

impl EthnicityCounts {
    /// Materialize the counts as one aggregate per county in `all`.
    pub fn aggregates(&self) -> PolarsResult<Vec<CountyAggregate>> {
        let denied_codes = self.denied.column(COUNTY_CODE)?.str()?;
        let denied_counts = self.denied.column(DENIED_COUNT)?.u64()?;
        let denied_by_county: std::collections::HashMap<&str, u64> = denied_codes
            .into_iter()
            .zip(denied_counts.into_iter())
            .filter_map(|(code, count)| Some((code?, count?)))
            .collect();

        let codes = self.all.column(COUNTY_CODE)?.str()?;
        let totals = self.all.column(TOTAL)?.u64()?;
        Ok(codes
            .into_iter()
            .zip(totals.into_iter())
            .filter_map(|(code, total)| {
                let code = code?;
                Some(CountyAggregate {
                    county_code: code.to_string(),
                    total: total?,
                    denied: denied_by_county.get(code).copied().unwrap_or(0),
                })
            })
            .collect())
    }

    pub fn summary(&self) -> PolarsResult<EthnicitySummary> {
        let aggregates = self.aggregates()?;
        let applications: u64 = aggregates.iter().map(|a| a.total).sum();
        let denied: u64 = aggregates.iter().map(|a| a.denied).sum();

        let mut highest: Option<(&CountyAggregate, f64)> = None;
        for aggregate in &aggregates {
            let pct = aggregate.percent_denied();
            if pct.is_nan() {
                continue;
            }
            if highest.map_or(true, |(_, best)| pct > best) {
                highest = Some((aggregate, pct));
            }
        }

        Ok(EthnicitySummary {
            ethnicity: self.ethnicity,
            counties: aggregates.len(),
            applications,
            denied,
            pct_denied: (applications > 0)
                .then(|| denied as f64 * 100.0 / applications as f64),
            highest_rate_county: highest.map(|(a, _)| a.county_code.clone()),
        })
    }
}

/// Counts for both ethnicities.
#[derive(Debug, Clone)]
pub struct DenialCounts {
    pub latino: EthnicityCounts,
    pub not_latino: EthnicityCounts,
}

impl DenialCounts {
    pub fn get(&self, ethnicity: Ethnicity) -> &EthnicityCounts {
        match ethnicity {
            Ethnicity::Latino => &self.latino,
            Ethnicity::NotLatino => &self.not_latino,
        }
    }
}

/// Groups the recoded loan table by county.
pub struct DenialAggregator;

impl DenialAggregator {
    /// Count rows per county, sorted by county code.
    fn count_by_county(lf: LazyFrame, alias: &str) -> PolarsResult<DataFrame> {
        lf.group_by([col(COUNTY_CODE)])
            .agg([len().cast(DataType::UInt64).alias(alias)])
            .sort_by_exprs([col(COUNTY_CODE)], SortMultipleOptions::default())
            .collect()
    }

    /// Compute all-counts and denied-counts for a single ethnicity.
    ///
    /// Counties without a matching row are absent, not zero.
    pub fn count_ethnicity(df: &DataFrame, ethnicity: Ethnicity) -> PolarsResult<EthnicityCounts> {
        let subset = df
            .clone()
            .lazy()
            .filter(col(ETHNICITY).eq(lit(ethnicity.label())));

        let all = Self::count_by_county(subset.clone(), TOTAL)?;
        let denied = Self::count_by_county(subset.filter(col(DENIED)), DENIED_COUNT)?;

        debug!(
            "{}: {} counties with applications, {} with denials",
            ethnicity,
            all.height(),
            denied.height()
        );

        Ok(EthnicityCounts {
            ethnicity,
            all,
            denied,
        })
    }

    /// Partition by ethnicity and count each partition.
    pub fn aggregate(df: &DataFrame) -> PolarsResult<DenialCounts> {
        let latino = Self::count_ethnicity(df, Ethnicity::Latino)?;
        let not_latino = Self::count_ethnicity(df, Ethnicity::NotLatino)?;

        info!(
            "aggregated {} Latino and {} NotLatino counties",
            latino.all.height(),
            not_latino.all.height()
        );

        Ok(DenialCounts { latino, not_latino })
    }
}
