//! Denial Joiner Module
//! Turns per-county counts into percent-denied tables and merges the two
//! ethnicities into one comparison table.

use crate::config::JoinDirection;
use crate::data::model::columns::{
    COUNTY_CODE, DENIED_COUNT, PCT_DENIED, PCT_LATINO, PCT_NOT_LATINO, PCT_POINT_DIFF, TOTAL,
};
use crate::data::CountyComparison;
use crate::stats::{DenialCounts, EthnicityCounts};
use polars::prelude::*;
use tracing::{debug, info};

pub struct DenialJoiner;

impl DenialJoiner {
    /// Left-join denied counts onto all counts and compute percent denied.
    ///
    /// Output columns: [county_code, total, denied_count, pct_denied]
    pub fn percent_denied(counts: &EthnicityCounts) -> PolarsResult<DataFrame> {
        let df = counts
            .all
            .clone()
            .lazy()
            .join(
                counts.denied.clone().lazy(),
                [col(COUNTY_CODE)],
                [col(COUNTY_CODE)],
                JoinArgs::new(JoinType::Left),
            )
            // A county can legitimately have no denials.
            .with_column(col(DENIED_COUNT).fill_null(lit(0u64)))
            .with_column(
                (col(DENIED_COUNT).cast(DataType::Float64) * lit(100.0)
                    / col(TOTAL).cast(DataType::Float64))
                .alias(PCT_DENIED),
            )
            .select([col(COUNTY_CODE), col(TOTAL), col(DENIED_COUNT), col(PCT_DENIED)])
            .sort_by_exprs([col(COUNTY_CODE)], SortMultipleOptions::default())
            .collect()?;

        debug!("{}: percent denied for {} counties", counts.ethnicity, df.height());
        Ok(df)
    }

    /// Merge both ethnicities into one row per county.
    ///
    /// Output columns: [county_code, pct_denied_latino, pct_denied_not_latino,
    /// pct_point_difference]. Percentages missing for one side stay null, and
    /// so does the difference.
    pub fn compare(counts: &DenialCounts, direction: JoinDirection) -> PolarsResult<DataFrame> {
        let latino = Self::percent_denied(&counts.latino)?
            .lazy()
            .select([col(COUNTY_CODE), col(PCT_DENIED).alias(PCT_LATINO)]);
        let not_latino = Self::percent_denied(&counts.not_latino)?
            .lazy()
            .select([col(COUNTY_CODE), col(PCT_DENIED).alias(PCT_NOT_LATINO)]);

        let on = [col(COUNTY_CODE)];
        let merged = match direction {
            JoinDirection::NotLatino => not_latino.join(
                latino,
                on.clone(),
                on,
                JoinArgs::new(JoinType::Left),
            ),
            JoinDirection::Latino => latino.join(
                not_latino,
                on.clone(),
                on,
                JoinArgs::new(JoinType::Left),
            ),
            JoinDirection::Full => not_latino.join(
                latino,
                on.clone(),
                on,
                JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
            ),
        };

        let df = merged
            .with_column((col(PCT_LATINO) - col(PCT_NOT_LATINO)).alias(PCT_POINT_DIFF))
            .select([
                col(COUNTY_CODE),
                col(PCT_LATINO),
                col(PCT_NOT_LATINO),
                col(PCT_POINT_DIFF),
            ])
            .sort_by_exprs([col(COUNTY_CODE)], SortMultipleOptions::default())
            .collect()?;

        info!(
            "merged denial rates for {} counties ({:?} join)",
            df.height(),
            direction
        );
        Ok(df)
    }

    /// Materialize a comparison table as typed records.
    pub fn comparisons(df: &DataFrame) -> PolarsResult<Vec<CountyComparison>> {
        let codes = df.column(COUNTY_CODE)?.str()?;
        let latino = df.column(PCT_LATINO)?.f64()?;
        let not_latino = df.column(PCT_NOT_LATINO)?.f64()?;

        Ok(codes
            .into_iter()
            .zip(latino.into_iter())
            .zip(not_latino.into_iter())
            .filter_map(|((code, latino), not_latino)| {
                Some(CountyComparison::new(code?, latino, not_latino))
            })
            .collect())
    }
}
