//! End-to-end batch run.
//!
//! Loader → Recoder → Aggregator → Joiner → GeoJoiner, then the writers and
//! the renderer. Everything is computed and every map view checked before
//! the first file is written. Files are written into a staging directory
//! and only moved into the output directory once all of them succeeded, so
//! a fatal error in any stage leaves the output directory untouched.

use crate::charts::ChoroplethRenderer;
use crate::config::PipelineConfig;
use crate::data::{LoanLoader, ProjectedLoans, Recoder};
use crate::error::PipelineResult;
use crate::geography::{GeoJoinResult, GeoJoiner, GeoLoader};
use crate::output::{self, StagedOutput, COMPARISON_CSV, ENRICHED_GEOJSON};
use crate::stats::{DenialAggregator, DenialCounts, DenialJoiner, EthnicitySummary};
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Denial-rate tables computed from the loan file.
#[derive(Debug, Clone)]
pub struct DenialRates {
    pub counts: DenialCounts,
    /// Columns: [county_code, pct_denied_latino, pct_denied_not_latino,
    /// pct_point_difference]
    pub comparison: DataFrame,
}

/// Everything a run computes before writing.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub rows_read: usize,
    pub rows_discarded: usize,
    pub rates: DenialRates,
    pub geo: GeoJoinResult,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub rows_read: usize,
    pub rows_discarded: usize,
    pub ethnicities: Vec<EthnicitySummary>,
    pub compared_counties: usize,
    pub boundaries: usize,
    pub matched_boundaries: usize,
    pub loan_counties_without_boundary: usize,
    pub files_written: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn renderer(&self) -> ChoroplethRenderer {
        ChoroplethRenderer::new(
            self.config.image_width,
            self.config.image_height,
            self.config.excluded_regions.clone(),
        )
    }

    /// Recode, aggregate and merge a projected loan table.
    pub fn denial_rates(&self, projected: &ProjectedLoans) -> PipelineResult<DenialRates> {
        let recoded = Recoder::recode(&projected.df)?;
        let counts = DenialAggregator::aggregate(&recoded)?;
        let comparison = DenialJoiner::compare(&counts, self.config.join_direction)?;
        Ok(DenialRates { counts, comparison })
    }

    /// Run every computing stage without touching the output directory.
    pub fn analyze(&self) -> PipelineResult<Analysis> {
        let loader = LoanLoader::new(
            self.config.loan_columns.clone(),
            self.config.delimiter_byte()?,
        );
        let projected = loader.load_csv(&self.config.loans_path)?;
        let rates = self.denial_rates(&projected)?;

        let geometries = GeoLoader::new(self.config.geometry_fields.clone())
            .load_geojson(&self.config.counties_path)?;
        let comparisons = DenialJoiner::comparisons(&rates.comparison)?;
        let geo = GeoJoiner::new(self.config.code_width).join(geometries, &comparisons)?;

        if self.config.render {
            let renderer = self.renderer();
            for view in &self.config.views {
                renderer.check(&geo.counties, *view)?;
            }
        }

        Ok(Analysis {
            rows_read: projected.rows_read,
            rows_discarded: projected.rows_discarded,
            rates,
            geo,
        })
    }

    /// Persist tables and render the configured map views.
    ///
    /// Nothing appears in the output directory unless every file was
    /// written.
    pub fn write(&self, analysis: &Analysis) -> PipelineResult<Vec<PathBuf>> {
        let mut stage = StagedOutput::create(&self.config.output_dir)?;

        output::write_csv(&analysis.rates.comparison, &stage.file(COMPARISON_CSV))?;
        output::write_geojson(&analysis.geo.counties, &stage.file(ENRICHED_GEOJSON))?;

        if self.config.render {
            let renderer = self.renderer();
            for view in &self.config.views {
                let path = stage.file(view.file_name());
                renderer.render(&analysis.geo.counties, *view, &path)?;
            }
        } else {
            warn!("rendering disabled; no maps written");
        }

        Ok(stage.commit()?)
    }

    pub fn run(&self) -> PipelineResult<PipelineReport> {
        let analysis = self.analyze()?;
        let ethnicities = vec![
            analysis.rates.counts.latino.summary()?,
            analysis.rates.counts.not_latino.summary()?,
        ];
        let files_written = self.write(&analysis)?;

        let report = PipelineReport {
            rows_read: analysis.rows_read,
            rows_discarded: analysis.rows_discarded,
            ethnicities,
            compared_counties: analysis.rates.comparison.height(),
            boundaries: analysis.geo.counties.len(),
            matched_boundaries: analysis.geo.matched,
            loan_counties_without_boundary: analysis.geo.unmatched_codes.len(),
            files_written,
        };
        info!("run complete: {} files written", report.files_written.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JoinDirection;
    use crate::data::{CountyComparison, RecodeError};
    use crate::error::PipelineError;

    fn projected(rows: &[(&str, &str, &str)]) -> ProjectedLoans {
        let raw = df!(
            "county_code" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            "derived_ethnicity" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            "action_taken" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        )
        .unwrap();
        LoanLoader::default().project(raw.lazy()).unwrap()
    }

    #[test]
    fn test_single_county_scenario() {
        let pipeline = Pipeline::new(PipelineConfig {
            join_direction: JoinDirection::NotLatino,
            ..Default::default()
        })
        .unwrap();
        let loans = projected(&[
            ("06001", "Hispanic or Latino", "1"),
            ("06001", "Hispanic or Latino", "3"),
            ("06001", "Not Hispanic or Latino", "1"),
        ]);

        let rates = pipeline.denial_rates(&loans).unwrap();
        let rows = DenialJoiner::comparisons(&rates.comparison).unwrap();
        assert_eq!(
            rows,
            vec![CountyComparison::new("06001", Some(50.0), Some(0.0))]
        );
        assert_eq!(rows[0].pct_point_difference, Some(50.0));
    }

    #[test]
    fn test_unknown_ethnicity_halts() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let loans = projected(&[
            ("06001", "Hispanic or Latino", "1"),
            ("06001", "Unknown", "3"),
        ]);

        let err = pipeline.denial_rates(&loans).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Recode(RecodeError::UnrecognizedCategory { .. })
        ));
    }

    #[test]
    fn test_rates_are_identical_across_runs() {
        let pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let loans = projected(&[
            ("06075", "Hispanic or Latino", "3"),
            ("06001", "Not Hispanic or Latino", "7"),
            ("06037", "Hispanic or Latino", "1"),
            ("06001", "Hispanic or Latino", "1"),
        ]);

        let first = pipeline.denial_rates(&loans).unwrap();
        let second = pipeline.denial_rates(&loans).unwrap();
        assert!(first.comparison.equals_missing(&second.comparison));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Pipeline::new(PipelineConfig {
            code_width: 0,
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
