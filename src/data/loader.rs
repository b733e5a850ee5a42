//! Loan File Loader Module
//! Reads the raw loan CSV with Polars and projects it down to the three
//! columns the pipeline needs.

use crate::config::LoanColumns;
use crate::data::model::columns::{ACTION_TAKEN, COUNTY_CODE, ETHNICITY, SOURCE_ROW};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Column '{column}' not found in loan file (available: {available})")]
    Schema { column: String, available: String },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Projected loan table plus the audit counts gathered while building it.
#[derive(Debug, Clone)]
pub struct ProjectedLoans {
    /// Columns: county_code (str), ethnicity (str), action_taken (i64),
    /// source_row (u64).
    pub df: DataFrame,
    pub rows_read: usize,
    pub rows_discarded: usize,
}

/// Loads the loan CSV and keeps only county, ethnicity and action code.
pub struct LoanLoader {
    columns: LoanColumns,
    delimiter: u8,
}

impl Default for LoanLoader {
    fn default() -> Self {
        Self::new(LoanColumns::default(), b',')
    }
}

impl LoanLoader {
    pub fn new(columns: LoanColumns, delimiter: u8) -> Self {
        Self { columns, delimiter }
    }

    /// Load a CSV file and project it.
    ///
    /// Every column is read as text so county codes keep their leading
    /// zeros; the action code is parsed afterwards.
    pub fn load_csv(&self, path: &Path) -> Result<ProjectedLoans, LoaderError> {
        // Polars defers opening the file until collect; open it here so a
        // missing file surfaces as an I/O error.
        File::open(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!("reading loan file {}", path.display());
        let lf = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_separator(self.delimiter)
            .with_infer_schema_length(Some(0))
            .finish()?;

        self.project(lf)
    }

    /// Select the three columns of interest under their canonical names and
    /// drop rows where any of them is null.
    pub fn project(&self, mut lf: LazyFrame) -> Result<ProjectedLoans, LoaderError> {
        let schema = lf.collect_schema()?;
        for column in self.columns.names() {
            if schema.get(column).is_none() {
                let available = schema
                    .iter_names()
                    .map(|name| name.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(LoaderError::Schema {
                    column: column.to_string(),
                    available,
                });
            }
        }

        let projected = lf
            .with_row_index(SOURCE_ROW, None)
            .select([
                col(self.columns.county.as_str())
                    .cast(DataType::String)
                    .alias(COUNTY_CODE),
                col(self.columns.ethnicity.as_str())
                    .cast(DataType::String)
                    .alias(ETHNICITY),
                col(self.columns.action.as_str())
                    .cast(DataType::Int64)
                    .alias(ACTION_TAKEN),
                col(SOURCE_ROW).cast(DataType::UInt64),
            ])
            .collect()?;
        let rows_read = projected.height();

        let df = projected
            .lazy()
            .filter(
                col(COUNTY_CODE)
                    .is_not_null()
                    .and(col(ETHNICITY).is_not_null())
                    .and(col(ACTION_TAKEN).is_not_null()),
            )
            .collect()?;
        let rows_discarded = rows_read - df.height();

        info!(
            "projected {} loan rows, discarded {} with missing values",
            df.height(),
            rows_discarded
        );
        debug!("projected schema: {:?}", df.schema());

        Ok(ProjectedLoans {
            df,
            rows_read,
            rows_discarded,
        })
    }
}
