//! Recoder Module
//! Collapses raw ethnicity labels into the two canonical categories and maps
//! action codes to [`ActionTaken`] once, materializing a `denied` flag.

use crate::data::model::columns::{ACTION_TAKEN, COUNTY_CODE, DENIED, ETHNICITY, SOURCE_ROW};
use crate::data::model::{ActionTaken, Ethnicity};
use polars::prelude::*;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RecodeError {
    /// `row` is the data row in the loan file when the table carries a
    /// `source_row` column, else the position in the table.
    #[error("Unrecognized ethnicity category '{value}' at row {row}")]
    UnrecognizedCategory { value: String, row: u64 },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Recodes a projected loan table.
pub struct Recoder;

impl Recoder {
    /// Replace raw ethnicity labels with canonical ones and add the `denied`
    /// column.
    ///
    /// Output columns: [county_code, ethnicity, action_taken, denied]
    pub fn recode(df: &DataFrame) -> Result<DataFrame, RecodeError> {
        let ethnicity_ca = df.column(ETHNICITY)?.str()?;
        let source_rows = match df.column(SOURCE_ROW) {
            Ok(column) => Some(column.u64()?),
            Err(_) => None,
        };
        let mut labels: Vec<&'static str> = Vec::with_capacity(df.height());
        for (idx, raw) in ethnicity_ca.into_iter().enumerate() {
            let raw = raw.unwrap_or_default();
            let ethnicity = Ethnicity::from_source_label(raw).ok_or_else(|| {
                RecodeError::UnrecognizedCategory {
                    value: raw.to_string(),
                    row: source_rows
                        .and_then(|rows| rows.get(idx))
                        .unwrap_or(idx as u64),
                }
            })?;
            labels.push(ethnicity.label());
        }

        let action_ca = df.column(ACTION_TAKEN)?.i64()?;
        let denied: Vec<bool> = action_ca
            .into_iter()
            .map(|code| code.map(ActionTaken::from_code).is_some_and(ActionTaken::is_denial))
            .collect();

        let denied_rows = denied.iter().filter(|d| **d).count();
        let mut result = df.select([COUNTY_CODE, ACTION_TAKEN])?;
        result.with_column(Column::new(ETHNICITY.into(), labels))?;
        result.with_column(Column::new(DENIED.into(), denied))?;
        let result = result.select([COUNTY_CODE, ETHNICITY, ACTION_TAKEN, DENIED])?;

        info!("recoded {} rows, {} denials", result.height(), denied_rows);
        Ok(result)
    }

    /// Materialize a recoded table as typed records.
    #[cfg(test)]
    pub(crate) fn records(
        df: &DataFrame,
    ) -> Result<Vec<crate::data::LoanRecord>, RecodeError> {
        let codes = df.column(COUNTY_CODE)?.str()?;
        let ethnicities = df.column(ETHNICITY)?.str()?;
        let actions = df.column(ACTION_TAKEN)?.i64()?;

        let mut records = Vec::with_capacity(df.height());
        for (row, ((code, ethnicity), action)) in codes
            .into_iter()
            .zip(ethnicities.into_iter())
            .zip(actions.into_iter())
            .enumerate()
        {
            let (Some(code), Some(label), Some(action)) = (code, ethnicity, action) else {
                continue;
            };
            let ethnicity = Ethnicity::ALL
                .into_iter()
                .find(|e| e.label() == label)
                .ok_or_else(|| RecodeError::UnrecognizedCategory {
                    value: label.to_string(),
                    row: row as u64,
                })?;
            records.push(crate::data::LoanRecord {
                county_code: code.to_string(),
                ethnicity,
                action_taken: ActionTaken::from_code(action),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projected(ethnicities: &[&str], actions: &[i64]) -> DataFrame {
        let codes: Vec<&str> = ethnicities.iter().map(|_| "06001").collect();
        df!(
            COUNTY_CODE => codes,
            ETHNICITY => ethnicities.to_vec(),
            ACTION_TAKEN => actions.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_recode_yields_only_canonical_labels() {
        let df = projected(
            &[
                "Hispanic or Latino",
                "Not Hispanic or Latino",
                "Hispanic or Latino",
            ],
            &[1, 3, 7],
        );
        let recoded = Recoder::recode(&df).unwrap();

        let labels: Vec<&str> = recoded
            .column(ETHNICITY)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(labels, vec!["Latino", "NotLatino", "Latino"]);
        assert!(labels.iter().all(|l| *l == "Latino" || *l == "NotLatino"));

        let denied: Vec<bool> = recoded
            .column(DENIED)
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(denied, vec![false, true, true]);
    }

    #[test]
    fn test_unknown_ethnicity_is_rejected() {
        let df = projected(&["Hispanic or Latino", "Unknown"], &[1, 1]);
        let err = Recoder::recode(&df).unwrap_err();
        match err {
            RecodeError::UnrecognizedCategory { value, row } => {
                assert_eq!(value, "Unknown");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_ethnicity_reports_source_row() {
        let mut df = projected(
            &["Hispanic or Latino", "Not Hispanic or Latino", "Unknown"],
            &[1, 1, 3],
        );
        // Rows 1 and 3 of the file were dropped for missing values.
        df.with_column(Column::new(SOURCE_ROW.into(), vec![0u64, 2, 4]))
            .unwrap();

        let err = Recoder::recode(&df).unwrap_err();
        match err {
            RecodeError::UnrecognizedCategory { value, row } => {
                assert_eq!(value, "Unknown");
                assert_eq!(row, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_records_map_action_codes() {
        let df = projected(&["Hispanic or Latino", "Not Hispanic or Latino"], &[3, 6]);
        let recoded = Recoder::recode(&df).unwrap();
        let records = Recoder::records(&recoded).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ethnicity, Ethnicity::Latino);
        assert_eq!(records[0].action_taken, ActionTaken::ApplicationDenied);
        assert_eq!(records[1].action_taken, ActionTaken::LoanPurchased);
    }
}
