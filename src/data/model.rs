//! Loan and county record types shared by every pipeline stage.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical column names used after projection.
pub mod columns {
    pub const COUNTY_CODE: &str = "county_code";
    pub const ETHNICITY: &str = "ethnicity";
    pub const ACTION_TAKEN: &str = "action_taken";
    pub const DENIED: &str = "denied";
    /// Zero-based data row in the loan file, header excluded.
    pub const SOURCE_ROW: &str = "source_row";

    pub const TOTAL: &str = "total";
    pub const DENIED_COUNT: &str = "denied_count";
    pub const PCT_DENIED: &str = "pct_denied";

    pub const PCT_LATINO: &str = "pct_denied_latino";
    pub const PCT_NOT_LATINO: &str = "pct_denied_not_latino";
    pub const PCT_POINT_DIFF: &str = "pct_point_difference";
}

/// Applicant ethnicity, collapsed to two categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ethnicity {
    Latino,
    NotLatino,
}

impl Ethnicity {
    pub const ALL: [Ethnicity; 2] = [Ethnicity::Latino, Ethnicity::NotLatino];

    /// Raw label as it appears in the loan file.
    pub fn source_label(self) -> &'static str {
        match self {
            Ethnicity::Latino => "Hispanic or Latino",
            Ethnicity::NotLatino => "Not Hispanic or Latino",
        }
    }

    /// Canonical label stored after recoding.
    pub fn label(self) -> &'static str {
        match self {
            Ethnicity::Latino => "Latino",
            Ethnicity::NotLatino => "NotLatino",
        }
    }

    /// Parse a raw label; anything outside the closed set yields `None`.
    pub fn from_source_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "Hispanic or Latino" => Some(Ethnicity::Latino),
            "Not Hispanic or Latino" => Some(Ethnicity::NotLatino),
            _ => None,
        }
    }
}

impl fmt::Display for Ethnicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// HMDA "action taken" outcome codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionTaken {
    LoanOriginated,
    ApprovedNotAccepted,
    ApplicationDenied,
    Withdrawn,
    ClosedIncomplete,
    LoanPurchased,
    PreapprovalDenied,
    PreapprovalApprovedNotAccepted,
    Other(i64),
}

impl ActionTaken {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => ActionTaken::LoanOriginated,
            2 => ActionTaken::ApprovedNotAccepted,
            3 => ActionTaken::ApplicationDenied,
            4 => ActionTaken::Withdrawn,
            5 => ActionTaken::ClosedIncomplete,
            6 => ActionTaken::LoanPurchased,
            7 => ActionTaken::PreapprovalDenied,
            8 => ActionTaken::PreapprovalApprovedNotAccepted,
            other => ActionTaken::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            ActionTaken::LoanOriginated => 1,
            ActionTaken::ApprovedNotAccepted => 2,
            ActionTaken::ApplicationDenied => 3,
            ActionTaken::Withdrawn => 4,
            ActionTaken::ClosedIncomplete => 5,
            ActionTaken::LoanPurchased => 6,
            ActionTaken::PreapprovalDenied => 7,
            ActionTaken::PreapprovalApprovedNotAccepted => 8,
            ActionTaken::Other(code) => code,
        }
    }

    pub fn is_denial(self) -> bool {
        matches!(
            self,
            ActionTaken::ApplicationDenied | ActionTaken::PreapprovalDenied
        )
    }
}

/// A single projected and recoded loan application.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRecord {
    pub county_code: String,
    pub ethnicity: Ethnicity,
    pub action_taken: ActionTaken,
}

/// Application and denial counts for one (county, ethnicity) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyAggregate {
    pub county_code: String,
    pub total: u64,
    pub denied: u64,
}

impl CountyAggregate {
    /// Denied share in percent; NaN when there were no applications.
    pub fn percent_denied(&self) -> f64 {
        if self.total == 0 {
            return f64::NAN;
        }
        self.denied as f64 * 100.0 / self.total as f64
    }
}

/// Denial rates for both ethnicities in one county.
///
/// A missing side stays `None`: a county without data is not a county
/// without denials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyComparison {
    pub county_code: String,
    pub pct_denied_latino: Option<f64>,
    pub pct_denied_not_latino: Option<f64>,
    pub pct_point_difference: Option<f64>,
}

impl CountyComparison {
    pub fn new(
        county_code: impl Into<String>,
        pct_denied_latino: Option<f64>,
        pct_denied_not_latino: Option<f64>,
    ) -> Self {
        let pct_point_difference = match (pct_denied_latino, pct_denied_not_latino) {
            (Some(latino), Some(not_latino)) => Some(latino - not_latino),
            _ => None,
        };
        Self {
            county_code: county_code.into(),
            pct_denied_latino,
            pct_denied_not_latino,
            pct_point_difference,
        }
    }

    pub fn percent_denied(&self, ethnicity: Ethnicity) -> Option<f64> {
        match ethnicity {
            Ethnicity::Latino => self.pct_denied_latino,
            Ethnicity::NotLatino => self.pct_denied_not_latino,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_codes() {
        let denied: Vec<i64> = (1..=8)
            .filter(|&c| ActionTaken::from_code(c).is_denial())
            .collect();
        assert_eq!(denied, vec![3, 7]);
        assert!(!ActionTaken::from_code(42).is_denial());
        assert_eq!(ActionTaken::from_code(42).code(), 42);
    }

    #[test]
    fn test_ethnicity_labels() {
        assert_eq!(
            Ethnicity::from_source_label("Hispanic or Latino"),
            Some(Ethnicity::Latino)
        );
        assert_eq!(
            Ethnicity::from_source_label("Not Hispanic or Latino"),
            Some(Ethnicity::NotLatino)
        );
        assert_eq!(Ethnicity::from_source_label("Joint"), None);
    }

    #[test]
    fn test_percent_denied_zero_total() {
        let agg = CountyAggregate {
            county_code: "06001".into(),
            total: 0,
            denied: 0,
        };
        assert!(agg.percent_denied().is_nan());

        let agg = CountyAggregate {
            county_code: "06001".into(),
            total: 4,
            denied: 1,
        };
        assert!((agg.percent_denied() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_comparison_difference_requires_both_sides() {
        let both = CountyComparison::new("06001", Some(50.0), Some(20.0));
        assert_eq!(both.pct_point_difference, Some(30.0));

        let only_latino = CountyComparison::new("06003", Some(50.0), None);
        assert_eq!(only_latino.pct_point_difference, None);
    }
}
