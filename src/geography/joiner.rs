//! Geometry Joiner
//! Normalizes county codes on both sides and left-joins the comparison table
//! onto the county boundaries.

use crate::data::{CountyComparison, Ethnicity};
use crate::geography::CountyGeometry;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, PartialEq)]
pub enum GeoJoinError {
    #[error("County code '{code}' cannot be normalized to width {width}")]
    InvalidCountyCode { code: String, width: usize },
    #[error("County code '{code}' appears more than once in the {table} table")]
    DuplicateCountyCode { code: String, table: &'static str },
}

/// Left-pad a county code with zeros to `width`.
///
/// Codes must be ASCII digits no longer than `width` once trimmed.
pub fn normalize_county_code(code: &str, width: usize) -> Result<String, GeoJoinError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.len() > width || !trimmed.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(GeoJoinError::InvalidCountyCode {
            code: code.to_string(),
            width,
        });
    }
    Ok(format!("{trimmed:0>width$}"))
}

/// A county boundary with the denial rates that matched it, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedCounty {
    pub geometry: CountyGeometry,
    pub comparison: Option<CountyComparison>,
}

impl EnrichedCounty {
    pub fn code(&self) -> &str {
        &self.geometry.code
    }

    pub fn percent_denied(&self, ethnicity: Ethnicity) -> Option<f64> {
        self.comparison.as_ref()?.percent_denied(ethnicity)
    }

    pub fn pct_point_difference(&self) -> Option<f64> {
        self.comparison.as_ref()?.pct_point_difference
    }
}

/// Outcome of a geometry join.
#[derive(Debug, Clone)]
pub struct GeoJoinResult {
    pub counties: Vec<EnrichedCounty>,
    pub matched: usize,
    /// Loan-side county codes with no boundary.
    pub unmatched_codes: Vec<String>,
}

pub struct GeoJoiner {
    width: usize,
}

impl GeoJoiner {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Join comparisons onto geometries. Every geometry is kept, in input
    /// order; geometry codes are rewritten to their normalized form.
    pub fn join(
        &self,
        geometries: Vec<CountyGeometry>,
        comparisons: &[CountyComparison],
    ) -> Result<GeoJoinResult, GeoJoinError> {
        let mut by_code: HashMap<String, CountyComparison> =
            HashMap::with_capacity(comparisons.len());
        for comparison in comparisons {
            let code = normalize_county_code(&comparison.county_code, self.width)?;
            if by_code.contains_key(&code) {
                return Err(GeoJoinError::DuplicateCountyCode {
                    code,
                    table: "denial rate",
                });
            }
            let mut comparison = comparison.clone();
            comparison.county_code = code.clone();
            by_code.insert(code, comparison);
        }

        let mut seen: HashSet<String> = HashSet::with_capacity(geometries.len());
        let mut counties = Vec::with_capacity(geometries.len());
        let mut matched = 0;
        for mut geometry in geometries {
            let code = normalize_county_code(&geometry.code, self.width)?;
            if !seen.insert(code.clone()) {
                return Err(GeoJoinError::DuplicateCountyCode {
                    code,
                    table: "boundary",
                });
            }
            let comparison = by_code.get(&code).cloned();
            if comparison.is_some() {
                matched += 1;
            }
            geometry.code = code;
            counties.push(EnrichedCounty {
                geometry,
                comparison,
            });
        }

        let mut unmatched_codes: Vec<String> = by_code
            .into_keys()
            .filter(|code| !seen.contains(code))
            .collect();
        unmatched_codes.sort();

        info!(
            "joined denial rates onto {} boundaries: {} matched, {} without loan data",
            counties.len(),
            matched,
            counties.len() - matched
        );
        if !unmatched_codes.is_empty() {
            warn!(
                "{} counties with loan data have no boundary (first: {})",
                unmatched_codes.len(),
                unmatched_codes[0]
            );
        }

        Ok(GeoJoinResult {
            counties,
            matched,
            unmatched_codes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn county(code: &str, region: &str) -> CountyGeometry {
        CountyGeometry {
            code: code.to_string(),
            region: region.to_string(),
            boundary: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ]]),
        }
    }

    #[test]
    fn test_zero_padding() {
        let padded: Vec<String> = ["123", "4567"]
            .iter()
            .map(|c| normalize_county_code(c, 5).unwrap())
            .collect();
        assert_eq!(padded, vec!["00123", "04567"]);
        assert_eq!(normalize_county_code("06001", 5).unwrap(), "06001");
        assert_eq!(normalize_county_code(" 6001 ", 5).unwrap(), "06001");
    }

    #[test]
    fn test_invalid_codes() {
        for code in ["123456", "", "06A01"] {
            assert_eq!(
                normalize_county_code(code, 5),
                Err(GeoJoinError::InvalidCountyCode {
                    code: code.to_string(),
                    width: 5
                })
            );
        }
    }

    #[test]
    fn test_left_join_keeps_every_boundary() {
        let geometries = vec![county("06001", "CA"), county("1001", "AL"), county("02013", "AK")];
        let comparisons = vec![
            CountyComparison::new("6001", Some(50.0), Some(0.0)),
            CountyComparison::new("01001", Some(10.0), None),
            CountyComparison::new("99999", Some(10.0), Some(10.0)),
        ];

        let result = GeoJoiner::new(5).join(geometries, &comparisons).unwrap();

        let codes: Vec<&str> = result.counties.iter().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["06001", "01001", "02013"]);
        assert_eq!(result.matched, 2);
        assert_eq!(result.unmatched_codes, vec!["99999"]);

        assert_eq!(result.counties[0].pct_point_difference(), Some(50.0));
        assert_eq!(result.counties[1].percent_denied(Ethnicity::NotLatino), None);
        // No loan data: absent, not zero.
        assert!(result.counties[2].comparison.is_none());
        assert_eq!(result.counties[2].percent_denied(Ethnicity::Latino), None);
    }

    #[test]
    fn test_codes_colliding_after_padding_are_rejected() {
        let comparisons = vec![
            CountyComparison::new("6001", Some(50.0), Some(0.0)),
            CountyComparison::new("06001", Some(10.0), Some(0.0)),
        ];
        let err = GeoJoiner::new(5)
            .join(vec![county("06001", "CA")], &comparisons)
            .unwrap_err();
        assert_eq!(
            err,
            GeoJoinError::DuplicateCountyCode {
                code: "06001".into(),
                table: "denial rate"
            }
        );
    }
}
