//! Pipeline configuration.
//!
//! Every input path and knob the pipeline needs is carried here explicitly.
//! A configuration can be read from a JSON file; fields omitted from the file
//! take their defaults.

use crate::charts::MapView;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Canonical width of a county code (two-digit state + three-digit county).
pub const DEFAULT_CODE_WIDTH: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Which side drives the cross-ethnicity merge.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum JoinDirection {
    /// NotLatino counties drive a left join; Latino-only counties are dropped.
    NotLatino,
    /// Latino counties drive a left join; NotLatino-only counties are dropped.
    Latino,
    /// Keep every county with data for either ethnicity.
    #[default]
    Full,
}

/// Source column names in the loan file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanColumns {
    pub county: String,
    pub ethnicity: String,
    pub action: String,
}

impl Default for LoanColumns {
    fn default() -> Self {
        Self {
            county: "county_code".to_string(),
            ethnicity: "derived_ethnicity".to_string(),
            action: "action_taken".to_string(),
        }
    }
}

impl LoanColumns {
    pub fn names(&self) -> [&str; 3] {
        [&self.county, &self.ethnicity, &self.action]
    }
}

/// Property names in the county boundary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryFields {
    pub code: String,
    pub region: String,
}

impl Default for GeometryFields {
    fn default() -> Self {
        Self {
            code: "CODE_LOCAL".to_string(),
            region: "REGION".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub loans_path: PathBuf,
    pub counties_path: PathBuf,
    pub output_dir: PathBuf,
    pub loan_columns: LoanColumns,
    pub delimiter: char,
    pub geometry_fields: GeometryFields,
    pub code_width: usize,
    pub join_direction: JoinDirection,
    pub excluded_regions: Vec<String>,
    pub views: Vec<MapView>,
    pub image_width: u32,
    pub image_height: u32,
    pub render: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            loans_path: PathBuf::from("data/loans.csv"),
            counties_path: PathBuf::from("data/counties.geojson"),
            output_dir: PathBuf::from("output"),
            loan_columns: LoanColumns::default(),
            delimiter: ',',
            geometry_fields: GeometryFields::default(),
            code_width: DEFAULT_CODE_WIDTH,
            join_direction: JoinDirection::default(),
            excluded_regions: vec!["AK".to_string(), "HI".to_string()],
            views: vec![MapView::Latino, MapView::NotLatino],
            image_width: 1600,
            image_height: 1000,
            render: true,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                ConfigError::Invalid(format!("delimiter {:?} is not ASCII", self.delimiter))
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delimiter_byte()?;
        if self.code_width == 0 {
            return Err(ConfigError::Invalid("code_width must be positive".into()));
        }
        if self.render && self.views.is_empty() {
            return Err(ConfigError::Invalid(
                "rendering is enabled but no map views are configured".into(),
            ));
        }
        if self.image_width < 200 || self.image_height < 200 {
            return Err(ConfigError::Invalid(format!(
                "image size {}x{} is too small",
                self.image_width, self.image_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "loans_path": "hmda_2022.csv",
            "join_direction": "not-latino",
            "loan_columns": { "county": "county" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.loans_path, PathBuf::from("hmda_2022.csv"));
        assert_eq!(config.join_direction, JoinDirection::NotLatino);
        assert_eq!(config.loan_columns.county, "county");
        assert_eq!(config.loan_columns.ethnicity, "derived_ethnicity");
        assert_eq!(config.code_width, 5);
        assert_eq!(config.excluded_regions, vec!["AK", "HI"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = PipelineConfig {
            delimiter: '§',
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_tab_delimiter() {
        let config = PipelineConfig {
            delimiter: '\t',
            ..Default::default()
        };
        assert_eq!(config.delimiter_byte().unwrap(), b'\t');
    }
}
