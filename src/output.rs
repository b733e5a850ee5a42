//! Writers for the tabular and geographic results.

use crate::geography::EnrichedCounty;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

pub const COMPARISON_CSV: &str = "county_comparison.csv";
pub const ENRICHED_GEOJSON: &str = "enriched_counties.geojson";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] PolarsError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError {
    let path = path.to_path_buf();
    move |source| OutputError::Io { path, source }
}

pub fn ensure_dir(dir: &Path) -> Result<(), OutputError> {
    fs::create_dir_all(dir).map_err(io_error(dir))
}

/// Output files written into a hidden sibling of the target directory and
/// moved into place by [`StagedOutput::commit`]. Dropping an uncommitted
/// stage removes everything written to it.
pub struct StagedOutput {
    staging: TempDir,
    target: PathBuf,
    files: Vec<String>,
}

impl StagedOutput {
    pub fn create(target: &Path) -> Result<Self, OutputError> {
        let parent = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_dir(&parent)?;
        let staging = tempfile::Builder::new()
            .prefix(".denial_map-")
            .tempdir_in(&parent)
            .map_err(io_error(&parent))?;
        debug!("staging outputs in {}", staging.path().display());

        Ok(Self {
            staging,
            target: target.to_path_buf(),
            files: Vec::new(),
        })
    }

    /// Staging path for `name`; the file is moved on commit.
    pub fn file(&mut self, name: &str) -> PathBuf {
        self.files.push(name.to_string());
        self.staging.path().join(name)
    }

    /// Move every staged file into the target directory and return their
    /// final paths.
    pub fn commit(self) -> Result<Vec<PathBuf>, OutputError> {
        if !self.target.exists() {
            fs::rename(self.staging.path(), &self.target).map_err(io_error(&self.target))?;
        } else {
            for name in &self.files {
                let dest = self.target.join(name);
                fs::rename(self.staging.path().join(name), &dest).map_err(io_error(&dest))?;
            }
        }

        info!("committed {} files to {}", self.files.len(), self.target.display());
        Ok(self.files.iter().map(|name| self.target.join(name)).collect())
    }
}

/// Write a data frame as CSV with a header row.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), OutputError> {
    let mut file = File::create(path).map_err(io_error(path))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    info!("wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Build one feature per county; comparison values become JSON null when
/// the county had no loan data.
pub fn enriched_features(counties: &[EnrichedCounty]) -> FeatureCollection {
    counties
        .iter()
        .map(|county| {
            let mut feature = Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(
                    &county.geometry.boundary,
                ))),
                id: None,
                properties: None,
                foreign_members: None,
            };
            let comparison = county.comparison.as_ref();
            feature.set_property("county_code", county.code());
            feature.set_property("region", county.geometry.region.as_str());
            feature.set_property(
                "pct_denied_latino",
                comparison.and_then(|c| c.pct_denied_latino),
            );
            feature.set_property(
                "pct_denied_not_latino",
                comparison.and_then(|c| c.pct_denied_not_latino),
            );
            feature.set_property(
                "pct_point_difference",
                comparison.and_then(|c| c.pct_point_difference),
            );
            feature
        })
        .collect()
}

pub fn write_geojson(counties: &[EnrichedCounty], path: &Path) -> Result<(), OutputError> {
    let out = GeoJson::from(enriched_features(counties));
    fs::write(path, out.to_string()).map_err(io_error(path))?;
    info!("wrote {} features to {}", counties.len(), path.display());
    Ok(())
}
