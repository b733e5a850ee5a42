//! County Boundary Loader
//! Reads county polygons from a GeoJSON feature collection.

use crate::config::GeometryFields;
use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Feature {index} has no '{property}' property")]
    MissingProperty { index: usize, property: String },
    #[error("Feature {index} has unusable '{property}' value {value}")]
    InvalidProperty {
        index: usize,
        property: String,
        value: String,
    },
    #[error("Feature {index} has no geometry")]
    MissingGeometry { index: usize },
    #[error("Feature {index} has unsupported geometry type {kind}")]
    UnsupportedGeometry { index: usize, kind: &'static str },
}

/// One county boundary, as found in the boundary file.
#[derive(Debug, Clone, PartialEq)]
pub struct CountyGeometry {
    pub code: String,
    pub region: String,
    pub boundary: MultiPolygon<f64>,
}

pub struct GeoLoader {
    fields: GeometryFields,
}

impl Default for GeoLoader {
    fn default() -> Self {
        Self::new(GeometryFields::default())
    }
}

impl GeoLoader {
    pub fn new(fields: GeometryFields) -> Self {
        Self { fields }
    }

    pub fn load_geojson(&self, path: &Path) -> Result<Vec<CountyGeometry>, GeoError> {
        let text = fs::read_to_string(path).map_err(|source| GeoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let counties = self.parse(&text)?;
        info!("loaded {} county boundaries from {}", counties.len(), path.display());
        Ok(counties)
    }

    pub fn parse(&self, text: &str) -> Result<Vec<CountyGeometry>, GeoError> {
        let collection: FeatureCollection = text.parse()?;
        collection
            .features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| self.county_from_feature(index, feature))
            .collect()
    }

    fn county_from_feature(&self, index: usize, feature: Feature) -> Result<CountyGeometry, GeoError> {
        let code = Self::property_text(&feature, index, &self.fields.code)?;
        let region = Self::property_text(&feature, index, &self.fields.region)?;

        let geometry = feature.geometry.ok_or(GeoError::MissingGeometry { index })?;
        let boundary = match geometry.value {
            value @ geojson::Value::Polygon(_) => {
                MultiPolygon::new(vec![Polygon::<f64>::try_from(value)?])
            }
            value @ geojson::Value::MultiPolygon(_) => MultiPolygon::<f64>::try_from(value)?,
            other => {
                return Err(GeoError::UnsupportedGeometry {
                    index,
                    kind: Self::geometry_kind(&other),
                })
            }
        };

        Ok(CountyGeometry {
            code,
            region,
            boundary,
        })
    }

    /// String or whole-number property as text. Numeric codes are the usual
    /// source of lost leading zeros; they are padded later.
    fn property_text(feature: &Feature, index: usize, name: &str) -> Result<String, GeoError> {
        let invalid = |value: &JsonValue| GeoError::InvalidProperty {
            index,
            property: name.to_string(),
            value: value.to_string(),
        };
        let value = match feature.property(name) {
            None | Some(JsonValue::Null) => {
                return Err(GeoError::MissingProperty {
                    index,
                    property: name.to_string(),
                })
            }
            Some(value) => value,
        };
        match value {
            JsonValue::String(s) => Ok(s.trim().to_string()),
            JsonValue::Number(n) => n
                .as_u64()
                .map(|n| n.to_string())
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                        .map(|f| format!("{f:.0}"))
                })
                .ok_or_else(|| invalid(value)),
            _ => Err(invalid(value)),
        }
    }

    fn geometry_kind(value: &geojson::Value) -> &'static str {
        match value {
            geojson::Value::Point(_) => "Point",
            geojson::Value::MultiPoint(_) => "MultiPoint",
            geojson::Value::LineString(_) => "LineString",
            geojson::Value::MultiLineString(_) => "MultiLineString",
            geojson::Value::Polygon(_) => "Polygon",
            geojson::Value::MultiPolygon(_) => "MultiPolygon",
            geojson::Value::GeometryCollection(_) => "GeometryCollection",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TWO_COUNTIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "CODE_LOCAL": "06001", "REGION": "CA" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-122.3, 37.9], [-121.5, 37.9], [-121.5, 37.4], [-122.3, 37.4], [-122.3, 37.9]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "CODE_LOCAL": 1001, "REGION": "AL" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[-86.9, 32.7], [-86.4, 32.7], [-86.4, 32.3], [-86.9, 32.3], [-86.9, 32.7]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_polygon_and_multipolygon() {
        let counties = GeoLoader::default().parse(TWO_COUNTIES).unwrap();

        assert_eq!(counties.len(), 2);
        assert_eq!(counties[0].code, "06001");
        assert_eq!(counties[0].region, "CA");
        assert_eq!(counties[0].boundary.0.len(), 1);
        // Numeric code is kept as text, still unpadded.
        assert_eq!(counties[1].code, "1001");
    }

    #[test]
    fn test_missing_code_property() {
        let text = TWO_COUNTIES.replace("\"CODE_LOCAL\": \"06001\",", "");
        let err = GeoLoader::default().parse(&text).unwrap_err();
        match err {
            GeoError::MissingProperty { index, property } => {
                assert_eq!(index, 0);
                assert_eq!(property, "CODE_LOCAL");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_whole_float_code_is_accepted() {
        let text = TWO_COUNTIES.replace("\"CODE_LOCAL\": 1001,", "\"CODE_LOCAL\": 1001.0,");
        let counties = GeoLoader::default().parse(&text).unwrap();
        assert_eq!(counties[1].code, "1001");
    }

    #[test]
    fn test_fractional_code_is_invalid_not_missing() {
        let text = TWO_COUNTIES.replace("\"CODE_LOCAL\": 1001,", "\"CODE_LOCAL\": 1001.5,");
        let err = GeoLoader::default().parse(&text).unwrap_err();
        match err {
            GeoError::InvalidProperty {
                index,
                property,
                value,
            } => {
                assert_eq!(index, 1);
                assert_eq!(property, "CODE_LOCAL");
                assert_eq!(value, "1001.5");
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = TWO_COUNTIES.replace("\"REGION\": \"CA\"", "\"REGION\": [\"CA\"]");
        let err = GeoLoader::default().parse(&text).unwrap_err();
        assert!(matches!(err, GeoError::InvalidProperty { index: 0, .. }));
    }

    #[test]
    fn test_point_geometry_rejected() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "CODE_LOCAL": "06001", "REGION": "CA" },
                "geometry": { "type": "Point", "coordinates": [-122.0, 37.0] }
            }]
        }"#;
        let err = GeoLoader::default().parse(text).unwrap_err();
        assert!(matches!(
            err,
            GeoError::UnsupportedGeometry { kind: "Point", .. }
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = GeoLoader::default()
            .load_geojson(&dir.path().join("counties.geojson"))
            .unwrap_err();
        assert!(matches!(err, GeoError::Io { .. }));
    }
}
