//! Map views and the display bins values are bucketed into.

use crate::data::Ethnicity;
use crate::geography::EnrichedCounty;
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

/// Upper bound (inclusive) of every bin except the last.
const BIN_UPPER_BOUNDS: [f64; 5] = [5.0, 10.0, 15.0, 20.0, 25.0];

/// The first bin also holds zero and every negative difference.
pub const BIN_LABELS: [&str; 6] = ["≤5", "6-10", "11-15", "16-20", "21-25", "26+"];

/// Sequential yellow to red scale, one color per bin.
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(255, 255, 178),
    RGBColor(254, 217, 118),
    RGBColor(254, 178, 76),
    RGBColor(253, 141, 60),
    RGBColor(240, 59, 32),
    RGBColor(189, 0, 38),
];

/// Index of the display bin for a value; `None` for missing data.
///
/// Values at or below 5 (zero and negative differences included) land in the
/// first bin.
pub fn bin_index(value: f64) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    Some(
        BIN_UPPER_BOUNDS
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or(BIN_UPPER_BOUNDS.len()),
    )
}

pub fn bin_color(value: Option<f64>) -> Option<RGBColor> {
    value.and_then(bin_index).map(|i| PALETTE[i])
}

/// Which value a choropleth shades counties by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum MapView {
    /// Percent of Latino applications denied.
    Latino,
    /// Percent of NotLatino applications denied.
    NotLatino,
    /// Latino minus NotLatino, in percentage points.
    Difference,
}

impl MapView {
    pub fn value(self, county: &EnrichedCounty) -> Option<f64> {
        match self {
            MapView::Latino => county.percent_denied(Ethnicity::Latino),
            MapView::NotLatino => county.percent_denied(Ethnicity::NotLatino),
            MapView::Difference => county.pct_point_difference(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MapView::Latino => "Mortgage denial rate, Latino applicants",
            MapView::NotLatino => "Mortgage denial rate, non-Latino applicants",
            MapView::Difference => "Denial rate gap, Latino minus non-Latino",
        }
    }

    pub fn legend_title(self) -> &'static str {
        match self {
            MapView::Difference => "Points",
            MapView::Latino | MapView::NotLatino => "% denied",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            MapView::Latino => "denial_rate_latino.png",
            MapView::NotLatino => "denial_rate_not_latino.png",
            MapView::Difference => "denial_rate_difference.png",
        }
    }
}
