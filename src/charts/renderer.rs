//! Choropleth Renderer
//! Draws county polygons shaded by denial-rate bin into a PNG.
//!
//! Layout:
//! 1. Title naming the view, centered above the map
//! 2. Map area: every kept county filled by bin, outlined in grey;
//!    counties without data are outlined only, holes are left blank
//! 3. Legend column on the right: one swatch per bin plus "No data"

use crate::charts::bins::{bin_color, BIN_LABELS, PALETTE};
use crate::charts::MapView;
use crate::geography::EnrichedCounty;
use geo::{Area, BoundingRect, LineString, Rect};
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::info;

const LEGEND_WIDTH: u32 = 220;
const OUTLINE: RGBColor = RGBColor(90, 90, 90);

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("No counties left to draw for the {0:?} view")]
    NothingToDraw(MapView),
    #[error("Failed to render chart: {0}")]
    Render(String),
}

pub struct ChoroplethRenderer {
    width: u32,
    height: u32,
    excluded_regions: Vec<String>,
}

impl ChoroplethRenderer {
    pub fn new(width: u32, height: u32, excluded_regions: Vec<String>) -> Self {
        Self {
            width,
            height,
            excluded_regions,
        }
    }

    /// Counties that belong on the map (excluded regions removed).
    pub fn visible<'a>(&self, counties: &'a [EnrichedCounty]) -> Vec<&'a EnrichedCounty> {
        counties
            .iter()
            .filter(|c| !self.excluded_regions.iter().any(|r| r == &c.geometry.region))
            .collect()
    }

    /// Fail early when a view would have nothing to draw.
    pub fn check(&self, counties: &[EnrichedCounty], view: MapView) -> Result<(), ChartError> {
        Self::bounds(&self.visible(counties))
            .map(|_| ())
            .ok_or(ChartError::NothingToDraw(view))
    }

    /// Render one view to `path`; returns the number of counties drawn.
    pub fn render(
        &self,
        counties: &[EnrichedCounty],
        view: MapView,
        path: &Path,
    ) -> Result<usize, ChartError> {
        let visible = Self::draw_order(self.visible(counties));
        let bounds = Self::bounds(&visible).ok_or(ChartError::NothingToDraw(view))?;

        self.draw(&visible, view, bounds, path)
            .map_err(|e| ChartError::Render(e.to_string()))?;

        info!(
            "rendered {:?} map with {} counties to {}",
            view,
            visible.len(),
            path.display()
        );
        Ok(visible.len())
    }

    /// Bounding box of every boundary, padded so a single county still
    /// yields a non-empty range.
    fn bounds(counties: &[&EnrichedCounty]) -> Option<Rect<f64>> {
        let rect = counties
            .iter()
            .filter_map(|c| c.geometry.boundary.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
                    (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
                )
            })?;
        let pad_x = (rect.width() * 0.02).max(0.01);
        let pad_y = (rect.height() * 0.02).max(0.01);
        Some(Rect::new(
            (rect.min().x - pad_x, rect.min().y - pad_y),
            (rect.max().x + pad_x, rect.max().y + pad_y),
        ))
    }

    /// Largest first, so an enclave is painted after the county whose hole
    /// it fills.
    fn draw_order(mut counties: Vec<&EnrichedCounty>) -> Vec<&EnrichedCounty> {
        counties.sort_by(|a, b| {
            b.geometry
                .boundary
                .unsigned_area()
                .total_cmp(&a.geometry.boundary.unsigned_area())
        });
        counties
    }

    fn ring(line: &LineString<f64>) -> Vec<(f64, f64)> {
        line.points().map(|p| (p.x(), p.y())).collect()
    }

    fn draw(
        &self,
        counties: &[&EnrichedCounty],
        view: MapView,
        bounds: Rect<f64>,
        path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let (map_area, legend_area) =
            root.split_horizontally(self.width.saturating_sub(LEGEND_WIDTH) as i32);

        let mut chart = ChartBuilder::on(&map_area)
            .caption(view.title(), ("sans-serif", 28))
            .margin(10)
            .build_cartesian_2d(
                bounds.min().x..bounds.max().x,
                bounds.min().y..bounds.max().y,
            )?;

        for county in counties {
            let fill = bin_color(view.value(county));
            for polygon in &county.geometry.boundary {
                let exterior = Self::ring(polygon.exterior());
                let holes: Vec<Vec<(f64, f64)>> =
                    polygon.interiors().iter().map(Self::ring).collect();
                if let Some(color) = fill {
                    chart.draw_series(std::iter::once(Polygon::new(
                        exterior.clone(),
                        color.filled(),
                    )))?;
                    chart.draw_series(
                        holes
                            .iter()
                            .map(|hole| Polygon::new(hole.clone(), WHITE.filled())),
                    )?;
                }
                chart.draw_series(
                    std::iter::once(exterior)
                        .chain(holes)
                        .map(|ring| PathElement::new(ring, OUTLINE.stroke_width(1))),
                )?;
            }
        }

        // Legend
        let font = ("sans-serif", 18).into_font();
        legend_area.draw(&Text::new(view.legend_title(), (20, 60), font.clone()))?;
        for (i, (label, color)) in BIN_LABELS.iter().zip(PALETTE.iter()).enumerate() {
            let y = 100 + i as i32 * 36;
            legend_area.draw(&Rectangle::new([(20, y), (48, y + 24)], color.filled()))?;
            legend_area.draw(&Rectangle::new(
                [(20, y), (48, y + 24)],
                OUTLINE.stroke_width(1),
            ))?;
            legend_area.draw(&Text::new(*label, (58, y + 4), font.clone()))?;
        }
        let y = 100 + BIN_LABELS.len() as i32 * 36;
        legend_area.draw(&Rectangle::new(
            [(20, y), (48, y + 24)],
            OUTLINE.stroke_width(1),
        ))?;
        legend_area.draw(&Text::new("No data", (58, y + 4), font))?;

        root.present()?;
        Ok(())
    }
}
