//! Charts module - choropleth rendering

mod bins;
mod renderer;

pub use bins::{bin_color, bin_index, MapView, BIN_LABELS, PALETTE};
pub use renderer::{ChartError, ChoroplethRenderer};
