//! Geography module - county boundaries and the join onto denial rates

mod joiner;
mod loader;

pub use joiner::{normalize_county_code, EnrichedCounty, GeoJoinError, GeoJoinResult, GeoJoiner};
pub use loader::{CountyGeometry, GeoError, GeoLoader};
