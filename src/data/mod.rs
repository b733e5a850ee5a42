//! Data module - loan file loading, projection and recoding

mod loader;
pub mod model;
mod recoder;

pub use loader::{LoanLoader, LoaderError, ProjectedLoans};
pub use model::{ActionTaken, CountyAggregate, CountyComparison, Ethnicity, LoanRecord};
pub use recoder::{RecodeError, Recoder};
