pub mod catalog;
pub mod error;
pub mod report;

pub use catalog::{Catalog, CatalogMetadata, SpatialFilter, TestConfiguration};
pub use error::ReportError;
