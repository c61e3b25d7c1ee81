pub mod band;
pub mod tiler;

pub use band::{LatitudeBand, LATITUDE_BANDS};
pub use tiler::{LatitudeTiler, TileOutcome, TilerError, TilingReport};
