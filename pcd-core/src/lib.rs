pub mod crs;
pub mod pointcloud;
pub mod tool;

pub use tool::{ToolError, ToolLocator};
