pub mod builder;
pub mod error;
pub mod pipeline;
pub mod precision;
pub mod runner;
pub mod stage;

pub use builder::PipelineBuilder;
pub use error::PipelineError;
pub use pipeline::Pipeline;
pub use precision::{Offset, Precision};
pub use runner::{pdal_locator, InvocationMode, PdalRunner, RunOutput, Runner};
pub use stage::{Stage, StageKind, WriterOptions};
