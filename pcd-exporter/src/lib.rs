pub mod error;
pub mod job;
pub mod metadata;
pub mod potree;
pub mod verify;

pub use error::ExportError;
pub use job::{CopcToPotree, ExternalHdfConverter, HdfToLas, HdfToPotree, JobReport};
pub use metadata::PotreeMetadata;
pub use potree::{PotreeConverter, PotreeOutput};
pub use verify::{verify, verify_dir, BoundsLimits, BoundsWarning, Verification};
