pub mod confirm;
pub mod discover;
pub mod driver;
pub mod error;

pub use confirm::confirm;
pub use discover::{discover, COPC_SUFFIX};
pub use driver::{job_name, BatchDriver, BatchSummary};
pub use error::BatchError;
