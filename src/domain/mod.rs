pub mod error;
pub mod model;

pub use error::{AcquireError, AppError};
pub use model::{AcquirePhase, AcquisitionOutcome, ItemDescriptor, LocalPackage};
