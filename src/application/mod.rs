pub mod acquisition;
pub mod context;

pub use acquisition::{AcquireEvent, AcquireUpdate};
pub use context::AppContext;
