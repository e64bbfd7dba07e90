pub mod client;
pub mod models;
pub mod probe;
pub mod traits;

pub use client::PortalClient;
pub use models::{AuthMode, PortalConfig};
pub use probe::TcpProbe;
pub use traits::{Connectivity, ItemContent, PortalSource};
