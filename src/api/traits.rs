//! Seams between the acquisition flow and the outside world.
//!
//! The flow only sees these traits, so tests can drive it without a network.

use std::future::Future;

use bytes::Bytes;
use futures::stream::BoxStream;

use super::client::Result;
use crate::domain::ItemDescriptor;

/// Byte stream of a portal item's data
pub type ContentStream = BoxStream<'static, Result<Bytes>>;

/// An item's data: the announced length (if the portal sent one) and the bytes.
pub struct ItemContent {
    pub length: Option<u64>,
    pub stream: ContentStream,
}

/// Source of the package's metadata and content.
pub trait PortalSource: Send + Sync {
    /// Fetch the item descriptor, fresh on every call.
    fn fetch_item(&self) -> impl Future<Output = Result<ItemDescriptor>> + Send;

    /// Open the item's data for streaming.
    fn fetch_content(&self) -> impl Future<Output = Result<ItemContent>> + Send;
}

/// Answers whether the portal can be reached at all.
pub trait Connectivity: Send + Sync {
    fn is_reachable(&self) -> impl Future<Output = bool> + Send;
}
