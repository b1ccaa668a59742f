use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::TransportError;
use crate::types::{JsonMap, Path, RequestRecord, ResponseRecord, Section, SubscriptionId};

/// Pending response for an enqueued request.
pub type ResponseFuture = BoxFuture<'static, Result<ResponseRecord, TransportError>>;

/// Callback invoked by the transport for every push on a subscription.
pub type DispatchFn = Arc<dyn Fn(ResponseRecord) + Send + Sync>;

/// Reshapes the `data` map of inbound records for one `(section, path)`
/// before they are handed out. The result must stay a map, and running the
/// hook on its own output must not change it.
pub type ReworkFn = Arc<dyn Fn(JsonMap) -> JsonMap + Send + Sync>;

/// A live connection to the server.
///
/// Implementations own framing, the wire protocol and reconnection. None of
/// the methods block; results arrive through the returned future or through
/// the dispatch callback. A transport may invoke dispatch callbacks from any
/// thread, including concurrently.
pub trait Transport: Send + Sync {
    /// Queue a request and return a future resolving to its response.
    fn enqueue_request(&self, request: RequestRecord) -> ResponseFuture;

    /// Register `dispatch` for pushes matching `request`.
    fn add_subscription(&self, dispatch: DispatchFn, request: RequestRecord) -> SubscriptionId;

    /// Drop a subscription. Unknown identifiers are ignored.
    fn remove_subscription(&self, id: SubscriptionId);

    /// Install a reshaping hook for inbound data on `(section, path)`.
    ///
    /// The hook runs over the `data` of every response to a request on that
    /// pair and of every push addressed to it. A later registration for the
    /// same pair replaces the earlier one.
    fn register_rework_pattern(&self, section: Section, path: Path, rework: ReworkFn);

    /// Tear the connection down. Pending futures resolve with
    /// [`TransportError::Closed`].
    fn close(&self);
}
