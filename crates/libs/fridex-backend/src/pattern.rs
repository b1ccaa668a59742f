//! Typed attribute patterns.
//!
//! An [`AttributePattern`] binds one `(section, path)` pair of a
//! [`SubWorker`] to a typed value. What the pattern can do is fixed by its
//! capability parameter: every pattern supports get and subscribe, [`GetSet`]
//! adds `set`, and [`AddDelGet`] adds `add` and `delete`.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fridex_transport::{JsonMap, Path, RequestType, ResponseFuture, ReworkFn};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::worker::{Listener, SubWorker, SubscriptionHandle};

/// Future returned by [`AttributePattern::get`].
pub type Pending<T> = BoxFuture<'static, Result<T, BackendError>>;

/// One addressable field of a section.
pub trait Attribute: Send + Sync + 'static {
    const PATH: Path;
    type Value: Send + 'static;

    /// Hook registered with the transport for data on this path. It must
    /// return a map and be idempotent.
    fn normalize(data: JsonMap) -> JsonMap {
        retain_field(Self::PATH, data)
    }

    /// Pick this attribute's raw value out of response data.
    fn extract(mut data: JsonMap) -> Result<JsonValue, BackendError> {
        data.remove(Self::PATH.as_str())
            .ok_or_else(|| BackendError::rework(Self::PATH, "field missing from response"))
    }

    fn decode(value: JsonValue) -> Result<Self::Value, BackendError>;

    /// Turn response data into a typed value.
    fn rework(data: JsonMap) -> Result<Self::Value, BackendError> {
        Self::decode(Self::extract(data)?)
    }
}

/// Narrow `data` down to the `path` field. Idempotent.
pub fn retain_field(path: Path, mut data: JsonMap) -> JsonMap {
    let mut narrowed = JsonMap::new();
    if let Some(value) = data.remove(path.as_str()) {
        narrowed.insert(path.as_str().to_owned(), value);
    }
    narrowed
}

pub trait Capability: Send + Sync + 'static {}

/// Capability: `set` is available.
pub trait Settable: Capability {}

/// Capability: `add` and `delete` are available.
pub trait Collection: Capability {}

/// Get and subscribe only.
pub enum Get {}

/// Get, subscribe and set.
pub enum GetSet {}

/// Get, subscribe, add and delete.
pub enum AddDelGet {}

impl Capability for Get {}
impl Capability for GetSet {}
impl Capability for AddDelGet {}
impl Settable for GetSet {}
impl Collection for AddDelGet {}

pub struct AttributePattern<A, C = Get> {
    worker: Arc<SubWorker>,
    _marker: PhantomData<fn() -> (A, C)>,
}

impl<A: Attribute, C: Capability> AttributePattern<A, C> {
    /// Bind the pattern to `worker` and register its transport hook.
    pub fn new(worker: Arc<SubWorker>) -> Self {
        let hook: ReworkFn = Arc::new(A::normalize);
        worker.add_pattern(A::PATH, hook);
        Self { worker, _marker: PhantomData }
    }

    pub fn path(&self) -> Path {
        A::PATH
    }

    pub fn get(&self) -> Result<Pending<A::Value>, BackendError> {
        self.get_with(JsonMap::new())
    }

    /// `get` with extra request parameters.
    pub fn get_with(&self, params: JsonMap) -> Result<Pending<A::Value>, BackendError> {
        let response = self.worker.data_request(A::PATH, RequestType::Get, params)?;
        Ok(async move {
            let record = response.await?;
            A::rework(record.data)
        }
        .boxed())
    }

    /// Call `callback` with every pushed value of this attribute.
    ///
    /// Pushes that do not decode are logged and dropped.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionHandle, BackendError>
    where
        F: Fn(A::Value) + Send + Sync + 'static,
    {
        self.subscribe_with(JsonMap::new(), callback)
    }

    /// `subscribe` with extra request parameters.
    ///
    /// The section shares one transport subscription, so `params` only reach
    /// the server when this call opens it.
    pub fn subscribe_with<F>(
        &self,
        params: JsonMap,
        callback: F,
    ) -> Result<SubscriptionHandle, BackendError>
    where
        F: Fn(A::Value) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(move |value: &JsonValue| {
            match A::decode(value.clone()) {
                Ok(value) => callback(value),
                Err(err) => log::warn!("dropping {} update: {err}", A::PATH),
            }
        });
        self.worker.sub_request(A::PATH, RequestType::Subscribe, params, listener)
    }

    /// Like [`subscribe`](Self::subscribe), delivering into a channel instead.
    pub fn watch(
        &self,
    ) -> Result<(SubscriptionHandle, mpsc::UnboundedReceiver<A::Value>), BackendError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.subscribe(move |value| {
            if tx.send(value).is_err() {
                log::trace!("{} watcher dropped its receiver", A::PATH);
            }
        })?;
        Ok((handle, rx))
    }

    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        if handle.path() != A::PATH {
            return false;
        }
        self.worker.unsubscribe(handle.path(), handle.listener_id())
    }

    fn send(&self, kind: RequestType, value: JsonValue) -> Result<ResponseFuture, BackendError> {
        let mut params = JsonMap::new();
        params.insert(A::PATH.as_str().to_owned(), value);
        self.worker.data_request(A::PATH, kind, params)
    }
}

impl<A: Attribute, C: Settable> AttributePattern<A, C> {
    pub fn set(&self, value: impl Into<JsonValue>) -> Result<ResponseFuture, BackendError> {
        self.send(RequestType::Set, value.into())
    }
}

impl<A: Attribute, C: Collection> AttributePattern<A, C> {
    pub fn add(&self, value: impl Into<JsonValue>) -> Result<ResponseFuture, BackendError> {
        self.send(RequestType::Add, value.into())
    }

    pub fn delete(&self, value: impl Into<JsonValue>) -> Result<ResponseFuture, BackendError> {
        self.send(RequestType::Delete, value.into())
    }
}

impl<A: Attribute, C> fmt::Debug for AttributePattern<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributePattern")
            .field("section", &self.worker.section())
            .field("path", &A::PATH)
            .finish()
    }
}

// ── Decoding helpers ──────────────────────────────────────────────────────────

pub(crate) fn decode_string(path: Path, value: JsonValue) -> Result<String, BackendError> {
    match value {
        JsonValue::String(s) => Ok(s),
        other => Err(BackendError::rework(path, format!("expected a string, got {other}"))),
    }
}

pub(crate) fn decode_i64(path: Path, value: JsonValue) -> Result<i64, BackendError> {
    value
        .as_i64()
        .ok_or_else(|| BackendError::rework(path, format!("expected an integer, got {value}")))
}

pub(crate) fn decode_map(path: Path, value: JsonValue) -> Result<JsonMap, BackendError> {
    match value {
        JsonValue::Object(map) => Ok(map),
        other => Err(BackendError::rework(path, format!("expected an object, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::TransportHandle;
    use fridex_transport::{MemoryTransport, ResponseRecord, Section, Transport, TransportError};
    use serde_json::json;
    use std::sync::Mutex;

    struct Tags;

    impl Attribute for Tags {
        const PATH: Path = Path::Name;
        type Value = String;

        fn decode(value: JsonValue) -> Result<String, BackendError> {
            decode_string(Self::PATH, value)
        }
    }

    struct Votes;

    impl Attribute for Votes {
        const PATH: Path = Path::DoubleVotes;
        type Value = i64;

        fn decode(value: JsonValue) -> Result<i64, BackendError> {
            decode_i64(Self::PATH, value)
        }
    }

    fn echo_responder() -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::with_responder(Arc::new(
            |req: &fridex_transport::RequestRecord| -> Result<JsonMap, TransportError> {
                match req.path {
                    Path::Name => Ok(json!({"name": "Bob", "double_votes": 3})
                        .as_object()
                        .cloned()
                        .unwrap_or_default()),
                    Path::DoubleVotes => Ok(json!({"double_votes": "three"})
                        .as_object()
                        .cloned()
                        .unwrap_or_default()),
                    _ => Err(TransportError::rejected("unsupported")),
                }
            },
        )))
    }

    fn bound(transport: Arc<MemoryTransport>) -> Arc<SubWorker> {
        let handle = TransportHandle::new();
        handle.replace(Some(transport));
        SubWorker::new(Section::User, &handle)
    }

    fn object(value: JsonValue) -> JsonMap {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn normalize_keeps_only_the_field_and_is_idempotent() {
        let once = Tags::normalize(object(json!({"name": "Bob", "double_votes": 3})));
        assert_eq!(once, object(json!({"name": "Bob"})));
        assert_eq!(Tags::normalize(once.clone()), once);
        assert!(Tags::normalize(object(json!({"other": 1}))).is_empty());
    }

    #[tokio::test]
    async fn get_decodes_data_narrowed_by_the_transport_hook() {
        let transport = echo_responder();
        let worker = bound(transport.clone());
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(worker);

        let narrowed = transport.apply_pattern(
            Section::User,
            Path::Name,
            object(json!({"name": "Bob", "double_votes": 3})),
        );
        assert_eq!(narrowed, object(json!({"name": "Bob"})));

        let value = name.get().expect("request").await.expect("response");
        assert_eq!(value, "Bob");
    }

    #[tokio::test]
    async fn get_reports_shape_mismatches() {
        let worker = bound(echo_responder());
        let votes: AttributePattern<Votes> = AttributePattern::new(worker);
        let err = votes.get().expect("request").await.expect_err("not an integer");
        assert!(matches!(err, BackendError::Rework { path: Path::DoubleVotes, .. }));
    }

    #[test]
    fn rework_reports_a_missing_field() {
        let err = Tags::rework(object(json!({"double_votes": 1}))).expect_err("no name");
        assert_eq!(err, BackendError::rework(Path::Name, "field missing from response"));
    }

    #[tokio::test]
    async fn transport_failures_pass_through() {
        let transport = echo_responder();
        transport.close();
        let worker = bound(transport);
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(worker);
        let err = name.get().expect("request").await.expect_err("closed");
        assert_eq!(err, BackendError::Transport(TransportError::Closed));
    }

    #[test]
    fn subscribe_with_forwards_params_when_opening_the_subscription() {
        let transport = Arc::new(MemoryTransport::new());
        let worker = bound(transport.clone());
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(Arc::clone(&worker));
        let votes: AttributePattern<Votes> = AttributePattern::new(worker);

        name.subscribe_with(object(json!({"since": 5})), |_| {}).expect("subscribe");
        votes.subscribe_with(object(json!({"since": 9})), |_| {}).expect("subscribe");

        let subscriptions = transport.subscriptions();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].1.kind, RequestType::Subscribe);
        assert_eq!(subscriptions[0].1.params, object(json!({"since": 5})));
    }

    #[tokio::test]
    async fn set_add_and_delete_wrap_the_value_under_the_path() {
        let transport = Arc::new(MemoryTransport::new());
        let worker = bound(transport.clone());
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(Arc::clone(&worker));
        let votes: AttributePattern<Votes, AddDelGet> = AttributePattern::new(worker);

        name.set("Alice").expect("set").await.expect("set response");
        votes.add(2).expect("add").await.expect("add response");
        votes.delete(1).expect("delete").await.expect("delete response");

        let sent: Vec<_> = transport
            .requests()
            .into_iter()
            .map(|req| (req.kind, req.path, JsonValue::Object(req.params)))
            .collect();
        assert_eq!(
            sent,
            vec![
                (RequestType::Set, Path::Name, json!({"name": "Alice"})),
                (RequestType::Add, Path::DoubleVotes, json!({"double_votes": 2})),
                (RequestType::Delete, Path::DoubleVotes, json!({"double_votes": 1})),
            ]
        );
    }

    #[test]
    fn subscribe_drops_pushes_that_do_not_decode() {
        let transport = Arc::new(MemoryTransport::new());
        let worker = bound(transport.clone());
        let votes: AttributePattern<Votes> = AttributePattern::new(worker);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = votes
            .subscribe(move |value| sink.lock().expect("seen mutex poisoned").push(value))
            .expect("subscribe");

        for payload in [json!({"double_votes": "x"}), json!({"double_votes": 7})] {
            let record = ResponseRecord::new(Section::User, Path::Information, object(payload));
            transport.push(handle.id(), record);
        }
        assert_eq!(*seen.lock().expect("seen mutex poisoned"), vec![7]);
        assert!(votes.unsubscribe(&handle));
        assert!(!votes.unsubscribe(&handle));
    }

    #[tokio::test]
    async fn watch_delivers_into_a_channel() {
        let transport = Arc::new(MemoryTransport::new());
        let worker = bound(transport.clone());
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(worker);
        let (handle, mut rx) = name.watch().expect("watch");

        let data = object(json!({"name": "Carol"}));
        assert_eq!(transport.push_section(Section::User, data), 1);
        assert_eq!(rx.recv().await.as_deref(), Some("Carol"));

        assert!(name.unsubscribe(&handle));
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn unsubscribe_rejects_handles_for_other_paths() {
        let transport = Arc::new(MemoryTransport::new());
        let worker = bound(transport);
        let name: AttributePattern<Tags, GetSet> = AttributePattern::new(Arc::clone(&worker));
        let votes: AttributePattern<Votes> = AttributePattern::new(worker);
        let handle = name.subscribe(|_| {}).expect("subscribe");
        assert!(!votes.unsubscribe(&handle));
        assert!(name.unsubscribe(&handle));
    }
}
