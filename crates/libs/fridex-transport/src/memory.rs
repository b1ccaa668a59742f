use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{self, FutureExt};

use crate::error::TransportError;
use crate::traits::{Connector, DispatchFn, Endpoint, ResponseFuture, ReworkFn, Transport};
use crate::types::*;

/// Computes the `data` of the response for a request.
pub type Responder = Arc<dyn Fn(&RequestRecord) -> Result<JsonMap, TransportError> + Send + Sync>;

fn empty_response(_request: &RequestRecord) -> Result<JsonMap, TransportError> {
    Ok(JsonMap::new())
}

struct MemorySubscription {
    dispatch: DispatchFn,
    request: RequestRecord,
}

/// An in-process transport that never touches the network.
///
/// Every request is recorded and answered synchronously by the responder
/// (an empty `data` map by default). Pushes are injected with
/// [`MemoryTransport::push`] or [`MemoryTransport::push_section`]. Registered
/// rework patterns run over response and push data the way a wire transport
/// runs them.
pub struct MemoryTransport {
    responder: Responder,
    requests: Mutex<Vec<RequestRecord>>,
    subscriptions: Mutex<BTreeMap<SubscriptionId, MemorySubscription>>,
    removed: Mutex<Vec<SubscriptionId>>,
    patterns: Mutex<HashMap<(Section, Path), ReworkFn>>,
    next_subscription_id: AtomicU64,
    closed: AtomicBool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::with_responder(Arc::new(empty_response))
    }

    pub fn with_responder(responder: Responder) -> Self {
        Self {
            responder,
            requests: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(BTreeMap::new()),
            removed: Mutex::new(Vec::new()),
            patterns: Mutex::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Requests enqueued so far, in call order.
    pub fn requests(&self) -> Vec<RequestRecord> {
        self.requests.lock().expect("requests mutex poisoned").clone()
    }

    /// Active subscriptions with the request each was registered for.
    pub fn subscriptions(&self) -> Vec<(SubscriptionId, RequestRecord)> {
        self.subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .iter()
            .map(|(id, sub)| (*id, sub.request.clone()))
            .collect()
    }

    /// Identifiers passed to `remove_subscription`, in call order.
    pub fn removed_subscriptions(&self) -> Vec<SubscriptionId> {
        self.removed.lock().expect("removed mutex poisoned").clone()
    }

    /// `(section, path)` pairs with a registered rework pattern, sorted.
    pub fn registered_patterns(&self) -> Vec<(Section, Path)> {
        let mut keys: Vec<_> =
            self.patterns.lock().expect("patterns mutex poisoned").keys().copied().collect();
        keys.sort();
        keys
    }

    /// Run the rework pattern registered for `(section, path)` over `data`.
    /// Data for unregistered pairs comes back as is.
    pub fn apply_pattern(&self, section: Section, path: Path, data: JsonMap) -> JsonMap {
        let rework =
            self.patterns.lock().expect("patterns mutex poisoned").get(&(section, path)).cloned();
        match rework {
            Some(rework) => rework(data),
            None => data,
        }
    }

    fn rework(&self, record: ResponseRecord) -> ResponseRecord {
        let data = self.apply_pattern(record.section, record.path, record.data);
        ResponseRecord { data, ..record }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Deliver `record` to one subscription. Returns `false` if `id` is not active.
    pub fn push(&self, id: SubscriptionId, record: ResponseRecord) -> bool {
        let dispatch = self
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .get(&id)
            .map(|sub| Arc::clone(&sub.dispatch));
        match dispatch {
            Some(dispatch) => {
                dispatch(self.rework(record));
                true
            }
            None => false,
        }
    }

    /// Deliver `data` to every subscription on `section`, addressed to the
    /// section-wide `information` path. Returns the number of deliveries.
    pub fn push_section(&self, section: Section, data: JsonMap) -> usize {
        let targets: Vec<DispatchFn> = self
            .subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .values()
            .filter(|sub| sub.request.section == section)
            .map(|sub| Arc::clone(&sub.dispatch))
            .collect();
        let record = self.rework(ResponseRecord::new(section, Path::Information, data));
        for dispatch in &targets {
            dispatch(record.clone());
        }
        targets.len()
    }
}

impl Transport for MemoryTransport {
    fn enqueue_request(&self, request: RequestRecord) -> ResponseFuture {
        if self.is_closed() {
            return future::ready(Err(TransportError::Closed)).boxed();
        }
        log::trace!("memory transport: {} {}/{}", request.kind, request.section, request.path);
        let result = (self.responder)(&request)
            .map(|data| self.rework(ResponseRecord::new(request.section, request.path, data)));
        self.requests.lock().expect("requests mutex poisoned").push(request);
        future::ready(result).boxed()
    }

    fn add_subscription(&self, dispatch: DispatchFn, request: RequestRecord) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions
            .lock()
            .expect("subscriptions mutex poisoned")
            .insert(id, MemorySubscription { dispatch, request });
        id
    }

    fn remove_subscription(&self, id: SubscriptionId) {
        self.removed.lock().expect("removed mutex poisoned").push(id);
        self.subscriptions.lock().expect("subscriptions mutex poisoned").remove(&id);
    }

    fn register_rework_pattern(&self, section: Section, path: Path, rework: ReworkFn) {
        self.patterns.lock().expect("patterns mutex poisoned").insert((section, path), rework);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.subscriptions.lock().expect("subscriptions mutex poisoned").clear();
    }
}

/// Hands out a fresh [`MemoryTransport`] per connect and keeps every one of
/// them reachable for inspection.
pub struct MemoryConnector {
    responder: Responder,
    refuse: AtomicBool,
    opened: Mutex<Vec<(Endpoint, Arc<MemoryTransport>)>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_responder(Arc::new(empty_response))
    }

    pub fn with_responder(responder: Responder) -> Self {
        Self { responder, refuse: AtomicBool::new(false), opened: Mutex::new(Vec::new()) }
    }

    /// Make subsequent connects fail with [`TransportError::ConnectFailed`].
    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Release);
    }

    /// The most recently opened transport.
    pub fn latest(&self) -> Option<Arc<MemoryTransport>> {
        self.opened
            .lock()
            .expect("opened mutex poisoned")
            .last()
            .map(|(_, transport)| Arc::clone(transport))
    }

    /// Endpoints connected to so far, in order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.opened
            .lock()
            .expect("opened mutex poisoned")
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn Transport>, TransportError> {
        if self.refuse.load(Ordering::Acquire) {
            return Err(TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_owned(),
            });
        }
        let transport = Arc::new(MemoryTransport::with_responder(Arc::clone(&self.responder)));
        self.opened
            .lock()
            .expect("opened mutex poisoned")
            .push((endpoint.clone(), Arc::clone(&transport)));
        Ok(transport)
    }
}
