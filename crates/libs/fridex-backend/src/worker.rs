//! Per-section request and subscription dispatch.
//!
//! A [`SubWorker`] is the only stateful piece of the facade. It resolves the
//! live transport through the shared [`TransportHandle`], forwards data
//! requests, and multiplexes every subscription of its section onto a single
//! transport subscription on the section-wide [`SECTION_PATH`].
//!
//! Locking: `binding` is always taken before `registry`. Inbound dispatch only
//! takes `registry`, and only long enough to snapshot listeners, so listeners
//! may subscribe or unsubscribe from inside a callback and a transport may
//! push from any thread.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};

use fridex_transport::{
    DispatchFn, JsonMap, Path, RequestRecord, RequestType, ResponseFuture, ResponseRecord,
    ReworkFn, Section, SubscriptionId, Transport,
};
use serde_json::Value as JsonValue;
use tokio::sync::watch;

use crate::error::BackendError;
use crate::handle::{TransportHandle, TransportSlot};
use crate::request::build_request;

/// Path carrying the whole-section subscription. Listeners registered on it
/// receive every inbound payload as one map.
pub const SECTION_PATH: Path = Path::Information;

/// Receives inbound values for one path.
pub type Listener = Arc<dyn Fn(&JsonValue) + Send + Sync>;

/// Identifies one registered listener within a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Returned by a subscribe call; needed to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    path: Path,
    listener: ListenerId,
}

impl SubscriptionHandle {
    /// Transport subscription shared by every listener of the section.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> Path {
        self.path
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener
    }
}

struct Binding {
    updates: watch::Receiver<TransportSlot>,
    transport: TransportSlot,
    subscription: Option<SubscriptionId>,
    subscription_request: Option<RequestRecord>,
}

#[derive(Default)]
struct Registry {
    patterns: BTreeMap<Path, ReworkFn>,
    listeners: HashMap<Path, Vec<(ListenerId, Listener)>>,
    next_listener: u64,
}

struct Delivery {
    value: JsonValue,
    listeners: Vec<Listener>,
}

pub struct SubWorker {
    section: Section,
    this: Weak<SubWorker>,
    binding: Mutex<Binding>,
    registry: Mutex<Registry>,
}

impl SubWorker {
    pub fn new(section: Section, handle: &TransportHandle) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            section,
            this: this.clone(),
            binding: Mutex::new(Binding {
                updates: handle.watch(),
                transport: None,
                subscription: None,
                subscription_request: None,
            }),
            registry: Mutex::new(Registry::default()),
        })
    }

    pub fn section(&self) -> Section {
        self.section
    }

    /// The shared transport subscription, if one is open.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        self.binding.lock().expect("binding mutex poisoned").subscription
    }

    pub fn listener_count(&self, path: Path) -> usize {
        self.registry
            .lock()
            .expect("registry mutex poisoned")
            .listeners
            .get(&path)
            .map_or(0, Vec::len)
    }

    /// Record the transport hook for `path`.
    ///
    /// Registered with the transport right away when one is live, otherwise
    /// replayed to every transport this worker binds to later. The transport
    /// runs it; the worker never does.
    pub fn add_pattern(&self, path: Path, rework: ReworkFn) {
        let mut binding = self.binding.lock().expect("binding mutex poisoned");
        let transport = self.resolve(&mut binding);
        self.registry
            .lock()
            .expect("registry mutex poisoned")
            .patterns
            .insert(path, Arc::clone(&rework));
        match transport {
            Some(transport) => transport.register_rework_pattern(self.section, path, rework),
            None => log::trace!("{}: queued {path} rework until connected", self.section),
        }
    }

    /// Resolve the live transport, binding to it first if it is new.
    pub fn check_transport(&self) -> Result<Arc<dyn Transport>, BackendError> {
        let mut binding = self.binding.lock().expect("binding mutex poisoned");
        self.resolve(&mut binding).ok_or(BackendError::TransportNotInitialized)
    }

    /// Pick up a connect or disconnect now. Returns whether a transport is live.
    pub fn sync(&self) -> bool {
        let mut binding = self.binding.lock().expect("binding mutex poisoned");
        self.resolve(&mut binding).is_some()
    }

    /// Forward a request; the transport's future is returned as is.
    pub fn data_request(
        &self,
        path: Path,
        kind: RequestType,
        params: JsonMap,
    ) -> Result<ResponseFuture, BackendError> {
        let transport = self.check_transport()?;
        log::debug!("{}: {kind} {path}", self.section);
        Ok(transport.enqueue_request(build_request(self.section, kind, path, params)))
    }

    /// Register `listener` for `path`, opening the section subscription on
    /// first use.
    pub fn sub_request(
        &self,
        path: Path,
        kind: RequestType,
        params: JsonMap,
        listener: Listener,
    ) -> Result<SubscriptionHandle, BackendError> {
        let mut binding = self.binding.lock().expect("binding mutex poisoned");
        let transport = self.resolve(&mut binding).ok_or(BackendError::TransportNotInitialized)?;

        let listener_id = {
            let mut registry = self.registry.lock().expect("registry mutex poisoned");
            let id = ListenerId(registry.next_listener);
            registry.next_listener += 1;
            registry.listeners.entry(path).or_default().push((id, listener));
            id
        };

        let id = match binding.subscription {
            Some(id) => id,
            None => {
                let request = build_request(self.section, kind, SECTION_PATH, params);
                let id = self.open_subscription(transport.as_ref(), request.clone());
                binding.subscription = Some(id);
                binding.subscription_request = Some(request);
                id
            }
        };
        Ok(SubscriptionHandle { id, path, listener: listener_id })
    }

    /// Remove one listener. The transport subscription is torn down when the
    /// last listener of the section goes. Returns `false` for unknown listeners.
    pub fn unsubscribe(&self, path: Path, listener: ListenerId) -> bool {
        let mut binding = self.binding.lock().expect("binding mutex poisoned");
        let transport = self.resolve(&mut binding);

        let (removed, now_empty) = {
            let mut registry = self.registry.lock().expect("registry mutex poisoned");
            let Some(entries) = registry.listeners.get_mut(&path) else {
                return false;
            };
            let before = entries.len();
            entries.retain(|(id, _)| *id != listener);
            let removed = entries.len() != before;
            if entries.is_empty() {
                registry.listeners.remove(&path);
            }
            (removed, registry.listeners.is_empty())
        };

        if removed && now_empty {
            binding.subscription_request = None;
            if let Some(id) = binding.subscription.take() {
                if let Some(transport) = transport {
                    transport.remove_subscription(id);
                }
                log::debug!("{}: closed subscription {id}", self.section);
            }
        }
        removed
    }

    /// Fan an inbound record out to the listeners registered for its keys.
    ///
    /// `record.data` arrives already reshaped by the transport's hook for
    /// [`SECTION_PATH`]. Keys are visited in payload order; listeners of one
    /// path fire in registration order. Listeners on [`SECTION_PATH`] then
    /// receive the whole payload.
    pub fn work_subscription(&self, record: ResponseRecord) {
        if record.section != self.section {
            log::warn!("{}: ignoring push addressed to {}", self.section, record.section);
            return;
        }

        let deliveries = {
            let registry = self.registry.lock().expect("registry mutex poisoned");
            let mut deliveries = Vec::new();
            for (key, value) in &record.data {
                let path = match key.parse::<Path>() {
                    Ok(path) if path != SECTION_PATH => path,
                    Ok(_) => continue,
                    Err(err) => {
                        log::debug!("{}: skipping push field: {err}", self.section);
                        continue;
                    }
                };
                if let Some(delivery) = registry.delivery(path, value.clone()) {
                    deliveries.push(delivery);
                }
            }
            if let Some(delivery) =
                registry.delivery(SECTION_PATH, JsonValue::Object(record.data.clone()))
            {
                deliveries.push(delivery);
            }
            deliveries
        };

        for Delivery { value, listeners } in deliveries {
            for listener in &listeners {
                listener(&value);
            }
        }
    }

    fn resolve(&self, binding: &mut Binding) -> TransportSlot {
        let changed = binding.updates.has_changed().unwrap_or(false);
        if changed || binding.transport.is_none() {
            let current = binding.updates.borrow_and_update().clone();
            match current {
                Some(transport) => self.bind(binding, transport),
                None => {
                    if binding.transport.take().is_some() {
                        log::debug!("{}: transport gone", self.section);
                    }
                    binding.subscription = None;
                }
            }
        }
        binding.transport.clone()
    }

    fn bind(&self, binding: &mut Binding, transport: Arc<dyn Transport>) {
        let (patterns, listening) = {
            let registry = self.registry.lock().expect("registry mutex poisoned");
            let patterns: Vec<_> = registry
                .patterns
                .iter()
                .map(|(path, rework)| (*path, Arc::clone(rework)))
                .collect();
            (patterns, !registry.listeners.is_empty())
        };
        log::debug!("{}: bound transport, replaying {} pattern(s)", self.section, patterns.len());
        for (path, rework) in patterns {
            transport.register_rework_pattern(self.section, path, rework);
        }

        binding.subscription = None;
        if listening {
            if let Some(request) = binding.subscription_request.clone() {
                binding.subscription = Some(self.open_subscription(transport.as_ref(), request));
            }
        }
        binding.transport = Some(transport);
    }

    fn open_subscription(
        &self,
        transport: &dyn Transport,
        request: RequestRecord,
    ) -> SubscriptionId {
        let worker = self.this.clone();
        let dispatch: DispatchFn = Arc::new(move |record: ResponseRecord| {
            if let Some(worker) = worker.upgrade() {
                worker.work_subscription(record);
            }
        });
        let id = transport.add_subscription(dispatch, request);
        log::debug!("{}: opened subscription {id}", self.section);
        id
    }
}

impl Registry {
    fn delivery(&self, path: Path, value: JsonValue) -> Option<Delivery> {
        let entries = self.listeners.get(&path)?;
        Some(Delivery {
            value,
            listeners: entries.iter().map(|(_, listener)| Arc::clone(listener)).collect(),
        })
    }
}
