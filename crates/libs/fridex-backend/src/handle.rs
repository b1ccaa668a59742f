use std::sync::Arc;

use fridex_transport::Transport;
use tokio::sync::watch;

/// Value published on every connect and disconnect.
pub type TransportSlot = Option<Arc<dyn Transport>>;

/// Shared, observable reference to the live transport.
///
/// Cloning is cheap and every clone sees the same slot. Section workers and
/// outside observers hold a [`watch::Receiver`] and learn about changes
/// without being rebuilt.
#[derive(Clone)]
pub struct TransportHandle {
    slot: Arc<watch::Sender<TransportSlot>>,
}

impl Default for TransportHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportHandle {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot: Arc::new(slot) }
    }

    /// The live transport, if connected.
    pub fn current(&self) -> TransportSlot {
        self.slot.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Receiver that is marked changed whenever the slot is replaced.
    pub fn watch(&self) -> watch::Receiver<TransportSlot> {
        self.slot.subscribe()
    }

    /// Publish `transport` and return what it replaced.
    pub(crate) fn replace(&self, transport: TransportSlot) -> TransportSlot {
        self.slot.send_replace(transport)
    }
}

impl std::fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportHandle").field("connected", &self.is_connected()).finish()
    }
}
