#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use fridex_backend::Backend;
use fridex_transport::{JsonMap, MemoryConnector, MemoryTransport};
use serde_json::Value as JsonValue;

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .is_test(true)
            .try_init();
    });
}

pub fn backend() -> (Backend, Arc<MemoryConnector>) {
    setup();
    let connector = Arc::new(MemoryConnector::new());
    (Backend::new(connector.clone()), connector)
}

pub fn connected() -> (Backend, Arc<MemoryConnector>, Arc<MemoryTransport>) {
    let (backend, connector) = backend();
    backend.connection().connect("127.0.0.1", 3849).expect("connect");
    let transport = connector.latest().expect("transport");
    (backend, connector, transport)
}

pub fn object(value: JsonValue) -> JsonMap {
    match value {
        JsonValue::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Shared, ordered record of callback invocations.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("calls mutex poisoned").push(entry.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().expect("calls mutex poisoned"))
    }
}
