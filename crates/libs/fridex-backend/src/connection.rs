use std::sync::{Arc, Mutex, Weak};

use fridex_transport::{Connector, Endpoint, JsonMap, Path, RequestType, ResponseFuture, Section};
use serde_json::json;

use crate::config::ServerConfig;
use crate::credentials::password_digest;
use crate::error::BackendError;
use crate::handle::TransportHandle;
use crate::request::params;
use crate::worker::SubWorker;

/// The `connection` section: session management and the transport lifecycle.
///
/// This is the only place the shared [`TransportHandle`] is written. After
/// every connect or disconnect the section workers attached here are synced
/// so they replay their patterns and subscriptions right away instead of on
/// their next request.
pub struct Connection {
    worker: Arc<SubWorker>,
    handle: TransportHandle,
    connector: Arc<dyn Connector>,
    dependents: Mutex<Vec<Weak<SubWorker>>>,
}

impl Connection {
    pub fn new(handle: &TransportHandle, connector: Arc<dyn Connector>) -> Self {
        let worker = SubWorker::new(Section::Connection, handle);
        Self {
            dependents: Mutex::new(vec![Arc::downgrade(&worker)]),
            worker,
            handle: handle.clone(),
            connector,
        }
    }

    /// Sync `worker` on every transport change.
    pub(crate) fn attach(&self, worker: &Arc<SubWorker>) {
        self.dependents.lock().expect("dependents mutex poisoned").push(Arc::downgrade(worker));
    }

    /// Open a transport to `host:port` and make it the live one.
    ///
    /// The previous transport, if any, is closed only once the new one is up.
    pub fn connect(&self, host: &str, port: u16) -> Result<(), BackendError> {
        let endpoint = Endpoint::new(host, port);
        let transport = self.connector.connect(&endpoint)?;
        log::info!("connected to {endpoint}");
        if let Some(previous) = self.handle.replace(Some(transport)) {
            log::debug!("closing previous transport");
            previous.close();
        }
        self.sync_dependents();
        Ok(())
    }

    pub fn connect_with(&self, server: &ServerConfig) -> Result<(), BackendError> {
        self.connect(&server.host, server.port)
    }

    /// Close and forget the live transport. Returns `false` if there was none.
    pub fn disconnect(&self) -> bool {
        let Some(previous) = self.handle.replace(None) else {
            return false;
        };
        previous.close();
        log::info!("disconnected");
        self.sync_dependents();
        true
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Log in as `name`.
    ///
    /// `password` is sent as its [`password_digest`], the same value
    /// `User::register` stores, never in clear text.
    pub fn login(&self, name: &str, password: &str) -> Result<ResponseFuture, BackendError> {
        log::debug!("logging in as {name}");
        self.worker.data_request(
            Path::Login,
            RequestType::Set,
            params(json!({"name": name, "password": password_digest(password)})),
        )
    }

    pub fn logout(&self) -> Result<ResponseFuture, BackendError> {
        self.worker.data_request(Path::Logout, RequestType::Set, JsonMap::new())
    }

    fn sync_dependents(&self) {
        let mut dependents = self.dependents.lock().expect("dependents mutex poisoned");
        dependents.retain(|worker| match worker.upgrade() {
            Some(worker) => {
                worker.sync();
                true
            }
            None => false,
        });
    }
}
