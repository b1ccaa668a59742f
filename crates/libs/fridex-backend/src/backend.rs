use std::sync::Arc;

use fridex_transport::{Connector, Transport};
use tokio::sync::watch;

use crate::config::BackendConfig;
use crate::connection::Connection;
use crate::error::BackendError;
use crate::handle::{TransportHandle, TransportSlot};
use crate::user::User;
use crate::voting::Voting;

/// Entry point of the facade: one instance per server session.
///
/// All section interfaces share one [`TransportHandle`], so they can be used
/// before the first connect and keep working across reconnects.
pub struct Backend {
    handle: TransportHandle,
    connection: Connection,
    user: User,
    voting: Voting,
}

impl Backend {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let handle = TransportHandle::new();
        let connection = Connection::new(&handle, connector);
        let user = User::new(&handle);
        let voting = Voting::new(&handle);
        connection.attach(user.worker());
        connection.attach(voting.worker());
        Self { handle, connection, user, voting }
    }

    /// Build a backend and connect right away when `auto_connect` is set.
    pub fn from_config(
        connector: Arc<dyn Connector>,
        config: &BackendConfig,
    ) -> Result<Self, BackendError> {
        let backend = Self::new(connector);
        if config.auto_connect {
            backend.connection.connect_with(&config.server)?;
        }
        Ok(backend)
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn voting(&self) -> &Voting {
        &self.voting
    }

    /// The live transport, if connected.
    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.handle.current()
    }

    /// Observe connects and disconnects.
    pub fn watch_transport(&self) -> watch::Receiver<TransportSlot> {
        self.handle.watch()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("handle", &self.handle).finish_non_exhaustive()
    }
}
