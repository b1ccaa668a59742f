use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;
use crate::traits::Transport;

/// Server address a transport is opened against.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens transports. Supplied by whoever owns the wire implementation.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn Transport>, TransportError>;
}

impl<F> Connector for F
where
    F: Fn(&Endpoint) -> Result<Arc<dyn Transport>, TransportError> + Send + Sync,
{
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn Transport>, TransportError> {
        self(endpoint)
    }
}
