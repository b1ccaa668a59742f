mod connector;
mod transport;

pub use connector::{Connector, Endpoint};
pub use transport::{DispatchFn, ResponseFuture, ReworkFn, Transport};
