//! Transport boundary for the fridex backend.
//!
//! The backend facade never speaks the wire protocol itself. This crate pins
//! down what it needs from whoever does:
//!
//! - **Records**: [`RequestRecord`] and [`ResponseRecord`] addressed by
//!   [`Section`] and [`Path`]
//! - **[`Transport`]**: enqueue a request, manage push subscriptions,
//!   register rework hooks, close
//! - **[`Connector`]**: open a transport for an [`Endpoint`]
//! - **[`MemoryTransport`]** / **[`MemoryConnector`]**: in-process
//!   implementations for tests and local wiring

pub mod error;
pub mod traits;
pub mod types;

pub use error::TransportError;
pub use traits::{Connector, DispatchFn, Endpoint, ResponseFuture, ReworkFn, Transport};
pub use types::*;

mod memory;
pub use memory::{MemoryConnector, MemoryTransport, Responder};
