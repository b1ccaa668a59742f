//! Client-side facade over a fridex transport.
//!
//! A [`Backend`] exposes the server's sections as typed objects:
//!
//! - [`Connection`]: transport lifecycle, login and logout
//! - [`User`]: profile attributes, registration, password changes
//! - [`Voting`]: section-wide voting information
//!
//! Every readable field is an [`AttributePattern`] supporting `get` and
//! `subscribe`, plus `set` or `add`/`delete` depending on its capability
//! marker. All subscriptions of one section share a single transport
//! subscription, fanned out by that section's [`SubWorker`].
//!
//! The wire protocol lives behind [`fridex_transport::Transport`]; a
//! [`fridex_transport::Connector`] opens one per connect.

mod backend;
pub mod config;
mod connection;
pub mod credentials;
mod error;
mod handle;
pub mod pattern;
mod request;
pub mod user;
pub mod voting;
pub mod worker;

pub use backend::Backend;
pub use config::{BackendConfig, ConfigError, ServerConfig};
pub use connection::Connection;
pub use credentials::password_digest;
pub use error::BackendError;
pub use handle::{TransportHandle, TransportSlot};
pub use pattern::{
    AddDelGet, Attribute, AttributePattern, Capability, Collection, Get, GetSet, Pending, Settable,
};
pub use request::build_request;
pub use user::{User, UserInformation};
pub use voting::{Voting, VotingInformation};
pub use worker::{Listener, ListenerId, SubWorker, SubscriptionHandle, SECTION_PATH};
