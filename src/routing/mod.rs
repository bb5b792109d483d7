//! Routing: from application keys to transport names.
//!
//! ## Contents
//! - [`RoutingKey`] transport-level projection of a [`RegistrationKey`](crate::RegistrationKey)
//! - [`RoutingKeyResolver`] the reversible mapping between the two
//! - [`EventBusId`] identity of one bus instance
//! - [`NamingStrategy`] channel and directory set names, namespaced by bus name
//!
//! ## Naming
//! ```text
//! bus "keybus", instance 5f0e…, key username:alice
//!   inbound channel  : keybus:channel:5f0e…
//!   directory set    : keybus:registrations:username:alice   → { keybus:channel:5f0e…, … }
//! ```

mod naming;
mod routing_key;

pub use naming::{EventBusId, NamingStrategy};
pub use routing_key::{RoutingKey, RoutingKeyResolver};
