//! Transport abstractions used for cross-instance delivery.
//!
//! ## Contents
//! - [`PubSub`] fire-and-forget publish/subscribe on named channels
//! - [`RegistrationDirectory`] shared `set name → {channel, ..}` membership store
//! - [`InMemoryPubSub`], [`InMemoryDirectory`] single-process implementations
//!
//! ## How the bus uses them
//! ```text
//! publisher instance                           directory                      receiver instance
//! ──────────────────                           ─────────                      ─────────────────
//!                                   "{name}:registrations:username:bob"
//!                                        = { "{name}:channel:<id-B>" }  ◄── add on first register
//! dispatch(event, {username:bob})
//!   ├─ members(set)  ───────────────────────►
//!   └─ publish("{name}:channel:<id-B>", envelope) ─────────────────────────► consumer task
//! ```
//!
//! ## Rules
//! - Every operation returns [`TransportError`](crate::TransportError); the
//!   dispatcher bounds each call with `Config::publish_timeout`.
//! - `add`/`remove` are idempotent; `members` of an unknown set is empty.
//! - Publishing to a channel without subscribers is not an error.

mod directory;
mod pubsub;

pub use directory::{InMemoryDirectory, RegistrationDirectory};
pub use pubsub::{InMemoryPubSub, MessageStream, PubSub};
