//! Retry policies for registration directory bookkeeping.
//!
//! Advertising (or withdrawing) a bus channel in the registration directory is
//! retried when the directory reports a transient failure. This module holds the
//! knobs that decide **how long** to wait between attempts.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy so bus instances do not retry in lockstep
//!
//! ## Quick wiring
//! ```text
//! Config { retry: BackoffPolicy, max_retries: u32, .. }
//!      └─► core::handler::KeyRegistrationHandler uses:
//!           - retry.next(attempt) to schedule the next directory attempt
//!           - max_retries to give up and roll the registration back
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=2s, jitter=Equal.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
