//! # Event bus configuration.
//!
//! Provides [`Config`] the settings of one [`EventBus`](crate::EventBus) instance.
//!
//! ## Sentinel values
//! - `execution_rate = 0` → unlimited local listener concurrency
//! - `publish_timeout = 0s` → remote lookups and publishes are not bounded
//!
//! ## TOML
//! ```toml
//! name = "dav"
//! publish_timeout_ms = 2500
//! failure_ignore = true
//! execution_rate = 16
//! max_retries = 5
//!
//! [retry]
//! first_ms = 50
//! max_ms = 1000
//! factor = 2.0
//! jitter = "equal"
//! ```
//! Every field is optional; missing ones keep their default.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::BackoffPolicy;

/// Configuration of one event bus instance.
///
/// ## Field semantics
/// - `name`: namespaces the inbound channel and the directory sets; buses only
///   exchange events with buses of the same name
/// - `publish_timeout`: bound on each directory lookup and each channel publish
/// - `failure_ignore`: log and skip transient transport failures instead of failing the dispatch
/// - `execution_rate`: max concurrent local listener invocations per event (`0` = unlimited)
/// - `retry` / `max_retries`: backoff for registration directory bookkeeping
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over sentinel checks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bus identity used in channel and directory set names.
    pub name: String,

    /// Bound applied separately to every remote lookup and publish.
    #[serde(rename = "publish_timeout_ms", with = "crate::serde_millis")]
    pub publish_timeout: Duration,

    /// Tolerate transient transport failures during the remote phase.
    ///
    /// Only `Timeout` and `Unavailable` are tolerated; other transport errors
    /// always fail the dispatch.
    pub failure_ignore: bool,

    /// Concurrency of the local phase.
    pub execution_rate: usize,

    /// Backoff between registration directory retries.
    pub retry: BackoffPolicy,

    /// Directory retries before a registration is rolled back.
    pub max_retries: u32,
}

impl Config {
    /// Parses a TOML document.
    ///
    /// # Example
    /// ```
    /// use keybus::Config;
    ///
    /// let cfg = Config::from_toml_str("name = \"dav\"\nexecution_rate = 0").unwrap();
    /// assert_eq!(cfg.name, "dav");
    /// assert_eq!(cfg.concurrency_limit(), None);
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(document)?)
    }

    /// Local phase concurrency as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.execution_rate == 0 {
            None
        } else {
            Some(self.execution_rate)
        }
    }

    /// Remote operation bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn remote_timeout(&self) -> Option<Duration> {
        if self.publish_timeout.is_zero() {
            None
        } else {
            Some(self.publish_timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `name = "keybus"`
    /// - `publish_timeout = 10s`
    /// - `failure_ignore = false`
    /// - `execution_rate = 10`
    /// - `retry = BackoffPolicy::default()` (100ms, x2, max 2s, equal jitter)
    /// - `max_retries = 3`
    fn default() -> Self {
        Self {
            name: "keybus".to_string(),
            publish_timeout: Duration::from_secs(10),
            failure_ignore: false,
            execution_rate: 10,
            retry: BackoffPolicy::default(),
            max_retries: 3,
        }
    }
}
