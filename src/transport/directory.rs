//! # Registration directory.
//!
//! The directory answers "which bus channels want events for this routing key".
//! Each bus instance adds its inbound channel to the set of every key it has
//! local listeners for, and removes it when the last listener goes away or the
//! bus stops.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

use crate::error::TransportError;

/// Shared `set name → members` store.
#[async_trait]
pub trait RegistrationDirectory: Send + Sync + 'static {
    /// Members of `set`; empty if the set does not exist.
    async fn members(&self, set: &str) -> Result<HashSet<String>, TransportError>;

    /// Adds `member` to `set`. Idempotent.
    async fn add(&self, set: &str, member: &str) -> Result<(), TransportError>;

    /// Removes `member` from `set`. Idempotent.
    async fn remove(&self, set: &str, member: &str) -> Result<(), TransportError>;
}

/// Process-local [`RegistrationDirectory`].
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    sets: DashMap<String, HashSet<String>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-empty sets.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// `true` if no set has members.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

#[async_trait]
impl RegistrationDirectory for InMemoryDirectory {
    async fn members(&self, set: &str) -> Result<HashSet<String>, TransportError> {
        Ok(self
            .sets
            .get(set)
            .map(|members| members.clone())
            .unwrap_or_default())
    }

    async fn add(&self, set: &str, member: &str) -> Result<(), TransportError> {
        self.sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn remove(&self, set: &str, member: &str) -> Result<(), TransportError> {
        if let Some(mut members) = self.sets.get_mut(set) {
            members.remove(member);
        }
        self.sets.remove_if(set, |_, members| members.is_empty());
        Ok(())
    }
}
