//! Request-scoped value sharing.
//!
//! Handler stages of one HTTP request share values (notably the store
//! session) through a [`RequestContextStore`] keyed by the request's
//! [`RequestId`]. The id travels in the request's extensions; the entry lives
//! from registration until the request finishes.

use crate::error::{AudiubeError, Result};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Key under which the request's store session is kept.
pub const STORE_HANDLE_KEY: &str = "store";

/// Identity of one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Values = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Concurrency-safe map from request id to named values.
#[derive(Default)]
pub struct RequestContextStore {
    entries: RwLock<HashMap<RequestId, Values>>,
}

impl RequestContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a request. Registering the same id twice is an error.
    pub fn register(&self, id: RequestId) -> Result<()> {
        let mut entries = self.write();
        if entries.contains_key(&id) {
            return Err(AudiubeError::DuplicateRegistration(id.to_string()));
        }
        entries.insert(id, HashMap::new());
        Ok(())
    }

    /// Drop every value of a request. Returns whether it was registered.
    pub fn deregister(&self, id: RequestId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Value stored under `key` for the request.
    ///
    /// Unregistered requests, absent keys and values of another type all read
    /// as `None`.
    pub fn get<T>(&self, id: RequestId, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.read()
            .get(&id)?
            .get(key)?
            .downcast_ref::<T>()
            .cloned()
    }

    /// Store a value for the request, registering it if needed.
    pub fn set<T>(&self, id: RequestId, key: &str, value: T)
    where
        T: Any + Send + Sync,
    {
        self.write()
            .entry(id)
            .or_default()
            .insert(key.to_string(), Box::new(value));
    }

    pub fn is_registered(&self, id: RequestId) -> bool {
        self.read().contains_key(&id)
    }

    /// Number of requests currently tracked.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `id` and return a guard that deregisters it when dropped.
    pub fn scope(self: &Arc<Self>, id: RequestId) -> Result<ContextScope> {
        self.register(id)?;
        Ok(ContextScope {
            store: Arc::clone(self),
            id,
        })
    }

    // A panic while holding the lock cannot leave the map half-updated, so a
    // poisoned lock is still usable.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<RequestId, Values>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<RequestId, Values>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registration bound to a lexical scope.
pub struct ContextScope {
    store: Arc<RequestContextStore>,
    id: RequestId,
}

impl ContextScope {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        self.store.deregister(self.id);
    }
}
