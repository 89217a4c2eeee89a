//! Listener registry keyed by event name.
//!
//! Listeners for one event are kept in registration order. The same
//! callback handle registered twice under one event is stored once, and
//! removal by id is idempotent. Dispatch snapshots the listener list before
//! invoking anything, so callbacks may register or remove listeners
//! (including themselves) while being called.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use cryptek_common::ListenerId;
use tracing::{debug, error};

/// A registered callback. Receives the event payload.
pub type Listener = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Mapping from event name to an ordered collection of listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: RwLock<HashMap<String, Vec<(ListenerId, Listener)>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `event`.
    ///
    /// If this exact handle is already registered for `event`, the existing
    /// id is returned and nothing is added.
    pub fn on(&self, event: &str, listener: Listener) -> ListenerId {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entries = map.entry(event.to_string()).or_default();
        if let Some((id, _)) = entries.iter().find(|(_, l)| Arc::ptr_eq(l, &listener)) {
            return *id;
        }
        let id = ListenerId::next();
        entries.push((id, listener));
        debug!(event = %event, listener = %id, "listener registered");
        id
    }

    /// Remove a listener. Returns whether anything was removed.
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = map.get_mut(event) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            map.remove(event);
        }
        removed
    }

    /// Invoke every listener registered for `event` with `payload`.
    ///
    /// A panicking listener is logged and skipped; the others still run.
    /// Returns the number of listeners that completed normally.
    pub fn emit(&self, event: &str, payload: &serde_json::Value) -> usize {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            match map.get(event) {
                Some(entries) => entries.clone(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for (id, listener) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    error!(
                        event = %event,
                        listener = %id,
                        panic = %panic_message(panic.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        delivered
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
