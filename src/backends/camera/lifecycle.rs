// SPDX-License-Identifier: GPL-3.0-only

//! Lifecycle scopes
//!
//! A scope spans the time a screen is shown. Resources bound to it register
//! an end observer and are released when the scope ends, either explicitly
//! through [`LifecycleScope::end`] or when the last handle is dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

type EndObserver = Box<dyn FnOnce() + Send>;

struct ScopeInner {
    id: u64,
    active: AtomicBool,
    observers: Mutex<Vec<EndObserver>>,
}

impl ScopeInner {
    fn end(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }

        let observers = match self.observers.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        debug!(scope = self.id, observers = observers.len(), "Lifecycle scope ended");

        for observer in observers {
            observer();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.end();
    }
}

/// Handle to a lifecycle scope; clones share the same scope
#[derive(Clone)]
pub struct LifecycleScope {
    inner: Arc<ScopeInner>,
}

impl LifecycleScope {
    /// Start a new, active scope
    pub fn new() -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        debug!(scope = id, "Lifecycle scope started");

        Self {
            inner: Arc::new(ScopeInner {
                id,
                active: AtomicBool::new(true),
                observers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// End the scope, running every registered observer once
    pub fn end(&self) {
        self.inner.end();
    }

    /// Register a callback for the end of this scope
    ///
    /// Runs immediately when the scope has already ended.
    pub fn on_end<F>(&self, observer: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if !self.is_active() {
            observer();
            return;
        }

        let mut observers = match self.inner.observers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Re-check under the lock: end() may have drained the list meanwhile
        if self.is_active() {
            observers.push(Box::new(observer));
        } else {
            drop(observers);
            observer();
        }
    }
}

impl Default for LifecycleScope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LifecycleScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleScope")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .finish()
    }
}
