//! One write lock per collection name.
//!
//! Locks are created lazily and live as long as the store. Writers to
//! different collections never block each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use wcm_core::error::{Result, WcmError};

#[derive(Debug, Default)]
pub struct CollectionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CollectionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding `collection`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] if the lock table is poisoned.
    pub fn get_lock(&self, collection: &str) -> Result<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| WcmError::Lock(format!("lock table poisoned: {e}")))?;
        Ok(locks
            .entry(collection.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Run `f` while holding the lock for `collection`.
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] if the lock is poisoned, otherwise
    /// whatever `f` returns.
    pub fn with_lock<R>(&self, collection: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let lock = self.get_lock(collection)?;
        let _guard = lock
            .lock()
            .map_err(|_| WcmError::Lock(format!("lock for '{collection}' poisoned")))?;
        f()
    }
}
