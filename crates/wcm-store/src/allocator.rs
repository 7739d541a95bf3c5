//! Per-collection id allocation.
//!
//! The next id is `max(last issued + 1, largest id on disk + 1)`, so ids only
//! grow and rows added to a file by hand are never handed out again. Callers
//! hold the collection lock while allocating.

use std::collections::HashMap;
use std::sync::Mutex;

use wcm_core::error::{Result, WcmError};

#[derive(Debug, Default)]
pub struct IdAllocator {
    last_issued: Mutex<HashMap<String, u32>>,
}

impl IdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next id for `collection` given the largest id currently
    /// stored in it (`0` when empty).
    ///
    /// # Errors
    ///
    /// Returns [`WcmError::Lock`] on a poisoned table and
    /// [`WcmError::InvalidArgument`] when the id space is exhausted.
    pub fn next_id(&self, collection: &str, max_existing: u32) -> Result<u32> {
        let mut last_issued = self
            .last_issued
            .lock()
            .map_err(|e| WcmError::Lock(format!("id allocator poisoned: {e}")))?;
        let last = last_issued.get(collection).copied().unwrap_or(0);
        let next = last
            .max(max_existing)
            .checked_add(1)
            .ok_or_else(|| WcmError::InvalidArgument(format!("no ids left in '{collection}'")))?;
        last_issued.insert(collection.to_string(), next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_id_is_one() {
        assert_eq!(IdAllocator::new().next_id("tours", 0).unwrap(), 1);
    }

    #[test]
    fn never_reuses_an_id_after_deletion() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id("tours", 4).unwrap(), 5);
        // Entry 5 deleted again; the file's max drops back to 4.
        assert_eq!(ids.next_id("tours", 4).unwrap(), 6);
    }

    #[test]
    fn picks_up_external_edits() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id("vehicles", 2).unwrap(), 3);
        assert_eq!(ids.next_id("vehicles", 40).unwrap(), 41);
    }

    #[test]
    fn collections_are_independent() {
        let ids = IdAllocator::new();
        assert_eq!(ids.next_id("tours", 9).unwrap(), 10);
        assert_eq!(ids.next_id("reports", 0).unwrap(), 1);
    }

    #[test]
    fn exhausted_id_space_is_an_error() {
        assert!(IdAllocator::new().next_id("tours", u32::MAX).is_err());
    }

    proptest! {
        #[test]
        fn ids_strictly_increase(maxes in proptest::collection::vec(0u32..1000, 1..50)) {
            let ids = IdAllocator::new();
            let mut previous = 0;
            for max in maxes {
                let id = ids.next_id("c", max).unwrap();
                prop_assert!(id > previous);
                prop_assert!(id > max);
                previous = id;
            }
        }
    }
}
