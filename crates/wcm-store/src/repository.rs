//! Generic CRUD over one collection.
//!
//! Every write loads the collection, changes it in memory and saves the
//! whole document while holding the collection's lock.

use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use wcm_core::entity::Entity;
use wcm_core::error::Result;

use crate::Shared;

pub struct Repository<T> {
    shared: Arc<Shared>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(shared: Arc<Shared>, collection: impl Into<String>) -> Self {
        Self {
            shared,
            collection: collection.into(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Parse`] if the stored document is malformed.
    pub fn get_all(&self) -> Result<Vec<T>> {
        self.shared.documents.load(&self.collection)
    }

    /// # Errors
    ///
    /// See [`Repository::get_all`].
    pub fn get_by_id(&self, id: u32) -> Result<Option<T>> {
        Ok(self.get_all()?.into_iter().find(|e| e.id() == id))
    }

    /// Entities matching `predicate`, in stored order.
    ///
    /// # Errors
    ///
    /// See [`Repository::get_all`].
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Result<Vec<T>> {
        Ok(self.get_all()?.into_iter().filter(|e| predicate(e)).collect())
    }

    /// Store `candidate` under a fresh id with type defaults applied. Any id
    /// already set on the candidate is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`wcm_core::WcmError::Validation`] if the resulting document
    /// breaks its schema; nothing is written in that case.
    pub fn create(&self, mut candidate: T) -> Result<T> {
        let created = self.locked(|items| {
            let id = self.next_id(items)?;
            candidate.set_id(id);
            candidate.apply_defaults();
            items.push(candidate.clone());
            Ok((candidate, true))
        })?;
        info!(collection = %self.collection, id = created.id(), "entity created");
        Ok(created)
    }

    /// Merge `patch` into entity `id`. Returns `None` if there is no such
    /// entity.
    ///
    /// # Errors
    ///
    /// See [`Repository::create`].
    pub fn update(&self, id: u32, patch: T::Patch) -> Result<Option<T>> {
        self.update_with(id, |entity| {
            entity.apply_patch(patch);
            Ok(())
        })
    }

    /// Apply `change` to entity `id` and save. The changed entity moves to
    /// the end of the collection.
    ///
    /// # Errors
    ///
    /// Returns whatever `change` returns, or the save error.
    pub fn update_with(
        &self,
        id: u32,
        change: impl FnOnce(&mut T) -> Result<()>,
    ) -> Result<Option<T>> {
        self.modify(id, change, true)
    }

    /// Like [`Repository::update_with`], but the entity keeps its position
    /// in the collection.
    ///
    /// # Errors
    ///
    /// Returns whatever `change` returns, or the save error.
    pub fn update_in_place(
        &self,
        id: u32,
        change: impl FnOnce(&mut T) -> Result<()>,
    ) -> Result<Option<T>> {
        self.modify(id, change, false)
    }

    fn modify(
        &self,
        id: u32,
        change: impl FnOnce(&mut T) -> Result<()>,
        move_to_end: bool,
    ) -> Result<Option<T>> {
        let updated = self.locked(|items| {
            let Some(pos) = items.iter().position(|e| e.id() == id) else {
                return Ok((None, false));
            };
            let mut entity = items[pos].clone();
            change(&mut entity)?;
            entity.set_id(id);
            if move_to_end {
                items.remove(pos);
                items.push(entity.clone());
            } else {
                items[pos] = entity.clone();
            }
            Ok((Some(entity), true))
        })?;
        if updated.is_some() {
            info!(collection = %self.collection, id, "entity updated");
        }
        Ok(updated)
    }

    /// Remove entity `id`. The file is rewritten only if something was
    /// removed.
    ///
    /// # Errors
    ///
    /// See [`Repository::create`].
    pub fn delete(&self, id: u32) -> Result<bool> {
        let removed = self.locked(|items| {
            let before = items.len();
            items.retain(|e| e.id() != id);
            let removed = items.len() != before;
            Ok((removed, removed))
        })?;
        if removed {
            info!(collection = %self.collection, id, "entity deleted");
        }
        Ok(removed)
    }

    /// Run a read-modify-write cycle under the collection lock. `body`
    /// returns its result and whether the collection must be saved.
    pub(crate) fn locked<R>(
        &self,
        body: impl FnOnce(&mut Vec<T>) -> Result<(R, bool)>,
    ) -> Result<R> {
        self.shared.locks.with_lock(&self.collection, || {
            let mut items = self.shared.documents.load::<T>(&self.collection)?;
            let (result, dirty) = body(&mut items)?;
            if dirty {
                self.shared.documents.save(&self.collection, &items)?;
            }
            Ok(result)
        })
    }

    /// Next id for this collection. Call only inside [`Repository::locked`].
    pub(crate) fn next_id(&self, items: &[T]) -> Result<u32> {
        let max_existing = items.iter().map(Entity::id).max().unwrap_or(0);
        self.shared.ids.next_id(&self.collection, max_existing)
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
