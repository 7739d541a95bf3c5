//! The contract every persisted record satisfies, plus the two field-merge
//! policies used by updates and imports.
//!
//! - **Patch** (`update`): a patch field that is absent or blank leaves the
//!   stored value alone.
//! - **Import overwrite** (`merge`): an incoming field that is non-blank
//!   replaces the stored value.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A typed record stored in a collection, keyed by an integer id.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Partial update accepted by `Repository::update`.
    type Patch;

    /// Collection this type lives in unless a repository overrides it.
    const COLLECTION: &'static str;

    fn id(&self) -> u32;

    fn set_id(&mut self, id: u32);

    /// Fill type-specific defaults on a freshly created or imported entity.
    fn apply_defaults(&mut self) {}

    /// Merge a patch into `self`; blank patch fields keep the current value.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Overwrite `self` with every non-blank field of `incoming`.
    fn overwrite_from(&mut self, incoming: Self);
}

/// Records any caller may write through a plain repository.
///
/// [`Tour`](crate::tour::Tour) is not one: every tour write must pass the
/// scheduling rules, so tours are written only by the tour scheduler.
pub trait DirectWrite: Entity {}

/// Whether a value counts as "not provided" for merge purposes.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Blank for u32 {
    fn is_blank(&self) -> bool {
        *self == 0
    }
}

impl Blank for u64 {
    fn is_blank(&self) -> bool {
        *self == 0
    }
}

impl Blank for f64 {
    fn is_blank(&self) -> bool {
        *self == 0.0
    }
}

impl<T: Blank> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.as_ref().is_none_or(Blank::is_blank)
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Replace `current` with `incoming` unless `incoming` is blank.
pub fn overwrite<T: Blank>(current: &mut T, incoming: T) {
    if !incoming.is_blank() {
        *current = incoming;
    }
}

/// Apply an optional patch value unless it is absent or blank.
pub fn patch<T: Blank>(current: &mut T, value: Option<T>) {
    if let Some(value) = value {
        overwrite(current, value);
    }
}

/// Apply a patch value to an optional field.
pub fn patch_opt<T: Blank>(current: &mut Option<T>, value: Option<T>) {
    if let Some(value) = value {
        if !value.is_blank() {
            *current = Some(value);
        }
    }
}

/// Apply a patch value that has no blank state (flags, enums).
pub fn patch_value<T>(current: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *current = value;
    }
}

/// Overwrite an optional field from an import when the incoming side is set.
pub fn overwrite_opt<T>(current: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *current = incoming;
    }
}
