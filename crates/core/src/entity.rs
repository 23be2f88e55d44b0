//! Entity trait: identity + continuity across state changes.

use chrono::{DateTime, Utc};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Soft-delete marker. `Some` means the record is hidden from every read.
    fn deleted_at(&self) -> Option<DateTime<Utc>>;

    fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }
}
