//! Per-error side-channel for string data.
//!
//! The map lives alongside an error without touching its declared fields and
//! is only allocated on first write. Writes go through `&self` so a raise
//! handler that only sees a shared reference can still tag the error.
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Reserved key for the severity tag. Callers go through [`crate::LevelExt`]
/// rather than reading or writing it directly.
pub const LEVEL_KEY: &str = "snag.level";

/// Prefix for user-supplied custom data, see [`crate::LevelExt::add_log_data`].
pub const CUSTOM_DATA_PREFIX: &str = "snag.custom.";

#[derive(Debug, Default)]
pub struct Metadata {
    entries: OnceLock<DashMap<String, String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> &DashMap<String, String> {
        self.entries.get_or_init(DashMap::new)
    }

    /// Whether the backing map has been allocated yet.
    pub fn is_allocated(&self) -> bool {
        self.entries.get().is_some()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get()
            .and_then(|map| map.get(key).map(|v| v.value().clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get()
            .is_some_and(|map| map.contains_key(key))
    }

    /// Insert, replacing any previous value. Returns the replaced value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries().insert(key.into(), value.into())
    }

    /// Insert only if `key` is vacant. The check and the write happen under
    /// the same shard lock. Returns `true` if the value was written.
    pub fn insert_if_absent(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.entries().entry(key.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
        }
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries
            .get()
            .and_then(|map| map.remove(key).map(|(_, v)| v))
    }

    pub fn len(&self) -> usize {
        self.entries.get().map_or(0, DashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered copy of every entry, reserved keys included.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.entries
            .get()
            .map(|map| {
                map.iter()
                    .map(|e| (e.key().clone(), e.value().clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Anything that carries a [`Metadata`] side-channel.
pub trait HasMetadata {
    fn metadata(&self) -> &Metadata;
}

impl<T: HasMetadata + ?Sized> HasMetadata for &T {
    fn metadata(&self) -> &Metadata {
        (**self).metadata()
    }
}

impl<T: HasMetadata + ?Sized> HasMetadata for Box<T> {
    fn metadata(&self) -> &Metadata {
        (**self).metadata()
    }
}

impl<T: HasMetadata + ?Sized> HasMetadata for Arc<T> {
    fn metadata(&self) -> &Metadata {
        (**self).metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_do_not_allocate() {
        let md = Metadata::new();
        assert_eq!(md.get(LEVEL_KEY), None);
        assert!(!md.contains_key(LEVEL_KEY));
        assert!(md.is_empty());
        assert!(md.snapshot().is_empty());
        assert!(!md.is_allocated());

        md.insert("Level", "user value");
        assert!(md.is_allocated());
    }

    #[test]
    fn insert_if_absent_keeps_first_value() {
        let md = Metadata::new();
        assert!(md.insert_if_absent("k", "first"));
        assert!(!md.insert_if_absent("k", "second"));
        assert_eq!(md.get("k").as_deref(), Some("first"));

        assert_eq!(md.insert("k", "third").as_deref(), Some("first"));
        assert_eq!(md.get("k").as_deref(), Some("third"));
    }

    #[test]
    fn user_level_key_is_distinct_from_reserved_key() {
        let md = Metadata::new();
        md.insert("Level", "Warning");
        assert!(!md.contains_key(LEVEL_KEY));
        assert_eq!(md.remove("Level").as_deref(), Some("Warning"));
        assert!(md.is_empty());
    }
}
