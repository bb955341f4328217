//! Severity tagging for anything that carries [`Metadata`].
//!
//! ```rust,ignore
//! use snag_error::{Fault, LevelExt, Severity};
//!
//! let fault = Fault::new("cache miss").info(true);
//! assert_eq!(fault.try_get_level(), Some(Severity::Info));
//!
//! // A non-overriding tag never replaces an existing one.
//! let fault = fault.critical(false);
//! assert_eq!(fault.try_get_level(), Some(Severity::Info));
//! ```
use std::collections::BTreeMap;

use crate::metadata::{CUSTOM_DATA_PREFIX, HasMetadata, LEVEL_KEY};
use crate::severity::Severity;

pub trait LevelExt: HasMetadata + Sized {
    /// Write `level` under the reserved key and hand the value back.
    ///
    /// With `override_existing` the tag always wins; without it the write is
    /// skipped when the value is already tagged.
    fn tag_as_level(self, level: Severity, override_existing: bool) -> Self {
        self.record_level(level, override_existing);
        self
    }

    /// Same as [`LevelExt::tag_as_level`] through a shared reference,
    /// reporting whether the tag was written.
    fn record_level(&self, level: Severity, override_existing: bool) -> bool {
        let metadata = self.metadata();
        if override_existing {
            metadata.insert(LEVEL_KEY, level.as_str());
            true
        } else {
            metadata.insert_if_absent(LEVEL_KEY, level.as_str())
        }
    }

    /// The current tag. Missing or unparsable values read as `None`.
    fn try_get_level(&self) -> Option<Severity> {
        self.metadata()
            .get(LEVEL_KEY)
            .and_then(|raw| Severity::parse_lenient(&raw))
    }

    fn clear_level(&self) -> Option<Severity> {
        self.metadata()
            .remove(LEVEL_KEY)
            .and_then(|raw| Severity::parse_lenient(&raw))
    }

    fn trace(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Trace, override_existing)
    }

    fn debug(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Debug, override_existing)
    }

    fn info(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Info, override_existing)
    }

    fn warning(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Warning, override_existing)
    }

    fn error(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Error, override_existing)
    }

    fn critical(self, override_existing: bool) -> Self {
        self.tag_as_level(Severity::Critical, override_existing)
    }

    /// Attach a custom key/value pair to be forwarded with the error when it
    /// is logged. Later writes to the same key replace earlier ones.
    fn add_log_data(self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.metadata()
            .insert(format!("{CUSTOM_DATA_PREFIX}{}", key.as_ref()), value);
        self
    }

    /// Custom pairs added through [`LevelExt::add_log_data`], prefix removed.
    fn custom_data(&self) -> BTreeMap<String, String> {
        self.metadata()
            .snapshot()
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix(CUSTOM_DATA_PREFIX).map(|k| (k.to_string(), v)))
            .collect()
    }
}

impl<T: HasMetadata> LevelExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Fault;

    #[test]
    fn untagged_reads_none() {
        let fault = Fault::new("FAIL");
        assert_eq!(fault.try_get_level(), None);
    }

    #[test]
    fn override_replaces_and_non_override_keeps() {
        let fault = Fault::new("FAIL").debug(true);
        assert_eq!(fault.try_get_level(), Some(Severity::Debug));

        let fault = fault.info(true);
        assert_eq!(fault.try_get_level(), Some(Severity::Info));

        let fault = fault.critical(false);
        assert_eq!(fault.try_get_level(), Some(Severity::Info));

        let fresh = Fault::new("FAIL").warning(false);
        assert_eq!(fresh.try_get_level(), Some(Severity::Warning));
    }

    #[test]
    fn each_wrapper_writes_its_level() {
        let wrappers: [(fn(Fault) -> Fault, Severity); 6] = [
            (|f| f.trace(true), Severity::Trace),
            (|f| f.debug(true), Severity::Debug),
            (|f| f.info(true), Severity::Info),
            (|f| f.warning(true), Severity::Warning),
            (|f| f.error(true), Severity::Error),
            (|f| f.critical(true), Severity::Critical),
        ];
        for (tag, expected) in wrappers {
            assert_eq!(tag(Fault::new("x")).try_get_level(), Some(expected));
        }
    }

    #[test]
    fn malformed_tag_reads_as_absent() {
        let fault = Fault::new("FAIL");
        fault.metadata().insert(LEVEL_KEY, "Catastrophic");
        assert_eq!(fault.try_get_level(), None);

        // A non-overriding write still sees the slot as occupied.
        assert!(!fault.record_level(Severity::Critical, false));
        assert!(fault.record_level(Severity::Error, true));
        assert_eq!(fault.try_get_level(), Some(Severity::Error));
    }

    #[test]
    fn tagging_through_shared_handles_hits_the_same_error() {
        let fault = Arc::new(Fault::new("shared"));
        let alias = fault.clone();
        let _ = (&*alias).warning(true);
        assert_eq!(fault.try_get_level(), Some(Severity::Warning));
        assert_eq!(fault.clear_level(), Some(Severity::Warning));
        assert_eq!(alias.try_get_level(), None);
    }

    #[test]
    fn custom_data_is_separate_from_the_tag() {
        let fault = Fault::new("FAIL")
            .add_log_data("User Id", "42")
            .add_log_data("Level", "not the tag")
            .trace(true);
        let custom = fault.custom_data();
        assert_eq!(custom.len(), 2);
        assert_eq!(custom["User Id"], "42");
        assert_eq!(custom["Level"], "not the tag");
        assert_eq!(fault.try_get_level(), Some(Severity::Trace));
    }
}
