//! snag-store — where captured faults end up
//!
//! This crate defines the [`ErrorStore`] seam consumed by applications, the
//! [`ErrorRecord`] shape a store hands back, and [`MemoryErrorStore`], an
//! in-process store for tests and short-lived tools. Durable backends live
//! outside this workspace and implement the same trait.
//!
//! Faults reach a store in one of two ways:
//! - directly, with [`capture::log_fault`] at a `catch` site
//! - from the raise channel, by subscribing the [`CapturePolicy`] returned by
//!   [`spawn_capture`]; records are written by a background task
//!
//! Either way the fault's severity tag is forwarded under
//! [`snag_error::LEVEL_KEY`], so [`ErrorRecord::try_get_level`] agrees with
//! [`snag_error::LevelExt::try_get_level`] on the fault that was logged.
pub mod capture;
pub mod memory;
pub mod record;
pub mod store;

pub use capture::{
    CaptureHandle, CapturePolicy, DEFAULT_CAPTURE_CAPACITY, log_fault, spawn_capture,
    spawn_capture_with_capacity,
};
pub use memory::MemoryErrorStore;
pub use record::ErrorRecord;
pub use store::ErrorStore;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("No record with id {0}")]
    NotFound(Uuid),

    #[error("Capture worker has shut down")]
    Closed,
}

impl From<StoreError> for snag_error::Error {
    fn from(e: StoreError) -> snag_error::Error {
        snag_error::Error::Store {
            message: e.to_string(),
        }
    }
}
