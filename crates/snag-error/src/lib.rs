//! snag-error — severity classification for in-flight errors
//!
//! Application code tags a raised [`Fault`] with a [`Severity`] through
//! [`LevelExt`]; the tag lives in the fault's [`Metadata`] side-channel and is
//! read back with [`LevelExt::try_get_level`]. Faults nobody classified can be
//! given a default level process-wide by enabling [`DefaultLevelHook`], which
//! subscribes a [`DefaultLevelPolicy`] on a [`RaiseChannel`].
//!
//! Key properties
//! - One reserved metadata key per fault, so at most one tag at a time.
//! - Explicit tags always beat the default; the default never overrides.
//! - Composite wrappers ([`Fault::aggregate`]) are never tagged by the
//!   default policy, their causes are. Cancellations are never tagged.
//! - Nothing on the classification path returns an error.
//!
//! Quick start
//! ```rust,ignore
//! use snag_error::{DefaultLevelHook, Fault, LevelExt, RaiseChannel, Severity};
//!
//! let _guard = DefaultLevelHook::global().enable_scoped();
//! let channel = RaiseChannel::global();
//!
//! let explicit = channel.raise(Fault::new("retrying").warning(true));
//! let implicit = channel.raise(Fault::new("unhandled"));
//! assert_eq!(explicit.try_get_level(), Some(Severity::Warning));
//! assert_eq!(implicit.try_get_level(), Some(Severity::Critical));
//! ```
pub mod channel;
pub mod classify;
pub mod config;
pub mod fault;
pub mod hook;
pub mod metadata;
pub mod policy;
pub mod result_ext;
pub mod severity;

// public exports
pub use channel::{RaiseChannel, RaiseNotifier, SubscriptionId};
pub use classify::LevelExt;
pub use config::SnagConfig;
pub use fault::{Fault, FaultKind};
pub use hook::{DefaultLevelHook, HookGuard};
pub use metadata::{CUSTOM_DATA_PREFIX, HasMetadata, LEVEL_KEY, Metadata};
pub use policy::{CombinedPolicy, DefaultLevelPolicy, ErrorPolicy, NoopPolicy, TracingPolicy};
pub use result_ext::{IntoFaultExt, ResultExt};
pub use severity::{ParseSeverityError, Severity};

use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures outside the classification path: configuration and the stores
/// that persist faults.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid configuration in {path:?}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O failure on {path:?}: {operation}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    ParseSeverity(#[from] ParseSeverityError),

    #[error("Store error: {message}")]
    Store { message: String },
}
