//! Ordered classification levels for captured errors.
//!
//! Typical mappings:
//! - Trace/Debug: diagnostic noise, useful when reproducing an issue
//! - Info: expected failures worth recording
//! - Warning: non-fatal issues allowing forward progress
//! - Error: failures that should be handled or bubbled up
//! - Critical: unhandled or irrecoverable; the default for unclassified raises
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown severity level: {0:?}")]
pub struct ParseSeverityError(pub String);

impl Severity {
    /// All levels, least severe first.
    pub const ALL: [Severity; 6] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "Trace",
            Severity::Debug => "Debug",
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }

    /// Tolerant parse used when reading a stored tag: anything that is not a
    /// canonical level name reads as `None`.
    pub fn parse_lenient(raw: &str) -> Option<Severity> {
        raw.parse().ok()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ParseSeverityError(s.to_string()))
    }
}

impl From<Severity> for tracing::Level {
    fn from(value: Severity) -> Self {
        match value {
            Severity::Trace => tracing::Level::TRACE,
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warning => tracing::Level::WARN,
            Severity::Error | Severity::Critical => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(Severity::Trace < Severity::Debug);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
        assert_eq!(Severity::ALL.iter().max(), Some(&Severity::Critical));
    }

    #[test]
    fn parse_accepts_canonical_names_only() {
        for level in Severity::ALL {
            assert_eq!(level.to_string().parse::<Severity>(), Ok(level));
        }
        assert!("critical".parse::<Severity>().is_err());
        assert_eq!(Severity::parse_lenient(" Warning"), None);
        assert_eq!(Severity::parse_lenient(""), None);
    }

    #[test]
    fn critical_maps_to_error_level() {
        assert_eq!(tracing::Level::from(Severity::Critical), tracing::Level::ERROR);
        assert_eq!(tracing::Level::from(Severity::Warning), tracing::Level::WARN);
    }
}
