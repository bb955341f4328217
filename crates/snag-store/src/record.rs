use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use snag_error::{Fault, LEVEL_KEY, LevelExt, Severity};
use uuid::Uuid;

/// A fault as persisted by an [`crate::ErrorStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    pub id: Uuid,
    pub application_name: String,
    pub message: String,
    pub creation_date: DateTime<Utc>,
    /// User pairs from [`LevelExt::add_log_data`] plus any extra pairs given
    /// at log time, and the severity tag under [`LEVEL_KEY`].
    pub custom_data: BTreeMap<String, String>,
}

impl ErrorRecord {
    /// Snapshot a single fault. `extra` pairs win over the fault's own custom
    /// data. [`LEVEL_KEY`] is reserved: user or extra pairs under it are
    /// dropped and only the fault's real tag is stored there.
    pub fn from_fault(
        fault: &Fault,
        application_name: &str,
        extra: &BTreeMap<String, String>,
    ) -> Self {
        let mut custom_data = fault.custom_data();
        custom_data.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(spoofed) = custom_data.remove(LEVEL_KEY) {
            tracing::warn!(key = LEVEL_KEY, value = %spoofed, "dropping user data under reserved key");
        }
        if let Some(level) = fault.try_get_level() {
            custom_data.insert(LEVEL_KEY.to_string(), level.to_string());
        }
        Self {
            id: Uuid::new_v4(),
            application_name: application_name.to_string(),
            message: fault.message().to_string(),
            creation_date: Utc::now(),
            custom_data,
        }
    }

    /// One record per leaf of a fault tree. Composite wrappers are walked
    /// rather than recorded, and cancellations are dropped.
    pub fn from_fault_tree(
        fault: &Fault,
        application_name: &str,
        extra: &BTreeMap<String, String>,
    ) -> Vec<Self> {
        let mut out = Vec::new();
        collect_leaves(fault, 0, &mut |leaf| {
            out.push(Self::from_fault(leaf, application_name, extra))
        });
        out
    }

    /// The severity tag the fault carried when it was logged.
    pub fn try_get_level(&self) -> Option<Severity> {
        self.custom_data
            .get(LEVEL_KEY)
            .and_then(|raw| Severity::parse_lenient(raw))
    }

    /// Custom data without the reserved severity entry.
    pub fn user_data(&self) -> impl Iterator<Item = (&str, &str)> {
        self.custom_data
            .iter()
            .filter(|(k, _)| k.as_str() != LEVEL_KEY)
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn collect_leaves(fault: &Fault, depth: usize, visit: &mut impl FnMut(&Fault)) {
    if fault.is_composite() {
        if depth >= snag_error::policy::DEFAULT_MAX_DEPTH {
            tracing::warn!(depth, "composite fault nested too deeply; dropping remaining causes");
            return;
        }
        for cause in fault.causes() {
            collect_leaves(cause, depth + 1, visit);
        }
    } else if !fault.is_cancellation() {
        visit(fault);
    }
}
