use tracing::{Level, event};

use super::{Fault, LevelExt, Severity};

/// A handler for raised faults.
///
/// Libraries should not log or print directly; instead they raise a [`Fault`]
/// and let the application subscribe an `ErrorPolicy` on the raise channel to
/// decide how to classify or route it. Implementations are called from any
/// thread that raises, possibly concurrently, and must not keep per-raise
/// state of their own.
///
/// Example
/// ```rust,ignore
/// use snag_error::{ErrorPolicy, Fault, LevelExt, Severity};
///
/// struct PrintPolicy;
/// impl ErrorPolicy for PrintPolicy {
///     fn classify(&self, f: &Fault) -> Option<Severity> { f.try_get_level() }
///     fn emit(&self, f: &Fault) { eprintln!("[{:?}] {f}", self.classify(f)); }
/// }
/// ```
pub trait ErrorPolicy: Send + Sync {
    /// Classify the fault's severity, if it has one
    fn classify(&self, fault: &Fault) -> Option<Severity>;

    /// Handle a raised fault (tag it, log it, forward it...)
    fn emit(&self, fault: &Fault);
}

/// A no-operation policy that does nothing
#[derive(Debug, Clone, Default)]
pub struct NoopPolicy;

impl ErrorPolicy for NoopPolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        fault.try_get_level()
    }

    fn emit(&self, _fault: &Fault) {}
}

/// Composite nesting deeper than this is left alone.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Tags every raised fault that nobody classified with a fixed level.
///
/// Per raised fault:
/// 1. composite wrappers are never tagged; each cause is handled on its own,
///    recursively for nested composites
/// 2. cancellations are skipped
/// 3. an existing tag is kept
/// 4. anything else gets `level`, written without override
#[derive(Debug, Clone, Copy)]
pub struct DefaultLevelPolicy {
    level: Severity,
    max_depth: usize,
}

impl Default for DefaultLevelPolicy {
    fn default() -> Self {
        Self {
            level: Severity::Critical,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DefaultLevelPolicy {
    pub fn new(level: Severity) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Apply the policy to one raised fault. Returns how many tags were written.
    pub fn apply(&self, fault: &Fault) -> usize {
        self.apply_at(fault, 0)
    }

    fn apply_at(&self, fault: &Fault, depth: usize) -> usize {
        if fault.is_composite() {
            if depth >= self.max_depth {
                tracing::warn!(
                    depth,
                    max_depth = self.max_depth,
                    "composite fault nested too deeply; leaving remaining causes untagged"
                );
                return 0;
            }
            return fault
                .causes()
                .iter()
                .map(|cause| self.apply_at(cause, depth + 1))
                .sum();
        }
        if fault.is_cancellation() {
            tracing::trace!(message = %fault, "skipping cancellation");
            return 0;
        }
        let wrote = fault.record_level(self.level, false);
        if wrote {
            tracing::trace!(message = %fault, level = %self.level, "applied default level");
        }
        usize::from(wrote)
    }
}

impl ErrorPolicy for DefaultLevelPolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        if fault.is_composite() || fault.is_cancellation() {
            return fault.try_get_level();
        }
        Some(fault.try_get_level().unwrap_or(self.level))
    }

    fn emit(&self, fault: &Fault) {
        self.apply(fault);
    }
}

/// Logs each raised fault through `tracing` at its tagged level.
///
/// Composite wrappers are not logged themselves; their causes are. Untagged
/// faults are logged at `fallback`.
#[derive(Debug, Clone)]
pub struct TracingPolicy {
    fallback: Severity,
}

impl Default for TracingPolicy {
    fn default() -> Self {
        Self {
            fallback: Severity::Error,
        }
    }
}

impl TracingPolicy {
    pub fn with_fallback(fallback: Severity) -> Self {
        Self { fallback }
    }

    fn log(&self, fault: &Fault, depth: usize) {
        if fault.is_composite() {
            if depth < DEFAULT_MAX_DEPTH {
                for cause in fault.causes() {
                    self.log(cause, depth + 1);
                }
            }
            return;
        }
        if fault.is_cancellation() {
            return;
        }
        let severity = fault.try_get_level().unwrap_or(self.fallback);
        let custom = fault.custom_data();
        match Level::from(severity) {
            Level::ERROR => event!(Level::ERROR, %severity, ?custom, "{fault}"),
            Level::WARN => event!(Level::WARN, %severity, ?custom, "{fault}"),
            Level::INFO => event!(Level::INFO, %severity, ?custom, "{fault}"),
            Level::DEBUG => event!(Level::DEBUG, %severity, ?custom, "{fault}"),
            _ => event!(Level::TRACE, %severity, ?custom, "{fault}"),
        }
    }
}

impl ErrorPolicy for TracingPolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        fault.try_get_level()
    }

    fn emit(&self, fault: &Fault) {
        self.log(fault, 0);
    }
}

/// A composite policy that delegates to multiple policies.
///
/// Behavior
/// - classify: returns the maximum severity among inner policies (falling back to the fault's own tag when empty).
/// - emit: delegates emission to all inner policies in insertion order.
///
/// Example
/// ```rust,ignore
/// use snag_error::policy::{CombinedPolicy, DefaultLevelPolicy, TracingPolicy};
/// // Tag first, then log with the tag in place.
/// let policy = CombinedPolicy::new()
///     .push(DefaultLevelPolicy::default())
///     .push(TracingPolicy::default());
/// ```
#[derive(Default)]
pub struct CombinedPolicy {
    policies: Vec<Box<dyn ErrorPolicy>>,
}

impl CombinedPolicy {
    /// Create an empty CombinedPolicy.
    pub fn new() -> Self {
        Self { policies: Vec::new() }
    }

    /// Construct from an existing vector of boxed policies.
    pub fn from_vec(policies: Vec<Box<dyn ErrorPolicy>>) -> Self {
        Self { policies }
    }

    /// Add a policy by value (boxed internally). Consumes and returns Self for builder-style chaining.
    pub fn push<P: ErrorPolicy + 'static>(mut self, policy: P) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl ErrorPolicy for CombinedPolicy {
    fn classify(&self, fault: &Fault) -> Option<Severity> {
        self.policies
            .iter()
            .filter_map(|p| p.classify(fault))
            .chain(fault.try_get_level())
            .max()
    }

    fn emit(&self, fault: &Fault) {
        for p in &self.policies {
            p.emit(fault);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn untagged_simple_fault_gets_default() {
        let fault = Fault::new("FAIL");
        assert_eq!(DefaultLevelPolicy::default().apply(&fault), 1);
        assert_eq!(fault.try_get_level(), Some(Severity::Critical));
    }

    #[test]
    fn explicit_tag_is_kept() {
        let fault = Fault::new("FAIL").warning(true);
        assert_eq!(DefaultLevelPolicy::default().apply(&fault), 0);
        assert_eq!(fault.try_get_level(), Some(Severity::Warning));
    }

    #[test]
    fn composite_wrapper_is_not_tagged_but_causes_are() {
        let untagged = Arc::new(Fault::new("inner"));
        let tagged = Arc::new(Fault::new("inner tagged").warning(true));
        let wrapper = Fault::aggregate([untagged.clone(), tagged.clone()]);

        assert_eq!(DefaultLevelPolicy::default().apply(&wrapper), 1);
        assert_eq!(wrapper.try_get_level(), None);
        assert_eq!(untagged.try_get_level(), Some(Severity::Critical));
        assert_eq!(tagged.try_get_level(), Some(Severity::Warning));
    }

    #[test]
    fn nested_composites_recurse_to_leaves() {
        let leaf = Arc::new(Fault::new("leaf"));
        let cancelled = Arc::new(Fault::cancelled("stop"));
        let middle = Arc::new(Fault::aggregate([leaf.clone(), cancelled.clone()]));
        let outer = Fault::aggregate([middle.clone()]);

        assert_eq!(DefaultLevelPolicy::new(Severity::Error).apply(&outer), 1);
        assert_eq!(outer.try_get_level(), None);
        assert_eq!(middle.try_get_level(), None);
        assert_eq!(leaf.try_get_level(), Some(Severity::Error));
        assert_eq!(cancelled.try_get_level(), None);
    }

    #[test]
    fn simple_fault_cause_is_not_walked() {
        // Only composite wrappers are descended into; a simple fault is one unit.
        let root = Arc::new(Fault::new("root"));
        let outer = Fault::with_cause("outer", root.clone());
        DefaultLevelPolicy::default().apply(&outer);
        assert_eq!(outer.try_get_level(), Some(Severity::Critical));
        assert_eq!(root.try_get_level(), None);
    }

    #[test]
    fn depth_guard_stops_descent() {
        let leaf = Arc::new(Fault::new("deep"));
        let mut current = leaf.clone();
        for _ in 0..4 {
            current = Arc::new(Fault::aggregate([current]));
        }
        let policy = DefaultLevelPolicy::default().with_max_depth(2);
        assert_eq!(policy.apply(&current), 0);
        assert_eq!(leaf.try_get_level(), None);

        let policy = DefaultLevelPolicy::default().with_max_depth(4);
        assert_eq!(policy.apply(&current), 1);
        assert_eq!(leaf.try_get_level(), Some(Severity::Critical));
    }

    #[test]
    fn combined_policy_runs_in_order_and_takes_max() {
        let fault = Fault::new("FAIL");
        let policy = CombinedPolicy::new()
            .push(NoopPolicy)
            .push(DefaultLevelPolicy::default())
            .push(TracingPolicy::default());
        assert_eq!(policy.len(), 3);
        assert_eq!(policy.classify(&fault), Some(Severity::Critical));
        assert_eq!(fault.try_get_level(), None);

        policy.emit(&fault);
        assert_eq!(fault.try_get_level(), Some(Severity::Critical));

        let empty = CombinedPolicy::new();
        assert_eq!(empty.classify(&Fault::new("x").debug(true)), Some(Severity::Debug));
    }
}
