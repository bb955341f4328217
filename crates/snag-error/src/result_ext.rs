use std::sync::Arc;

use super::{ErrorPolicy, Fault, LevelExt, RaiseChannel, Severity};

/// Extension trait for `Result<T, Arc<Fault>>` enabling tagging and
/// policy-driven emission without contaminating core control-flow with
/// side-effects.
///
/// Typical usage: tag where the failure is understood, observe at the
/// boundary where it would otherwise go unhandled.
///
/// Example
/// ```rust,ignore
/// use snag_error::{Fault, RaiseChannel, ResultExt, Severity};
///
/// fn do_work(channel: &RaiseChannel) -> Result<(), std::sync::Arc<Fault>> {
///     let r: Result<(), _> = Err(Fault::new("bad input").into());
///     r.tag_err(Severity::Warning, true).observe_err(channel)
/// }
/// ```
pub trait ResultExt<T>: Sized {
    /// Tag the error, if any, and return the result unchanged
    fn tag_err(self, level: Severity, override_existing: bool) -> Self;

    /// Notify the raise channel about the error, if any
    fn observe_err(self, channel: &RaiseChannel) -> Self;

    /// Emit the error using the provided policy and return the result unchanged
    fn emit_event(self, policy: &impl ErrorPolicy) -> Self;

    /// Emit the error only if the policy classifies it at `min` or above
    fn emit_at_least(self, min: Severity, policy: &impl ErrorPolicy) -> Self;
}

impl<T> ResultExt<T> for Result<T, Arc<Fault>> {
    fn tag_err(self, level: Severity, override_existing: bool) -> Self {
        self.map_err(|e| e.tag_as_level(level, override_existing))
    }

    fn observe_err(self, channel: &RaiseChannel) -> Self {
        if let Err(ref e) = self {
            channel.observe(e);
        }
        self
    }

    fn emit_event(self, policy: &impl ErrorPolicy) -> Self {
        if let Err(ref e) = self {
            policy.emit(e);
        }
        self
    }

    fn emit_at_least(self, min: Severity, policy: &impl ErrorPolicy) -> Self {
        if let Err(ref e) = self {
            if policy.classify(e).is_some_and(|s| s >= min) {
                policy.emit(e);
            }
        }
        self
    }
}

/// Lift any std error into a shared [`Fault`].
pub trait IntoFaultExt<T> {
    fn into_fault(self) -> Result<T, Arc<Fault>>;
}

impl<T, E> IntoFaultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn into_fault(self) -> Result<T, Arc<Fault>> {
        self.map_err(|e| Arc::new(Fault::wrap(e)))
    }
}
