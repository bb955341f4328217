//! The "error raised" notification channel.
//!
//! Observing uncaught errors process-wide is the host application's job; the
//! classification layer only needs somewhere to register a handler. That seam
//! is [`RaiseNotifier`]. [`RaiseChannel`] is the in-process implementation:
//! code at a raise point (or a top-level catch) calls [`RaiseChannel::raise`]
//! or [`RaiseChannel::observe`], and every subscribed [`ErrorPolicy`] sees the
//! top-level fault. Descending into composites is the handler's business.
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use lazy_static::lazy_static;

use crate::{ErrorPolicy, Fault};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Something that accepts raise handlers.
pub trait RaiseNotifier: Send + Sync {
    fn subscribe(&self, handler: Arc<dyn ErrorPolicy>) -> SubscriptionId;

    /// Returns `false` if `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

lazy_static! {
    static ref GLOBAL_CHANNEL: Arc<RaiseChannel> = Arc::new(RaiseChannel::new());
}

#[derive(Default)]
pub struct RaiseChannel {
    handlers: DashMap<SubscriptionId, Arc<dyn ErrorPolicy>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RaiseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaiseChannel")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

impl RaiseChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide channel.
    pub fn global() -> Arc<RaiseChannel> {
        GLOBAL_CHANNEL.clone()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Share `fault` and notify every handler. Returns the shared fault so the
    /// caller can keep propagating it.
    pub fn raise(&self, fault: Fault) -> Arc<Fault> {
        let fault = Arc::new(fault);
        self.observe(&fault);
        fault
    }

    /// `Err` shorthand for [`RaiseChannel::raise`].
    pub fn raise_err<T>(&self, fault: Fault) -> Result<T, Arc<Fault>> {
        Err(self.raise(fault))
    }

    /// Notify handlers about a fault that is already shared, e.g. one caught
    /// at a top-level boundary.
    pub fn observe(&self, fault: &Fault) {
        // Snapshot first so a handler can (un)subscribe without deadlocking
        // on the shard it is being read from.
        let mut handlers: Vec<_> = self
            .handlers
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect();
        handlers.sort_by_key(|(id, _)| *id);
        tracing::trace!(handlers = handlers.len(), message = %fault, "fault raised");
        for (_, handler) in handlers {
            handler.emit(fault);
        }
    }
}

impl RaiseNotifier for RaiseChannel {
    fn subscribe(&self, handler: Arc<dyn ErrorPolicy>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.insert(id, handler);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.remove(&id).is_some()
    }
}

impl<N: RaiseNotifier + ?Sized> RaiseNotifier for Arc<N> {
    fn subscribe(&self, handler: Arc<dyn ErrorPolicy>) -> SubscriptionId {
        (**self).subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::{HasMetadata, LevelExt, Severity};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl ErrorPolicy for Counter {
        fn classify(&self, fault: &Fault) -> Option<Severity> {
            fault.try_get_level()
        }

        fn emit(&self, _fault: &Fault) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn raise_reaches_every_subscriber_until_removed() {
        let channel = RaiseChannel::new();
        let counter = Arc::new(Counter::default());
        let a = channel.subscribe(counter.clone());
        let b = channel.subscribe(counter.clone());
        assert_ne!(a, b);
        assert_eq!(channel.handler_count(), 2);

        let fault = channel.raise(Fault::new("FAIL"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(fault.message(), "FAIL");

        assert!(channel.unsubscribe(a));
        assert!(!channel.unsubscribe(a));
        let _ = channel.raise_err::<()>(Fault::new("again"));
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn raise_without_handlers_leaves_fault_untouched() {
        let channel = RaiseChannel::new();
        let fault = channel.raise(Fault::new("FAIL"));
        assert_eq!(fault.try_get_level(), None);
        assert!(fault.metadata().is_empty());
    }
}
