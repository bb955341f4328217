//! Opt-in installation of [`DefaultLevelPolicy`] on a raise channel.
//!
//! The hook has two states, disabled (initial) and enabled. Toggling is
//! idempotent and serialized, so concurrent `enable()` calls subscribe the
//! policy exactly once and `disable()` returns only after the handler is gone.
//!
//! ```rust,ignore
//! use snag_error::{DefaultLevelHook, Fault, LevelExt, RaiseChannel, Severity};
//!
//! let hook = DefaultLevelHook::global();
//! hook.enable();
//! let fault = RaiseChannel::global().raise(Fault::new("FAIL"));
//! assert_eq!(fault.try_get_level(), Some(Severity::Critical));
//! hook.disable();
//! ```
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;

use crate::channel::{RaiseChannel, RaiseNotifier, SubscriptionId};
use crate::config::SnagConfig;
use crate::policy::{DefaultLevelPolicy, ErrorPolicy};

lazy_static! {
    static ref GLOBAL_HOOK: DefaultLevelHook = DefaultLevelHook::new(
        RaiseChannel::global(),
        Arc::new(DefaultLevelPolicy::default()),
    );
}

pub struct DefaultLevelHook {
    notifier: Arc<dyn RaiseNotifier>,
    policy: Arc<dyn ErrorPolicy>,
    subscription: Mutex<Option<SubscriptionId>>,
    // Mirrors `subscription.is_some()` for lock-free reads.
    enabled: AtomicBool,
}

impl std::fmt::Debug for DefaultLevelHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultLevelHook")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl DefaultLevelHook {
    /// A disabled hook that will subscribe `policy` on `notifier`.
    pub fn new(notifier: Arc<dyn RaiseNotifier>, policy: Arc<dyn ErrorPolicy>) -> Self {
        Self {
            notifier,
            policy,
            subscription: Mutex::new(None),
            enabled: AtomicBool::new(false),
        }
    }

    /// The single process-wide hook, bound to [`RaiseChannel::global`] with a
    /// `Critical` default.
    pub fn global() -> &'static DefaultLevelHook {
        &GLOBAL_HOOK
    }

    /// Build a hook from configuration, enabling it when
    /// `apply_default_level` is set.
    pub fn from_config(config: &SnagConfig, notifier: Arc<dyn RaiseNotifier>) -> Self {
        let policy = DefaultLevelPolicy::new(config.default_level)
            .with_max_depth(config.max_cause_depth);
        let hook = Self::new(notifier, Arc::new(policy));
        if config.apply_default_level {
            hook.enable();
        }
        hook
    }

    fn lock(&self) -> MutexGuard<'_, Option<SubscriptionId>> {
        // The guarded value is only ever replaced whole, so a poisoned lock
        // still holds a consistent state.
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Subscribe the policy. Returns `false` if it was already enabled.
    pub fn enable(&self) -> bool {
        let mut slot = self.lock();
        if slot.is_some() {
            return false;
        }
        let id = self.notifier.subscribe(self.policy.clone());
        *slot = Some(id);
        self.enabled.store(true, Ordering::Release);
        tracing::debug!(?id, "default level hook enabled");
        true
    }

    /// Unsubscribe the policy. Returns `false` if it was already disabled.
    pub fn disable(&self) -> bool {
        let mut slot = self.lock();
        let Some(id) = slot.take() else {
            return false;
        };
        if !self.notifier.unsubscribe(id) {
            tracing::warn!(?id, "default level hook subscription was already gone");
        }
        self.enabled.store(false, Ordering::Release);
        tracing::debug!(?id, "default level hook disabled");
        true
    }

    /// Enable for the lifetime of the returned guard. If the hook was already
    /// enabled, the guard leaves it enabled when dropped.
    pub fn enable_scoped(&self) -> HookGuard<'_> {
        let owned = self.enable();
        HookGuard { hook: self, owned }
    }
}

impl Drop for DefaultLevelHook {
    fn drop(&mut self) {
        self.disable();
    }
}

/// Disables its hook when dropped, if the guard was the one that enabled it.
#[must_use = "the hook is disabled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct HookGuard<'a> {
    hook: &'a DefaultLevelHook,
    owned: bool,
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.hook.disable();
        }
    }
}
