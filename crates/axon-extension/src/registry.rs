//! The addon registry.
//!
//! A process-wide, mutex-guarded map from `(kind, name)` to a
//! registration callback with deferred, at-most-once invocation.
//! This is the one structure in axon explicitly protected by a lock:
//! dynamically loaded modules register from arbitrary startup-time
//! threads, before any loop affinity exists.
//!
//! # Locking discipline
//!
//! Entries are *extracted* under the lock and *invoked* after it is
//! released. Callbacks may therefore re-enter the registry to query
//! (`is_loaded`) or to register further addons; they must not expect to
//! mutate the entries currently being drained — those are already out
//! of the table.
//!
//! # Duplicate policy
//!
//! Registering an already-present `(kind, name)` logs a warning, keeps
//! the first entry, and still returns `Ok`. Redundant registration
//! attempts by dynamically loaded modules must never abort startup.

use crate::{AddonError, AddonKind, RegisterCtx, RegisterFn};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use tracing::{debug, warn};

/// Registry mapping `(kind, name)` to a pending registration callback.
pub struct AddonRegistry {
    entries: Mutex<HashMap<(AddonKind, String), RegisterFn>>,
}

impl AddonRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry adapters register into.
    #[must_use]
    pub fn global() -> &'static AddonRegistry {
        static GLOBAL: OnceLock<AddonRegistry> = OnceLock::new();
        GLOBAL.get_or_init(AddonRegistry::new)
    }

    /// Registers a callback under `(kind, name)`.
    ///
    /// A duplicate is kept-first: the new callback is dropped with a
    /// warning and the call still succeeds.
    ///
    /// # Errors
    ///
    /// [`AddonError::InvalidTarget`] when `name` is empty.
    pub fn register(
        &self,
        kind: AddonKind,
        name: impl Into<String>,
        register: RegisterFn,
    ) -> Result<(), AddonError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AddonError::InvalidTarget("empty addon name".into()));
        }

        let mut entries = self.entries.lock().expect("addon registry lock poisoned");
        if entries.contains_key(&(kind, name.clone())) {
            warn!(%kind, %name, "duplicate addon registration ignored");
            return Ok(());
        }
        debug!(%kind, %name, "addon registered");
        entries.insert((kind, name), register);
        Ok(())
    }

    /// Returns `true` while `(kind, name)` has a pending callback.
    #[must_use]
    pub fn is_loaded(&self, kind: AddonKind, name: &str) -> bool {
        self.entries
            .lock()
            .expect("addon registry lock poisoned")
            .contains_key(&(kind, name.to_string()))
    }

    /// Drains the registry, invoking every callback exactly once.
    ///
    /// Callbacks run in `(kind, name)` order for deterministic startup,
    /// with the lock released first. Entries registered *during* the
    /// drain stay in the table for a later drain.
    pub fn register_all(&self, ctx: &mut RegisterCtx) {
        let mut drained: Vec<((AddonKind, String), RegisterFn)> = {
            let mut entries = self.entries.lock().expect("addon registry lock poisoned");
            entries.drain().collect()
        };
        drained.sort_by(|a, b| {
            (kind_order(a.0 .0), &a.0 .1).cmp(&(kind_order(b.0 .0), &b.0 .1))
        });

        for ((kind, name), register) in drained {
            debug!(%kind, %name, "invoking addon registration");
            register(ctx);
        }
    }

    /// Extracts and invokes one entry on demand.
    ///
    /// Returns `false`, with no side effects, when the entry is absent.
    pub fn register_specific(&self, kind: AddonKind, name: &str, ctx: &mut RegisterCtx) -> bool {
        let register = {
            let mut entries = self.entries.lock().expect("addon registry lock poisoned");
            entries.remove(&(kind, name.to_string()))
        };
        match register {
            Some(register) => {
                debug!(%kind, %name, "invoking addon registration");
                register(ctx);
                true
            }
            None => false,
        }
    }

    /// Number of pending registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("addon registry lock poisoned")
            .len()
    }

    /// Returns `true` when no registration is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AddonRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Protocols and groups register before the extensions hosted in them.
fn kind_order(kind: AddonKind) -> u8 {
    match kind {
        AddonKind::Protocol => 0,
        AddonKind::ExtensionGroup => 1,
        AddonKind::Extension => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extension, ExtensionError};
    use axon_msg::{Cmd, CmdResult, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Nop(&'static str);
    impl Extension for Nop {
        fn name(&self) -> &str {
            self.0
        }
        fn on_cmd(&mut self, cmd: Cmd) -> Result<CmdResult, ExtensionError> {
            Ok(CmdResult::for_cmd(&cmd, StatusCode::Ok))
        }
    }

    fn installer(name: &'static str, calls: Arc<AtomicUsize>) -> RegisterFn {
        Box::new(move |ctx: &mut RegisterCtx| {
            calls.fetch_add(1, Ordering::SeqCst);
            ctx.install_extension("grp", name, Box::new(Nop(name)));
        })
    }

    #[test]
    fn register_and_query() {
        let reg = AddonRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        reg.register(AddonKind::Extension, "echo", installer("echo", calls))
            .unwrap();

        assert!(reg.is_loaded(AddonKind::Extension, "echo"));
        assert!(!reg.is_loaded(AddonKind::Extension, "other"));
        assert!(!reg.is_loaded(AddonKind::Protocol, "echo"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn duplicate_registration_keeps_first_and_succeeds() {
        let reg = AddonRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        reg.register(AddonKind::Extension, "echo", installer("echo", first.clone()))
            .unwrap();
        // Same (kind, name): warn, keep first, still Ok.
        reg.register(
            AddonKind::Extension,
            "echo",
            installer("echo", second.clone()),
        )
        .unwrap();

        assert_eq!(reg.len(), 1);

        let mut ctx = RegisterCtx::new("app://test");
        reg.register_all(&mut ctx);

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_name_is_invalid_target() {
        let reg = AddonRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let err = reg
            .register(AddonKind::Extension, "", installer("x", calls))
            .unwrap_err();
        assert_eq!(err, AddonError::InvalidTarget("empty addon name".into()));
    }

    #[test]
    fn register_all_drains_and_invokes_once() {
        let reg = AddonRegistry::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        reg.register(AddonKind::Extension, "a", installer("a", a.clone()))
            .unwrap();
        reg.register(AddonKind::Extension, "b", installer("b", b.clone()))
            .unwrap();

        let mut ctx = RegisterCtx::new("app://test");
        reg.register_all(&mut ctx);

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.installed_count(), 2);
        assert!(reg.is_empty());

        // A second drain finds nothing; counts stay at one.
        reg.register_all(&mut ctx);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callbacks_may_reenter_the_registry() {
        let reg_ref: &'static AddonRegistry = Box::leak(Box::new(AddonRegistry::new()));

        // Use the leaked registry so the callback can query it.
        reg_ref
            .register(
                AddonKind::Extension,
                "reentrant",
                Box::new(move |ctx: &mut RegisterCtx| {
                    // The drained entry is already out of the table.
                    assert!(!reg_ref.is_loaded(AddonKind::Extension, "reentrant"));
                    ctx.install_extension("grp", "reentrant", Box::new(Nop("reentrant")));
                }),
            )
            .unwrap();

        let mut ctx = RegisterCtx::new("app://test");
        reg_ref.register_all(&mut ctx);
        assert_eq!(ctx.installed_count(), 1);
    }

    #[test]
    fn register_specific_invokes_one_entry() {
        let reg = AddonRegistry::new();
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        reg.register(AddonKind::Extension, "a", installer("a", a.clone()))
            .unwrap();
        reg.register(AddonKind::Extension, "b", installer("b", b.clone()))
            .unwrap();

        let mut ctx = RegisterCtx::new("app://test");
        assert!(reg.register_specific(AddonKind::Extension, "a", &mut ctx));

        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
        assert!(!reg.is_loaded(AddonKind::Extension, "a"));
        assert!(reg.is_loaded(AddonKind::Extension, "b"));
    }

    #[test]
    fn register_specific_unknown_returns_false_without_side_effects() {
        let reg = AddonRegistry::new();
        let mut ctx = RegisterCtx::new("app://test");

        assert!(!reg.register_specific(AddonKind::Extension, "ghost", &mut ctx));
        assert_eq!(ctx.installed_count(), 0);
        assert!(reg.is_empty());
    }

    #[test]
    fn registration_during_drain_stays_for_later() {
        let reg_ref: &'static AddonRegistry = Box::leak(Box::new(AddonRegistry::new()));
        let late = Arc::new(AtomicUsize::new(0));
        let late2 = late.clone();

        reg_ref
            .register(
                AddonKind::Extension,
                "early",
                Box::new(move |_ctx: &mut RegisterCtx| {
                    reg_ref
                        .register(AddonKind::Extension, "late", installer("late", late2.clone()))
                        .unwrap();
                }),
            )
            .unwrap();

        let mut ctx = RegisterCtx::new("app://test");
        reg_ref.register_all(&mut ctx);

        // "late" was registered mid-drain and is still pending.
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert!(reg_ref.is_loaded(AddonKind::Extension, "late"));

        reg_ref.register_all(&mut ctx);
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }
}
