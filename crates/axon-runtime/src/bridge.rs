//! The protocol asynced bridge.
//!
//! A protocol implementation owns its own thread and loop; the
//! connection object it feeds lives on a core (app/engine) loop.
//! The bridge lets the two talk without either side blocking on the
//! other's lock: everything crosses as a task posted onto the target
//! loop, and messages always cross by value.
//!
//! ```text
//!  implementation loop                      core loop
//! ┌────────────────────┐   post task    ┌──────────────────┐
//! │ decoder ─ on_input ├───────────────►│ sink(msg)        │
//! │                    │                │                  │
//! │ migration mirror   │◄───────────────┤ begin/finish_    │
//! │ pending queue      │   post task    │ migration        │
//! └────────────────────┘                └──────────────────┘
//! ```
//!
//! # Migration
//!
//! A freshly accepted connection is first owned by the accepting
//! context and later reassigned to the engine loop that will actually
//! own it. Until that handoff finishes it is unsafe for the
//! implementation side to resolve the connection's loop, so input
//! arriving mid-migration is deferred:
//!
//! - `Init` — pre-migration; input is deferred.
//! - `Migrating` — handoff in progress; input is deferred.
//! - `Done` — stable; input relays directly.
//!
//! The mirror is advanced only by tasks posted to the implementation
//! loop, so the implementation side always reads a value its own loop
//! wrote — the original's racily-read flag is replaced by an explicit
//! message carrying the new state. On reaching `Done` the deferred
//! queue replays toward the core loop in arrival order, ahead of any
//! newer input.
//!
//! # Closing
//!
//! Closing the owning connection runs [`ProtocolBridge::impl_close_action`]
//! as the close action of a node in the core side's close graph: the
//! registered implementation closer runs on the implementation loop and
//! reports back through the [`ActionDone`] token, which finishes the
//! core-side close. Teardown that never reports done stalls the close,
//! never falsifies it.

use crate::close::{ActionDone, CloseAction};
use crate::config::BridgeConfig;
use crate::runloop::{LoopHandle, Runloop};
use axon_msg::Msg;
use axon_types::ErrorCode;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Bridge layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The migration pending queue is full; the message was dropped.
    ///
    /// **Recoverable** - retry once migration completes.
    #[error("migration pending queue is full")]
    PendingFull,

    /// The target loop has stopped.
    ///
    /// **Not recoverable** - a stopped loop never restarts.
    #[error("bridge target loop has stopped")]
    LoopGone,
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::PendingFull => "BRIDGE_PENDING_FULL",
            Self::LoopGone => "BRIDGE_LOOP_GONE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::PendingFull)
    }
}

/// Ownership handoff progress of a bridged connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
    /// Pre-migration; still owned by the accepting context.
    Init,
    /// Handoff in progress; loop resolution must be deferred.
    Migrating,
    /// Handoff finished; stable.
    Done,
}

/// Handler receiving relayed messages on the core loop.
pub type MsgSink = Box<dyn FnMut(Msg) + Send>;

/// Handler receiving connect/disconnect transitions on the core loop.
pub type ConnectedSink = Box<dyn FnMut(bool) + Send>;

/// Teardown of the implementation-side resources, run on the
/// implementation loop.
pub type ImplCloser = Box<dyn FnOnce(ActionDone) + Send>;

struct BridgeState {
    migration: MigrationState,
    pending: VecDeque<Msg>,
}

/// Cloneable bridge between a protocol implementation loop and a core
/// loop.
///
/// Method docs note which side each call belongs to; the split mirrors
/// the two task-posting primitives the bridge is built from.
#[derive(Clone)]
pub struct ProtocolBridge {
    state: Arc<Mutex<BridgeState>>,
    core: LoopHandle,
    impl_loop: LoopHandle,
    sink: Arc<Mutex<MsgSink>>,
    connected_sink: Arc<Mutex<Option<ConnectedSink>>>,
    impl_closer: Arc<Mutex<Option<ImplCloser>>>,
    cfg: BridgeConfig,
}

impl ProtocolBridge {
    /// Creates a bridge relaying decoded input into `sink` on `core`.
    #[must_use]
    pub fn new(core: LoopHandle, impl_loop: LoopHandle, cfg: BridgeConfig, sink: MsgSink) -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState {
                migration: MigrationState::Init,
                pending: VecDeque::new(),
            })),
            core,
            impl_loop,
            sink: Arc::new(Mutex::new(sink)),
            connected_sink: Arc::new(Mutex::new(None)),
            impl_closer: Arc::new(Mutex::new(None)),
            cfg,
        }
    }

    /// Registers the connect/disconnect handler (core side).
    pub fn set_connected_sink(&self, sink: ConnectedSink) {
        *self.connected_sink.lock() = Some(sink);
    }

    /// Registers the implementation-side teardown (implementation side).
    pub fn set_impl_closer(&self, closer: ImplCloser) {
        *self.impl_closer.lock() = Some(closer);
    }

    /// Feeds one decoded wire message in. **Implementation loop.**
    ///
    /// While migration is not [`Done`](MigrationState::Done) the
    /// message is deferred in arrival order; otherwise it is posted to
    /// the core loop.
    ///
    /// # Errors
    ///
    /// [`BridgeError::PendingFull`] when the deferred queue overflows,
    /// [`BridgeError::LoopGone`] when the core loop has stopped.
    pub fn on_input(&self, msg: Msg) -> Result<(), BridgeError> {
        {
            let mut state = self.state.lock();
            if state.migration != MigrationState::Done {
                if state.pending.len() >= self.cfg.pending_capacity {
                    warn!(
                        capacity = self.cfg.pending_capacity,
                        "pending queue full mid-migration, dropping message"
                    );
                    return Err(BridgeError::PendingFull);
                }
                debug!(
                    queued = state.pending.len() + 1,
                    "deferring input until migration completes"
                );
                state.pending.push_back(msg);
                return Ok(());
            }
        }
        self.relay_to_core(msg)
    }

    /// Reports a connect/disconnect transition. **Implementation loop.**
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopGone`] when the core loop has stopped.
    pub fn on_connected(&self, connected: bool) -> Result<(), BridgeError> {
        let sink = self.connected_sink.clone();
        self.core
            .post(Box::new(move || {
                if let Some(sink) = sink.lock().as_mut() {
                    sink(connected);
                }
            }))
            .map_err(|_| BridgeError::LoopGone)
    }

    /// Advances the mirror to `Migrating`. **Core loop.**
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopGone`] when the implementation loop has
    /// stopped.
    pub fn begin_migration(&self) -> Result<(), BridgeError> {
        let state = self.state.clone();
        self.impl_loop
            .post(Box::new(move || {
                let mut state = state.lock();
                debug_assert_eq!(state.migration, MigrationState::Init);
                state.migration = MigrationState::Migrating;
            }))
            .map_err(|_| BridgeError::LoopGone)
    }

    /// Advances the mirror to `Done` and replays deferred input.
    /// **Core loop.**
    ///
    /// The replay happens as a task on the implementation loop, so
    /// every message deferred before this call relays ahead of any
    /// input arriving after it.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopGone`] when the implementation loop has
    /// stopped.
    pub fn finish_migration(&self) -> Result<(), BridgeError> {
        let bridge = self.clone();
        self.impl_loop
            .post(Box::new(move || {
                let drained: Vec<Msg> = {
                    let mut state = bridge.state.lock();
                    state.migration = MigrationState::Done;
                    state.pending.drain(..).collect()
                };
                if !drained.is_empty() {
                    info!(count = drained.len(), "replaying input deferred during migration");
                }
                for msg in drained {
                    if let Err(err) = bridge.relay_to_core(msg) {
                        warn!(%err, "dropping deferred message");
                    }
                }
            }))
            .map_err(|_| BridgeError::LoopGone)
    }

    /// The migration mirror as last written by the implementation loop.
    #[must_use]
    pub fn migration_state(&self) -> MigrationState {
        self.state.lock().migration
    }

    /// Number of messages currently deferred.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Builds the close action of the owning connection's close node.
    /// **Core side.**
    ///
    /// The action posts the registered implementation closer onto the
    /// implementation loop; its completion travels back through the
    /// [`ActionDone`] token. With no closer registered (or the
    /// implementation loop already gone) the action completes
    /// immediately — there is nothing left to tear down.
    #[must_use]
    pub fn impl_close_action(&self) -> CloseAction {
        let bridge = self.clone();
        Box::new(move |done: ActionDone| {
            let closer = bridge.impl_closer.lock().take();
            match closer {
                Some(closer) if bridge.impl_loop.alive() => {
                    debug!("posting implementation teardown");
                    let _ = bridge.impl_loop.post(Box::new(move || closer(done)));
                }
                Some(_) | None => done.complete(),
            }
        })
    }

    fn relay_to_core(&self, msg: Msg) -> Result<(), BridgeError> {
        let sink = self.sink.clone();
        self.core
            .post(Box::new(move || (sink.lock())(msg)))
            .map_err(|_| BridgeError::LoopGone)
    }
}
