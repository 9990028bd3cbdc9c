//! The per-connection object on the core side.
//!
//! A [`Connection`] owns the bridge to its protocol implementation and
//! the close node that tears both down. It is the object that gets
//! migrated: accepted on a listening context, later handed to the
//! engine loop that owns it.
//!
//! # Lifecycle
//!
//! ```text
//! accept ──► Connection::new (Init)
//!                │ migrate()            accepting context → engine
//!                ▼
//!            Migrating ── input deferred by the bridge
//!                │ migration_done()
//!                ▼
//!            Done ── input relays to the sink on the core loop
//!                │ close()
//!                ▼
//!            implementation teardown ──► on_closed notifiers
//! ```

use crate::bridge::{BridgeError, MigrationState, MsgSink, ProtocolBridge};
use crate::close::{CloseGraph, CloseableSpec, NodeId};
use crate::config::BridgeConfig;
use crate::runloop::LoopHandle;
use axon_types::ConnId;
use tracing::debug;

/// A bridged physical connection.
pub struct Connection {
    id: ConnId,
    bridge: ProtocolBridge,
    close: CloseGraph,
    node: NodeId,
}

impl Connection {
    /// Creates a connection whose decoded input lands in `sink` on the
    /// `core` loop.
    #[must_use]
    pub fn new(
        core: LoopHandle,
        impl_loop: LoopHandle,
        cfg: BridgeConfig,
        sink: MsgSink,
    ) -> Self {
        let bridge = ProtocolBridge::new(core.clone(), impl_loop, cfg, sink);
        let close = CloseGraph::with_home(core);
        let node = close.add_root(
            CloseableSpec::new("connection", bridge.impl_close_action()).close_root(true),
        );
        let id = ConnId::new();
        debug!(%id, "connection created");
        Self {
            id,
            bridge,
            close,
            node,
        }
    }

    /// Stable identity across migration.
    #[must_use]
    pub fn id(&self) -> ConnId {
        self.id
    }

    /// The bridge the protocol implementation feeds.
    #[must_use]
    pub fn bridge(&self) -> &ProtocolBridge {
        &self.bridge
    }

    /// Starts the ownership handoff to the owning engine.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopGone`] when the implementation loop stopped.
    pub fn migrate(&self) -> Result<(), BridgeError> {
        debug!(id = %self.id, "connection migration started");
        self.bridge.begin_migration()
    }

    /// Completes the handoff; deferred input replays in arrival order.
    ///
    /// # Errors
    ///
    /// [`BridgeError::LoopGone`] when the implementation loop stopped.
    pub fn migration_done(&self) -> Result<(), BridgeError> {
        debug!(id = %self.id, "connection migration done");
        self.bridge.finish_migration()
    }

    /// The bridge's migration mirror (as the implementation side sees it).
    #[must_use]
    pub fn migration_state(&self) -> MigrationState {
        self.bridge.migration_state()
    }

    /// Registers a notifier fired once the connection fully closed.
    pub fn on_closed(&self, hook: impl FnOnce() + Send + 'static) {
        self.close.on_closed(self.node, hook);
    }

    /// Closes the connection: the implementation tears down on its own
    /// loop and reports back before the close completes.
    pub fn close(&self) {
        self.close.close(self.node);
    }

    /// Signals, from the implementation side, that the connection wants
    /// to disappear (e.g. the peer hung up).
    pub fn intend_to_close(&self) {
        self.close.intend_to_close(self.node);
    }

    /// Returns `true` once the close cycle finished.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        !self.close.contains(self.node)
    }
}
