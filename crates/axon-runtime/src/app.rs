//! The app: the outermost owner.
//!
//! An [`App`] owns the app loop, the predefined-graph table, the
//! engines of its running graphs, and the root of the close graph.
//! It is the entry point for app-level commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `start_graph` | resolve alias / inline definition, spawn an engine |
//! | `stop_graph` | close one engine subtree |
//! | `close_app` | close everything, then release [`wait`](App::wait) |
//!
//! Ordinary messages submitted to the app are destination-corrected
//! against the graph table and forwarded to the owning engine's loop.

use crate::close::{CloseGraph, CloseableSpec, NodeId};
use crate::engine::{correct_dest, Engine, EngineError, GraphTable};
use crate::runloop::{LoopHandle, Runloop, TaskLoop};
use axon_extension::{AddonKind, AddonRegistry, RegisterCtx};
use axon_msg::{CmdKind, Msg};
use axon_types::GraphId;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The outermost runtime object; one per embedded app.
///
/// Must be created inside a tokio runtime (the app loop is spawned on
/// it).
pub struct App {
    uri: String,
    handle: LoopHandle,
    graphs: Arc<Mutex<GraphTable>>,
    engines: Arc<Mutex<HashMap<GraphId, Engine>>>,
    nodes: Arc<Mutex<HashMap<GraphId, NodeId>>>,
    close: CloseGraph,
    root: NodeId,
    closed_rx: watch::Receiver<bool>,
}

impl App {
    /// Creates an app and spawns its loop.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let handle = TaskLoop::spawn();
        let close = CloseGraph::with_home(handle.clone());

        let (closed_tx, closed_rx) = watch::channel(false);
        let app_handle = handle.clone();
        let root = close.add_root(
            CloseableSpec::immediate("app")
                .close_root(true)
                .on_closed(move || {
                    let _ = closed_tx.send(true);
                    app_handle.stop();
                }),
        );

        info!(%uri, "app started");
        Self {
            uri,
            handle,
            graphs: Arc::new(Mutex::new(GraphTable::new())),
            engines: Arc::new(Mutex::new(HashMap::new())),
            nodes: Arc::new(Mutex::new(HashMap::new())),
            close,
            root,
            closed_rx,
        }
    }

    /// The app's URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The app loop's handle.
    #[must_use]
    pub fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    /// Registers a predefined graph alias.
    pub fn register_predefined_graph(&self, alias: impl Into<String>) -> GraphId {
        self.graphs.lock().register(alias)
    }

    /// Starts the predefined graph behind `alias`.
    ///
    /// Starting an already-running graph returns its engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownGraph`] when the alias is not registered.
    pub fn start_graph(&self, alias: &str) -> Result<Engine, EngineError> {
        let id = self
            .graphs
            .lock()
            .resolve(alias)
            .ok_or_else(|| EngineError::UnknownGraph(alias.to_string()))?;
        Ok(self.spawn_engine(id, alias))
    }

    /// Starts a graph from an inline definition.
    ///
    /// Each `nodes[]` entry names an extension addon; the addon's
    /// registration callback is invoked through the process-wide
    /// registry and the extensions it hands over are hosted in the new
    /// engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::AddonNotFound`] when a referenced addon has no
    /// pending registration; the half-started engine is torn down.
    pub fn start_graph_inline(&self, graph_json: &Value) -> Result<Engine, EngineError> {
        let id = GraphId::new();
        let engine = self.spawn_engine(id, "<inline>");

        let mut ctx = RegisterCtx::new(self.uri.clone());
        if let Some(nodes) = graph_json.get("nodes").and_then(Value::as_array) {
            for node in nodes {
                let Some(addon) = node.get("addon").and_then(Value::as_str) else {
                    continue;
                };
                if !AddonRegistry::global().register_specific(
                    AddonKind::Extension,
                    addon,
                    &mut ctx,
                ) {
                    warn!(%addon, "graph references an unregistered addon");
                    self.stop_graph(id);
                    return Err(EngineError::AddonNotFound(addon.to_string()));
                }
            }
        }
        engine.install(ctx.drain_installed());
        Ok(engine)
    }

    /// The engine of a running graph.
    #[must_use]
    pub fn engine(&self, id: GraphId) -> Option<Engine> {
        self.engines.lock().get(&id).cloned()
    }

    /// Number of running graphs.
    #[must_use]
    pub fn graph_count(&self) -> usize {
        self.engines.lock().len()
    }

    /// Closes one running graph. Returns `false` when it is not running.
    pub fn stop_graph(&self, id: GraphId) -> bool {
        let node = self.nodes.lock().remove(&id);
        match node {
            Some(node) => {
                info!(graph = %id, "stopping graph");
                self.close.close(node);
                true
            }
            None => false,
        }
    }

    /// Submits a message to the app.
    ///
    /// App-level commands are handled here; everything else is
    /// destination-corrected and forwarded to the owning engine.
    ///
    /// # Errors
    ///
    /// [`EngineError::NoDest`] / [`EngineError::Unroutable`] when no
    /// engine owns the (corrected) first destination, plus the
    /// app-level command errors.
    pub fn submit(&self, msg: Msg) -> Result<(), EngineError> {
        if let Msg::Cmd(cmd) = &msg {
            match cmd.kind() {
                CmdKind::CloseApp => {
                    self.close();
                    return Ok(());
                }
                CmdKind::StartGraph {
                    predefined_graph: Some(alias),
                    ..
                } => {
                    self.start_graph(alias)?;
                    return Ok(());
                }
                CmdKind::StartGraph {
                    predefined_graph: None,
                    graph_json,
                } => {
                    let graph_json = graph_json.clone().unwrap_or(Value::Null);
                    self.start_graph_inline(&graph_json)?;
                    return Ok(());
                }
                CmdKind::StopGraph { graph_id } => {
                    let id: GraphId = graph_id
                        .parse()
                        .map_err(|_| EngineError::UnknownGraph(graph_id.clone()))?;
                    if !self.stop_graph(id) {
                        return Err(EngineError::UnknownGraph(graph_id.clone()));
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        let mut msg = msg;
        correct_dest(&self.graphs.lock(), &mut msg);

        let Some(dest) = msg.header().first_dest().cloned() else {
            return Err(EngineError::NoDest);
        };
        let graph_id: GraphId = dest
            .graph
            .parse()
            .map_err(|_| EngineError::Unroutable(dest.clone()))?;
        let engine = self
            .engines
            .lock()
            .get(&graph_id)
            .cloned()
            .ok_or_else(|| EngineError::Unroutable(dest.clone()))?;
        engine.submit(msg)
    }

    /// Closes the whole app: every engine subtree, then the root.
    pub fn close(&self) {
        info!(uri = %self.uri, "app closing");
        self.close.close(self.root);
    }

    /// Waits until the app has fully closed.
    ///
    /// The outermost blocking primitive; everything else in the
    /// runtime is task-posting.
    pub async fn wait(&self) {
        let mut rx = self.closed_rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    fn spawn_engine(&self, id: GraphId, label: &str) -> Engine {
        if let Some(existing) = self.engines.lock().get(&id) {
            debug!(graph = %id, "graph already running");
            return existing.clone();
        }

        let engine_handle = TaskLoop::spawn();
        let engine = Engine::new(id, engine_handle);

        // The engine's close action winds it down on its own loop and
        // reports back through the token.
        let action_engine = engine.clone();
        let engines = self.engines.clone();
        let nodes = self.nodes.clone();
        let node = self.close.add_child(
            self.root,
            CloseableSpec::new(
                format!("graph:{label}"),
                Box::new(move |done| {
                    if !action_engine.handle().alive() {
                        action_engine.stop();
                        done.complete();
                        return;
                    }
                    let engine = action_engine.clone();
                    let _ = action_engine.handle().post(Box::new(move || {
                        engine.stop();
                        done.complete();
                    }));
                }),
            )
            .on_closed(move || {
                engines.lock().remove(&id);
                nodes.lock().remove(&id);
            }),
        );

        self.engines.lock().insert(id, engine.clone());
        self.nodes.lock().insert(id, node);
        info!(graph = %id, %label, "graph started");
        engine
    }
}
