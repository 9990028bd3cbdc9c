//! The routing engine.
//!
//! One engine owns one graph: a loop, the extensions hosted in the
//! graph, and the timers armed by them. Messages reach extensions by
//! destination [`Loc`]; everything an engine does happens as tasks on
//! its own loop.
//!
//! # Destination correction
//!
//! Destinations may name a predefined graph *alias* instead of a
//! concrete graph id. [`correct_dest`] resolves aliases against the
//! live [`GraphTable`]; a miss is deliberately silent — the unresolved
//! destination surfaces later, at dispatch, as
//! [`EngineError::Unroutable`] carrying the offending `Loc`.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`EngineError::NoDest`] | `ENGINE_NO_DEST` | No |
//! | [`EngineError::Unroutable`] | `ENGINE_UNROUTABLE` | No |
//! | [`EngineError::UnknownGraph`] | `ENGINE_UNKNOWN_GRAPH` | Yes |
//! | [`EngineError::AddonNotFound`] | `ENGINE_ADDON_NOT_FOUND` | Yes |
//! | [`EngineError::LoopGone`] | `ENGINE_LOOP_GONE` | No |

use crate::runloop::{LoopHandle, Runloop, Task, TimerHandle};
use axon_extension::{Extension, InstalledExtension};
use axon_msg::{Cmd, CmdKind, CmdResult, Loc, Msg, StatusCode};
use axon_types::{ErrorCode, GraphId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Engine layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The message has an empty destination list.
    #[error("message has no destination")]
    NoDest,

    /// No live target matches the destination.
    ///
    /// Also raised for destinations whose graph alias never resolved.
    #[error("no route to {0}")]
    Unroutable(Loc),

    /// The predefined graph alias is not registered.
    #[error("unknown graph '{0}'")]
    UnknownGraph(String),

    /// A graph node references an addon nobody registered.
    #[error("no extension addon named '{0}'")]
    AddonNotFound(String),

    /// The target loop has stopped.
    #[error("engine loop has stopped")]
    LoopGone,
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoDest => "ENGINE_NO_DEST",
            Self::Unroutable(_) => "ENGINE_UNROUTABLE",
            Self::UnknownGraph(_) => "ENGINE_UNKNOWN_GRAPH",
            Self::AddonNotFound(_) => "ENGINE_ADDON_NOT_FOUND",
            Self::LoopGone => "ENGINE_LOOP_GONE",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Graphs and addons may be registered later; the rest needs a
        // caller-side fix.
        matches!(self, Self::UnknownGraph(_) | Self::AddonNotFound(_))
    }
}

/// Registry of predefined graph aliases.
#[derive(Debug, Default)]
pub struct GraphTable {
    aliases: HashMap<String, GraphId>,
}

impl GraphTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predefined alias, returning its deterministic id.
    pub fn register(&mut self, alias: impl Into<String>) -> GraphId {
        let alias = alias.into();
        let id = GraphId::predefined(&alias);
        self.aliases.insert(alias, id);
        id
    }

    /// Resolves an alias to its concrete id.
    #[must_use]
    pub fn resolve(&self, alias: &str) -> Option<GraphId> {
        self.aliases.get(alias).copied()
    }

    /// Number of registered aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` when no alias is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Resolves predefined graph aliases in the message's destinations.
///
/// Every destination whose `graph` field is neither empty nor already a
/// concrete id is looked up in `table`; hits are rewritten to the
/// concrete id, misses are left untouched (and will fail at dispatch).
/// The list is replaced wholesale, never partially.
pub fn correct_dest(table: &GraphTable, msg: &mut Msg) {
    let corrected: Vec<Loc> = msg
        .header()
        .dests()
        .iter()
        .cloned()
        .map(|mut loc| {
            if !loc.graph.is_empty() && loc.graph.parse::<GraphId>().is_err() {
                if let Some(id) = table.resolve(&loc.graph) {
                    loc.graph = id.to_string();
                }
            }
            loc
        })
        .collect();
    msg.header_mut().set_dest(corrected);
}

struct EngineInner {
    exts: HashMap<(String, String), Box<dyn Extension>>,
    timers: HashMap<u64, TimerHandle>,
}

/// One graph's routing engine. Cloneable handle.
#[derive(Clone)]
pub struct Engine {
    graph_id: GraphId,
    handle: LoopHandle,
    inner: Arc<Mutex<EngineInner>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph_id", &self.graph_id)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine for `graph_id` running on `handle`'s loop.
    #[must_use]
    pub fn new(graph_id: GraphId, handle: LoopHandle) -> Self {
        Self {
            graph_id,
            handle,
            inner: Arc::new(Mutex::new(EngineInner {
                exts: HashMap::new(),
                timers: HashMap::new(),
            })),
        }
    }

    /// The graph this engine runs.
    #[must_use]
    pub fn graph_id(&self) -> GraphId {
        self.graph_id
    }

    /// The engine's loop handle.
    #[must_use]
    pub fn handle(&self) -> &LoopHandle {
        &self.handle
    }

    /// Hosts an extension under `(group, name)`, running its startup
    /// lifecycle.
    ///
    /// Startup failures are logged and the extension is not hosted;
    /// the graph keeps starting (matching the lenient addon policy).
    pub fn add_extension(
        &self,
        group: impl Into<String>,
        name: impl Into<String>,
        mut ext: Box<dyn Extension>,
    ) {
        let group = group.into();
        let name = name.into();
        if let Err(err) = ext.on_init().and_then(|()| ext.on_start()) {
            warn!(%group, %name, %err, "extension failed to start, not hosted");
            return;
        }
        debug!(%group, %name, "extension hosted");
        self.inner.lock().exts.insert((group, name), ext);
    }

    /// Hosts every extension handed over by addon registration.
    pub fn install(&self, installed: Vec<InstalledExtension>) {
        for entry in installed {
            self.add_extension(entry.group, entry.name, entry.extension);
        }
    }

    /// Number of hosted extensions.
    #[must_use]
    pub fn extension_count(&self) -> usize {
        self.inner.lock().exts.len()
    }

    /// Posts a dispatch of `msg` onto the engine loop.
    ///
    /// Routing errors inside the task are logged; errors that need the
    /// caller travel back via messages, not shared state.
    ///
    /// # Errors
    ///
    /// [`EngineError::LoopGone`] when the engine loop has stopped.
    pub fn submit(&self, msg: Msg) -> Result<(), EngineError> {
        let engine = self.clone();
        self.handle
            .post(Box::new(move || {
                if let Err(err) = engine.dispatch(msg) {
                    warn!(%err, "message dropped");
                }
            }))
            .map_err(|_| EngineError::LoopGone)
    }

    /// Routes `msg` to every destination.
    ///
    /// Runs on the engine loop. Each destination receives its own
    /// deep copy; results produced by command handlers are routed
    /// onward to their destinations (and dropped with a debug log when
    /// the requester is not hosted here).
    ///
    /// # Errors
    ///
    /// [`EngineError::NoDest`] on an empty destination list,
    /// [`EngineError::Unroutable`] on the first destination without a
    /// live target.
    pub fn dispatch(&self, msg: Msg) -> Result<(), EngineError> {
        if let Msg::Cmd(cmd) = &msg {
            if matches!(cmd.kind(), CmdKind::Timer { .. }) {
                return self.handle_timer(cmd);
            }
        }

        let dests = msg.header().dests().to_vec();
        if dests.is_empty() {
            return Err(EngineError::NoDest);
        }

        let mut followups = Vec::new();
        for dest in &dests {
            self.check_routable(dest)?;
            if let Some(followup) = self.deliver(dest, &msg)? {
                followups.push(followup);
            }
        }
        for followup in followups {
            self.route_followup(followup);
        }
        Ok(())
    }

    /// Stops the engine: timers cancelled, extensions wound down, loop
    /// stopped. Runs on the engine loop during close.
    pub fn stop(&self) {
        info!(graph = %self.graph_id, "engine stopping");
        let (exts, timers) = {
            let mut inner = self.inner.lock();
            (
                inner.exts.drain().collect::<Vec<_>>(),
                inner.timers.drain().collect::<Vec<_>>(),
            )
        };
        for (_, timer) in timers {
            timer.cancel();
        }
        for (_, mut ext) in exts {
            ext.on_stop();
            ext.on_deinit();
        }
        self.handle.stop();
    }

    fn check_routable(&self, dest: &Loc) -> Result<(), EngineError> {
        if dest.validate().is_err() || !dest.has_extension() {
            return Err(EngineError::Unroutable(dest.clone()));
        }
        if !dest.graph.is_empty() {
            // An unresolved alias (not a concrete id) or a foreign
            // graph cannot be routed from here.
            match dest.graph.parse::<GraphId>() {
                Ok(id) if id == self.graph_id => {}
                _ => return Err(EngineError::Unroutable(dest.clone())),
            }
        }
        Ok(())
    }

    fn deliver(&self, dest: &Loc, msg: &Msg) -> Result<Option<Msg>, EngineError> {
        let key = (dest.extension_group.clone(), dest.extension.clone());
        let mut inner = self.inner.lock();
        let Some(ext) = inner.exts.get_mut(&key) else {
            return Err(EngineError::Unroutable(dest.clone()));
        };

        match msg.clone() {
            Msg::Cmd(cmd) => {
                let result = match ext.on_cmd(cmd.clone()) {
                    Ok(result) => result,
                    Err(err) => {
                        debug!(%err, name = cmd.header().name(), "command handler failed");
                        let status = if err.is_recoverable() {
                            StatusCode::Error
                        } else {
                            StatusCode::Invalid
                        };
                        CmdResult::for_cmd(&cmd, status)
                    }
                };
                Ok((result.header().dest_count() > 0).then(|| Msg::CmdResult(result)))
            }
            Msg::CmdResult(result) => {
                ext.on_cmd_result(result);
                Ok(None)
            }
            Msg::Data(data) => {
                ext.on_data(data);
                Ok(None)
            }
            Msg::AudioFrame(frame) => {
                ext.on_audio_frame(frame);
                Ok(None)
            }
            Msg::VideoFrame(frame) => {
                ext.on_video_frame(frame);
                Ok(None)
            }
        }
    }

    /// Routes a handler-produced result onward. A result whose
    /// requester is not hosted here is dropped quietly — the command
    /// already did its work.
    fn route_followup(&self, msg: Msg) {
        let Some(dest) = msg.header().first_dest().cloned() else {
            return;
        };
        if self.check_routable(&dest).is_err() {
            debug!(%dest, "result requester not local, dropped");
            return;
        }
        if self.deliver(&dest, &msg).is_err() {
            debug!(%dest, "result requester not hosted, dropped");
        }
    }

    fn handle_timer(&self, cmd: &Cmd) -> Result<(), EngineError> {
        let CmdKind::Timer {
            timer_id,
            timeout_us,
            times,
        } = cmd.kind()
        else {
            unreachable!("handle_timer is only called for timer commands");
        };
        let (timer_id, timeout_us, times) = (*timer_id, *timeout_us, *times);

        if timeout_us == 0 || times == 0 {
            if let Some(timer) = self.inner.lock().timers.remove(&timer_id) {
                timer.cancel();
                info!(timer_id, "timer cancelled");
            }
            return Ok(());
        }

        let requester = cmd.header().src().clone();
        if !requester.has_extension() {
            // A timeout with no requester has nowhere to fire.
            return Err(EngineError::Unroutable(requester));
        }

        let engine = self.clone();
        let times = if times < 0 { None } else { Some(times as u64) };
        let timer = self.handle.schedule(
            Duration::from_micros(timeout_us),
            times,
            move || -> Task {
                let engine = engine.clone();
                let requester = requester.clone();
                Box::new(move || {
                    let mut timeout = Cmd::timeout(timer_id);
                    timeout.header_mut().set_dest([requester]);
                    if let Err(err) = engine.dispatch(timeout.into()) {
                        debug!(%err, timer_id, "timeout undeliverable");
                    }
                })
            },
        );

        if let Some(replaced) = self.inner.lock().timers.insert(timer_id, timer) {
            replaced.cancel();
        }
        info!(timer_id, timeout_us, "timer armed");
        Ok(())
    }
}
