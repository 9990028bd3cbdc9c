//! The closeable resource graph.
//!
//! Shutting a runtime down means tearing down a tree of resources —
//! engines, connections, sockets, timers — some of which live on other
//! threads. The close graph makes that teardown composable and safe:
//! every node is closed exactly once, and a node reports itself closed
//! only after every resource under it has.
//!
//! # State machine
//!
//! ```text
//! Active ──► IntendToClose ──► Closing ──► Closed (terminal)
//!              bottom-up          │            │
//!              intent             │ action     │ notifiers fire,
//!                                 │ runs once  │ node is dropped
//! ```
//!
//! - `Active → IntendToClose`: a leaf signals it wants to disappear
//!   ([`CloseGraph::intend_to_close`]); intent travels up to the
//!   nearest *close root*, which begins the actual close instead of
//!   forwarding further.
//! - `IntendToClose → Closing`: the node's close action runs, exactly
//!   once. This is the only place teardown work happens.
//! - `Closing → Closed`: reached only once the action has reported
//!   done **and** every child is `Closed`. The node then fires its
//!   `on_closed` notifiers — leaves strictly before parents — and is
//!   removed from the graph.
//!
//! # Cross-thread resources
//!
//! A resource living on a foreign loop is represented by a local node
//! whose action posts the real teardown to that loop; the foreign side
//! reports back through the [`ActionDone`] token, which routes the
//! completion through the graph's home loop. No foreign node is ever
//! held as a direct child.
//!
//! # Failure semantics
//!
//! Closing a node twice is a programming-logic fault and panics. An
//! action that never reports done stalls the close — deliberately: a
//! false "closed" would let the owner free memory a foreign thread
//! still references. Timeout policy, if any, belongs to the caller.
//!
//! # Concurrency
//!
//! The graph is a cloneable handle around a mutex (the same shape the
//! runtime uses for its other registries). Transitions are expected to
//! be driven from the owning loop; completions arriving from foreign
//! threads are marshalled there via the home loop. Actions and
//! notifiers always run with the lock released, so they may re-enter
//! the graph freely.

use crate::runloop::{LoopHandle, Runloop};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Close lifecycle of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    /// In service.
    Active,
    /// Intent to close recorded; teardown not yet started.
    IntendToClose,
    /// Close action running (or awaiting children).
    Closing,
    /// Terminal. A `Closed` node is removed from the graph.
    Closed,
}

/// The teardown work of one node, invoked exactly once.
///
/// The action receives an [`ActionDone`] token and must eventually
/// call [`ActionDone::complete`] — possibly from another thread, after
/// asynchronous teardown.
pub type CloseAction = Box<dyn FnOnce(ActionDone) + Send>;

/// A notifier fired once the node is fully closed.
pub type ClosedHook = Box<dyn FnOnce() + Send>;

/// Identity of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

/// Completion token of a close action.
///
/// Dropping the token without calling [`complete`](Self::complete)
/// stalls the close; that is the contract — never report closed
/// falsely.
pub struct ActionDone {
    graph: CloseGraph,
    node: NodeId,
}

impl ActionDone {
    /// Reports the action finished, from any thread.
    ///
    /// When the graph has a home loop the completion is posted there;
    /// otherwise it is applied directly.
    pub fn complete(self) {
        match &self.graph.home {
            Some(home) => {
                let graph = self.graph.clone();
                let node = self.node;
                if home.post(Box::new(move || graph.action_done(node))).is_err() {
                    warn!("home loop gone, applying close completion directly");
                    self.graph.action_done(self.node);
                }
            }
            None => self.graph.action_done(self.node),
        }
    }
}

/// Blueprint of one closeable node.
pub struct CloseableSpec {
    name: String,
    close_root: bool,
    action: CloseAction,
    on_closed: Vec<ClosedHook>,
}

impl CloseableSpec {
    /// Creates a spec with the required close action.
    #[must_use]
    pub fn new(name: impl Into<String>, action: CloseAction) -> Self {
        Self {
            name: name.into(),
            close_root: false,
            action,
            on_closed: Vec::new(),
        }
    }

    /// A spec whose action completes immediately.
    ///
    /// For nodes that exist purely to group children.
    #[must_use]
    pub fn immediate(name: impl Into<String>) -> Self {
        Self::new(name, Box::new(ActionDone::complete))
    }

    /// Marks this node as a close root: bottom-up intent stops here and
    /// turns into an actual close.
    #[must_use]
    pub fn close_root(mut self, yes: bool) -> Self {
        self.close_root = yes;
        self
    }

    /// Adds an `on_closed` notifier.
    #[must_use]
    pub fn on_closed(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_closed.push(Box::new(hook));
        self
    }
}

struct Node {
    name: String,
    state: CloseState,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    open_children: usize,
    close_root: bool,
    action: Option<CloseAction>,
    action_done: bool,
    on_closed: Vec<ClosedHook>,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<u64, Node>,
    next_id: u64,
}

/// Cloneable handle to one owner's close graph.
#[derive(Clone)]
pub struct CloseGraph {
    inner: Arc<Mutex<GraphInner>>,
    home: Option<LoopHandle>,
}

impl CloseGraph {
    /// Creates a graph driven directly by its (single-threaded) owner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(GraphInner::default())),
            home: None,
        }
    }

    /// Creates a graph whose completions are marshalled onto `home`.
    #[must_use]
    pub fn with_home(home: LoopHandle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GraphInner::default())),
            home: Some(home),
        }
    }

    /// Adds a node with no parent.
    pub fn add_root(&self, spec: CloseableSpec) -> NodeId {
        self.add_node(None, spec)
    }

    /// Adds a node owned by `parent`.
    ///
    /// # Panics
    ///
    /// Panics when the parent is unknown or already closing; wiring a
    /// new resource under a closing owner is a bug.
    pub fn add_child(&self, parent: NodeId, spec: CloseableSpec) -> NodeId {
        self.add_node(Some(parent), spec)
    }

    fn add_node(&self, parent: Option<NodeId>, spec: CloseableSpec) -> NodeId {
        let mut inner = self.inner.lock();
        let id = NodeId(inner.next_id);
        inner.next_id += 1;

        if let Some(parent) = parent {
            let parent_node = inner
                .nodes
                .get_mut(&parent.0)
                .expect("parent closeable does not exist");
            assert!(
                matches!(
                    parent_node.state,
                    CloseState::Active | CloseState::IntendToClose
                ),
                "cannot add a resource under closing closeable '{}'",
                parent_node.name
            );
            parent_node.children.push(id);
        }

        debug!(name = %spec.name, ?id, "closeable added");
        inner.nodes.insert(
            id.0,
            Node {
                name: spec.name,
                state: CloseState::Active,
                parent,
                children: Vec::new(),
                open_children: 0,
                close_root: spec.close_root,
                action: Some(spec.action),
                action_done: false,
                on_closed: spec.on_closed,
            },
        );
        id
    }

    /// Current state of a node; `None` once it closed and was removed.
    #[must_use]
    pub fn state(&self, id: NodeId) -> Option<CloseState> {
        self.inner.lock().nodes.get(&id.0).map(|n| n.state)
    }

    /// Returns `true` while the node exists (i.e. has not fully closed).
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.lock().nodes.contains_key(&id.0)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    /// Returns `true` when no node is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers an additional `on_closed` notifier on a live node.
    ///
    /// # Panics
    ///
    /// Panics when the node is unknown (already closed).
    pub fn on_closed(&self, id: NodeId, hook: impl FnOnce() + Send + 'static) {
        let mut inner = self.inner.lock();
        let node = inner
            .nodes
            .get_mut(&id.0)
            .expect("closeable does not exist");
        node.on_closed.push(Box::new(hook));
    }

    /// Bottom-up close intent.
    ///
    /// Marks the path from `id` up to the nearest close root as
    /// `IntendToClose`, then starts that root's close. If a close is
    /// already under way anywhere on the path, this is a no-op.
    pub fn intend_to_close(&self, id: NodeId) {
        let root = {
            let mut inner = self.inner.lock();
            let mut current = id;
            loop {
                let node = inner
                    .nodes
                    .get_mut(&current.0)
                    .expect("intend_to_close of unknown closeable");
                match node.state {
                    CloseState::Closing | CloseState::Closed => return,
                    CloseState::Active | CloseState::IntendToClose => {
                        node.state = CloseState::IntendToClose;
                    }
                }
                if node.close_root {
                    break current;
                }
                match node.parent {
                    Some(parent) => current = parent,
                    // A parentless node is the effective close root.
                    None => break current,
                }
            }
        };
        debug!(?id, ?root, "close intent reached its root");
        self.close(root);
    }

    /// Top-down close of `id` and everything under it.
    ///
    /// Every reached node transitions to `Closing` and has its action
    /// invoked; nodes report `Closed` bottom-up as actions complete.
    ///
    /// # Panics
    ///
    /// Panics when `id` (or any node under it) is already `Closing` —
    /// closing twice is a programming-logic fault the graph exists to
    /// surface.
    pub fn close(&self, id: NodeId) {
        let actions = {
            let mut inner = self.inner.lock();
            let mut actions = Vec::new();
            inner.begin_close(id, &mut actions);
            actions
        };
        // Lock released: actions may re-enter (synchronous completions).
        for (node, action) in actions {
            action(ActionDone {
                graph: self.clone(),
                node,
            });
        }
    }

    /// Reports the close action of `id` finished.
    ///
    /// Normally reached through [`ActionDone::complete`]. Fires
    /// `on_closed` notifiers for every node that becomes `Closed` as a
    /// result, children before parents.
    ///
    /// # Panics
    ///
    /// Panics when the node is unknown, not `Closing`, or its action
    /// already reported done.
    pub fn action_done(&self, id: NodeId) {
        let hooks = {
            let mut inner = self.inner.lock();
            let node = inner
                .nodes
                .get_mut(&id.0)
                .expect("action_done for unknown closeable");
            assert_eq!(
                node.state,
                CloseState::Closing,
                "close action of '{}' completed outside a close",
                node.name
            );
            assert!(
                !node.action_done,
                "close action of '{}' reported done twice",
                node.name
            );
            node.action_done = true;

            let mut hooks = Vec::new();
            inner.try_finish(id, &mut hooks);
            hooks
        };
        for hook in hooks {
            hook();
        }
    }
}

impl Default for CloseGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphInner {
    fn begin_close(&mut self, id: NodeId, actions: &mut Vec<(NodeId, CloseAction)>) {
        let (action, children) = {
            let node = self.nodes.get_mut(&id.0).expect("close of unknown closeable");
            match node.state {
                CloseState::Closing | CloseState::Closed => {
                    panic!("closeable '{}' closed twice", node.name)
                }
                CloseState::Active | CloseState::IntendToClose => {}
            }
            node.state = CloseState::Closing;
            node.open_children = node.children.len();
            let action = node
                .action
                .take()
                .expect("close action vanished before the close");
            (action, node.children.clone())
        };
        debug!(?id, "closeable closing");
        actions.push((id, action));
        for child in children {
            self.begin_close(child, actions);
        }
    }

    /// Flips `id` to `Closed` if its action is done and no child is
    /// open, collecting notifiers and cascading to the parent.
    fn try_finish(&mut self, id: NodeId, hooks: &mut Vec<ClosedHook>) {
        {
            let node = &self.nodes[&id.0];
            if !node.action_done || node.open_children > 0 {
                return;
            }
        }
        let mut node = self
            .nodes
            .remove(&id.0)
            .expect("finishing closeable vanished");
        debug!(name = %node.name, ?id, "closeable closed");
        hooks.append(&mut node.on_closed);

        if let Some(parent) = node.parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent.0) {
                parent_node.open_children -= 1;
                parent_node.children.retain(|c| *c != id);
                self.try_finish(parent, hooks);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn tracking_spec(
        name: &str,
        order: &Arc<StdMutex<Vec<String>>>,
    ) -> CloseableSpec {
        let name_owned = name.to_string();
        let order = order.clone();
        CloseableSpec::immediate(name).on_closed(move || {
            order.lock().unwrap().push(name_owned);
        })
    }

    #[test]
    fn single_node_closes_and_is_removed() {
        let graph = CloseGraph::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();

        let id = graph.add_root(
            CloseableSpec::immediate("solo").on_closed(move || {
                fired2.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(graph.state(id), Some(CloseState::Active));

        graph.close(id);

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!graph.contains(id));
        assert!(graph.is_empty());
    }

    #[test]
    fn async_action_defers_closed_until_done() {
        let graph = CloseGraph::new();
        let pending: Arc<StdMutex<Option<ActionDone>>> = Arc::new(StdMutex::new(None));
        let pending2 = pending.clone();

        let id = graph.add_root(CloseableSpec::new(
            "socket",
            Box::new(move |done| {
                *pending2.lock().unwrap() = Some(done);
            }),
        ));

        graph.close(id);
        // Action started but has not reported done: still closing.
        assert_eq!(graph.state(id), Some(CloseState::Closing));

        pending.lock().unwrap().take().unwrap().complete();
        assert!(!graph.contains(id));
    }

    #[test]
    fn three_level_tree_notifies_leaves_before_parents() {
        let graph = CloseGraph::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let root = graph.add_root(tracking_spec("root", &order).close_root(true));
        let mid_a = graph.add_child(root, tracking_spec("mid_a", &order));
        let mid_b = graph.add_child(root, tracking_spec("mid_b", &order));
        let leaf_a1 = graph.add_child(mid_a, tracking_spec("leaf_a1", &order));
        let leaf_a2 = graph.add_child(mid_a, tracking_spec("leaf_a2", &order));
        let leaf_b1 = graph.add_child(mid_b, tracking_spec("leaf_b1", &order));

        graph.close(root);

        let order = order.lock().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();

        // Every node notified exactly once.
        assert_eq!(order.len(), 6);
        // Leaves strictly before their parents, parents before the root.
        assert!(pos("leaf_a1") < pos("mid_a"));
        assert!(pos("leaf_a2") < pos("mid_a"));
        assert!(pos("leaf_b1") < pos("mid_b"));
        assert!(pos("mid_a") < pos("root"));
        assert!(pos("mid_b") < pos("root"));

        assert!(graph.is_empty());
        for id in [root, mid_a, mid_b, leaf_a1, leaf_a2, leaf_b1] {
            assert!(!graph.contains(id));
        }
    }

    #[test]
    fn parent_stalls_until_async_leaf_completes() {
        let graph = CloseGraph::new();
        let order = Arc::new(StdMutex::new(Vec::new()));
        let pending: Arc<StdMutex<Option<ActionDone>>> = Arc::new(StdMutex::new(None));
        let pending2 = pending.clone();

        let root = graph.add_root(tracking_spec("root", &order));
        let order2 = order.clone();
        let leaf = graph.add_child(
            root,
            CloseableSpec::new(
                "leaf",
                Box::new(move |done| {
                    *pending2.lock().unwrap() = Some(done);
                }),
            )
            .on_closed(move || order2.lock().unwrap().push("leaf".into())),
        );

        graph.close(root);

        // Root's own action completed, but the leaf is still tearing down.
        assert_eq!(graph.state(root), Some(CloseState::Closing));
        assert_eq!(graph.state(leaf), Some(CloseState::Closing));
        assert!(order.lock().unwrap().is_empty());

        pending.lock().unwrap().take().unwrap().complete();

        assert_eq!(*order.lock().unwrap(), vec!["leaf", "root"]);
        assert!(graph.is_empty());
    }

    #[test]
    fn intend_to_close_reaches_the_close_root() {
        let graph = CloseGraph::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let root = graph.add_root(tracking_spec("root", &order).close_root(true));
        let mid = graph.add_child(root, tracking_spec("mid", &order));
        let leaf = graph.add_child(mid, tracking_spec("leaf", &order));

        // The leaf wants to disappear; the whole tree closes from the root.
        graph.intend_to_close(leaf);

        let order = order.lock().unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order.last().unwrap(), "root");
        assert!(graph.is_empty());
    }

    #[test]
    fn intend_to_close_during_close_is_a_noop() {
        let graph = CloseGraph::new();
        let pending: Arc<StdMutex<Option<ActionDone>>> = Arc::new(StdMutex::new(None));
        let pending2 = pending.clone();

        let root = graph.add_root(
            CloseableSpec::new(
                "root",
                Box::new(move |done| {
                    *pending2.lock().unwrap() = Some(done);
                }),
            )
            .close_root(true),
        );

        graph.close(root);
        // A late intent while closing must not re-run the close.
        graph.intend_to_close(root);

        pending.lock().unwrap().take().unwrap().complete();
        assert!(graph.is_empty());
    }

    #[test]
    #[should_panic(expected = "closed twice")]
    fn double_close_panics() {
        let graph = CloseGraph::new();
        let pending: Arc<StdMutex<Option<ActionDone>>> = Arc::new(StdMutex::new(None));
        let pending2 = pending.clone();

        let id = graph.add_root(CloseableSpec::new(
            "dup",
            Box::new(move |done| {
                *pending2.lock().unwrap() = Some(done);
            }),
        ));

        graph.close(id);
        graph.close(id);
    }

    #[test]
    #[should_panic(expected = "cannot add a resource under closing")]
    fn adding_under_closing_parent_panics() {
        let graph = CloseGraph::new();
        let pending: Arc<StdMutex<Option<ActionDone>>> = Arc::new(StdMutex::new(None));
        let pending2 = pending.clone();

        let id = graph.add_root(CloseableSpec::new(
            "parent",
            Box::new(move |done| {
                *pending2.lock().unwrap() = Some(done);
            }),
        ));
        graph.close(id);
        graph.add_child(id, CloseableSpec::immediate("late"));
    }

    #[test]
    fn exactly_once_notification_per_close_cycle() {
        let graph = CloseGraph::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();

        let root = graph.add_root(CloseableSpec::immediate("root").on_closed(move || {
            fired2.fetch_add(1, Ordering::SeqCst);
        }));
        let _leaf_a = graph.add_child(root, CloseableSpec::immediate("a"));
        let _leaf_b = graph.add_child(root, CloseableSpec::immediate("b"));

        graph.close(root);

        // Two children completing must not double-fire the root notifier.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
