//! The axon runtime.
//!
//! This crate hosts the concurrency machinery under the message model:
//! per-owner task loops, the composable shutdown protocol, the bridge
//! to externally-threaded protocol implementations, and the routing
//! engine/app pair.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── App (app loop) ─────────────────────────────┐
//! │  GraphTable ── correct_dest ── submit ──► Engine (engine loop, per graph)│
//! │                                              │ dispatch                  │
//! │  CloseGraph (root) ── engine nodes           ▼                           │
//! │        │                              extensions (axon-extension)        │
//! └────────┼─────────────────────────────────────────────────────────────────┘
//!          │ close / intend_to_close
//! ┌────────▼──────────────┐   on_input / migration   ┌──────────────────────┐
//! │ Connection (core loop)│◄────────────────────────►│ protocol impl loop   │
//! │   ProtocolBridge      │       posted tasks       │ (owns its thread)    │
//! └───────────────────────┘                          └──────────────────────┘
//! ```
//!
//! # Concurrency rules
//!
//! One cooperative [`TaskLoop`] per logical owner; cross-owner work is
//! always a posted task, never a shared poll; tasks on one loop run in
//! post order; close is the only one-way cancellation primitive.

mod app;
mod bridge;
mod close;
mod config;
mod connection;
mod engine;
mod runloop;

pub use app::App;
pub use bridge::{
    BridgeError, ConnectedSink, ImplCloser, MigrationState, MsgSink, ProtocolBridge,
};
pub use close::{ActionDone, CloseAction, CloseGraph, CloseState, CloseableSpec, ClosedHook, NodeId};
pub use config::{BridgeConfig, DEFAULT_PENDING_CAPACITY};
pub use connection::Connection;
pub use engine::{correct_dest, Engine, EngineError, GraphTable};
pub use runloop::{LoopError, LoopHandle, Runloop, Task, TaskLoop, TimerHandle};
