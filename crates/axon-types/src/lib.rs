//! Core types for the axon runtime.
//!
//! This crate is the bottom of the axon stack: every other crate depends
//! on it and it depends on nothing but serde/uuid.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SDK layer                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  axon-types     : Loc, GraphId, ConnId, ErrorCode  ◄── HERE │
//! │  axon-msg       : Msg, field registry, wire mapping         │
//! │  axon-extension : Extension trait, addon registry           │
//! └─────────────────────────────────────────────────────────────┘
//! │  axon-runtime   : runloop, close graph, bridge, engine      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # What lives here
//!
//! - [`Loc`] — the routing coordinate every message source and
//!   destination is expressed in (app / graph / extension group /
//!   extension).
//! - [`GraphId`], [`ConnId`], [`CmdId`] — uuid-backed identifiers.
//!   Predefined graphs get deterministic ids so the same alias resolves
//!   identically in every process.
//! - [`ErrorCode`] — the unified error contract all axon error enums
//!   implement, plus test helpers validating code tables.

mod error;
mod id;
mod loc;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{CmdId, ConnId, GraphId};
pub use loc::{Loc, LocError};
