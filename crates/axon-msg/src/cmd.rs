//! Commands and command results.
//!
//! A command is the request half of the runtime's only request/response
//! shape. Each command carries a unique [`CmdId`]; every result it
//! produces echoes that id back, which is what lets an extension stream
//! several partial results against one in-flight command.
//!
//! # Result streaming
//!
//! ```text
//! caller ── Cmd{id} ─────────────► extension
//! caller ◄─ CmdResult{id, final: false} ── (partial)
//! caller ◄─ CmdResult{id, final: false} ── (partial)
//! caller ◄─ CmdResult{id, final: true}  ── (ownership released)
//! ```
//!
//! `is_final == true` tells the caller the originating command will
//! produce nothing further and its ownership may be released.

use crate::{CmdKind, MsgHeader};
use axon_types::{CmdId, Loc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command message.
///
/// Built either as a custom command (dispatched by name) or as one of
/// the specialized runtime sub-kinds.
///
/// # Example
///
/// ```
/// use axon_msg::Cmd;
/// use axon_types::Loc;
///
/// let mut cmd = Cmd::new("hello");
/// cmd.header_mut()
///     .set_dest([Loc::extension("", "g1", "grp", "target")]);
/// assert_eq!(cmd.header().name(), "hello");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Cmd {
    header: MsgHeader,
    kind: CmdKind,
    id: CmdId,
}

impl Cmd {
    /// Creates a custom command dispatched by `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kind(name, CmdKind::Custom)
    }

    /// Creates a command of an explicit sub-kind.
    #[must_use]
    pub fn with_kind(name: impl Into<String>, kind: CmdKind) -> Self {
        Self {
            header: MsgHeader::new(name),
            kind,
            id: CmdId::new(),
        }
    }

    /// Creates a start-graph command for a predefined alias.
    #[must_use]
    pub fn start_graph(alias: impl Into<String>) -> Self {
        Self::with_kind(
            "",
            CmdKind::StartGraph {
                predefined_graph: Some(alias.into()),
                graph_json: None,
            },
        )
    }

    /// Creates a start-graph command carrying an inline definition.
    #[must_use]
    pub fn start_graph_inline(graph_json: Value) -> Self {
        Self::with_kind(
            "",
            CmdKind::StartGraph {
                predefined_graph: None,
                graph_json: Some(graph_json),
            },
        )
    }

    /// Creates a stop-graph command.
    #[must_use]
    pub fn stop_graph(graph_id: impl Into<String>) -> Self {
        Self::with_kind(
            "",
            CmdKind::StopGraph {
                graph_id: graph_id.into(),
            },
        )
    }

    /// Creates a close-app command.
    #[must_use]
    pub fn close_app() -> Self {
        Self::with_kind("", CmdKind::CloseApp)
    }

    /// Creates a timer command. `timeout_us == 0` cancels `timer_id`.
    #[must_use]
    pub fn timer(timer_id: u64, timeout_us: u64, times: i32) -> Self {
        Self::with_kind(
            "",
            CmdKind::Timer {
                timer_id,
                timeout_us,
                times,
            },
        )
    }

    /// Creates a timeout command for a fired timer.
    #[must_use]
    pub fn timeout(timer_id: u64) -> Self {
        Self::with_kind("", CmdKind::Timeout { timer_id })
    }

    /// This command's unique id, echoed by its results.
    #[must_use]
    pub fn id(&self) -> CmdId {
        self.id
    }

    /// The command sub-kind and its payload.
    #[must_use]
    pub fn kind(&self) -> &CmdKind {
        &self.kind
    }

    /// Shared routing header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        &self.header
    }

    /// Mutable routing header.
    pub fn header_mut(&mut self) -> &mut MsgHeader {
        &mut self.header
    }

    /// Rebuilds a command from decoded wire parts.
    pub(crate) fn from_parts(header: MsgHeader, kind: CmdKind, id: CmdId) -> Self {
        Self { header, kind, id }
    }
}

/// Outcome classification of a command result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The command succeeded.
    Ok,
    /// The command was understood but failed.
    Error,
    /// The command itself was invalid.
    Invalid,
}

impl StatusCode {
    /// The wire string of this status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Invalid => "invalid",
        }
    }

    /// Parses the wire string of a status.
    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            "invalid" => Some(Self::Invalid),
            _ => None,
        }
    }
}

/// A (possibly partial) result for an in-flight command.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdResult {
    header: MsgHeader,
    original_cmd_id: CmdId,
    status: StatusCode,
    is_final: bool,
    is_completed: bool,
}

impl CmdResult {
    /// Creates the result for `cmd`, routed back to the command's source.
    ///
    /// The result inherits the command's name, echoes its id, and is
    /// final by default; use [`partial`](Self::partial) for streamed
    /// intermediate results.
    #[must_use]
    pub fn for_cmd(cmd: &Cmd, status: StatusCode) -> Self {
        let mut header = MsgHeader::new(cmd.header().name());
        if !cmd.header().src().is_empty() {
            header.set_dest([cmd.header().src().clone()]);
        }
        Self {
            header,
            original_cmd_id: cmd.id(),
            status,
            is_final: true,
            is_completed: true,
        }
    }

    /// Marks this result as a non-final partial.
    ///
    /// The caller keeps ownership of the in-flight command and should
    /// expect further results with the same original id.
    #[must_use]
    pub fn partial(mut self) -> Self {
        self.is_final = false;
        self.is_completed = false;
        self
    }

    /// Id of the command this result answers.
    #[must_use]
    pub fn original_cmd_id(&self) -> CmdId {
        self.original_cmd_id
    }

    /// Outcome classification.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// `true` when the originating command's ownership may be released.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// `true` when the command's processing has fully completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Shared routing header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        &self.header
    }

    /// Mutable routing header.
    pub fn header_mut(&mut self) -> &mut MsgHeader {
        &mut self.header
    }

    /// Rebuilds a result from decoded wire parts.
    pub(crate) fn from_parts(
        header: MsgHeader,
        original_cmd_id: CmdId,
        status: StatusCode,
        is_final: bool,
        is_completed: bool,
    ) -> Self {
        Self {
            header,
            original_cmd_id,
            status,
            is_final,
            is_completed,
        }
    }

    /// Convenience: route this result to an explicit destination.
    pub fn set_dest(&mut self, dest: Loc) {
        self.header.set_dest([dest]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::Loc;

    #[test]
    fn custom_cmd_has_fresh_id() {
        let a = Cmd::new("hello");
        let b = Cmd::new("hello");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), &CmdKind::Custom);
    }

    #[test]
    fn result_echoes_cmd_id_and_routes_to_src() {
        let mut cmd = Cmd::new("hello");
        cmd.header_mut()
            .set_src(Loc::extension("", "g1", "grp", "caller"));

        let result = CmdResult::for_cmd(&cmd, StatusCode::Ok);

        assert_eq!(result.original_cmd_id(), cmd.id());
        assert_eq!(result.header().first_dest().unwrap().extension, "caller");
        assert!(result.is_final());
        assert!(result.is_completed());
    }

    #[test]
    fn result_for_srcless_cmd_has_no_dest() {
        let cmd = Cmd::new("hello");
        let result = CmdResult::for_cmd(&cmd, StatusCode::Ok);
        assert_eq!(result.header().dest_count(), 0);
    }

    #[test]
    fn partial_results_keep_command_in_flight() {
        let cmd = Cmd::new("stream");
        let partial = CmdResult::for_cmd(&cmd, StatusCode::Ok).partial();
        assert!(!partial.is_final());
        assert!(!partial.is_completed());

        let last = CmdResult::for_cmd(&cmd, StatusCode::Ok);
        assert!(last.is_final());
        assert_eq!(partial.original_cmd_id(), last.original_cmd_id());
    }

    #[test]
    fn status_code_wire_strings() {
        for status in [StatusCode::Ok, StatusCode::Error, StatusCode::Invalid] {
            assert_eq!(StatusCode::from_wire(status.as_str()), Some(status));
        }
        assert_eq!(StatusCode::from_wire("bogus"), None);
    }

    #[test]
    fn timer_cmd_payload() {
        let cmd = Cmd::timer(7, 1_000, -1);
        match cmd.kind() {
            CmdKind::Timer {
                timer_id,
                timeout_us,
                times,
            } => {
                assert_eq!(*timer_id, 7);
                assert_eq!(*timeout_us, 1_000);
                assert_eq!(*times, -1);
            }
            other => panic!("expected timer kind, got {other:?}"),
        }
    }
}
