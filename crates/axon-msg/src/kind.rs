//! Message kind tags and wire-type resolution.
//!
//! Every message carries exactly one kind tag fixed at creation. On the
//! wire the tag is the `type` string in the reserved namespace; command
//! sub-kinds are flattened into that same string (`start_graph`,
//! `timer`, ...) so a decoder resolves `(type, name)` straight to one
//! concrete kind or fails.
//!
//! | Wire `type` | Kind |
//! |-------------|------|
//! | `cmd` | [`MsgKind::Cmd`] (custom, dispatched by `name`) |
//! | `start_graph` / `stop_graph` / `close_app` / `timer` / `timeout` | [`MsgKind::Cmd`] specialized sub-kind |
//! | `cmd_result` | [`MsgKind::CmdResult`] |
//! | `data` | [`MsgKind::Data`] |
//! | `audio_frame` | [`MsgKind::AudioFrame`] |
//! | `video_frame` | [`MsgKind::VideoFrame`] |

use crate::MsgError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminant of a message. Never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MsgKind {
    /// A command: expects one or more results back.
    Cmd,
    /// A (possibly partial) result for an in-flight command.
    CmdResult,
    /// An opaque data payload.
    Data,
    /// A PCM audio frame payload.
    AudioFrame,
    /// A raster video frame payload.
    VideoFrame,
}

impl MsgKind {
    /// The wire `type` string for this kind.
    ///
    /// Specialized command sub-kinds override this with their own
    /// string; see [`CmdKind::wire_type`].
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cmd => "cmd",
            Self::CmdResult => "cmd_result",
            Self::Data => "data",
            Self::AudioFrame => "audio_frame",
            Self::VideoFrame => "video_frame",
        }
    }
}

impl std::fmt::Display for MsgKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command sub-kind, including any sub-kind-specific payload.
///
/// Specialized sub-kinds are runtime-internal commands; `Custom` is the
/// open namespace user extensions dispatch on by message name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CmdKind {
    /// A user-defined command, dispatched by the message `name`.
    Custom,
    /// Start a graph, either a predefined alias or an inline definition.
    StartGraph {
        /// Predefined graph alias to resolve and start.
        predefined_graph: Option<String>,
        /// Inline graph definition (JSON), used when no alias is given.
        graph_json: Option<Value>,
    },
    /// Stop one running graph.
    StopGraph {
        /// Concrete id of the graph to stop.
        graph_id: String,
    },
    /// Close the whole app.
    CloseApp,
    /// Arm (or cancel) a timer owned by the receiving engine.
    Timer {
        /// Caller-chosen timer identity.
        timer_id: u64,
        /// Interval in microseconds. Zero cancels the timer.
        timeout_us: u64,
        /// Number of firings; `-1` repeats until cancelled.
        times: i32,
    },
    /// A timer firing, posted back toward the timer's requester.
    Timeout {
        /// Identity of the timer that fired.
        timer_id: u64,
    },
}

impl CmdKind {
    /// The wire `type` string of this sub-kind.
    #[must_use]
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Custom => "cmd",
            Self::StartGraph { .. } => "start_graph",
            Self::StopGraph { .. } => "stop_graph",
            Self::CloseApp => "close_app",
            Self::Timer { .. } => "timer",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Returns `true` for the specialized (runtime-internal) sub-kinds.
    #[must_use]
    pub fn is_specialized(&self) -> bool {
        !matches!(self, Self::Custom)
    }
}

/// Names reserved by the specialized command sub-kinds.
///
/// A custom command must not use one of these as its `name`; the pair
/// `("cmd", "timer")` would be ambiguous with `("timer", _)`.
pub(crate) const RESERVED_CMD_NAMES: &[&str] =
    &["start_graph", "stop_graph", "close_app", "timer", "timeout"];

/// The kind a wire `(type, name)` pair resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedKind {
    Cmd,
    StartGraph,
    StopGraph,
    CloseApp,
    Timer,
    Timeout,
    CmdResult,
    Data,
    AudioFrame,
    VideoFrame,
}

/// Resolves a wire `(type, name)` pair to exactly one kind.
///
/// # Errors
///
/// [`MsgError::MalformedWire`] when the type is unknown, or when a
/// custom `cmd` carries a name reserved by a specialized sub-kind
/// (the pair would not resolve uniquely).
pub(crate) fn resolve_wire_type(ty: &str, name: &str) -> Result<ResolvedKind, MsgError> {
    match ty {
        "cmd" => {
            if RESERVED_CMD_NAMES.contains(&name) {
                return Err(MsgError::MalformedWire(format!(
                    "cmd name '{name}' is ambiguous with the '{name}' sub-kind"
                )));
            }
            Ok(ResolvedKind::Cmd)
        }
        "start_graph" => Ok(ResolvedKind::StartGraph),
        "stop_graph" => Ok(ResolvedKind::StopGraph),
        "close_app" => Ok(ResolvedKind::CloseApp),
        "timer" => Ok(ResolvedKind::Timer),
        "timeout" => Ok(ResolvedKind::Timeout),
        "cmd_result" => Ok(ResolvedKind::CmdResult),
        "data" => Ok(ResolvedKind::Data),
        "audio_frame" => Ok(ResolvedKind::AudioFrame),
        "video_frame" => Ok(ResolvedKind::VideoFrame),
        other => Err(MsgError::MalformedWire(format!(
            "unknown message type '{other}'"
        ))),
    }
}
