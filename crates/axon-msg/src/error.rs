//! Message layer errors.
//!
//! # Error Code Convention
//!
//! All message errors use the `MSG_` prefix:
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`MalformedWire`](MsgError::MalformedWire) | `MSG_MALFORMED_WIRE` | No |
//! | [`BufLocked`](MsgError::BufLocked) | `MSG_BUF_LOCKED` | Yes |
//! | [`BufNotLocked`](MsgError::BufNotLocked) | `MSG_BUF_NOT_LOCKED` | No |
//! | [`InvalidLoc`](MsgError::InvalidLoc) | `MSG_INVALID_LOC` | No |
//! | [`PropertyPath`](MsgError::PropertyPath) | `MSG_PROPERTY_PATH` | No |

use axon_types::{ErrorCode, LocError};
use thiserror::Error;

/// Message layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MsgError {
    /// A wire value could not be decoded into any message kind.
    ///
    /// Raised when the reserved namespace or its `type` discriminant is
    /// absent, or when the `(type, name)` pair does not uniquely resolve
    /// to one kind.
    ///
    /// **Not recoverable** - the wire data has to change.
    #[error("malformed wire value: {0}")]
    MalformedWire(String),

    /// A payload buffer is locked by an outstanding external view.
    ///
    /// Mutating or releasing a payload fails while a producer or
    /// consumer still holds a raw view of it.
    ///
    /// **Recoverable** - retry after the view is unlocked.
    #[error("payload buffer is locked")]
    BufLocked,

    /// Unlock was called with no outstanding lock.
    ///
    /// **Not recoverable** - lock/unlock calls are unbalanced.
    #[error("payload buffer is not locked")]
    BufNotLocked,

    /// A routing coordinate violated its structural invariant.
    ///
    /// **Not recoverable** - the coordinate has to be fixed.
    #[error("invalid loc: {0}")]
    InvalidLoc(#[from] LocError),

    /// A property path could not be traversed.
    ///
    /// Raised when an intermediate path segment exists but is not an
    /// object.
    ///
    /// **Not recoverable** - the path or the stored value has to change.
    #[error("invalid property path: {0}")]
    PropertyPath(String),
}

impl ErrorCode for MsgError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedWire(_) => "MSG_MALFORMED_WIRE",
            Self::BufLocked => "MSG_BUF_LOCKED",
            Self::BufNotLocked => "MSG_BUF_NOT_LOCKED",
            Self::InvalidLoc(_) => "MSG_INVALID_LOC",
            Self::PropertyPath(_) => "MSG_PROPERTY_PATH",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::BufLocked)
    }
}
