//! Extension and addon layer errors.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`ExtensionError::NotSupported`] | `EXT_NOT_SUPPORTED` | No |
//! | [`ExtensionError::Failed`] | `EXT_FAILED` | Yes |
//! | [`ExtensionError::InvalidPayload`] | `EXT_INVALID_PAYLOAD` | No |
//! | [`AddonError::NotFound`] | `ADDON_NOT_FOUND` | Yes |
//! | [`AddonError::InvalidTarget`] | `ADDON_INVALID_TARGET` | No |

use crate::AddonKind;
use axon_types::ErrorCode;
use thiserror::Error;

/// Error returned by extension callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// The extension does not implement the requested command.
    ///
    /// **Not recoverable** - the command will never be understood.
    #[error("command not supported: {0}")]
    NotSupported(String),

    /// The command was understood but processing failed.
    ///
    /// **Recoverable** - a retry may succeed.
    #[error("command failed: {0}")]
    Failed(String),

    /// The command payload did not match the expected shape.
    ///
    /// **Not recoverable** - the payload has to change.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl ErrorCode for ExtensionError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotSupported(_) => "EXT_NOT_SUPPORTED",
            Self::Failed(_) => "EXT_FAILED",
            Self::InvalidPayload(_) => "EXT_INVALID_PAYLOAD",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Error returned by addon registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddonError {
    /// No addon is registered under the given kind and name.
    ///
    /// **Recoverable** - the addon may be registered later.
    #[error("no {kind} addon named '{name}'")]
    NotFound {
        /// The requested addon kind.
        kind: AddonKind,
        /// The requested addon name.
        name: String,
    },

    /// The registration target is invalid (e.g. an empty name).
    ///
    /// **Not recoverable** - the registration has to change.
    #[error("invalid registration target: {0}")]
    InvalidTarget(String),
}

impl ErrorCode for AddonError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ADDON_NOT_FOUND",
            Self::InvalidTarget(_) => "ADDON_INVALID_TARGET",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_types::assert_error_codes;

    #[test]
    fn extension_error_codes_valid() {
        assert_error_codes(
            &[
                ExtensionError::NotSupported("x".into()),
                ExtensionError::Failed("x".into()),
                ExtensionError::InvalidPayload("x".into()),
            ],
            "EXT_",
        );
    }

    #[test]
    fn addon_error_codes_valid() {
        assert_error_codes(
            &[
                AddonError::NotFound {
                    kind: AddonKind::Extension,
                    name: "x".into(),
                },
                AddonError::InvalidTarget("x".into()),
            ],
            "ADDON_",
        );
    }

    #[test]
    fn recoverability() {
        assert!(ExtensionError::Failed("t".into()).is_recoverable());
        assert!(!ExtensionError::NotSupported("t".into()).is_recoverable());
        assert!(AddonError::NotFound {
            kind: AddonKind::Extension,
            name: "t".into()
        }
        .is_recoverable());
    }
}
