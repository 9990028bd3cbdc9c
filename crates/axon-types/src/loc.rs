//! Routing coordinates.
//!
//! A [`Loc`] addresses a participant in the runtime: an app, a graph
//! inside an app, or an extension inside a graph. Messages carry one
//! source `Loc` and an ordered list of destination `Loc`s; routing is
//! nothing more than matching these coordinates against the live
//! topology.
//!
//! # Granularity
//!
//! | Filled fields | Addresses |
//! |---------------|-----------|
//! | `app` | a whole app |
//! | `app`, `graph` | one graph/engine |
//! | `app`, `graph`, `extension_group`, `extension` | one extension |
//!
//! Empty strings mean "unset". The single structural invariant: a
//! non-empty `extension` requires a non-empty `extension_group`, because
//! extensions are only addressable through the group that hosts them.

use crate::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A routing coordinate: (app URI, graph id, extension group, extension).
///
/// `Loc` is an immutable value type. Once attached to a message's
/// destination list it is cloned, never mutated in place; replacing a
/// destination means replacing the whole list.
///
/// # Example
///
/// ```
/// use axon_types::Loc;
///
/// let dest = Loc::extension("", "g1", "grp", "target");
/// assert!(dest.validate().is_ok());
/// assert_eq!(dest.extension, "target");
///
/// // An extension without its hosting group is not addressable.
/// let bad = Loc {
///     extension: "orphan".into(),
///     ..Loc::default()
/// };
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Loc {
    /// URI of the owning app. Empty means "the local app".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app: String,
    /// Graph id, either a concrete id or a predefined alias awaiting
    /// resolution against the live topology.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub graph: String,
    /// Extension group hosting the target extension.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extension_group: String,
    /// Extension name within the group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub extension: String,
}

impl Loc {
    /// Creates a coordinate addressing a whole app.
    #[must_use]
    pub fn app(uri: impl Into<String>) -> Self {
        Self {
            app: uri.into(),
            ..Self::default()
        }
    }

    /// Creates a coordinate addressing one graph of an app.
    #[must_use]
    pub fn graph(app: impl Into<String>, graph: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            graph: graph.into(),
            ..Self::default()
        }
    }

    /// Creates a coordinate addressing one extension.
    ///
    /// This is the common case for message destinations.
    #[must_use]
    pub fn extension(
        app: impl Into<String>,
        graph: impl Into<String>,
        group: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            graph: graph.into(),
            extension_group: group.into(),
            extension: extension.into(),
        }
    }

    /// Checks the structural invariant.
    ///
    /// # Errors
    ///
    /// Returns [`LocError::ExtensionWithoutGroup`] when `extension` is
    /// set but `extension_group` is empty.
    pub fn validate(&self) -> Result<(), LocError> {
        if !self.extension.is_empty() && self.extension_group.is_empty() {
            return Err(LocError::ExtensionWithoutGroup {
                extension: self.extension.clone(),
            });
        }
        Ok(())
    }

    /// Returns `true` when every field is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.app.is_empty()
            && self.graph.is_empty()
            && self.extension_group.is_empty()
            && self.extension.is_empty()
    }

    /// Returns `true` when this coordinate names an extension.
    #[must_use]
    pub fn has_extension(&self) -> bool {
        !self.extension.is_empty()
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.app, self.graph, self.extension_group, self.extension
        )
    }
}

/// Error for invalid routing coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocError {
    /// `extension` is set but `extension_group` is empty.
    #[error("extension '{extension}' has no extension group")]
    ExtensionWithoutGroup {
        /// The orphaned extension name.
        extension: String,
    },
}

impl ErrorCode for LocError {
    fn code(&self) -> &'static str {
        match self {
            Self::ExtensionWithoutGroup { .. } => "LOC_EXTENSION_WITHOUT_GROUP",
        }
    }

    fn is_recoverable(&self) -> bool {
        // The coordinate has to be fixed by the caller; retry won't help.
        false
    }
}
