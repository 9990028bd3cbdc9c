//! Identifier types.
//!
//! All identifiers are UUID-backed. Predefined graphs use deterministic
//! UUID v5 so the same alias resolves to the same id in every process;
//! everything else uses random v4.

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Namespace UUID for deterministic v5 generation of predefined ids.
const AXON_NAMESPACE: Uuid = uuid!("6f1a2c3e-58d4-4b09-9f27-c1d0a4e8b5a1");

/// Identifier for a graph (one engine instance).
///
/// A graph is a named topology of extensions. At runtime a graph is
/// addressed by its `GraphId`; destination [`Loc`](crate::Loc)s may
/// instead carry a predefined alias, which destination correction
/// resolves to the concrete id.
///
/// # UUID strategy
///
/// - **Predefined graphs**: UUID v5, deterministic from the alias.
/// - **Dynamically started graphs**: UUID v4, random per instance.
///
/// ```
/// use axon_types::GraphId;
///
/// let a = GraphId::predefined("default");
/// let b = GraphId::predefined("default");
/// assert_eq!(a, b); // same alias, same id, every process
///
/// let c = GraphId::new();
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

#[allow(clippy::new_without_default)] // a fresh random id must be an explicit act
impl GraphId {
    /// Creates a random `GraphId` for a dynamically started graph.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates the deterministic `GraphId` of a predefined graph alias.
    #[must_use]
    pub fn predefined(alias: &str) -> Self {
        Self(Uuid::new_v5(
            &AXON_NAMESPACE,
            format!("graph:{alias}").as_bytes(),
        ))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for GraphId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier for a physical connection.
///
/// A connection starts its life on an accepting context and is later
/// migrated to the engine that owns it; the `ConnId` is stable across
/// that migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnId(pub Uuid);

#[allow(clippy::new_without_default)]
impl ConnId {
    /// Creates a new random `ConnId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Identifier for an in-flight command.
///
/// Every command carries a unique `CmdId`; the results it produces echo
/// it back so callers can correlate streamed partial results with the
/// originating command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CmdId(pub Uuid);

#[allow(clippy::new_without_default)] // generated by Cmd construction, never defaulted
impl CmdId {
    /// Creates a new random `CmdId`.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for CmdId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cmd:{}", self.0)
    }
}
