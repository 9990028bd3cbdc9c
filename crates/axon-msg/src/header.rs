//! The shared routing header every message kind carries.
//!
//! The header is the structural ("virtual") part of the field registry:
//! routable name, source coordinate, ordered destination list, and the
//! free-form property bag.

use crate::MsgError;
use axon_types::Loc;
use serde_json::{Map, Value};

/// Routing metadata shared by all message kinds.
///
/// # Destination list
///
/// Order is significant: the head is the single-target convenience
/// destination most call sites use. [`set_dest`](Self::set_dest)
/// replaces the list wholesale — there is deliberately no partial
/// update, so an observer never sees a list mixing old and new entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MsgHeader {
    name: String,
    src: Loc,
    dests: Vec<Loc>,
    properties: Map<String, Value>,
}

impl MsgHeader {
    /// Creates a header with the given routable name (empty allowed).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The routable name used for graph-level dispatch.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the routable name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The source coordinate.
    #[must_use]
    pub fn src(&self) -> &Loc {
        &self.src
    }

    /// Replaces the source coordinate.
    pub fn set_src(&mut self, src: Loc) {
        self.src = src;
    }

    // === Destination list ===

    /// Replaces the whole destination list atomically.
    ///
    /// The list is cleared and repopulated in one exclusive step;
    /// partial updates are not supported.
    pub fn set_dest(&mut self, dests: impl IntoIterator<Item = Loc>) {
        self.dests.clear();
        self.dests.extend(dests);
    }

    /// Appends one destination.
    pub fn add_dest(&mut self, dest: Loc) {
        self.dests.push(dest);
    }

    /// Empties the destination list.
    pub fn clear_dest(&mut self) {
        self.dests.clear();
    }

    /// Number of destinations.
    #[must_use]
    pub fn dest_count(&self) -> usize {
        self.dests.len()
    }

    /// The first-added destination, if any.
    ///
    /// Destinations are insertion-ordered; this is the single-target
    /// convenience accessor.
    #[must_use]
    pub fn first_dest(&self) -> Option<&Loc> {
        self.dests.first()
    }

    /// All destinations in insertion order.
    #[must_use]
    pub fn dests(&self) -> &[Loc] {
        &self.dests
    }

    /// Mutable destination list, for destination correction.
    pub(crate) fn dests_mut(&mut self) -> &mut Vec<Loc> {
        &mut self.dests
    }

    // === Properties ===

    /// The whole property bag.
    #[must_use]
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Replaces the whole property bag.
    pub fn set_properties(&mut self, properties: Map<String, Value>) {
        self.properties = properties;
    }

    /// Looks a property up by dotted path (`"a.b.c"`).
    #[must_use]
    pub fn property(&self, path: &str) -> Option<&Value> {
        let mut current: &Value = self.properties.get(first_segment(path))?;
        for seg in path.split('.').skip(1) {
            current = current.as_object()?.get(seg)?;
        }
        Some(current)
    }

    /// Stores a property by dotted path, creating intermediate objects.
    ///
    /// # Errors
    ///
    /// [`MsgError::PropertyPath`] when the path is empty or an
    /// intermediate segment holds a non-object value.
    pub fn set_property(&mut self, path: &str, value: Value) -> Result<(), MsgError> {
        let mut segments = path.split('.');
        let first = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MsgError::PropertyPath(path.to_string()))?;

        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            self.properties.insert(first.to_string(), value);
            return Ok(());
        }

        let mut current = self
            .properties
            .entry(first.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        let (last, mids) = rest.split_last().expect("rest is non-empty");
        if last.is_empty() {
            return Err(MsgError::PropertyPath(path.to_string()));
        }
        for seg in mids {
            if seg.is_empty() {
                return Err(MsgError::PropertyPath(path.to_string()));
            }
            let obj = current
                .as_object_mut()
                .ok_or_else(|| MsgError::PropertyPath(path.to_string()))?;
            current = obj
                .entry((*seg).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        let obj = current
            .as_object_mut()
            .ok_or_else(|| MsgError::PropertyPath(path.to_string()))?;
        obj.insert((*last).to_string(), value);
        Ok(())
    }
}

fn first_segment(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}
