//! Identifier and enumeration types for link types
//!
//! Identifiers are UUID v4 newtypes. Parsing from caller-supplied strings
//! returns `None` rather than an error: the repository treats a malformed
//! identifier exactly like a missing one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier of a link type
///
/// Assigned once at creation and never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkTypeId(Uuid);

impl LinkTypeId {
    /// Create a new random LinkTypeId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a LinkTypeId from its string form
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Borrow the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinkTypeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a link category
///
/// The nil UUID is never a valid category reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkCategoryId(Uuid);

impl LinkCategoryId {
    /// Create a new random LinkCategoryId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil category id, used to detect unset references
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse a LinkCategoryId from its string form
    ///
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Check whether this is the nil id
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Borrow the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinkCategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkCategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of the relationship a link type describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// Undirected graph of links
    Network,
    /// Directed graph of links, cycles allowed
    DirectedNetwork,
    /// Directed acyclic dependencies
    Dependency,
    /// Every target has at most one source
    Tree,
}

impl Topology {
    /// All recognized topologies
    pub const ALL: [Topology; 4] = [
        Topology::Network,
        Topology::DirectedNetwork,
        Topology::Dependency,
        Topology::Tree,
    ];

    /// Stored and wire spelling
    pub const fn as_str(&self) -> &'static str {
        match self {
            Topology::Network => "network",
            Topology::DirectedNetwork => "directed_network",
            Topology::Dependency => "dependency",
            Topology::Tree => "tree",
        }
    }

    /// Parse a topology from its stored spelling
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a recognized topology
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown topology '{0}'")]
pub struct UnknownTopology(pub String);

impl FromStr for Topology {
    type Err = UnknownTopology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownTopology(s.to_string()))
    }
}
