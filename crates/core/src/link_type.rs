//! Link type and link category entities
//!
//! A link type defines how two work item types may be related: the names of
//! both traversal directions, the topology, and the category it belongs to.
//! The category is referenced, never owned.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::types::{LinkCategoryId, LinkTypeId, Topology};
use serde::{Deserialize, Serialize};

/// Optimistic concurrency token
pub type Version = u64;

/// Version every row starts at
pub const INITIAL_VERSION: Version = 0;

/// Entity name used in error messages
pub const LINK_TYPE_ENTITY: &str = "link type";

/// Entity name used in error messages
pub const LINK_CATEGORY_ENTITY: &str = "link category";

/// Persisted link type row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    /// Immutable identifier
    pub id: LinkTypeId,
    /// Display name, unique per category
    pub name: String,
    /// Optional free text
    pub description: Option<String>,
    /// Work item type on the source side
    pub source_type_name: String,
    /// Work item type on the target side
    pub target_type_name: String,
    /// Label for source -> target traversal
    pub forward_name: String,
    /// Label for target -> source traversal
    pub reverse_name: String,
    /// Relationship shape
    pub topology: Topology,
    /// Category this link type belongs to
    pub link_category_id: LinkCategoryId,
    /// Incremented by one on every successful update
    pub version: Version,
    /// Set once at creation
    pub created_at: Timestamp,
    /// Refreshed on every successful update
    pub updated_at: Timestamp,
}

impl LinkType {
    /// Check that all required fields are set
    ///
    /// Fails with BadParameter naming the first offending field.
    pub fn check_valid_for_creation(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("source_type_name", &self.source_type_name),
            ("target_type_name", &self.target_type_name),
            ("forward_name", &self.forward_name),
            ("reverse_name", &self.reverse_name),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(Error::bad_parameter(field, "\"\""));
            }
        }
        if self.link_category_id.is_nil() {
            return Err(Error::bad_parameter("link_category_id", self.link_category_id));
        }
        Ok(())
    }

    /// Version the row will carry after its next successful update, or
    /// `None` once the counter is exhausted
    pub fn next_version(&self) -> Option<Version> {
        self.version.checked_add(1)
    }
}

/// Caller input for creating a link type
///
/// Topology arrives as a caller string and is parsed during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLinkType {
    /// Display name
    pub name: String,
    /// Optional free text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Work item type on the source side
    pub source_type_name: String,
    /// Work item type on the target side
    pub target_type_name: String,
    /// Label for source -> target traversal
    pub forward_name: String,
    /// Label for target -> source traversal
    pub reverse_name: String,
    /// Topology spelling, e.g. `"dependency"`
    pub topology: String,
    /// Existing category to attach to
    pub link_category_id: LinkCategoryId,
}

impl NewLinkType {
    /// Validate the input and materialize a fresh row
    ///
    /// Assigns a new id, the initial version and creation timestamps.
    /// Touches no storage.
    pub fn into_link_type(self) -> Result<LinkType> {
        let topology = Topology::parse(&self.topology)
            .ok_or_else(|| Error::bad_parameter("topology", format!("'{}'", self.topology)))?;
        let now = Timestamp::now();
        let link_type = LinkType {
            id: LinkTypeId::new(),
            name: self.name,
            description: self.description,
            source_type_name: self.source_type_name,
            target_type_name: self.target_type_name,
            forward_name: self.forward_name,
            reverse_name: self.reverse_name,
            topology,
            link_category_id: self.link_category_id,
            version: INITIAL_VERSION,
            created_at: now,
            updated_at: now,
        };
        link_type.check_valid_for_creation()?;
        Ok(link_type)
    }
}

/// Link category row
///
/// Read by the repository to enforce referential integrity, never mutated by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCategory {
    /// Immutable identifier
    pub id: LinkCategoryId,
    /// Display name
    pub name: String,
    /// Optional free text
    pub description: Option<String>,
    /// Optimistic concurrency token
    pub version: Version,
}

impl LinkCategory {
    /// Create a category with a fresh id at the initial version
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: LinkCategoryId::new(),
            name: name.into(),
            description,
            version: INITIAL_VERSION,
        }
    }
}
