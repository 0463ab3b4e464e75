//! Caller-facing update view and its conversion onto stored rows
//!
//! The repository never inspects caller views directly. It asks a
//! [`LinkTypeChanges`] implementation for the target id and expected version,
//! then lets it apply its field changes onto the loaded row. A failed
//! conversion surfaces unchanged as [`crate::Error::Conversion`].

use crate::link_type::{LinkType, Version};
use crate::types::{LinkCategoryId, Topology};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource kind accepted by [`LinkTypeUpdate`]
pub const LINK_TYPES_KIND: &str = "link_types";

/// Failure mapping a caller view onto a stored link type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The view declares a resource kind other than link types
    #[error("conversion failed: expected resource kind 'link_types', got '{0}'")]
    WrongKind(String),

    /// Topology string is not recognized
    #[error("conversion failed: unknown topology '{0}'")]
    UnknownTopology(String),

    /// Category reference is not a valid identifier
    #[error("conversion failed: malformed link category id '{0}'")]
    MalformedCategoryId(String),

    /// A required field was supplied but empty
    #[error("conversion failed: field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Changes a caller wants applied to an existing link type
pub trait LinkTypeChanges {
    /// Identifier of the row to update, as supplied by the caller
    fn id(&self) -> Option<&str>;

    /// Version the caller believes is currently stored
    fn expected_version(&self) -> Option<Version>;

    /// Apply the field changes onto the loaded row
    ///
    /// Must not touch `id`, `version` or timestamps.
    fn apply_to(&self, target: &mut LinkType) -> Result<(), ConversionError>;
}

/// Partial update of a link type
///
/// Every `None` field is left unchanged. An empty description clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTypeUpdate {
    /// Target row identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Declared resource kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Expected stored version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// New display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description; empty clears it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New source work item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type_name: Option<String>,
    /// New target work item type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type_name: Option<String>,
    /// New forward label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_name: Option<String>,
    /// New reverse label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_name: Option<String>,
    /// New topology spelling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topology: Option<String>,
    /// New category reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_category_id: Option<String>,
}

impl LinkTypeUpdate {
    /// Start an update for the given row at the given expected version
    pub fn new(id: impl ToString, version: Version) -> Self {
        Self {
            id: Some(id.to_string()),
            version: Some(version),
            ..Self::default()
        }
    }

    /// Set the name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set or clear (with an empty string) the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the forward name
    pub fn forward_name(mut self, forward_name: impl Into<String>) -> Self {
        self.forward_name = Some(forward_name.into());
        self
    }

    /// Set the reverse name
    pub fn reverse_name(mut self, reverse_name: impl Into<String>) -> Self {
        self.reverse_name = Some(reverse_name.into());
        self
    }

    /// Set the topology spelling
    pub fn topology(mut self, topology: impl Into<String>) -> Self {
        self.topology = Some(topology.into());
        self
    }

    /// Move the link type to another category
    pub fn link_category_id(mut self, id: impl ToString) -> Self {
        self.link_category_id = Some(id.to_string());
        self
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<String, ConversionError> {
    if value.is_empty() {
        return Err(ConversionError::EmptyField(field));
    }
    Ok(value.to_string())
}

impl LinkTypeChanges for LinkTypeUpdate {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn expected_version(&self) -> Option<Version> {
        self.version
    }

    fn apply_to(&self, target: &mut LinkType) -> Result<(), ConversionError> {
        if let Some(kind) = &self.kind {
            if kind != LINK_TYPES_KIND {
                return Err(ConversionError::WrongKind(kind.clone()));
            }
        }

        // Resolve everything fallible before mutating the target.
        let topology = match &self.topology {
            Some(t) => Some(
                Topology::parse(t).ok_or_else(|| ConversionError::UnknownTopology(t.clone()))?,
            ),
            None => None,
        };
        let category = match &self.link_category_id {
            Some(c) => Some(
                LinkCategoryId::from_string(c)
                    .filter(|id| !id.is_nil())
                    .ok_or_else(|| ConversionError::MalformedCategoryId(c.clone()))?,
            ),
            None => None,
        };
        let name = self.name.as_deref().map(|v| non_empty("name", v)).transpose()?;
        let source = self
            .source_type_name
            .as_deref()
            .map(|v| non_empty("source_type_name", v))
            .transpose()?;
        let target_name = self
            .target_type_name
            .as_deref()
            .map(|v| non_empty("target_type_name", v))
            .transpose()?;
        let forward = self
            .forward_name
            .as_deref()
            .map(|v| non_empty("forward_name", v))
            .transpose()?;
        let reverse = self
            .reverse_name
            .as_deref()
            .map(|v| non_empty("reverse_name", v))
            .transpose()?;

        if let Some(v) = name {
            target.name = v;
        }
        if let Some(d) = &self.description {
            target.description = if d.is_empty() { None } else { Some(d.clone()) };
        }
        if let Some(v) = source {
            target.source_type_name = v;
        }
        if let Some(v) = target_name {
            target.target_type_name = v;
        }
        if let Some(v) = forward {
            target.forward_name = v;
        }
        if let Some(v) = reverse {
            target.reverse_name = v;
        }
        if let Some(t) = topology {
            target.topology = t;
        }
        if let Some(c) = category {
            target.link_category_id = c;
        }
        Ok(())
    }
}
