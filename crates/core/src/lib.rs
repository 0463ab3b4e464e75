//! Core types for link type persistence
//!
//! This crate defines the foundational types used throughout the system:
//! - LinkTypeId / LinkCategoryId: UUID identifiers
//! - Topology: recognized relationship shapes
//! - LinkType / LinkCategory: persisted entities and creation validation
//! - Error: classification of every repository failure
//! - LinkTypeChanges / LinkTypeUpdate: caller view and its conversion
//! - Page / LinkTypeList: listing types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod link_type;
pub mod page;
pub mod timestamp;
pub mod types;
pub mod view;

pub use error::{Error, ErrorKind, Result};
pub use link_type::{
    LinkCategory, LinkType, NewLinkType, Version, INITIAL_VERSION, LINK_CATEGORY_ENTITY,
    LINK_TYPE_ENTITY,
};
pub use page::{LinkTypeList, Page};
pub use timestamp::Timestamp;
pub use types::{LinkCategoryId, LinkTypeId, Topology, UnknownTopology};
pub use view::{ConversionError, LinkTypeChanges, LinkTypeUpdate, LINK_TYPES_KIND};
