//! Store contract
//!
//! The repository depends only on these traits. A [`Store`] hands out
//! transactional handles; every handle exposes the [`Tables`] the repository
//! reads and writes, and ends with exactly one of commit or rollback.
//! Dropping a handle without committing rolls it back.

use crate::error::StoreResult;
use linkstore_core::{LinkCategory, LinkCategoryId, LinkType, LinkTypeId, Page, Version};

/// Row-level access to the link type and link category tables
///
/// Reads take `&mut self` so optimistic implementations can record their
/// read set.
pub trait Tables {
    /// Look up a category by id
    fn find_category(&mut self, id: LinkCategoryId) -> StoreResult<Option<LinkCategory>>;

    /// Insert a category row
    fn insert_category(&mut self, category: &LinkCategory) -> StoreResult<()>;

    /// Look up a link type by id
    fn find_link_type(&mut self, id: LinkTypeId) -> StoreResult<Option<LinkType>>;

    /// Look up a link type by name within one category
    fn find_link_type_by_name(
        &mut self,
        name: &str,
        category: LinkCategoryId,
    ) -> StoreResult<Option<LinkType>>;

    /// Insert a new link type row
    ///
    /// Fails with `Constraint` on a duplicate id, a duplicate
    /// `(name, link_category_id)` or a missing category.
    fn insert_link_type(&mut self, link_type: &LinkType) -> StoreResult<()>;

    /// Overwrite the row with `link_type.id` if its stored version equals `expected_version`
    ///
    /// Returns the number of rows affected (0 or 1).
    fn update_link_type(
        &mut self,
        link_type: &LinkType,
        expected_version: Version,
    ) -> StoreResult<usize>;

    /// Delete by id, returning the number of rows affected (0 or 1)
    fn delete_link_type(&mut self, id: LinkTypeId) -> StoreResult<usize>;

    /// List link types ordered by `(name, id)`, optionally windowed
    fn list_link_types(&mut self, page: Option<Page>) -> StoreResult<Vec<LinkType>>;

    /// Count all link types
    fn count_link_types(&mut self) -> StoreResult<u64>;
}

/// A transactional handle
pub trait Transaction: Tables + Sized {
    /// Make every write of this transaction visible, or fail and discard them all
    fn commit(self) -> StoreResult<()>;

    /// Discard every write of this transaction
    fn rollback(self) -> StoreResult<()>;
}

/// A store able to open transactions
pub trait Store {
    /// Transactional handle type
    type Tx<'a>: Transaction
    where
        Self: 'a;

    /// Begin a new transaction
    fn begin(&self) -> StoreResult<Self::Tx<'_>>;
}
