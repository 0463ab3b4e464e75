//! Link type repository
//!
//! Every operation runs against a transactional handle supplied by the
//! caller; the repository never opens or ends a transaction itself. Compose
//! it with [`run_in_transaction`](crate::run_in_transaction):
//!
//! ```text
//! let created = run_in_transaction(&store, |tx| {
//!     LinkTypeRepository::new(tx).create(input)
//! })?;
//! ```
//!
//! ## Failure classification
//!
//! | Operation | Failure kinds |
//! |-----------|---------------|
//! | create    | BadParameter, Internal |
//! | load      | NotFound, Internal |
//! | list      | Internal |
//! | delete    | NotFound, Internal |
//! | save      | BadParameter, NotFound, VersionConflict, Internal, Conversion |
//!
//! Malformed identifiers are reported as NotFound, never BadParameter.

use crate::config::ListingConfig;
use crate::instrumentation::{Instrumentation, NoopInstrumentation, Operation, Outcome};
use linkstore_core::{
    Error, LinkCategoryId, LinkType, LinkTypeChanges, LinkTypeId, LinkTypeList, NewLinkType, Page,
    Result, Timestamp, LINK_CATEGORY_ENTITY, LINK_TYPE_ENTITY,
};
use linkstore_storage::Tables;
use std::sync::Arc;
use std::time::Instant;

/// Link type operations over one transactional handle
pub struct LinkTypeRepository<'t, T: Tables> {
    tables: &'t mut T,
    instrumentation: Arc<dyn Instrumentation>,
    listing: ListingConfig,
}

impl<'t, T: Tables> LinkTypeRepository<'t, T> {
    /// Wrap a transactional handle with no instrumentation and default listing limits
    pub fn new(tables: &'t mut T) -> Self {
        Self {
            tables,
            instrumentation: Arc::new(NoopInstrumentation),
            listing: ListingConfig::default(),
        }
    }

    /// Observe every operation with `instrumentation`
    pub fn with_instrumentation(mut self, instrumentation: Arc<dyn Instrumentation>) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    /// Use the given page limits for [`list_page`](Self::list_page)
    pub fn with_listing(mut self, listing: ListingConfig) -> Self {
        self.listing = listing;
        self
    }

    /// Create a link type under an existing category
    ///
    /// Input validation happens before any storage access. The category must
    /// exist in the same transaction the row is inserted in.
    pub fn create(&mut self, input: NewLinkType) -> Result<LinkType> {
        self.observe(Operation::Create, |repo| {
            let link_type = input.into_link_type()?;
            repo.require_category(link_type.link_category_id)?;
            repo.tables
                .insert_link_type(&link_type)
                .map_err(|e| Error::internal(format!("failed to insert link type: {e}")))?;
            Ok(link_type)
        })
    }

    /// Load a link type by the caller's identifier string
    pub fn load(&mut self, id: &str) -> Result<LinkType> {
        self.observe(Operation::Load, |repo| {
            let id = parse_link_type_id(id)?;
            repo.find(id)
        })
    }

    /// Load a link type by an already parsed identifier
    pub fn load_by_id(&mut self, id: LinkTypeId) -> Result<LinkType> {
        self.observe(Operation::Load, |repo| repo.find(id))
    }

    /// Load the link type named `name` within `category`
    pub fn load_by_name_and_category(
        &mut self,
        name: &str,
        category: LinkCategoryId,
    ) -> Result<LinkType> {
        self.observe(Operation::LoadByName, |repo| {
            repo.tables
                .find_link_type_by_name(name, category)
                .map_err(|e| Error::internal(format!("failed to load link type by name: {e}")))?
                .ok_or_else(|| {
                    Error::not_found(LINK_TYPE_ENTITY, format!("{name} in category {category}"))
                })
        })
    }

    /// Every link type ordered by `(name, id)`, with the total count
    pub fn list(&mut self) -> Result<LinkTypeList> {
        self.observe(Operation::List, |repo| repo.list_window(None))
    }

    /// One page of link types with the total count across all pages
    ///
    /// A zero limit means the configured default; larger limits are clamped
    /// to the configured maximum.
    pub fn list_page(&mut self, page: Page) -> Result<LinkTypeList> {
        self.observe(Operation::List, |repo| {
            let limit = repo.listing.effective_limit(page.limit);
            repo.list_window(Some(Page::new(page.offset, limit)))
        })
    }

    /// Hard delete by the caller's identifier string
    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.observe(Operation::Delete, |repo| {
            let parsed = parse_link_type_id(id)?;
            let affected = repo
                .tables
                .delete_link_type(parsed)
                .map_err(|e| Error::internal(format!("failed to delete link type: {e}")))?;
            if affected == 0 {
                return Err(Error::not_found(LINK_TYPE_ENTITY, id));
            }
            Ok(())
        })
    }

    /// Apply `changes` to a stored link type under optimistic concurrency
    ///
    /// The caller's expected version must equal the stored one; on success
    /// the stored version advances by exactly one.
    pub fn save(&mut self, changes: &dyn LinkTypeChanges) -> Result<LinkType> {
        self.observe(Operation::Save, |repo| {
            let raw_id = changes
                .id()
                .ok_or_else(|| Error::bad_parameter("id", "missing"))?;
            let id = parse_link_type_id(raw_id)?;
            let current = repo.find(id)?;

            let expected = changes.expected_version().ok_or_else(|| {
                Error::version_conflict(format!("no version given for link type {id}"))
            })?;
            if expected != current.version {
                return Err(Error::version_conflict(format!(
                    "link type {id} is at version {}, caller expected {expected}",
                    current.version
                )));
            }

            let mut updated = current.clone();
            changes.apply_to(&mut updated)?;
            updated.id = current.id;
            updated.created_at = current.created_at;
            if updated.link_category_id != current.link_category_id {
                repo.require_category(updated.link_category_id)?;
            }
            updated.version = current.next_version().ok_or_else(|| {
                Error::internal(format!(
                    "link type {id} version {} cannot advance",
                    current.version
                ))
            })?;
            updated.updated_at = Timestamp::now().max(current.updated_at);

            let affected = repo
                .tables
                .update_link_type(&updated, expected)
                .map_err(|e| Error::internal(format!("failed to update link type: {e}")))?;
            if affected == 0 {
                return Err(Error::version_conflict(format!(
                    "link type {id} changed since version {expected}"
                )));
            }
            Ok(updated)
        })
    }

    fn observe<R>(
        &mut self,
        operation: Operation,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        self.instrumentation.operation_started(operation);
        let started = Instant::now();
        let result = f(self);
        self.instrumentation
            .operation_finished(operation, Outcome::of(&result), started.elapsed());
        result
    }

    fn find(&mut self, id: LinkTypeId) -> Result<LinkType> {
        self.tables
            .find_link_type(id)
            .map_err(|e| Error::internal(format!("failed to load link type: {e}")))?
            .ok_or_else(|| Error::not_found(LINK_TYPE_ENTITY, id))
    }

    fn require_category(&mut self, id: LinkCategoryId) -> Result<()> {
        match self.tables.find_category(id) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Error::bad_parameter(
                LINK_CATEGORY_ENTITY,
                format!("'{id}' does not exist"),
            )),
            Err(e) => Err(Error::internal(format!("failed to find link category: {e}"))),
        }
    }

    fn list_window(&mut self, page: Option<Page>) -> Result<LinkTypeList> {
        let link_types = self
            .tables
            .list_link_types(page)
            .map_err(|e| Error::internal(format!("failed to list link types: {e}")))?;
        let total_count = self
            .tables
            .count_link_types()
            .map_err(|e| Error::internal(format!("failed to count link types: {e}")))?;
        Ok(LinkTypeList {
            link_types,
            total_count,
        })
    }
}

fn parse_link_type_id(id: &str) -> Result<LinkTypeId> {
    LinkTypeId::from_string(id).ok_or_else(|| Error::not_found(LINK_TYPE_ENTITY, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::OperationCounters;
    use linkstore_core::{
        ErrorKind, LinkCategory, LinkTypeUpdate, Topology, Version, INITIAL_VERSION,
    };
    use linkstore_storage::{FaultPoint, MemoryStore, Store, Transaction};

    fn seeded() -> (MemoryStore, LinkCategoryId) {
        let store = MemoryStore::new();
        let category = LinkCategory::new("system", None);
        let mut tx = store.begin().unwrap();
        tx.insert_category(&category).unwrap();
        tx.commit().unwrap();
        (store, category.id)
    }

    fn blocks(category: LinkCategoryId) -> NewLinkType {
        NewLinkType {
            name: "blocks".to_string(),
            description: Some("one item blocks another".to_string()),
            source_type_name: "Bug".to_string(),
            target_type_name: "Bug".to_string(),
            forward_name: "blocks".to_string(),
            reverse_name: "blocked by".to_string(),
            topology: "dependency".to_string(),
            link_category_id: category,
        }
    }

    #[test]
    fn test_create_assigns_initial_version() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        assert_eq!(created.version, INITIAL_VERSION);
        assert_eq!(created.topology, Topology::Dependency);
        assert_eq!(created.created_at, created.updated_at);
    }

    #[test]
    fn test_create_rejects_invalid_input_before_storage() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        store.fail_next(FaultPoint::Read);
        let mut input = blocks(category);
        input.topology = "ring".to_string();
        let err = repo.create(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
        // The armed read fault was never consumed
        assert!(store.faults().is_armed(FaultPoint::Read));

        store.faults().clear();
        assert!(!store.faults().is_armed(FaultPoint::Read));
        repo.create(blocks(category)).unwrap();
    }

    #[test]
    fn test_create_with_unknown_category() {
        let (store, _) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let err = repo.create(blocks(LinkCategoryId::new())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
        assert_eq!(repo.list().unwrap().total_count, 0);
    }

    #[test]
    fn test_create_category_lookup_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        store.fail_next(FaultPoint::Read);
        let err = repo.create(blocks(category)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_create_insert_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        store.fail_next(FaultPoint::Write);
        let err = repo.create(blocks(category)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_load_malformed_id_is_not_found() {
        let (store, _) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        store.fail_next(FaultPoint::Read);
        let err = repo.load("not-a-uuid").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // No query was attempted
        assert!(store.faults().is_armed(FaultPoint::Read));
    }

    #[test]
    fn test_load_read_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        store.fail_next(FaultPoint::Read);
        let err = repo.load(&created.id.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_load_by_name_read_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        store.fail_next(FaultPoint::Read);
        let err = repo
            .load_by_name_and_category("blocks", category)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(repo.load_by_name_and_category("blocks", category).unwrap(), created);
    }

    #[test]
    fn test_load_by_name_is_scoped_to_category() {
        let (store, first) = seeded();
        let second = LinkCategory::new("user", None);
        let mut tx = store.begin().unwrap();
        tx.insert_category(&second).unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let a = repo.create(blocks(first)).unwrap();
        let b = repo.create(blocks(second.id)).unwrap();

        assert_eq!(repo.load_by_name_and_category("blocks", first).unwrap(), a);
        assert_eq!(repo.load_by_name_and_category("blocks", second.id).unwrap(), b);
        let err = repo
            .load_by_name_and_category("blocks", LinkCategoryId::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_twice() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        let id = created.id.to_string();
        repo.delete(&id).unwrap();
        assert_eq!(repo.delete(&id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.load_by_id(created.id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(repo.delete("garbage").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_delete_write_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        store.fail_next(FaultPoint::Write);
        let err = repo.delete(&created.id.to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(repo.load_by_id(created.id).unwrap(), created);
    }

    #[test]
    fn test_save_requires_id() {
        let (store, _) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let err = repo.save(&LinkTypeUpdate::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParameter);
    }

    #[test]
    fn test_save_missing_version_conflicts() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();
        let update = LinkTypeUpdate {
            id: Some(created.id.to_string()),
            ..LinkTypeUpdate::default()
        };
        assert_eq!(repo.save(&update).unwrap_err().kind(), ErrorKind::VersionConflict);
    }

    #[test]
    fn test_save_applies_changes_and_bumps_version() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();

        let update = LinkTypeUpdate::new(created.id, 0)
            .forward_name("depends on")
            .description("");
        let saved = repo.save(&update).unwrap();
        assert_eq!(saved.version, 1);
        assert_eq!(saved.forward_name, "depends on");
        assert_eq!(saved.description, None);
        assert_eq!(saved.created_at, created.created_at);
        assert!(saved.updated_at >= created.updated_at);
        assert_eq!(repo.load_by_id(created.id).unwrap(), saved);
    }

    #[test]
    fn test_save_conversion_error_passes_through() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();

        let update = LinkTypeUpdate::new(created.id, 0).topology("ring");
        let err = repo.save(&update).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        assert_eq!(repo.load_by_id(created.id).unwrap(), created);
    }

    #[test]
    fn test_save_to_unknown_category() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();

        let update = LinkTypeUpdate::new(created.id, 0).link_category_id(LinkCategoryId::new());
        assert_eq!(repo.save(&update).unwrap_err().kind(), ErrorKind::BadParameter);
    }

    #[test]
    fn test_save_read_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();

        store.fail_next(FaultPoint::Read);
        let update = LinkTypeUpdate::new(created.id, 0).forward_name("depends on");
        let err = repo.save(&update).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(repo.load_by_id(created.id).unwrap(), created);
    }

    #[test]
    fn test_save_write_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let created = repo.create(blocks(category)).unwrap();

        store.fail_next(FaultPoint::Write);
        let update = LinkTypeUpdate::new(created.id, 0).forward_name("depends on");
        let err = repo.save(&update).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(repo.load_by_id(created.id).unwrap(), created);

        // The fault is spent; the same update now goes through
        assert_eq!(repo.save(&update).unwrap().version, 1);
    }

    #[test]
    fn test_save_at_exhausted_version_is_internal() {
        let (store, category) = seeded();
        let mut row = blocks(category).into_link_type().unwrap();
        row.version = Version::MAX;
        let mut tx = store.begin().unwrap();
        tx.insert_link_type(&row).unwrap();

        let mut repo = LinkTypeRepository::new(&mut tx);
        let update = LinkTypeUpdate::new(row.id, Version::MAX).forward_name("depends on");
        let err = repo.save(&update).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(repo.load_by_id(row.id).unwrap(), row);
    }

    #[test]
    fn test_save_malformed_id_is_not_found() {
        let (store, _) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        let update = LinkTypeUpdate::new("nope", 0);
        assert_eq!(repo.save(&update).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_list_read_failure_is_internal() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx);
        repo.create(blocks(category)).unwrap();
        store.fail_next(FaultPoint::Read);
        assert_eq!(repo.list().unwrap_err().kind(), ErrorKind::Internal);
        assert_eq!(repo.list().unwrap().total_count, 1);
    }

    #[test]
    fn test_list_page_clamps_and_counts() {
        let (store, category) = seeded();
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx).with_listing(ListingConfig {
            default_limit: 2,
            max_limit: 3,
        });
        for name in ["a", "b", "c", "d", "e"] {
            let mut input = blocks(category);
            input.name = name.to_string();
            repo.create(input).unwrap();
        }

        let first = repo.list_page(Page::first(0)).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.total_count, 5);

        let clamped = repo.list_page(Page::first(100)).unwrap();
        let names: Vec<_> = clamped.link_types.iter().map(|lt| lt.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(clamped.has_more(&Page::first(3)));

        let tail = repo.list_page(Page::new(3, 3)).unwrap();
        assert_eq!(tail.len(), 2);
        assert!(!tail.has_more(&Page::new(3, 3)));
    }

    #[test]
    fn test_instrumentation_sees_every_operation() {
        let (store, category) = seeded();
        let counters = Arc::new(OperationCounters::new());
        let mut tx = store.begin().unwrap();
        let mut repo = LinkTypeRepository::new(&mut tx).with_instrumentation(counters.clone());

        let created = repo.create(blocks(category)).unwrap();
        repo.load(&created.id.to_string()).unwrap();
        repo.load("bad").unwrap_err();
        repo.list().unwrap();
        repo.save(&LinkTypeUpdate::new(created.id, 7)).unwrap_err();

        assert_eq!(counters.started(), 5);
        assert_eq!(counters.succeeded(), 3);
        assert_eq!(counters.failed(ErrorKind::NotFound), 1);
        assert_eq!(counters.failed(ErrorKind::VersionConflict), 1);
    }
}
