//! In-memory store with optimistic concurrency control
//!
//! ## Design
//!
//! Committed rows live behind a single `RwLock`, each stamped with the
//! sequence number of the commit that last wrote it. A transaction reads
//! committed rows through its own write buffer and records the stamp of every
//! committed row it looks at (absent rows are recorded as absent).
//!
//! At commit the read set is validated under the write lock:
//! - First committer wins: any recorded stamp that no longer matches aborts
//!   the commit with [`StoreError::Conflict`]
//! - Read-only transactions always commit
//! - Uniqueness of `(name, link_category_id)` and the category reference are
//!   re-checked against the committed rows before applying
//!
//! Write skew across rows that were never read is allowed.

use crate::error::{StoreError, StoreResult};
use crate::fault::{FaultPlan, FaultPoint};
use crate::traits::{Store, Tables, Transaction};
use linkstore_core::{
    LinkCategory, LinkCategoryId, LinkType, LinkTypeId, Page, Version, LINK_CATEGORY_ENTITY,
    LINK_TYPE_ENTITY,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone)]
struct Stamped<T> {
    row: T,
    stamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Category(LinkCategoryId),
    LinkType(LinkTypeId),
}

impl RowKey {
    fn entity(&self) -> &'static str {
        match self {
            RowKey::Category(_) => LINK_CATEGORY_ENTITY,
            RowKey::LinkType(_) => LINK_TYPE_ENTITY,
        }
    }

    fn id_string(&self) -> String {
        match self {
            RowKey::Category(id) => id.to_string(),
            RowKey::LinkType(id) => id.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Committed {
    categories: BTreeMap<LinkCategoryId, Stamped<LinkCategory>>,
    link_types: BTreeMap<LinkTypeId, Stamped<LinkType>>,
    last_commit: u64,
}

impl Committed {
    fn stamp_of(&self, key: RowKey) -> Option<u64> {
        match key {
            RowKey::Category(id) => self.categories.get(&id).map(|s| s.stamp),
            RowKey::LinkType(id) => self.link_types.get(&id).map(|s| s.stamp),
        }
    }
}

/// Ephemeral store holding all rows in memory
///
/// # Example
///
/// ```text
/// let store = MemoryStore::new();
/// let mut tx = store.begin()?;
/// tx.insert_category(&LinkCategory::new("system", None))?;
/// tx.commit()?;
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: RwLock<Committed>,
    faults: FaultPlan,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the next operation passing `point`
    pub fn fail_next(&self, point: FaultPoint) {
        self.faults.arm(point);
    }

    /// Fault plan of this store
    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Sequence number of the latest commit that wrote anything
    pub fn last_commit(&self) -> u64 {
        self.committed.read().last_commit
    }
}

impl Store for MemoryStore {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> StoreResult<MemoryTransaction<'_>> {
        self.faults.check(FaultPoint::Begin)?;
        Ok(MemoryTransaction {
            store: self,
            read_set: HashMap::new(),
            category_writes: BTreeMap::new(),
            link_type_writes: BTreeMap::new(),
        })
    }
}

/// Transaction over a [`MemoryStore`]
///
/// Writes are buffered until commit; dropping the handle discards them.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
    read_set: HashMap<RowKey, Option<u64>>,
    category_writes: BTreeMap<LinkCategoryId, LinkCategory>,
    /// `None` marks a delete
    link_type_writes: BTreeMap<LinkTypeId, Option<LinkType>>,
}

impl<'a> MemoryTransaction<'a> {
    /// Number of buffered writes
    pub fn pending_writes(&self) -> usize {
        self.category_writes.len() + self.link_type_writes.len()
    }

    fn is_read_only(&self) -> bool {
        self.pending_writes() == 0
    }

    // First read wins: later reads of the same row keep the original stamp.
    fn record_read(&mut self, key: RowKey, stamp: Option<u64>) {
        self.read_set.entry(key).or_insert(stamp);
    }

    fn visible_link_types<F>(&mut self, pred: F) -> Vec<LinkType>
    where
        F: Fn(&LinkType) -> bool,
    {
        let store = self.store;
        let mut rows = Vec::new();
        let mut reads = Vec::new();
        {
            let committed = store.committed.read();
            for (id, stamped) in &committed.link_types {
                if self.link_type_writes.contains_key(id) {
                    continue;
                }
                if pred(&stamped.row) {
                    reads.push((RowKey::LinkType(*id), Some(stamped.stamp)));
                    rows.push(stamped.row.clone());
                }
            }
        }
        for (key, stamp) in reads {
            self.record_read(key, stamp);
        }
        rows.extend(
            self.link_type_writes
                .values()
                .flatten()
                .filter(|lt| pred(*lt))
                .cloned(),
        );
        rows.sort_by(|a, b| (a.name.as_str(), a.id).cmp(&(b.name.as_str(), b.id)));
        rows
    }

    fn ensure_category(&mut self, id: LinkCategoryId) -> StoreResult<()> {
        if self.find_category(id)?.is_none() {
            return Err(StoreError::Constraint(format!(
                "{LINK_CATEGORY_ENTITY} '{id}' does not exist"
            )));
        }
        Ok(())
    }

    fn ensure_unique_name(&mut self, link_type: &LinkType) -> StoreResult<()> {
        let clashes = self.visible_link_types(|other| {
            other.id != link_type.id
                && other.name == link_type.name
                && other.link_category_id == link_type.link_category_id
        });
        if !clashes.is_empty() {
            return Err(duplicate_name(link_type));
        }
        Ok(())
    }

    fn validate(&self, committed: &Committed) -> StoreResult<()> {
        for (key, seen) in &self.read_set {
            if committed.stamp_of(*key) != *seen {
                debug!(
                    target: "linkstore::store",
                    entity = key.entity(),
                    id = %key.id_string(),
                    "Commit conflict, row changed since read"
                );
                return Err(StoreError::Conflict {
                    entity: key.entity(),
                    id: key.id_string(),
                });
            }
        }

        for link_type in self.link_type_writes.values().flatten() {
            let category = link_type.link_category_id;
            if !committed.categories.contains_key(&category)
                && !self.category_writes.contains_key(&category)
            {
                return Err(StoreError::Constraint(format!(
                    "{LINK_CATEGORY_ENTITY} '{category}' does not exist"
                )));
            }
            let clash = committed.link_types.values().any(|other| {
                other.row.id != link_type.id
                    && !self.link_type_writes.contains_key(&other.row.id)
                    && other.row.name == link_type.name
                    && other.row.link_category_id == category
            });
            if clash {
                return Err(duplicate_name(link_type));
            }
        }
        Ok(())
    }
}

fn duplicate_name(link_type: &LinkType) -> StoreError {
    StoreError::Constraint(format!(
        "{LINK_TYPE_ENTITY} named '{}' already exists in category '{}'",
        link_type.name, link_type.link_category_id
    ))
}

fn window(rows: Vec<LinkType>, page: Option<Page>) -> Vec<LinkType> {
    match page {
        Some(page) => {
            let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
            let limit = usize::try_from(page.limit).unwrap_or(usize::MAX);
            rows.into_iter().skip(offset).take(limit).collect()
        }
        None => rows,
    }
}

impl<'a> Tables for MemoryTransaction<'a> {
    fn find_category(&mut self, id: LinkCategoryId) -> StoreResult<Option<LinkCategory>> {
        self.store.faults.check(FaultPoint::Read)?;
        if let Some(written) = self.category_writes.get(&id) {
            return Ok(Some(written.clone()));
        }
        let (row, stamp) = {
            let committed = self.store.committed.read();
            match committed.categories.get(&id) {
                Some(s) => (Some(s.row.clone()), Some(s.stamp)),
                None => (None, None),
            }
        };
        self.record_read(RowKey::Category(id), stamp);
        Ok(row)
    }

    fn insert_category(&mut self, category: &LinkCategory) -> StoreResult<()> {
        self.store.faults.check(FaultPoint::Write)?;
        if self.find_category(category.id)?.is_some() {
            return Err(StoreError::Constraint(format!(
                "duplicate {LINK_CATEGORY_ENTITY} id '{}'",
                category.id
            )));
        }
        self.category_writes.insert(category.id, category.clone());
        Ok(())
    }

    fn find_link_type(&mut self, id: LinkTypeId) -> StoreResult<Option<LinkType>> {
        self.store.faults.check(FaultPoint::Read)?;
        if let Some(written) = self.link_type_writes.get(&id) {
            return Ok(written.clone());
        }
        let (row, stamp) = {
            let committed = self.store.committed.read();
            match committed.link_types.get(&id) {
                Some(s) => (Some(s.row.clone()), Some(s.stamp)),
                None => (None, None),
            }
        };
        self.record_read(RowKey::LinkType(id), stamp);
        Ok(row)
    }

    fn find_link_type_by_name(
        &mut self,
        name: &str,
        category: LinkCategoryId,
    ) -> StoreResult<Option<LinkType>> {
        self.store.faults.check(FaultPoint::Read)?;
        let rows =
            self.visible_link_types(|lt| lt.name == name && lt.link_category_id == category);
        Ok(rows.into_iter().next())
    }

    fn insert_link_type(&mut self, link_type: &LinkType) -> StoreResult<()> {
        self.store.faults.check(FaultPoint::Write)?;
        if self.find_link_type(link_type.id)?.is_some() {
            return Err(StoreError::Constraint(format!(
                "duplicate {LINK_TYPE_ENTITY} id '{}'",
                link_type.id
            )));
        }
        self.ensure_category(link_type.link_category_id)?;
        self.ensure_unique_name(link_type)?;
        self.link_type_writes
            .insert(link_type.id, Some(link_type.clone()));
        Ok(())
    }

    fn update_link_type(
        &mut self,
        link_type: &LinkType,
        expected_version: Version,
    ) -> StoreResult<usize> {
        self.store.faults.check(FaultPoint::Write)?;
        let current = match self.find_link_type(link_type.id)? {
            Some(current) if current.version == expected_version => current,
            _ => return Ok(0),
        };
        if current.link_category_id != link_type.link_category_id {
            self.ensure_category(link_type.link_category_id)?;
        }
        self.ensure_unique_name(link_type)?;
        self.link_type_writes
            .insert(link_type.id, Some(link_type.clone()));
        Ok(1)
    }

    fn delete_link_type(&mut self, id: LinkTypeId) -> StoreResult<usize> {
        self.store.faults.check(FaultPoint::Write)?;
        if self.find_link_type(id)?.is_none() {
            return Ok(0);
        }
        self.link_type_writes.insert(id, None);
        Ok(1)
    }

    fn list_link_types(&mut self, page: Option<Page>) -> StoreResult<Vec<LinkType>> {
        self.store.faults.check(FaultPoint::Read)?;
        let rows = self.visible_link_types(|_| true);
        Ok(window(rows, page))
    }

    fn count_link_types(&mut self) -> StoreResult<u64> {
        self.store.faults.check(FaultPoint::Read)?;
        Ok(self.visible_link_types(|_| true).len() as u64)
    }
}

impl<'a> Transaction for MemoryTransaction<'a> {
    fn commit(self) -> StoreResult<()> {
        let store = self.store;
        store.faults.check(FaultPoint::Commit)?;
        if self.is_read_only() {
            return Ok(());
        }

        let mut committed = store.committed.write();
        self.validate(&committed)?;

        let stamp = committed.last_commit + 1;
        for (id, category) in self.category_writes {
            committed.categories.insert(id, Stamped { row: category, stamp });
        }
        for (id, write) in self.link_type_writes {
            match write {
                Some(row) => {
                    committed.link_types.insert(id, Stamped { row, stamp });
                }
                None => {
                    committed.link_types.remove(&id);
                }
            }
        }
        committed.last_commit = stamp;
        Ok(())
    }

    fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}
