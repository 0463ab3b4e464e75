//! SQLite Store Integration Tests
//!
//! Exercises the relational store directly through the store contract,
//! without the repository on top.

use linkstore_core::{LinkCategory, LinkType, NewLinkType, Page, Topology};
use linkstore_storage::{
    SqliteOptions, SqliteStore, Store, StoreError, Tables, Transaction,
};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn category() -> LinkCategory {
    LinkCategory::new("system", Some("built in".to_string()))
}

fn link_type(name: &str, category: &LinkCategory) -> LinkType {
    NewLinkType {
        name: name.to_string(),
        description: None,
        source_type_name: "Bug".to_string(),
        target_type_name: "Feature".to_string(),
        forward_name: "implements".to_string(),
        reverse_name: "implemented by".to_string(),
        topology: "network".to_string(),
        link_category_id: category.id,
    }
    .into_link_type()
    .unwrap()
}

fn seeded(store: &SqliteStore) -> LinkCategory {
    let category = category();
    let mut tx = store.begin().unwrap();
    tx.insert_category(&category).unwrap();
    tx.commit().unwrap();
    category
}

#[test]
fn test_open_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("links.db");
    let store = SqliteStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.path(), Some(path.as_path()));
}

#[test]
fn test_committed_rows_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("links.db");
    let (category, row) = {
        let store = SqliteStore::open(&path).unwrap();
        let category = seeded(&store);
        let row = link_type("implements", &category);
        let mut tx = store.begin().unwrap();
        tx.insert_link_type(&row).unwrap();
        tx.commit().unwrap();
        (category, row)
    };

    let store = SqliteStore::open_with(
        &path,
        &SqliteOptions {
            busy_timeout: Duration::from_millis(100),
        },
    )
    .unwrap();
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.find_category(category.id).unwrap(), Some(category));
    assert_eq!(tx.find_link_type(row.id).unwrap(), Some(row));
}

#[test]
fn test_rolled_back_rows_are_gone() {
    let store = SqliteStore::open_in_memory().unwrap();
    let category = seeded(&store);
    let row = link_type("implements", &category);

    let mut tx = store.begin().unwrap();
    tx.insert_link_type(&row).unwrap();
    tx.rollback().unwrap();

    let mut tx = store.begin().unwrap();
    assert_eq!(tx.find_link_type(row.id).unwrap(), None);
    assert_eq!(tx.count_link_types().unwrap(), 0);
}

#[test]
fn test_dropped_transaction_rolls_back() {
    let store = SqliteStore::open_in_memory().unwrap();
    let category = seeded(&store);
    {
        let mut tx = store.begin().unwrap();
        tx.insert_link_type(&link_type("implements", &category)).unwrap();
    }
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.count_link_types().unwrap(), 0);
}

#[test]
fn test_foreign_key_rejects_unknown_category() {
    let store = SqliteStore::open_in_memory().unwrap();
    let row = link_type("implements", &category());
    let mut tx = store.begin().unwrap();
    let err = tx.insert_link_type(&row).unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
}

#[test]
fn test_unique_name_per_category() {
    let store = SqliteStore::open_in_memory().unwrap();
    let first = seeded(&store);
    let second = category();
    let mut tx = store.begin().unwrap();
    tx.insert_category(&second).unwrap();
    tx.insert_link_type(&link_type("implements", &first)).unwrap();
    tx.insert_link_type(&link_type("implements", &second)).unwrap();
    let err = tx
        .insert_link_type(&link_type("implements", &first))
        .unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)), "got {err:?}");
}

#[test]
fn test_conditional_update_checks_version() {
    let store = SqliteStore::open_in_memory().unwrap();
    let category = seeded(&store);
    let row = link_type("implements", &category);
    let mut tx = store.begin().unwrap();
    tx.insert_link_type(&row).unwrap();

    let mut changed = row.clone();
    changed.topology = Topology::DirectedNetwork;
    changed.version = 1;
    assert_eq!(tx.update_link_type(&changed, 5).unwrap(), 0);
    assert_eq!(tx.update_link_type(&changed, 0).unwrap(), 1);
    assert_eq!(tx.update_link_type(&changed, 0).unwrap(), 0);
    assert_eq!(tx.find_link_type(row.id).unwrap(), Some(changed));
}

#[test]
fn test_delete_reports_affected_rows() {
    let store = SqliteStore::open_in_memory().unwrap();
    let category = seeded(&store);
    let row = link_type("implements", &category);
    let mut tx = store.begin().unwrap();
    tx.insert_link_type(&row).unwrap();
    assert_eq!(tx.delete_link_type(row.id).unwrap(), 1);
    assert_eq!(tx.delete_link_type(row.id).unwrap(), 0);
}

#[test]
fn test_list_orders_by_name_and_windows() {
    let store = SqliteStore::open_in_memory().unwrap();
    let category = seeded(&store);
    let mut tx = store.begin().unwrap();
    for name in ["delta", "alpha", "charlie", "bravo"] {
        tx.insert_link_type(&link_type(name, &category)).unwrap();
    }

    let all: Vec<_> = tx
        .list_link_types(None)
        .unwrap()
        .into_iter()
        .map(|lt| lt.name)
        .collect();
    assert_eq!(all, ["alpha", "bravo", "charlie", "delta"]);

    let window: Vec<_> = tx
        .list_link_types(Some(Page::new(1, 2)))
        .unwrap()
        .into_iter()
        .map(|lt| lt.name)
        .collect();
    assert_eq!(window, ["bravo", "charlie"]);
    assert_eq!(tx.count_link_types().unwrap(), 4);
}

#[test]
fn test_overlapping_begin_on_one_thread_times_out() {
    let store = SqliteStore::open_in_memory_with(&SqliteOptions {
        busy_timeout: Duration::from_millis(50),
    })
    .unwrap();
    let _held = store.begin().unwrap();

    let started = Instant::now();
    let err = store.begin().err().unwrap();
    assert!(matches!(err, StoreError::Busy(_)), "got {err:?}");
    assert!(started.elapsed() >= Duration::from_millis(50));

    let err: linkstore_core::Error = err.into();
    assert_eq!(err.kind(), linkstore_core::ErrorKind::Internal);
}

#[test]
fn test_begin_succeeds_once_handle_released() {
    let store = SqliteStore::open_in_memory_with(&SqliteOptions {
        busy_timeout: Duration::from_millis(50),
    })
    .unwrap();
    let held = store.begin().unwrap();
    held.rollback().unwrap();
    let mut tx = store.begin().unwrap();
    assert_eq!(tx.count_link_types().unwrap(), 0);
}

#[test]
fn test_store_errors_map_to_internal() {
    let err: linkstore_core::Error = StoreError::Constraint("duplicate".to_string()).into();
    assert_eq!(err.kind(), linkstore_core::ErrorKind::Internal);
}
