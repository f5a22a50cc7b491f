mod common;

use std::fs;
use std::sync::Arc;

use gallery_core::{CheckpointDraft, Item, PaginationState, PaginationStatus};
use gallery_engine::{CheckpointManager, FileStore, KeyValueStore, StorageError};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{init_logging, CHECKPOINT_KEY};

#[tokio::test]
async fn file_store_round_trips_and_replaces() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("state"));

    assert_eq!(store.get("settings").await.unwrap(), None);

    store.set("settings", json!({"theme": "dark"})).await.unwrap();
    store.set("settings", json!({"theme": "light"})).await.unwrap();
    assert_eq!(
        store.get("settings").await.unwrap(),
        Some(json!({"theme": "light"}))
    );

    // Only the record itself remains; no temp files are left behind.
    let names: Vec<_> = fs::read_dir(dir.path().join("state"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["settings.json".to_string()]);
}

#[tokio::test]
async fn file_store_remove_is_idempotent() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().to_path_buf());

    store.remove("missing").await.unwrap();
    store.set("k", json!(1)).await.unwrap();
    store.remove("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[tokio::test]
async fn file_store_rejects_path_like_keys() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().to_path_buf());

    let err = store.set("../escape", json!(true)).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(ref key) if key == "../escape"));
    assert!(matches!(
        store.get("").await.unwrap_err(),
        StorageError::InvalidKey(_)
    ));
}

#[tokio::test]
async fn corrupt_record_is_a_decode_error() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("settings.json"), b"{not json").unwrap();
    let store = FileStore::new(dir.path().to_path_buf());

    let err = store.get("settings").await.unwrap_err();
    assert!(matches!(err, StorageError::Decode { ref key, .. } if key == "settings"));
}

#[tokio::test]
async fn checkpoint_survives_a_new_store_instance() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let draft = CheckpointDraft {
        pagination_status: PaginationStatus {
            state: PaginationState::Running,
            current_page: 4,
            error: None,
        },
        images: vec![Item::new("https://example.com/a.jpg")],
        ..CheckpointDraft::default()
    };

    let store = Arc::new(FileStore::new(dir.path().to_path_buf()));
    let first = CheckpointManager::new(store, CHECKPOINT_KEY);
    let saved = first.save(draft).await.unwrap();

    let reopened = Arc::new(FileStore::new(dir.path().to_path_buf()));
    let second = CheckpointManager::new(reopened, CHECKPOINT_KEY);
    assert!(second.exists().await.unwrap());
    assert_eq!(second.load().await.unwrap(), Some(saved));
}
