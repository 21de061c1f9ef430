//! Media storage integration tests

use cropwatch_backend::services::MediaStore;
use tempfile::TempDir;
use uuid::Uuid;

#[tokio::test]
async fn test_save_and_remove_upload() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path());
    let id = Uuid::new_v4();

    let relative = store.save(id, "corn leaf.jpg", b"jpeg-bytes").await.unwrap();

    assert!(relative.starts_with("uploads/"));
    assert!(relative.ends_with("_corn_leaf.jpg"));
    let stored = store.resolve(&relative);
    assert_eq!(std::fs::read(&stored).unwrap(), b"jpeg-bytes");

    tokio_test::assert_ok!(store.remove(&relative).await);
    assert!(!stored.exists());
}

#[tokio::test]
async fn test_same_filename_does_not_collide() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path());

    let a = store.save(Uuid::new_v4(), "leaf.png", b"a").await.unwrap();
    let b = store.save(Uuid::new_v4(), "leaf.png", b"b").await.unwrap();

    assert_ne!(a, b);
    assert_eq!(std::fs::read(store.resolve(&a)).unwrap(), b"a");
    assert_eq!(std::fs::read(store.resolve(&b)).unwrap(), b"b");
}

#[tokio::test]
async fn test_removing_missing_file_is_ok() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path());

    tokio_test::assert_ok!(store.remove("uploads/never-written.png").await);
}

#[tokio::test]
async fn test_stored_files_stay_under_media_root() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path().join("media"));

    let relative = store
        .save(Uuid::new_v4(), "../../escape.png", b"x")
        .await
        .unwrap();

    assert!(store.resolve(&relative).starts_with(store.root()));
    assert!(!dir.path().join("escape.png").exists());
}

#[tokio::test]
async fn test_long_filename_is_stored() {
    let dir = TempDir::new().unwrap();
    let store = MediaStore::new(dir.path());
    let filename = format!("{}.jpg", "a".repeat(300));

    let relative = tokio_test::assert_ok!(store.save(Uuid::new_v4(), &filename, b"leaf").await);

    let stored = store.resolve(&relative);
    assert!(relative.ends_with(".jpg"));
    assert!(stored.file_name().unwrap().len() < 255);
    assert_eq!(std::fs::read(&stored).unwrap(), b"leaf");
}
