use serde_json::{json, Value};

use dormwatt::repository::models::binding::Binding;

use crate::common::test_app::spawn_app;
use crate::common::{binding_params, sync_item, sync_params, TEST_DEVICE_TOKEN};

#[tokio::test]
async fn sync_replaces_the_full_set() {
    // Arrange
    let app = spawn_app().await;
    let first = app.post_binding(&binding_params("A123", 7, 30)).await;
    let original: Binding = first.json().await.unwrap();

    // Act
    let response = app
        .post_sync(&sync_params(vec![
            sync_item("B200", 8, 0),
            sync_item("C305", 9, 15),
        ]))
        .await;
    let status = response.status();
    let replaced: Vec<Binding> = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert_eq!(replaced.len(), 2);
    assert!(!app.scheduler.is_scheduled(original.id));
    for binding in &replaced {
        assert!(app.scheduler.is_scheduled(binding.id));
    }

    let list = app.get_bindings(TEST_DEVICE_TOKEN).await;
    let bindings: Vec<Binding> = list.json().await.unwrap();
    let mut rooms: Vec<&str> = bindings.iter().map(|b| b.room.as_str()).collect();
    rooms.sort_unstable();
    assert_eq!(rooms, vec!["B200", "C305"]);
}

#[tokio::test]
async fn sync_with_one_invalid_item_changes_nothing() {
    // Arrange
    let app = spawn_app().await;
    let first = app.post_binding(&binding_params("A123", 7, 30)).await;
    let original: Binding = first.json().await.unwrap();

    let mut invalid = sync_item("B200", 8, 0);
    invalid["building"] = json!("99栋");

    // Act
    let response = app
        .post_sync(&sync_params(vec![sync_item("C305", 9, 15), invalid]))
        .await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert: the error names the failing item, prior state is untouched.
    assert_eq!(status, 400);
    assert!(body["reason"].as_str().unwrap().contains("Binding 2"));
    assert!(app.scheduler.is_scheduled(original.id));

    let list = app.get_bindings(TEST_DEVICE_TOKEN).await;
    let bindings: Vec<Binding> = list.json().await.unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].room, "A123");
}

#[tokio::test]
async fn sync_rejects_out_of_range_time_in_any_item() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app
        .post_sync(&sync_params(vec![sync_item("A123", 24, 0)]))
        .await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 400);
    assert!(body["reason"].as_str().unwrap().contains("Binding 1"));
}

#[tokio::test]
async fn empty_sync_unsubscribes_the_device() {
    // Arrange
    let app = spawn_app().await;
    app.post_binding(&binding_params("A123", 7, 30)).await;
    app.post_binding(&binding_params("B200", 8, 0)).await;
    assert_eq!(app.scheduler.active_jobs(), 2);

    // Act
    let response = app.post_sync(&sync_params(Vec::new())).await;
    let status = response.status();
    let replaced: Vec<Binding> = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert!(replaced.is_empty());
    assert_eq!(app.scheduler.active_jobs(), 0);

    let list = app.get_bindings(TEST_DEVICE_TOKEN).await;
    let bindings: Vec<Binding> = list.json().await.unwrap();
    assert!(bindings.is_empty());
}

#[tokio::test]
async fn resync_of_identical_set_recreates_jobs() {
    // Arrange
    let app = spawn_app().await;
    let items = vec![sync_item("A123", 7, 30)];
    let first = app.post_sync(&sync_params(items.clone())).await;
    let original: Vec<Binding> = first.json().await.unwrap();

    // Act: cancel-and-recreate semantics, not a diffing no-op.
    let response = app.post_sync(&sync_params(items)).await;
    let replaced: Vec<Binding> = response.json().await.unwrap();

    // Assert: same slot, fresh row and job.
    assert_eq!(replaced.len(), 1);
    assert_ne!(replaced[0].id, original[0].id);
    assert!(!app.scheduler.is_scheduled(original[0].id));
    assert!(app.scheduler.is_scheduled(replaced[0].id));
    assert_eq!(app.scheduler.active_jobs(), 1);
}
