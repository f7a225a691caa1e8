use serde_json::Value;

use dormwatt::repository::models::binding::Binding;

use crate::common::test_app::spawn_app;
use crate::common::{binding_params, TEST_DEVICE_TOKEN};

#[tokio::test]
async fn list_and_get_bindings() {
    // Arrange
    let app = spawn_app().await;
    let created: Binding = app
        .post_binding(&binding_params("A123", 7, 30))
        .await
        .json()
        .await
        .unwrap();

    // Act
    let list_response = app.get_bindings(TEST_DEVICE_TOKEN).await;
    let bindings: Vec<Binding> = list_response.json().await.unwrap();

    let get_response = app.get_binding(TEST_DEVICE_TOKEN, created.id).await;
    let fetched: Binding = get_response.json().await.unwrap();

    // Assert
    assert_eq!(bindings.len(), 1);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_unknown_binding_is_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get_binding(TEST_DEVICE_TOKEN, 999).await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 404);
    assert!(body["reason"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn delete_one_binding_cancels_its_job() {
    // Arrange
    let app = spawn_app().await;
    let first: Binding = app
        .post_binding(&binding_params("A123", 7, 30))
        .await
        .json()
        .await
        .unwrap();
    let second: Binding = app
        .post_binding(&binding_params("B200", 8, 0))
        .await
        .json()
        .await
        .unwrap();

    // Act
    let response = app.delete_binding(TEST_DEVICE_TOKEN, first.id).await;
    let status = response.status();
    let remaining: Vec<Binding> = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, second.id);
    assert!(!app.scheduler.is_scheduled(first.id));
    assert!(app.scheduler.is_scheduled(second.id));
}

#[tokio::test]
async fn delete_unknown_binding_is_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.delete_binding(TEST_DEVICE_TOKEN, 999).await;

    // Assert
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn delete_all_bindings_clears_the_device() {
    // Arrange
    let app = spawn_app().await;
    app.post_binding(&binding_params("A123", 7, 30)).await;
    app.post_binding(&binding_params("B200", 8, 0)).await;

    // Act
    let response = app.delete_bindings(TEST_DEVICE_TOKEN).await;
    let status = response.status();
    let remaining: Vec<Binding> = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert!(remaining.is_empty());
    assert_eq!(app.scheduler.active_jobs(), 0);
}

#[tokio::test]
async fn restore_reschedules_persisted_bindings_without_duplicates() {
    // Arrange
    let app = spawn_app().await;
    app.post_binding(&binding_params("A123", 7, 30)).await;
    app.post_binding(&binding_params("B200", 8, 0)).await;
    app.post_binding(&binding_params("C305", 9, 15)).await;
    assert_eq!(app.scheduler.active_jobs(), 3);

    // Act: what startup runs after a restart.
    let count = app.service.restore().await.unwrap();

    // Assert
    assert_eq!(count, 3);
    assert_eq!(app.scheduler.active_jobs(), 3);
}

#[tokio::test]
async fn info_reports_active_jobs() {
    // Arrange
    let app = spawn_app().await;
    app.post_binding(&binding_params("A123", 7, 30)).await;

    // Act
    let response = app.get_info().await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 200);
    assert_eq!(body["name"], "dormwatt");
    assert_eq!(body["activeJobs"], 1);
}
