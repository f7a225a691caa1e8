use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use dormwatt::repository::models::binding::Binding;

use crate::common::test_app::spawn_app;
use crate::common::{binding_params, TEST_DEVICE_TOKEN};

#[tokio::test]
async fn create_binding_success() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_binding(&binding_params("A123", 7, 30)).await;
    let status = response.status();
    let binding: Binding = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 201);
    assert!(binding.id > 0);
    assert_eq!(binding.room, "A123");
    assert!(app.scheduler.is_scheduled(binding.id));

    // The confirmation push went out to the device.
    let pushes = app.apns_server.received_requests().await.unwrap();
    assert_eq!(pushes.len(), 1);
    assert!(pushes[0].url.path().ends_with(TEST_DEVICE_TOKEN));
}

#[tokio::test]
async fn duplicate_room_binding_is_a_conflict() {
    // Arrange
    let app = spawn_app().await;
    let first = app.post_binding(&binding_params("A123", 7, 30)).await;
    assert_eq!(first.status(), 201);

    // Act: same (device, campus, building, room), different time.
    let response = app.post_binding(&binding_params("A123", 9, 0)).await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert
    assert_eq!(status, 400);
    assert!(body["reason"]
        .as_str()
        .unwrap()
        .contains("already exists"));
    assert_eq!(app.scheduler.active_jobs(), 1);
}

#[tokio::test]
async fn unknown_building_is_rejected() {
    // Arrange
    let app = spawn_app().await;
    let mut params = binding_params("A123", 7, 30);
    params["building"] = json!("99栋");

    // Act
    let response = app.post_binding(&params).await;

    // Assert
    assert_eq!(response.status(), 400);
    assert_eq!(app.scheduler.active_jobs(), 0);
}

#[tokio::test]
async fn out_of_range_schedule_time_is_rejected() {
    // Arrange
    let app = spawn_app().await;

    for (hour, minute) in [(24, 0), (0, 60)] {
        // Act
        let response = app.post_binding(&binding_params("A123", hour, minute)).await;
        let status = response.status();
        let body: Value = response.json().await.unwrap();

        // Assert
        assert_eq!(status, 400);
        assert!(body["reason"].as_str().unwrap().contains("out of range"));
    }

    assert_eq!(app.scheduler.active_jobs(), 0);
}

#[tokio::test]
async fn failed_meter_probe_rejects_the_create() {
    // Arrange
    let app = spawn_app().await;
    let _meter_down = Mock::given(method("GET"))
        .and(path("/electricity"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .named("Meter probe failure.")
        .mount_as_scoped(&app.meter_server)
        .await;

    // Act
    let response = app.post_binding(&binding_params("A123", 7, 30)).await;

    // Assert
    assert_eq!(response.status(), 400);
    assert_eq!(app.scheduler.active_jobs(), 0);
}

#[tokio::test]
async fn rejected_device_token_fails_the_create() {
    // Arrange
    let app = spawn_app().await;
    let _dead_token = Mock::given(method("POST"))
        .and(path_regex("^/3/device/.*"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"reason": "BadDeviceToken"})),
        )
        .expect(1)
        .named("Dead token confirmation.")
        .mount_as_scoped(&app.apns_server)
        .await;

    // Act
    let response = app.post_binding(&binding_params("A123", 7, 30)).await;
    let status = response.status();
    let body: Value = response.json().await.unwrap();

    // Assert: nothing was persisted or scheduled.
    assert_eq!(status, 400);
    assert!(body["reason"].as_str().unwrap().contains("rejected"));
    assert_eq!(app.scheduler.active_jobs(), 0);

    let list = app.get_bindings(TEST_DEVICE_TOKEN).await;
    let bindings: Vec<Binding> = list.json().await.unwrap();
    assert!(bindings.is_empty());
}
