#![allow(clippy::unwrap_used)]
// Integration tests for the REST client and session gate using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use visionguard_api::cameras::{CameraCreate, CameraUpdate};
use visionguard_api::transport::TransportConfig;
use visionguard_api::{ApiClient, AuthState, Error, SessionGate};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = ApiClient::new(base_url, &TransportConfig::default()).unwrap();
    (server, client)
}

fn identity_body() -> serde_json::Value {
    json!({
        "id": "42",
        "login": "ivan",
        "email": "ivan@example.com",
        "name": "Ivan Petrov",
        "gender": "male",
        "avatar": "https://avatars.example/ivan"
    })
}

fn csrf_mock() -> Mock {
    Mock::given(method("GET")).and(path("/csrf-token")).respond_with(
        ResponseTemplate::new(200).insert_header("set-cookie", "csrf_token=tok-abc; Path=/"),
    )
}

// ── Session gate ────────────────────────────────────────────────────

#[tokio::test]
async fn test_resolve_authenticated() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(identity_body()))
        .mount(&server)
        .await;

    let gate = SessionGate::new(client);
    let state = gate.resolve().await.unwrap();

    match state {
        AuthState::Authenticated(session) => {
            assert_eq!(session.email, "ivan@example.com");
            assert_eq!(session.name, "Ivan Petrov");
        }
        AuthState::Anonymous => panic!("expected authenticated state"),
    }
}

#[tokio::test]
async fn test_resolve_anonymous_on_401() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
        .mount(&server)
        .await;

    let gate = SessionGate::new(client);
    let state = gate.resolve().await.unwrap();
    assert_eq!(state, AuthState::Anonymous);
}

#[tokio::test]
async fn test_ensure_csrf_primes_cookie_once() {
    let (server, client) = setup().await;

    csrf_mock().expect(1).mount(&server).await;

    let gate = SessionGate::new(client.clone());
    assert_eq!(client.csrf_token(), None);

    gate.ensure_csrf().await.unwrap();
    assert_eq!(client.csrf_token().as_deref(), Some("tok-abc"));

    // Second call sees the cookie and skips the network (expect(1) above).
    gate.ensure_csrf().await.unwrap();
}

#[tokio::test]
async fn test_logout_wipes_local_state_even_when_server_fails() {
    let (server, client) = setup().await;

    csrf_mock().mount(&server).await;
    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .mount(&server)
        .await;

    let gate = SessionGate::new(client.clone());
    gate.ensure_csrf().await.unwrap();
    assert!(client.csrf_token().is_some());

    let redirect = gate.logout().await.unwrap();
    assert_eq!(redirect.host_str(), Some("passport.yandex.ru"));

    // Local credential state is gone regardless of the server error.
    assert_eq!(client.csrf_token(), None);
}

// ── Anti-forgery contract ───────────────────────────────────────────

#[tokio::test]
async fn test_mutating_call_without_token_fails_locally() {
    let (server, client) = setup().await;

    // The server must never see the request.
    Mock::given(method("DELETE"))
        .and(path("/delete_camera/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.delete_camera("abc").await;
    assert!(
        matches!(result, Err(Error::MissingCsrfToken)),
        "expected MissingCsrfToken, got: {result:?}"
    );
}

#[tokio::test]
async fn test_mutating_call_echoes_token_header() {
    let (server, client) = setup().await;

    csrf_mock().mount(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/delete_camera/abc"))
        .and(header("X-CSRFToken", "tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let gate = SessionGate::new(client.clone());
    gate.ensure_csrf().await.unwrap();
    client.delete_camera("abc").await.unwrap();
}

// ── Camera endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_get_camera() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/get_camera/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc123",
            "name": "Entrance",
            "description": "Front door",
            "tags": ["outdoor"],
            "protocol": "RTSP",
            "url": "rtsp://cam",
            "class_settings": [
                {"class_id": 0, "class_name": "person", "is_ignored": false, "is_notify": true}
            ]
        })))
        .mount(&server)
        .await;

    let camera = client.get_camera("abc123").await.unwrap();
    assert_eq!(camera.name.as_deref(), Some("Entrance"));
    assert_eq!(camera.tags, vec!["outdoor"]);
    assert_eq!(camera.class_settings.len(), 1);
    assert!(camera.class_settings[0].is_notify);
}

#[tokio::test]
async fn test_detected_objects_bootstrap() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/detected_objects/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 2, "tracker_id": 9, "object_class": "car",
             "start_time": "2024-01-01T00:00:05Z", "video_path": "2.mp4"},
            {"id": 1, "tracker_id": 9, "object_class": "car",
             "start_time": "2024-01-01T00:00:00Z", "image_path": "/img/1.jpg"}
        ])))
        .mount(&server)
        .await;

    let snapshot = client.detected_objects("abc123").await.unwrap();
    assert_eq!(snapshot.len(), 2);
    // Server order (reverse-chronological) is preserved as-is.
    assert_eq!(snapshot.events[0].id, 2);
    assert_eq!(snapshot.events[1].id, 1);
}

#[tokio::test]
async fn test_add_camera() {
    let (server, client) = setup().await;

    csrf_mock().mount(&server).await;
    Mock::given(method("POST"))
        .and(path("/add_camera"))
        .and(header("X-CSRFToken", "tok-abc"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "Camera added successfully",
            "camera_id": "xyz789"
        })))
        .mount(&server)
        .await;

    let gate = SessionGate::new(client.clone());
    gate.ensure_csrf().await.unwrap();

    let created = client
        .add_camera(&CameraCreate {
            name: "Entrance".into(),
            url: "rtsp://cam".into(),
            protocol: "RTSP".into(),
            ..CameraCreate::default()
        })
        .await
        .unwrap();
    assert_eq!(created.camera_id, "xyz789");
}

#[tokio::test]
async fn test_add_camera_validation_stays_local() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/add_camera"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.add_camera(&CameraCreate::default()).await;
    assert!(
        matches!(result, Err(Error::Validation { field: "name" })),
        "expected local validation error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_update_camera_server_error_surfaces_message() {
    let (server, client) = setup().await;

    csrf_mock().mount(&server).await;
    Mock::given(method("PUT"))
        .and(path("/update_camera/abc"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "Failed to update camera"})),
        )
        .mount(&server)
        .await;

    let gate = SessionGate::new(client.clone());
    gate.ensure_csrf().await.unwrap();

    let result = client
        .update_camera(
            "abc",
            &CameraUpdate {
                name: "Entrance".into(),
                ..CameraUpdate::default()
            },
        )
        .await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to update camera");
        }
        other => panic!("expected Api error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_mutation_maps_to_auth_error() {
    let (server, client) = setup().await;

    csrf_mock().mount(&server).await;
    Mock::given(method("PUT"))
        .and(path("/update_camera/abc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let gate = SessionGate::new(client.clone());
    gate.ensure_csrf().await.unwrap();

    let result = client
        .update_camera(
            "abc",
            &CameraUpdate {
                name: "Entrance".into(),
                ..CameraUpdate::default()
            },
        )
        .await;
    assert!(
        matches!(result, Err(Error::Unauthorized)),
        "expected Unauthorized, got: {result:?}"
    );
}
