//! Webhook endpoint integration tests.
//!
//! Drive the router with `tower::ServiceExt::oneshot` the way Emby's webhook
//! plugin would: raw JSON bodies, form-encoded `data=` bodies, the test
//! notification, and the immediate-200 handoff for real item events.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use embygram::classifier::Classifier;
use embygram::config::Config;
use embygram::emby::EmbyClient;
use embygram::notify::{Notifier, TelegramClient};
use embygram::server::{create_router, AppContext};
use embygram::state::{InFlight, NotifiedStore};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct TestContext {
    server: MockServer,
    store: Arc<NotifiedStore>,
    ctx: AppContext,
    _dir: TempDir,
}

async fn test_context() -> TestContext {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let store = NotifiedStore::load(dir.path().join("notified_item.json"), 100);

    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 5000,
        telegram_bot_token: "TOKEN".to_string(),
        telegram_chat_id: "chat-1".to_string(),
        emby_base_url: server.uri(),
        emby_api_key: "test-key".to_string(),
        episode_premiered_within_days: 14,
        season_added_within_days: 7,
        notified_store_path: "data/notified_item.json".into(),
        notified_max_entries: 100,
        metadata_poll_secs: 0,
        metadata_poll_attempts: 2,
        log_dir: "log".into(),
    };

    let emby = Arc::new(EmbyClient::new(&config.emby_base_url, &config.emby_api_key));
    let telegram = TelegramClient::with_api_base(
        &server.uri(),
        &config.telegram_bot_token,
        &config.telegram_chat_id,
    );
    let notifier = Arc::new(Notifier::new(telegram, emby.clone()));
    let classifier = Arc::new(Classifier::new(&config, emby, notifier.clone(), store.clone()));

    let ctx = AppContext {
        classifier,
        notifier,
        in_flight: Arc::new(InFlight::default()),
    };

    TestContext {
        server,
        store,
        ctx,
        _dir: dir,
    }
}

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Poll `check` until it passes or the deadline runs out. Webhook handling
/// replies before the spawned classification finishes, so assertions on its
/// side effects have to wait for the task.
async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn dune_movie() -> serde_json::Value {
    serde_json::json!({
        "Id": "42",
        "Name": "Dune (2020)",
        "Type": "Movie",
        "ProductionYear": 2020,
        "Overview": "A mythic journey.",
        "RunTimeTicks": 93_000_000_000i64
    })
}

fn test_notification() -> serde_json::Value {
    serde_json::json!({
        "Title": "Test Notification",
        "Server": {"Name": "home-emby", "Version": "4.8.0.0"}
    })
}

async fn mount_telegram_send_message(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendMessage"))
        .and(body_string_contains("Server Name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Payload validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint_replies_ok() {
    let tc = test_context().await;
    let app = create_router(tc.ctx.clone());

    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let tc = test_context().await;
    let app = create_router(tc.ctx.clone());

    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Invalid JSON payload"));
}

#[tokio::test]
async fn missing_item_id_is_rejected() {
    let tc = test_context().await;
    let app = create_router(tc.ctx.clone());

    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"Title": "New Media Added"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Missing Item.Id"));
}

#[tokio::test]
async fn malformed_form_body_is_rejected() {
    let tc = test_context().await;
    let app = create_router(tc.ctx.clone());

    // No `data` key at all
    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("payload=nothing"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Invalid form payload"));

    // `data` present but not JSON
    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("data=not-json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_string(response.into_body()).await;
    assert!(body.contains("Invalid JSON payload"));
}

// ---------------------------------------------------------------------------
// Test notification
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_notification_is_forwarded_to_telegram() {
    let tc = test_context().await;
    mount_telegram_send_message(&tc.server).await;
    let app = create_router(tc.ctx.clone());

    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(test_notification().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "OK");
}

#[tokio::test]
async fn form_encoded_payload_is_accepted() {
    let tc = test_context().await;
    mount_telegram_send_message(&tc.server).await;
    let app = create_router(tc.ctx.clone());

    let form_body =
        serde_urlencoded::to_string([("data", test_notification().to_string())]).unwrap();
    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form_body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "OK");
}

// ---------------------------------------------------------------------------
// Item events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn item_event_replies_ok_and_classifies_in_background() {
    let tc = test_context().await;

    Mock::given(method("GET"))
        .and(path("/emby/Items"))
        .and(query_param("Ids", "42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"Items": [dune_movie()]})),
        )
        .mount(&tc.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Items/42/Images/Primary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg!".to_vec()))
        .mount(&tc.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendPhoto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&tc.server)
        .await;

    let app = create_router(tc.ctx.clone());
    let request = Request::builder()
        .uri("/webhook")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({"Item": {"Id": "42"}}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_string(response.into_body()).await, "OK");

    let store = tc.store.clone();
    assert!(wait_until(Duration::from_secs(2), || store.contains("Dune (2020) 2020")).await);
}

#[tokio::test]
async fn duplicate_item_while_in_flight_is_dropped() {
    let tc = test_context().await;

    // Slow item lookup keeps the first classification in flight while the
    // duplicate webhook arrives.
    Mock::given(method("GET"))
        .and(path("/emby/Items"))
        .and(query_param("Ids", "42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"Items": [dune_movie()]}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&tc.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Items/42/Images/Primary"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg!".to_vec()))
        .mount(&tc.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/botTOKEN/sendPhoto"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .expect(1)
        .mount(&tc.server)
        .await;

    let app = create_router(tc.ctx.clone());
    let payload = serde_json::json!({"Item": {"Id": "42"}}).to_string();

    for _ in 0..2 {
        let request = Request::builder()
            .uri("/webhook")
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.clone()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let store = tc.store.clone();
    assert!(wait_until(Duration::from_secs(2), || store.contains("Dune (2020) 2020")).await);
    // MockServer verifies on drop that sendPhoto was hit exactly once
}
