use super::*;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use std::path::Path;
use std::time::Duration;
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};


/// Helper to build a router over a temporary storage root
fn create_test_app(configure: impl FnOnce(&mut Config)) -> (Router, Arc<Config>, TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.storage.root = temp_dir.path().join("vlm_files");
    configure(&mut config);
    let config = Arc::new(config);

    let state = AppState::new(config.clone()).unwrap();
    (create_router(state), config, temp_dir)
}

async fn serve_frame(server: &MockServer, route: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn job_dirs(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _config, _temp_dir) = create_test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let (app, _config, _temp_dir) = create_test_app(|_| {});

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/prepare_vlm"].is_object());
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let (app, _config, _temp_dir) = create_test_app(|c| c.server.swagger_ui = false);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/swagger-ui/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_enabled() {
    let (app, _config, _temp_dir) = create_test_app(|c| {
        c.server.cors_enabled = true;
        c.server.cors_origins = vec!["*".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (app, _config, _temp_dir) = create_test_app(|c| c.server.cors_enabled = false);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be absent when CORS is disabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (app, _config, _temp_dir) = create_test_app(|c| {
        c.server.cors_origins = vec!["http://allowed.example".to_string()];
    });

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_server_stops_on_shutdown_signal() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.storage.root = temp_dir.path().to_path_buf();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_api_server(config, async {
        rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_signal_waits_for_a_signal() {
    let pending = tokio::time::timeout(
        Duration::from_millis(50),
        crate::shutdown_signal(),
    )
    .await;
    assert!(pending.is_err(), "no signal was sent");
}

#[tokio::test]
async fn test_server_responds_over_tcp() {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.storage.root = temp_dir.path().to_path_buf();
    let config = Arc::new(config);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(AppState::new(config).unwrap());
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::Client::new()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body = response.json::<serde_json::Value>().await.unwrap();
    assert_eq!(body["status"], "ok");

    server_handle.abort();
}

#[tokio::test]
async fn test_storage_not_exposed_by_default() {
    let (app, config, _temp_dir) = create_test_app(|_| {});
    std::fs::create_dir_all(config.storage.root.join("job")).unwrap();
    std::fs::write(config.storage.root.join("job/frame_001.jpg"), b"img").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/job/frame_001.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_exposed_storage_serves_job_files() {
    let (app, config, _temp_dir) = create_test_app(|c| c.server.expose_storage = true);
    std::fs::create_dir_all(config.storage.root.join("job")).unwrap();
    std::fs::write(config.storage.root.join("job/frame_001.jpg"), b"img").unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/files/job/frame_001.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"img");
}
