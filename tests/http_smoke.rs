use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use media_server::app_state::AppState;
use media_server::config::Config;
use media_server::http;

async fn test_state(cache_root: &std::path::Path, db_path: &std::path::Path) -> AppState {
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        server_secret: "test-secret-test-secret".to_string(),
        database_path: db_path.to_path_buf(),
        cache_root: cache_root.to_path_buf(),
        cache_size_cap_bytes: 1024 * 1024 * 1024,
        cache_ttl_hours: 24,
        video_extensions: vec!["mp4".to_string(), "mkv".to_string()],
        metadata_provider_key: None,
        metadata_language: "en-US".to_string(),
        auto_enrich: false,
        ffmpeg_path: "ffmpeg".into(),
        ffprobe_path: "ffprobe".into(),
        credential_expiry_days: 7,
        hls_segment_secs: 10,
    };
    AppState::bootstrap(config).await.unwrap()
}

async fn json_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = if let Some(body) = body {
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    } else {
        builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn health_check_reports_ok() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    let (status, body) = json_request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn first_registered_user_becomes_admin_and_can_reach_admin_routes() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "hunter222"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["is_admin"].as_bool(), Some(true));
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = json_request(&app, "GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_registered_user_is_not_admin_and_is_forbidden_from_admin_routes() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    json_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "hunter222"})),
    )
    .await;

    let (_, body) = json_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "bob", "password": "hunter222"})),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = json_request(&app, "GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_library_access_is_rejected() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    let (status, _) = json_request(&app, "GET", "/api/library/movies", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scan_indexes_local_movie_and_it_shows_up_in_library() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    tokio::fs::write(media_dir.path().join("Inception.2010.mp4"), b"not-really-a-video")
        .await
        .unwrap();

    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    let (_, body) = json_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "hunter222"})),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = json_request(
        &app,
        "POST",
        "/api/network/sources",
        Some(&token),
        Some(json!({
            "display_name": "Movies",
            "protocol_kind": "local",
            "base_path": media_dir.path().to_string_lossy(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/library/scan",
        Some(&token),
        Some(json!({"path": media_dir.path().to_string_lossy()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["progress"].is_object());

    // The scan runs in a background task; poll until it reports finished.
    for _ in 0..50 {
        let (_, progress) = json_request(&app, "GET", "/api/library/scan/progress", Some(&token), None).await;
        if progress.get("finished").and_then(Value::as_bool).unwrap_or(false) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let (status, body) = json_request(&app, "GET", "/api/library/movies", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["movies"][0]["title"], "Inception");
}

#[tokio::test]
async fn watch_progress_round_trips_and_marks_watched() {
    let cache_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let media_dir = tempfile::tempdir().unwrap();
    tokio::fs::write(media_dir.path().join("Arrival.2016.mp4"), b"not-really-a-video")
        .await
        .unwrap();

    let state = test_state(cache_dir.path(), &db_dir.path().join("db.sqlite3")).await;
    let app = http::router(state);

    let (_, body) = json_request(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"username": "alice", "password": "hunter222"})),
    )
    .await;
    let token = body["token"].as_str().unwrap().to_string();

    json_request(
        &app,
        "POST",
        "/api/network/sources",
        Some(&token),
        Some(json!({
            "display_name": "Movies",
            "protocol_kind": "local",
            "base_path": media_dir.path().to_string_lossy(),
        })),
    )
    .await;

    json_request(
        &app,
        "POST",
        "/api/library/scan",
        Some(&token),
        Some(json!({"path": media_dir.path().to_string_lossy()})),
    )
    .await;

    for _ in 0..50 {
        let (_, progress) = json_request(&app, "GET", "/api/library/scan/progress", Some(&token), None).await;
        if progress.get("finished").and_then(Value::as_bool).unwrap_or(false) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let (_, body) = json_request(&app, "GET", "/api/library/movies", Some(&token), None).await;
    let media_id = body["movies"][0]["id"].as_i64().unwrap();

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/watch/progress",
        Some(&token),
        Some(json!({"mediaItemId": media_id, "currentTime": 30.0, "duration": 120.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["progress"].as_f64().unwrap() - 0.25).abs() < 1e-6);
    assert_eq!(body["completed"], false);

    let (status, body) = json_request(
        &app,
        "POST",
        "/api/watch/progress",
        Some(&token),
        Some(json!({"mediaItemId": media_id, "currentTime": 120.0, "duration": 120.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["progress"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    assert_eq!(body["completed"], true);

    let (status, _) = json_request(
        &app,
        "DELETE",
        &format!("/api/watch/mark-unwatched/{media_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = json_request(
        &app,
        "GET",
        &format!("/api/watch/progress/{media_id}"),
        Some(&token),
        None,
    )
    .await;
    assert!(body.is_null());
}
