use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use shopdash_core::config::Config;
use shopdash_core::model::Comment;
use shopdash_duckdb::DuckDbBackend;
use shopdash_server::app::build_app;
use shopdash_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/shopdash-test".to_string(),
        cors_origins: vec![],
        duckdb_memory_limit: "256MB".to_string(),
    }
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

#[tokio::test]
async fn test_health_returns_200_when_db_reachable() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    let app = build_app(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["store"], "duckdb");
    for collection in ["users", "orders", "products", "comments"] {
        assert_eq!(json["documents"][collection], 0, "{collection}");
    }
}

#[tokio::test]
async fn test_health_reports_document_counts() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    db.insert(&[Comment {
        id: "c1".to_string(),
        user: "u1".to_string(),
        product: "p1".to_string(),
        text: "arrived quickly".to_string(),
        created_at: Utc::now(),
    }])
    .await
    .expect("insert comment");
    let app = build_app(Arc::new(AppState::new(db, test_config())));

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["documents"]["comments"], 1);
    assert_eq!(json["documents"]["orders"], 0);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let app = build_app(Arc::new(AppState::new(db, test_config())));

    let request = Request::builder()
        .method("GET")
        .uri("/api/dashboard/unknown")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_configured_cors_origin_is_echoed() {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let config = Config {
        cors_origins: vec!["https://admin.example.com".to_string()],
        ..test_config()
    };
    let app = build_app(Arc::new(AppState::new(db, config)));

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("origin", "https://admin.example.com")
        .body(Body::empty())
        .expect("build request");

    let response = app.oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://admin.example.com")
    );
}
