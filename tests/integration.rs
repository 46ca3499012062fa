//! End-to-end tests against a mock annotation API.
//!
//! A small axum app stands in for the remote endpoint. It records every
//! request it receives so the tests can prove when the cache short-circuits
//! the outbound call.

use annotation_block::cache::{cache_key, AnnotationCache, MemoryCache};
use annotation_block::config::{Config, FetchConfig};
use annotation_block::fetch::{AnnotationFetcher, FALLBACK_TITLE};
use annotation_block::models::{Annotation, FetchOutcome, RequestContext};
use annotation_block::server::run_server_with_fetcher;
use annotation_block::source::HttpSource;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── Mock API ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct MockApi {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
}

impl MockApi {
    fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn annotations_ok(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.requests.lock().unwrap().push((headers, body));
    Json(json!([{"title": "T1", "description": "D1"}]))
}

async fn annotations_object(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.requests.lock().unwrap().push((headers, body));
    Json(json!({"error": "bad"}))
}

async fn annotations_error(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    api.requests.lock().unwrap().push((headers, body));
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn annotations_slow(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.requests.lock().unwrap().push((headers, body));
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!([{"title": "late"}]))
}

async fn annotations_mixed(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    api.requests.lock().unwrap().push((headers, body));
    Json(json!([
        {"title": "", "content": "x"},
        "not an object",
        {"title": "<script>alert(1)</script>Hi", "image_url": "nope", "type": "article"},
        {"title": "Ok", "image_url": "https://img.example.com/ok.png"}
    ]))
}

/// Serve the mock API on an ephemeral port and return its base URL.
async fn spawn_mock_api(api: MockApi) -> String {
    let app = Router::new()
        .route("/ok", post(annotations_ok))
        .route("/object", post(annotations_object))
        .route("/error", post(annotations_error))
        .route("/slow", post(annotations_slow))
        .route("/mixed", post(annotations_mixed))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn fetch_config(url: String) -> FetchConfig {
    FetchConfig::new(url).with_timeout(30).with_cache_ttl(300)
}

// ─── Fetcher ────────────────────────────────────────────────────────

/// Remote returns one record; the first call hits the API, the second is
/// served from cache with identical content.
#[tokio::test]
async fn test_fetch_then_cached_without_second_call() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let fetcher = AnnotationFetcher::with_defaults();
    let ctx = RequestContext::new(5, 0, 9);
    let cfg = fetch_config(format!("{}/ok", base));

    let expected = vec![Annotation {
        title: "T1".into(),
        description: "D1".into(),
        ..Default::default()
    }];

    let first = fetcher.fetch_outcome(&ctx, &cfg).await;
    assert_eq!(first, FetchOutcome::Fresh(expected.clone()));

    let second = fetcher.fetch_outcome(&ctx, &cfg).await;
    assert_eq!(second, FetchOutcome::Cached(expected));
    assert_eq!(api.count(), 1);
}

/// The outbound call carries the JSON body and both JSON headers.
#[tokio::test]
async fn test_outbound_request_shape() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let fetcher = AnnotationFetcher::with_defaults();

    fetcher
        .fetch(&RequestContext::new(5, 12, 9), &fetch_config(format!("{}/ok", base)))
        .await;

    let requests = api.requests.lock().unwrap();
    let (headers, body) = &requests[0];
    assert_eq!(body, &json!({"course_id": 5, "module_id": 12, "user_id": 9}));
    assert_eq!(headers["content-type"], "application/json");
    assert_eq!(headers["accept"], "application/json");
}

#[tokio::test]
async fn test_http_error_falls_back_and_retries() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let cache = Arc::new(MemoryCache::new());
    let fetcher = AnnotationFetcher::new(cache.clone(), Arc::new(HttpSource::new()));
    let ctx = RequestContext::new(5, 0, 9);
    let cfg = fetch_config(format!("{}/error", base));

    let result = fetcher.fetch(&ctx, &cfg).await;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].title, FALLBACK_TITLE);
    assert!(cache.get(&cache_key(&cfg.api_url, &ctx)).is_none());

    fetcher.fetch(&ctx, &cfg).await;
    assert_eq!(api.count(), 2, "fallback must not be cached");
}

#[tokio::test]
async fn test_object_response_falls_back() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let fetcher = AnnotationFetcher::with_defaults();

    let outcome = fetcher
        .fetch_outcome(&RequestContext::new(1, 0, 2), &fetch_config(format!("{}/object", base)))
        .await;
    assert!(outcome.is_fallback());
}

#[tokio::test]
async fn test_timeout_falls_back() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let fetcher = AnnotationFetcher::with_defaults();
    let cfg = FetchConfig::new(format!("{}/slow", base)).with_timeout(1);

    let started = std::time::Instant::now();
    let outcome = fetcher.fetch_outcome(&RequestContext::new(1, 0, 2), &cfg).await;
    assert!(outcome.is_fallback());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_unreachable_api_falls_back() {
    let port = find_free_port();
    let fetcher = AnnotationFetcher::with_defaults();
    let cfg = FetchConfig::new(format!("http://127.0.0.1:{}/api", port)).with_timeout(2);

    let result = fetcher.fetch(&RequestContext::new(1, 0, 2), &cfg).await;
    assert_eq!(result[0].title, FALLBACK_TITLE);
}

#[tokio::test]
async fn test_mixed_payload_validated() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let fetcher = AnnotationFetcher::with_defaults();

    let result = fetcher
        .fetch(&RequestContext::new(1, 0, 2), &fetch_config(format!("{}/mixed", base)))
        .await;

    assert_eq!(result.len(), 2);
    assert_eq!(result[0].title, "Hi");
    assert_eq!(result[0].kind, "article");
    assert_eq!(result[0].image_url, "");
    assert_eq!(result[1].title, "Ok");
    assert_eq!(result[1].image_url, "https://img.example.com/ok.png");
}

// ─── HTTP server ────────────────────────────────────────────────────

fn server_config(api_url: &str, port: u16) -> Config {
    toml::from_str(&format!(
        r#"[block]
title = "Course notes"

[api]
url = "{}"
timeout_secs = 5

[server]
bind = "127.0.0.1:{}"
"#,
        api_url, port
    ))
    .unwrap()
}

#[tokio::test]
async fn test_server_block_and_mobile_routes() {
    let api = MockApi::default();
    let base = spawn_mock_api(api.clone()).await;
    let port = find_free_port();
    let cfg = server_config(&format!("{}/ok", base), port);

    let server_handle = tokio::spawn(async move {
        run_server_with_fetcher(&cfg, AnnotationFetcher::with_defaults())
            .await
            .unwrap();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();

    let block: Value = client
        .get(format!("http://127.0.0.1:{}/block?courseid=5&userid=9", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(block["title"], "Course notes");
    assert!(block["text"].as_str().unwrap().contains("T1"));

    let mobile: Value = client
        .post(format!("http://127.0.0.1:{}/mobile/mobile_view", port))
        .json(&json!({"courseid": 5, "userid": 9}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mobile["templates"][0]["id"], "main");
    assert!(mobile["templates"][0]["html"].as_str().unwrap().contains("D1"));
    assert_eq!(mobile["javascript"], "");

    // Same context for both routes: one remote call in total.
    assert_eq!(api.count(), 1);

    let menu: Value = client
        .post(format!("http://127.0.0.1:{}/mobile/mobile_main_menu_view", port))
        .json(&json!({"userid": 9}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(menu["templates"][0]["html"]
        .as_str()
        .unwrap()
        .contains("block-annotation--main-menu"));

    server_handle.abort();
}

#[tokio::test]
async fn test_server_error_responses() {
    let port = find_free_port();
    let cfg = server_config("http://127.0.0.1:9/api", port);

    let server_handle = tokio::spawn(async move {
        run_server_with_fetcher(&cfg, AnnotationFetcher::with_defaults())
            .await
            .unwrap();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://127.0.0.1:{}/mobile/mobile_unknown", port))
        .json(&json!({"userid": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");

    let resp = client
        .get(format!("http://127.0.0.1:{}/block?courseid=5", port))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("userid"));

    server_handle.abort();
}

/// Arguments the extractors cannot decode still answer with the JSON
/// error body, not axum's plain-text rejection.
#[tokio::test]
async fn test_server_malformed_args_use_error_contract() {
    let port = find_free_port();
    let cfg = server_config("http://127.0.0.1:9/api", port);

    let server_handle = tokio::spawn(async move {
        run_server_with_fetcher(&cfg, AnnotationFetcher::with_defaults())
            .await
            .unwrap();
    });
    wait_for_server(port).await;

    let client = reqwest::Client::new();
    let mobile_url = format!("http://127.0.0.1:{}/mobile/mobile_view", port);

    let responses = vec![
        // Wrong field type in the JSON body.
        client
            .post(&mobile_url)
            .json(&json!({"userid": "abc"}))
            .send()
            .await
            .unwrap(),
        // Body without a JSON content type.
        client
            .post(&mobile_url)
            .body(r#"{"userid": 9}"#)
            .send()
            .await
            .unwrap(),
        // Wrong field type in the query string.
        client
            .get(format!("http://127.0.0.1:{}/block?userid=abc", port))
            .send()
            .await
            .unwrap(),
    ];

    for resp in responses {
        assert_eq!(resp.status(), 400);
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("application/json"), "{}", content_type);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(!body["error"]["message"].as_str().unwrap().is_empty());
    }

    server_handle.abort();
}
