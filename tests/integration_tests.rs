//! Integration tests using mock HTTP server
//!
//! Tests the full end-to-end flow: settings → API client → backend → typed results and files

use clap::Parser;
use pincart_client::api::{ExportRequest, GenerateRequest, MatchRequest, Plan, Tone};
use pincart_client::cli::{Cli, Runner};
use pincart_client::{ClientSettings, Error, PinCartApi};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> ClientSettings {
    ClientSettings {
        base_url: server.uri(),
        retry_delay_ms: 10,
        ..Default::default()
    }
}

fn api_for(server: &MockServer) -> PinCartApi {
    settings_for(server).build_api().unwrap()
}

fn discover_body() -> serde_json::Value {
    json!({
        "keyword": "lamp",
        "count": 2,
        "products": [
            {"title": "Mushroom Lamp", "image": "https://i.pinimg.com/m.jpg", "pin_url": "", "demand_score": 61, "saves_text": "2k"},
            {"title": "Rattan Lamp", "image": "https://i.pinimg.com/r.jpg", "pin_url": "", "demand_score": 88, "saves_text": "9k"}
        ]
    })
}

fn match_body() -> serde_json::Value {
    json!({
        "product_title": "Rattan Lamp",
        "match_count": 2,
        "suppliers": [
            {"source": "alibaba", "supplier_name": "A", "unit_cost": 9.0, "suggested_retail": 36.0},
            {"source": "cj", "supplier_name": "B", "unit_cost": 7.5, "suggested_retail": 30.0}
        ],
        "disclaimer": "Estimates only"
    })
}

fn generate_body() -> serde_json::Value {
    json!({
        "product_name": "Rattan Lamp",
        "generated": {
            "seo_title": "Handwoven Rattan Table Lamp",
            "description": "<p>Warm light</p>",
            "bullets": ["Natural rattan", "E26 bulb"],
            "faq": [{"q": "Bulb included?", "a": "No"}],
            "meta_description": "A handwoven rattan lamp."
        }
    })
}

// ============================================================================
// Endpoint flows
// ============================================================================

#[tokio::test]
async fn test_discover_with_no_products() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param("keyword", "decor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keyword": "decor",
            "count": 0,
            "products": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = api_for(&server).discover("decor").await.unwrap();

    assert_eq!(response.keyword, "decor");
    assert!(response.products.is_empty());
    assert!(response.top_product().is_none());
}

#[tokio::test]
async fn test_generate_recovers_after_two_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "busy"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    settings.retry_delay_ms = 50;
    let api = settings.build_api().unwrap();

    let start = Instant::now();
    let response = api
        .generate(&GenerateRequest::new("Rattan Lamp").tone(Tone::Luxury))
        .await
        .unwrap();

    // 50ms after the first failure, 100ms after the second
    assert!(start.elapsed() >= Duration::from_millis(150));
    assert_eq!(response.generated.seo_title, "Handwoven Rattan Table Lamp");
}

#[tokio::test]
async fn test_generate_gives_up_with_backend_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({"detail": "Model overloaded"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = api_for(&server)
        .generate(&GenerateRequest::new("Rattan Lamp"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.user_message(), "Model overloaded");
}

#[tokio::test]
async fn test_export_unauthorized_without_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = api_for(&server)
        .export(&ExportRequest::new("Rattan Lamp"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));
    assert_eq!(err.user_message(), "Not authenticated");
}

#[tokio::test]
async fn test_stale_access_token_refreshed_on_unauthorized() {
    let backend = MockServer::start().await;
    let identity = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(header("apikey", "anon"))
        .and(body_json(json!({"refresh_token": "rt-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "rt-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&identity)
        .await;

    Mock::given(method("POST"))
        .and(path("/match-product"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&backend)
        .await;

    Mock::given(method("POST"))
        .and(path("/match-product"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_body()))
        .expect(2)
        .mount(&backend)
        .await;

    let mut settings = settings_for(&backend);
    settings.apply_env(|key| match key {
        "PINCART_AUTH_URL" => Some(format!("{}/auth/v1", identity.uri())),
        "PINCART_AUTH_ANON_KEY" => Some("anon".to_string()),
        "PINCART_ACCESS_TOKEN" => Some("stale".to_string()),
        "PINCART_REFRESH_TOKEN" => Some("rt-1".to_string()),
        _ => None,
    });
    let api = settings.build_api().unwrap();

    let response = api
        .match_product(&MatchRequest::new("Rattan Lamp"))
        .await
        .unwrap();
    assert_eq!(response.cheapest().unwrap().source, "cj");

    // The renewed token is cached for later calls
    api.match_product(&MatchRequest::new("Rattan Lamp"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_checkout_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/create-checkout"))
        .and(body_json(json!({"user_id": "u1", "email": "a@b.co", "plan": "pro"})))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = api_for(&server)
        .create_checkout("u1", "a@b.co", Plan::Pro)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.user_message(), "Bad Gateway");
}

// ============================================================================
// CLI runner
// ============================================================================

#[tokio::test]
async fn test_run_pipeline_writes_export() {
    let server = MockServer::start().await;
    let out_dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param("keyword", "lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/match-product"))
        .and(body_json(json!({
            "product_title": "Rattan Lamp",
            "image_url": "https://i.pinimg.com/r.jpg"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(match_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(body_json(json!({
            "product_name": "Rattan Lamp",
            "target_audience": "renters",
            "tone": "playful",
            "supplier_price": 7.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "text/csv")
                .insert_header(
                    "Content-Disposition",
                    "attachment; filename=\"rattan-lamp.csv\"",
                )
                .set_body_bytes(b"Handle,Title\nrattan-lamp,Handwoven Rattan Table Lamp\n".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = out_dir.path().to_str().unwrap();
    let cli = Cli::parse_from([
        "pincart", "-f", "json", "run", "lamp", "--audience", "renters", "--tone", "playful",
        "--output", out,
    ]);
    Runner::new(cli).run_with(&settings_for(&server)).await.unwrap();

    let written = std::fs::read_to_string(out_dir.path().join("rattan-lamp.csv")).unwrap();
    assert!(written.starts_with("Handle,Title"));

    let requests = server.received_requests().await.unwrap();
    let export = requests
        .iter()
        .find(|r| r.url.path() == "/export")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&export.body).unwrap();
    assert_eq!(body["product_name"], "Handwoven Rattan Table Lamp");
    assert_eq!(body["price"], 30.0);
    assert_eq!(body["image_url"], "https://i.pinimg.com/r.jpg");
}

#[tokio::test]
async fn test_run_pipeline_without_products_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keyword": "decor", "count": 0, "products": []
        })))
        .mount(&server)
        .await;

    let cli = Cli::parse_from(["pincart", "run", "decor"]);
    let err = Runner::new(cli)
        .run_with(&settings_for(&server))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("No products found for 'decor'"));
}

#[tokio::test]
async fn test_generate_save_then_export() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let page_path = dir.path().join("page.json");
    let csv_path = dir.path().join("lamp.csv");

    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_body()))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/export"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"Handle\n".to_vec()))
        .mount(&server)
        .await;

    let settings = settings_for(&server);

    let cli = Cli::parse_from([
        "pincart",
        "generate",
        "Rattan Lamp",
        "--supplier-price",
        "7.5",
        "--retail-price",
        "30",
        "--save",
        page_path.to_str().unwrap(),
    ]);
    Runner::new(cli).run_with(&settings).await.unwrap();
    assert!(page_path.exists());

    let cli = Cli::parse_from([
        "pincart",
        "export",
        "--from",
        page_path.to_str().unwrap(),
        "--output",
        csv_path.to_str().unwrap(),
    ]);
    Runner::new(cli).run_with(&settings).await.unwrap();
    assert_eq!(std::fs::read(&csv_path).unwrap(), b"Handle\n");

    let requests = server.received_requests().await.unwrap();
    let export = requests.iter().find(|r| r.url.path() == "/export").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&export.body).unwrap();
    assert_eq!(body["price"], 30.0);
}

#[tokio::test]
async fn test_discover_many_reports_partial_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param("keyword", "lamp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_body()))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/discover"))
        .and(query_param("keyword", "rugs"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"detail": "Blocked keyword"})))
        .mount(&server)
        .await;

    let cli = Cli::parse_from(["pincart", "discover", "lamp", "rugs"]);
    Runner::new(cli).run_with(&settings_for(&server)).await.unwrap();

    let cli = Cli::parse_from(["pincart", "discover", "rugs", "rugs"]);
    let err = Runner::new(cli)
        .run_with(&settings_for(&server))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("all 2 keywords"));
}

#[tokio::test]
async fn test_login_saves_session_to_settings_file() {
    let identity = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let settings_path = dir.path().join("pincart.yaml");
    std::fs::write(&settings_path, "base_url: https://api.pincart.test\nmax_retries: 4\n").unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", "anon"))
        .and(body_json(json!({"email": "a@b.co", "password": "hunter2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "signed-in",
            "refresh_token": "rt-9",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let mut settings = ClientSettings::default();
    settings.apply_env(|key| match key {
        "PINCART_AUTH_URL" => Some(format!("{}/auth/v1", identity.uri())),
        "PINCART_AUTH_ANON_KEY" => Some("anon".to_string()),
        _ => None,
    });

    let cli = Cli::parse_from([
        "pincart",
        "login",
        "--email",
        "a@b.co",
        "--password",
        "hunter2",
        "--save",
        settings_path.to_str().unwrap(),
    ]);
    Runner::new(cli).run_with(&settings).await.unwrap();

    let saved = ClientSettings::from_file(&settings_path).unwrap();
    assert_eq!(saved.base_url, "https://api.pincart.test");
    assert_eq!(saved.max_retries, 4);
    assert_eq!(saved.auth.access_token.as_deref(), Some("signed-in"));
    assert_eq!(saved.auth.refresh_token.as_deref(), Some("rt-9"));
    assert_eq!(saved.auth.anon_key.as_deref(), Some("anon"));
}

#[tokio::test]
async fn test_login_rejected_credentials() {
    let identity = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .expect(1)
        .mount(&identity)
        .await;

    let mut settings = ClientSettings::default();
    settings.auth.url = Some(identity.uri());

    let cli = Cli::parse_from(["pincart", "login", "--email", "a@b.co", "--password", "nope"]);
    let err = Runner::new(cli).run_with(&settings).await.unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert_eq!(err.user_message(), "Authentication failed: Invalid login credentials");
}
