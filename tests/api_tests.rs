/// Router-level tests: session gate, login flow, and the JSON endpoints
/// against a mocked Apollo API
use apollo_leads::config::Config;
use apollo_leads::handlers::AppState;
use apollo_leads::routes::build_router;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD: &str = "correct horse battery";

/// Helper function to create test config
fn create_test_config(base_url: String) -> Config {
    Config {
        port: 8000,
        apollo_api_key: Some("test_key".to_string()),
        apollo_base_url: base_url.clone(),
        apollo_app_base_url: base_url,
        request_timeout_secs: 5,
        admin_email: "ops@example.com".to_string(),
        admin_password_sha256: hex::encode(Sha256::digest(PASSWORD.as_bytes())),
        session_secret: "test-session-secret-that-is-long-enough".to_string(),
        secure_cookies: false,
    }
}

fn create_app(base_url: String) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(create_test_config(base_url)).unwrap());
    (build_router(state.clone()), state)
}

fn session_header(state: &AppState) -> String {
    format!("apollo_leads_session={}", state.sessions.issue())
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_api_without_session_is_401_json() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let response = app
        .oneshot(post_json("/api/companies/search/", None, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await, json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_ui_without_session_redirects_to_login() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/login/");
}

#[tokio::test]
async fn test_tampered_cookie_is_rejected() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let valid = state.sessions.issue();
    let (expires, tag) = valid.split_once('.').unwrap();
    let forged = format!(
        "apollo_leads_session={}.{}",
        expires.parse::<i64>().unwrap() + 3600,
        tag
    );

    let response = app
        .oneshot(post_json("/api/tags/search/", Some(&forged), json!({"q": "x"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_success_sets_session_cookie() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let form = format!(
        "username=OPS%40example.com&password={}&next=%2Fapi%2Fdocs%2F",
        PASSWORD.replace(' ', "+")
    );
    let response = app
        .clone()
        .oneshot(
            Request::post("/login/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()[header::LOCATION], "/api/docs/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("apollo_leads_session="));
    assert!(cookie.contains("HttpOnly"));

    // The issued cookie opens the protected pages
    let session = cookie.split(';').next().unwrap().to_string();
    let response = app
        .oneshot(
            Request::get("/api/docs/")
                .header(header::COOKIE, session)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_bad_credentials_is_401() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let response = app
        .oneshot(
            Request::post("/login/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=ops%40example.com&password=nope"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _) = create_app("http://127.0.0.1:9".to_string());

    let response = app
        .oneshot(Request::post("/logout/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_company_search_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_companies/search"))
        .and(body_partial_json(json!({
            "organization_locations": ["united states", "germany"],
            "organization_num_employees_ranges": ["10,1000000"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{
                "id": "acc-1",
                "name": "Acme",
                "organization_city": "Austin",
                "city": "Ignored",
                "organization_revenue": 1200000.0
            }],
            "pagination": {"page": 1, "per_page": 25, "total_entries": 42}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, state) = create_app(mock_server.uri());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json(
            "/api/companies/search/",
            Some(&cookie),
            json!({"locations_included": "United States, Germany", "employees_min": "10"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_count"], 42);
    assert_eq!(body["companies"][0]["id"], "acc-1");
    assert_eq!(body["companies"][0]["city"], "Austin");
    assert_eq!(body["companies"][0]["annual_revenue"], 1200000.0);
}

#[tokio::test]
async fn test_company_search_vendor_422_is_500_with_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_companies/search"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "bad range"})))
        .mount(&mock_server)
        .await;

    let (app, state) = create_app(mock_server.uri());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json("/api/companies/search/", Some(&cookie), json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = json_body(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(message.contains("422"));
    assert!(message.contains("bad range"));
}

#[tokio::test]
async fn test_people_search_enriches_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mixed_people/api_search"))
        .and(body_partial_json(json!({
            "organization_ids": ["org-1"],
            "person_titles": ["cto"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                {"id": "p1", "first_name": "Ada", "last_name": "Lovelace", "title": "CTO",
                 "city": "London", "organization": {"name": "Acme"}},
                {"id": "p2", "name": "Grace Hopper", "email": "grace@old.example"}
            ],
            "total_entries": 2
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/people/bulk_match"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                {"id": "p1", "email": "ada@acme.example", "city": null,
                 "phone_numbers": [{"raw_number": "+1 555", "sanitized_number": "+1555"}]},
                {"id": "p2", "email": ""}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, state) = create_app(mock_server.uri());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json(
            "/api/people/search/",
            Some(&cookie),
            json!({"organization_id": "org-1", "job_titles": "CTO"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total_count"], 2);

    let ada = &body["people"][0];
    assert_eq!(ada["name"], "Ada Lovelace");
    assert_eq!(ada["email"], "ada@acme.example");
    assert_eq!(ada["city"], "London");
    assert_eq!(ada["phone_numbers"], json!(["+1555"]));
    assert_eq!(ada["organization_name"], "Acme");

    let grace = &body["people"][1];
    assert_eq!(grace["email"], "grace@old.example");
}

#[tokio::test]
async fn test_tag_search_requires_query() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let response = app
        .oneshot(
            Request::get("/api/tags/search/")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = json_body(response).await["error"].clone();
    assert!(message.as_str().unwrap().contains("'q'"));
}

#[tokio::test]
async fn test_tag_search_is_cached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tags/search"))
        .and(query_param("q_tag_fuzzy_name", "Software"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tags": [{"id": "t1", "cleaned_name": "software"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (app, state) = create_app(mock_server.uri());
    let cookie = session_header(&state);

    let first = app
        .clone()
        .oneshot(
            Request::get("/api/tags/search/?q=Software")
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json_body(first).await["tags"][0]["id"], "t1");

    let second = app
        .oneshot(post_json(
            "/api/tags/search/",
            Some(&cookie),
            json!({"q_tag_fuzzy_name": "software"}),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(json_body(second).await["tags"][0]["id"], "t1");
}

#[tokio::test]
async fn test_export_rejects_invalid_json() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let response = app
        .oneshot(
            Request::post("/api/export/companies/")
                .header(header::COOKIE, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "Invalid JSON"}));
}

#[tokio::test]
async fn test_export_requires_companies() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json(
            "/api/export/companies/",
            Some(&cookie),
            json!({"companies": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_returns_zip_attachment() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json(
            "/api/export/companies/",
            Some(&cookie),
            json!({"companies": [{"name": "Acme", "people": [{"id": "p1", "name": "Ada"}]}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"companies_export.zip\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_malformed_json_bodies_get_json_errors() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    for uri in [
        "/api/companies/search/",
        "/api/people/search/",
        "/api/tags/search/",
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::post(uri)
                    .header(header::COOKIE, cookie.clone())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json_body(response).await, json!({"error": "Invalid JSON"}));
    }
}

#[tokio::test]
async fn test_export_null_companies_is_no_companies_selected() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let response = app
        .oneshot(post_json(
            "/api/export/companies/",
            Some(&cookie),
            json!({"companies": null}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!({"error": "No companies selected"})
    );
}

#[tokio::test]
async fn test_export_accepts_bodies_above_two_megabytes() {
    let (app, state) = create_app("http://127.0.0.1:9".to_string());
    let cookie = session_header(&state);

    let body = json!({
        "companies": [{"name": "Acme", "people": [{"id": "p1", "name": "Ada"}]}],
        "notes": "x".repeat(3 * 1024 * 1024)
    });
    let response = app
        .oneshot(post_json("/api/export/companies/", Some(&cookie), body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
}
