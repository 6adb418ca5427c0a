use crate::apollo_client::ApolloClient;
use crate::auth::SessionSigner;
use crate::config::Config;
use crate::credits;
use crate::errors::AppError;
use crate::export;
use crate::models::*;
use crate::normalize;
use crate::payloads::{build_company_payload, build_people_payload};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the Apollo API.
    pub apollo: ApolloClient,
    /// Signs and verifies operator session cookies.
    pub sessions: SessionSigner,
    /// Tag search results (1 hour TTL), keyed by lower-cased query.
    pub tag_cache: Cache<String, Vec<Value>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, AppError> {
        let apollo = ApolloClient::new(&config)?;
        Ok(Self::with_client(config, apollo))
    }

    /// Builds state around an already configured client.
    pub fn with_client(config: Config, apollo: ApolloClient) -> Self {
        let tag_cache = Cache::builder()
            .time_to_live(Duration::from_secs(3600))
            .max_capacity(1_000)
            .build();

        Self {
            sessions: SessionSigner::new(config.session_secret.clone()),
            config,
            apollo,
            tag_cache,
        }
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "apollo-leads",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Parses a JSON request body, reporting failures as `{"error": "Invalid JSON"}`.
///
/// An empty body reads as `{}`.
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body[..]
    };
    serde_json::from_slice(raw).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        AppError::BadRequest("Invalid JSON".to_string())
    })
}

/// Runs a company search and shapes the response.
///
/// Shared by the JSON API and the HTML search page.
pub async fn run_company_search(
    state: &AppState,
    params: &CompanySearchParams,
) -> Result<CompanySearchResponse, AppError> {
    let payload = build_company_payload(params);
    let response = state.apollo.search_companies(&payload).await?;

    let companies = normalize::normalize_companies(&response);
    let total_count = normalize::total_count(&response).unwrap_or(companies.len() as u64);
    let (page, per_page) = normalize::pagination(&response);

    Ok(CompanySearchResponse {
        companies,
        total_count,
        page,
        per_page,
    })
}

/// POST /api/companies/search/
///
/// Searches companies with the given filters.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `body` - JSON body with company filters (see `CompanySearchParams`).
///
/// # Returns
///
/// * `Result<Json<CompanySearchResponse>, AppError>` - Normalized companies plus pagination.
pub async fn search_companies(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CompanySearchResponse>, AppError> {
    tracing::info!("POST /api/companies/search/");
    let params: CompanySearchParams = parse_json(&body)?;

    let result = run_company_search(&state, &params).await?;
    credits::log_credits("/api/companies/search/", credits::COMPANY_SEARCH, "");

    tracing::info!(
        "Company search returned {} of {} companies",
        result.companies.len(),
        result.total_count
    );
    Ok(Json(result))
}

/// POST /api/people/search/
///
/// Searches people, then enriches every returned contact through bulk match
/// (email, LinkedIn, phones). Enrichment consumes one credit per contact.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `body` - JSON body with organization id(s), domains, job titles, seniorities.
///
/// # Returns
///
/// * `Result<Json<PeopleSearchResponse>, AppError>` - Enriched contacts plus pagination.
pub async fn search_people(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PeopleSearchResponse>, AppError> {
    let params: PeopleSearchParams = parse_json(&body)?;
    tracing::info!("POST /api/people/search/ - org: {:?}", params.organization_id);

    let payload = build_people_payload(&params);
    let response = state.apollo.search_people(&payload).await?;

    let mut people = normalize::normalize_people(&response);
    let total_count = normalize::total_count(&response).unwrap_or(0);
    let (page, per_page) = normalize::pagination(&response);

    let ids = normalize::enrichable_ids(&people);
    if !ids.is_empty() {
        let enriched = state.apollo.enrich_people_bulk(&ids, false, false).await?;
        normalize::merge_enrichment(&mut people, &enriched);
    }

    let enrich_credits = ids.len() as u64 * credits::ENRICH_PER_PERSON;
    credits::log_credits(
        "/api/people/search/",
        credits::people_lookup_cost(1, ids.len()),
        &format!(
            "search=1 enrich={} ({} contacts)",
            enrich_credits,
            ids.len()
        ),
    );

    Ok(Json(PeopleSearchResponse {
        people,
        total_count,
        page,
        per_page,
    }))
}

async fn run_tag_search(
    state: &AppState,
    params: &TagSearchParams,
) -> Result<Json<TagSearchResponse>, AppError> {
    let q = params.query().ok_or_else(|| {
        AppError::BadRequest("Query param 'q' required (e.g. ?q=software)".to_string())
    })?;

    let cache_key = q.to_lowercase();
    if let Some(tags) = state.tag_cache.get(&cache_key).await {
        tracing::debug!("Tag search cache HIT for '{}'", q);
        return Ok(Json(TagSearchResponse { tags }));
    }

    let data = state.apollo.search_tags(&q).await?;
    let tags = data
        .get("tags")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    state.tag_cache.insert(cache_key, tags.clone()).await;

    credits::log_credits("/api/tags/search/", credits::TAGS_SEARCH, "");
    Ok(Json(TagSearchResponse { tags }))
}

/// GET /api/tags/search/?q=software
///
/// Looks up Apollo tag ids (industries etc.) by fuzzy name, for use in
/// company search filters.
pub async fn search_tags_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TagSearchParams>,
) -> Result<Json<TagSearchResponse>, AppError> {
    run_tag_search(&state, &params).await
}

/// POST /api/tags/search/ with `{"q": ...}` or `{"q_tag_fuzzy_name": ...}`.
pub async fn search_tags_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<TagSearchResponse>, AppError> {
    let params: TagSearchParams = parse_json(&body)?;
    run_tag_search(&state, &params).await
}

/// POST /api/export/companies/
///
/// Exports contacts of the selected companies as one xlsx per company,
/// zipped into a single download.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `body` - Raw JSON body: `{companies: [...], job_titles, seniorities}`.
///
/// # Returns
///
/// * `Result<Response, AppError>` - `companies_export.zip` or an error.
pub async fn export_companies(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let request: ExportRequest = parse_json(&body)?;

    credits::log_credits(
        "/api/export/companies/",
        0,
        "per-company credits logged when people are fetched",
    );

    let archive = export::export_companies(&state.apollo, &request).await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::ARCHIVE_NAME),
            ),
        ],
        archive,
    )
        .into_response())
}

/// Serves the OpenAPI specification YAML file.
///
/// This endpoint reads the `openapi.yml` file from the filesystem and serves it
/// with the appropriate content type. If the file is not found, it returns a 404 error.
pub async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page over `serve_openapi_spec`.
pub async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Apollo Leads - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api/schema/",
                dom_id: '#swagger-ui',
                deepLinking: true
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}
