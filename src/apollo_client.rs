use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;

/// Ids sent per `bulk_match` call (Apollo's limit).
pub const ENRICH_BATCH_SIZE: usize = 10;
/// Extra attempts after a timed-out search.
pub const MAX_RETRIES: usize = 2;
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Timeout for tag search and enrichment calls.
pub const SHORT_TIMEOUT: Duration = Duration::from_secs(30);
const USAGE_STATS_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the Apollo.io REST API.
///
/// Every call is a POST authenticated with the `X-Api-Key` header. Search
/// calls are retried on timeout; enrichment is best-effort per batch.
#[derive(Clone)]
pub struct ApolloClient {
    client: reqwest::Client,
    base_url: String,
    app_base_url: String,
    api_key: Option<String>,
    search_timeout: Duration,
    retry_backoff: Duration,
}

impl ApolloClient {
    /// Creates a new `ApolloClient` from the service configuration.
    ///
    /// A missing API key is not an error here; it is reported by the first
    /// call that needs it.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::with_endpoints(
            config.apollo_api_key.clone(),
            &config.apollo_base_url,
            &config.apollo_app_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Creates a client without a full service `Config` (operator tools).
    pub fn with_endpoints(
        api_key: Option<String>,
        base_url: &str,
        app_base_url: &str,
        search_timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            AppError::Configuration(format!("Failed to create Apollo client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            app_base_url: app_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            search_timeout,
            retry_backoff: RETRY_BACKOFF,
        })
    }

    /// Overrides the per-request timeout used by company and people search.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Overrides the sleep between timed-out search attempts.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn headers(&self) -> Result<HeaderMap, AppError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Missing APOLLO_API_KEY in environment".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(
            "X-Api-Key",
            HeaderValue::from_str(key).map_err(|_| {
                AppError::Configuration("APOLLO_API_KEY contains invalid characters".into())
            })?,
        );
        Ok(headers)
    }

    /// POST with up to `MAX_RETRIES` extra attempts when the request times out.
    ///
    /// Only connect/read timeouts are retried. Any HTTP status, including 5xx,
    /// is returned to the caller as-is.
    async fn post_with_retry(
        &self,
        url: &str,
        payload: &Map<String, Value>,
    ) -> Result<reqwest::Response, AppError> {
        let headers = self.headers()?;
        let strategy = FixedInterval::new(self.retry_backoff).take(MAX_RETRIES);

        let response = RetryIf::spawn(
            strategy,
            || {
                tracing::debug!("POST {}", url);
                self.client
                    .post(url)
                    .headers(headers.clone())
                    .json(payload)
                    .timeout(self.search_timeout)
                    .send()
            },
            |e: &reqwest::Error| {
                let retry = e.is_timeout();
                if retry {
                    tracing::warn!("Apollo request to {} timed out: {}", url, e);
                }
                retry
            },
        )
        .await?;

        Ok(response)
    }

    /// Searches companies (`mixed_companies/search`). Consumes credits.
    ///
    /// A 422 means Apollo rejected the filter shape; the vendor body is kept
    /// in the error.
    pub async fn search_companies(&self, payload: &Map<String, Value>) -> Result<Value, AppError> {
        let url = format!("{}/mixed_companies/search", self.base_url);
        let payload_json = Value::Object(payload.clone());
        tracing::info!("Apollo company search payload: {}", payload_json);

        let response = self.post_with_retry(&url, payload).await?;
        let status = response.status();

        if status.as_u16() == 422 {
            let body = rejection_body(response).await;
            return Err(AppError::VendorRejected { status: 422, body })
                .context("Apollo company search 422 (invalid payload)");
        }

        parse_success(response).await
    }

    /// Searches people (`mixed_people/api_search`). Consumes credits.
    ///
    /// The older `mixed_people/search` is deprecated and answers 422 to
    /// several filters this service sends.
    pub async fn search_people(&self, payload: &Map<String, Value>) -> Result<Value, AppError> {
        let url = format!("{}/mixed_people/api_search", self.base_url);
        let payload_json = Value::Object(payload.clone());
        tracing::debug!("Apollo people search payload: {}", payload_json);

        let response = self.post_with_retry(&url, payload).await?;
        parse_success(response).await
    }

    /// Enriches people via `people/bulk_match`, `ENRICH_BATCH_SIZE` ids per call.
    ///
    /// Returns enriched records keyed by stringified Apollo id. A failing batch
    /// is logged and skipped so the rest of the result stays usable.
    pub async fn enrich_people_bulk(
        &self,
        person_ids: &[String],
        reveal_personal_emails: bool,
        reveal_phone_number: bool,
    ) -> Result<HashMap<String, Value>, AppError> {
        let ids: Vec<&str> = person_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let headers = self.headers()?;
        let url = format!("{}/people/bulk_match", self.base_url);
        let mut result_by_id = HashMap::new();

        for (batch_no, batch) in ids.chunks(ENRICH_BATCH_SIZE).enumerate() {
            let body = json!({
                "details": batch.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
            });

            let outcome = self
                .client
                .post(&url)
                .headers(headers.clone())
                .query(&[
                    ("reveal_personal_emails", reveal_personal_emails.to_string()),
                    ("reveal_phone_number", reveal_phone_number.to_string()),
                ])
                .json(&body)
                .timeout(SHORT_TIMEOUT)
                .send()
                .await
                .map_err(AppError::from);

            let data = match outcome {
                Ok(response) => parse_success(response).await,
                Err(e) => Err(e),
            };

            match data {
                Ok(data) => {
                    let matches = data
                        .get("matches")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    for matched in matches {
                        if let Some(id) = matched.get("id").and_then(crate::models::value_to_string)
                        {
                            result_by_id.insert(id, matched);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Apollo enrichment batch {} ({} ids) failed, leaving unenriched: {}",
                        batch_no,
                        batch.len(),
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Apollo enrichment matched {} of {} ids",
            result_by_id.len(),
            ids.len()
        );
        Ok(result_by_id)
    }

    /// Searches tags (industry etc.) through Apollo's undocumented
    /// `tags/search`, used to look up ids for industry filters.
    pub async fn search_tags(&self, q_tag_fuzzy_name: &str) -> Result<Value, AppError> {
        let headers = self.headers()?;
        let url = format!("{}/tags/search", self.app_base_url);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .query(&[("q_tag_fuzzy_name", q_tag_fuzzy_name.trim())])
            .json(&json!({}))
            .timeout(SHORT_TIMEOUT)
            .send()
            .await?;

        parse_success(response).await
    }

    /// Reads Apollo's per-endpoint usage counters.
    ///
    /// Returns `None` when the key is not a master key (403).
    pub async fn usage_stats(&self) -> Result<Option<Value>, AppError> {
        let headers = self.headers()?;
        let url = format!("{}/usage_stats/api_usage_stats", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&json!({}))
            .timeout(USAGE_STATS_TIMEOUT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }

        parse_success(response).await.map(Some)
    }
}

/// Vendor error body: compact JSON when parseable, raw text otherwise.
async fn rejection_body(response: reqwest::Response) -> String {
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    serde_json::from_str::<Value>(&text)
        .map(|v| v.to_string())
        .unwrap_or(text)
}

async fn parse_success(response: reqwest::Response) -> Result<Value, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = rejection_body(response).await;
        return Err(AppError::VendorRejected {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Transport(format!("Failed to parse Apollo response: {}", e)))
}
