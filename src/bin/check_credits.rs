//! One-off check of Apollo credit usage.
//!
//! Searches 100 companies directly against Apollo, then runs people search
//! (search + enrichment) for the top 10 through the deployed service, printing
//! Apollo usage counters before and after each phase.
//!
//! ```text
//! APOLLO_API_KEY=... ADMIN_EMAIL=... ADMIN_PASSWORD=... \
//! API_BASE_URL=http://127.0.0.1:8000 cargo run --bin check_credits
//! ```

use apollo_leads::apollo_client::ApolloClient;
use apollo_leads::auth::SESSION_COOKIE;
use apollo_leads::config::{DEFAULT_APOLLO_APP_BASE_URL, DEFAULT_APOLLO_BASE_URL};
use apollo_leads::normalize::company_records;
use serde_json::{json, Map, Value};
use std::env;
use std::time::Duration;

const USAGE_KEYS: [(&str, &str); 3] = [
    ("api/v1/mixed_companies", "search"),
    ("api/v1/mixed_people", "search"),
    ("api/v1/people", "bulk_match"),
];

fn log_usage(label: &str, stats: Option<&Value>) {
    let Some(stats) = stats else {
        tracing::info!("{}: usage stats unavailable (needs a master API key)", label);
        return;
    };
    for (path, action) in USAGE_KEYS {
        // Apollo keys the stats object by the JSON-encoded [path, action] pair
        let key = json!([path, action]).to_string();
        if let Some(entry) = stats.get(&key) {
            let consumed = |window: &str| {
                entry
                    .get(window)
                    .and_then(|w| w.get("consumed"))
                    .cloned()
                    .unwrap_or(Value::Null)
            };
            tracing::info!(
                "{}: {} day={} hour={} minute={}",
                label,
                key,
                consumed("day"),
                consumed("hour"),
                consumed("minute")
            );
        }
    }
}

/// Logs in to the service and returns the session cookie value.
async fn login(http: &reqwest::Client, api_base: &str) -> anyhow::Result<String> {
    let email = env::var("ADMIN_EMAIL").map_err(|_| anyhow::anyhow!("ADMIN_EMAIL must be set"))?;
    let password =
        env::var("ADMIN_PASSWORD").map_err(|_| anyhow::anyhow!("ADMIN_PASSWORD must be set"))?;

    let response = http
        .post(format!("{}/login/", api_base))
        .form(&[("username", email.as_str()), ("password", password.as_str())])
        .send()
        .await?;

    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.trim().strip_prefix(&format!("{}=", SESSION_COOKIE)))
                .map(str::to_string)
        })
        .ok_or_else(|| anyhow::anyhow!("login failed: HTTP {}", response.status()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let api_base = env::var("API_BASE_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
        .trim_end_matches('/')
        .to_string();
    let apollo = ApolloClient::with_endpoints(
        env::var("APOLLO_API_KEY").ok(),
        &env::var("APOLLO_BASE_URL").unwrap_or_else(|_| DEFAULT_APOLLO_BASE_URL.to_string()),
        &env::var("APOLLO_APP_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_APOLLO_APP_BASE_URL.to_string()),
        Duration::from_secs(120),
    )?;

    tracing::info!("Phase 1: usage stats before");
    log_usage("before", apollo.usage_stats().await?.as_ref());

    tracing::info!("Phase 2: Apollo company search, 100 companies");
    let mut payload = Map::new();
    payload.insert("page".into(), json!(1));
    payload.insert("per_page".into(), json!(100));
    let companies = apollo.search_companies(&payload).await?;
    let org_ids: Vec<String> = company_records(&companies)
        .iter()
        .filter_map(|org| org.get("id").and_then(apollo_leads::models::value_to_string))
        .take(10)
        .collect();
    tracing::info!(
        "Fetched {} companies; top {} ids selected",
        company_records(&companies).len(),
        org_ids.len()
    );
    if org_ids.is_empty() {
        anyhow::bail!("No companies returned; check API key / plan");
    }
    log_usage("after company search", apollo.usage_stats().await?.as_ref());

    tracing::info!("Phase 3: people search through {}", api_base);
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(60))
        .build()?;
    let session = login(&http, &api_base).await?;

    for (i, org_id) in org_ids.iter().enumerate() {
        let response = http
            .post(format!("{}/api/people/search/", api_base))
            .header(
                reqwest::header::COOKIE,
                format!("{}={}", SESSION_COOKIE, session),
            )
            .json(&json!({ "organization_id": org_id, "per_page": 25 }))
            .send()
            .await?;

        if response.status().is_success() {
            let data: Value = response.json().await?;
            let returned = data
                .get("people")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0);
            let total = data.get("total_count").cloned().unwrap_or(Value::Null);
            tracing::info!(
                "Company {} (id={}): {} people returned, total_count={}",
                i + 1,
                org_id,
                returned,
                total
            );
        } else {
            tracing::warn!("Company {} (id={}): HTTP {}", i + 1, org_id, response.status());
        }
    }

    log_usage("after people search", apollo.usage_stats().await?.as_ref());
    tracing::info!(
        "Each people search through the service = 1 search credit + 1 credit per enriched contact"
    );
    Ok(())
}
