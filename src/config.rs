use serde::Deserialize;

pub const DEFAULT_APOLLO_BASE_URL: &str = "https://api.apollo.io/api/v1";
pub const DEFAULT_APOLLO_APP_BASE_URL: &str = "https://app.apollo.io/api/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub apollo_api_key: Option<String>,
    pub apollo_base_url: String,
    pub apollo_app_base_url: String, // Undocumented tag search lives on the app host
    pub request_timeout_secs: u64,
    pub admin_email: String,
    pub admin_password_sha256: String,
    pub session_secret: String,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            apollo_api_key: std::env::var("APOLLO_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            apollo_base_url: base_url_var("APOLLO_BASE_URL", DEFAULT_APOLLO_BASE_URL)?,
            apollo_app_base_url: base_url_var(
                "APOLLO_APP_BASE_URL",
                DEFAULT_APOLLO_APP_BASE_URL,
            )?,
            request_timeout_secs: std::env::var("APOLLO_REQUEST_TIMEOUT")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("APOLLO_REQUEST_TIMEOUT must be a whole number of seconds")
                })?,
            admin_email: std::env::var("ADMIN_EMAIL")
                .map_err(|_| anyhow::anyhow!("ADMIN_EMAIL environment variable required"))
                .and_then(|email| {
                    let email = email.trim().to_lowercase();
                    if email.is_empty() {
                        anyhow::bail!("ADMIN_EMAIL cannot be empty");
                    }
                    Ok(email)
                })?,
            admin_password_sha256: std::env::var("ADMIN_PASSWORD_SHA256")
                .map_err(|_| {
                    anyhow::anyhow!("ADMIN_PASSWORD_SHA256 environment variable required")
                })
                .and_then(|digest| {
                    let digest = digest.trim().to_lowercase();
                    if digest.len() != 64 || hex::decode(&digest).is_err() {
                        anyhow::bail!("ADMIN_PASSWORD_SHA256 must be a 64-character hex digest");
                    }
                    Ok(digest)
                })?,
            session_secret: std::env::var("SESSION_SECRET")
                .map_err(|_| anyhow::anyhow!("SESSION_SECRET environment variable required"))
                .and_then(|secret| {
                    if secret.len() < 32 {
                        anyhow::bail!("SESSION_SECRET must be at least 32 characters");
                    }
                    Ok(secret)
                })?,
            secure_cookies: std::env::var("COOKIE_SECURE")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        };

        // Never log the key or the secrets themselves
        tracing::info!("Configuration loaded successfully");
        if config.apollo_api_key.is_none() {
            tracing::warn!("APOLLO_API_KEY is not set; every Apollo call will fail until it is");
        }
        tracing::debug!("Apollo base URL: {}", config.apollo_base_url);
        tracing::debug!("Apollo app base URL: {}", config.apollo_app_base_url);
        tracing::debug!("Apollo search timeout: {}s", config.request_timeout_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn base_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let raw = std::env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string());

    let parsed = url::Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", name, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", name);
    }

    Ok(raw.trim().trim_end_matches('/').to_string())
}
