//! Operator login gate: credential check, signed session cookie, and the
//! middleware that guards every non-public route.

use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::{header::COOKIE, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "apollo_leads_session";
/// Seven days.
pub const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;
const SESSION_SUBJECT: &str = "admin";

/// Checks a login attempt against the configured operator identity.
///
/// The email is compared case-insensitively after trimming; the password is
/// compared by SHA-256 digest.
pub fn check_credentials(config: &Config, username: &str, password: &str) -> bool {
    let email = username.trim().to_lowercase();
    if email.is_empty() || email != config.admin_email.to_lowercase() {
        return false;
    }

    let digest = hex::encode(Sha256::digest(password.as_bytes()));
    digest == config.admin_password_sha256.to_lowercase()
}

/// Issues and verifies session cookie values of the form
/// `<expires_unix>.<hex hmac>`.
#[derive(Clone)]
pub struct SessionSigner {
    secret: String,
}

impl SessionSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, expires_at: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(format!("{}:{}", SESSION_SUBJECT, expires_at).as_bytes());
        mac
    }

    /// Signs a session valid until `now + SESSION_TTL_SECS`.
    pub fn issue_at(&self, now: i64) -> String {
        let expires_at = now + SESSION_TTL_SECS;
        let tag = self.mac(expires_at).finalize().into_bytes();
        format!("{}.{}", expires_at, hex::encode(tag))
    }

    pub fn issue(&self) -> String {
        self.issue_at(Utc::now().timestamp())
    }

    /// True when `value` carries a valid signature and has not expired at `now`.
    pub fn verify_at(&self, value: &str, now: i64) -> bool {
        let Some((expires, tag)) = value.split_once('.') else {
            return false;
        };
        let Ok(expires_at) = expires.parse::<i64>() else {
            return false;
        };
        let Ok(tag) = hex::decode(tag) else {
            return false;
        };
        if expires_at <= now {
            return false;
        }

        self.mac(expires_at).verify_slice(&tag).is_ok()
    }

    pub fn verify(&self, value: &str) -> bool {
        self.verify_at(value, Utc::now().timestamp())
    }
}

/// Reads one cookie from the `Cookie` header(s).
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(key), Some(value)) if key == name => Some(value.to_string()),
                _ => None,
            }
        })
}

/// `Set-Cookie` value carrying a fresh session.
pub fn session_cookie(value: &str, secure: bool) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        value,
        SESSION_TTL_SECS,
        if secure { "; Secure" } else { "" }
    )
}

/// `Set-Cookie` value that removes the session.
pub fn clear_session_cookie(secure: bool) -> String {
    format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; SameSite=Lax{}",
        SESSION_COOKIE,
        if secure { "; Secure" } else { "" }
    )
}

/// True when the request carries a valid session cookie.
pub fn is_authenticated(state: &AppState, headers: &HeaderMap) -> bool {
    read_cookie(headers, SESSION_COOKIE)
        .map(|value| state.sessions.verify(&value))
        .unwrap_or(false)
}

/// Guards the operator routes.
///
/// API callers (`/api/...`) get `401` JSON; browser routes are redirected to
/// `/login/`.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if is_authenticated(&state, req.headers()) {
        return next.run(req).await;
    }

    if req.uri().path().starts_with("/api/") {
        AppError::Unauthorized(format!("no valid session for {}", req.uri().path()))
            .into_response()
    } else {
        Redirect::to("/login/").into_response()
    }
}
