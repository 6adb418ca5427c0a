use crate::auth;
use crate::handlers::{self, AppState};
use crate::web;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Request size limit: export bodies carry embedded contacts, 5MB is plenty.
pub const BODY_LIMIT_BYTES: usize = 5 * 1024 * 1024;

/// Routes reachable without a session: login, logout, health.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/login/", get(web::login_form).post(web::login_submit))
        .route("/logout/", get(web::logout).post(web::logout))
}

/// Operator routes, all behind `auth::require_session`.
pub fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        // UI
        .route(
            "/",
            get(web::company_search_page).post(web::company_search_submit),
        )
        // API Documentation
        .route("/api/docs/", get(handlers::serve_swagger_ui))
        .route("/api/schema/", get(handlers::serve_openapi_spec))
        // API endpoints
        .route("/api/companies/search/", post(handlers::search_companies))
        .route("/api/people/search/", post(handlers::search_people))
        .route(
            "/api/tags/search/",
            get(handlers::search_tags_get).post(handlers::search_tags_post),
        )
        .route("/api/export/companies/", post(handlers::export_companies))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_session,
        ))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}

/// Full application without rate limiting (used by tests and tools).
pub fn build_router(state: Arc<AppState>) -> axum::Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
