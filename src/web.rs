//! Browser pages: login/logout and the company search screen.
//!
//! Pages render through askama templates under `templates/`.

use crate::auth::{self, check_credentials, clear_session_cookie, session_cookie};
use crate::credits;
use crate::handlers::{run_company_search, AppState};
use crate::models::{Company, CompanySearchParams, CompanySearchResponse};
use crate::payloads::{INDUSTRY_TAGS, SENIORITIES};
use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

/// Only same-site absolute paths are accepted as post-login targets.
pub fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && path != "/login/" => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Template for the sign-in page.
///
/// Renders `templates/login.html`; `username` is echoed back after a failed
/// attempt.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub username: String,
    pub next: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// GET /login/
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Response {
    if auth::is_authenticated(&state, &headers) {
        return Redirect::to("/").into_response();
    }
    let next = query.next.unwrap_or_default();
    LoginTemplate {
        error: None,
        username: String::new(),
        next,
    }
    .into_response()
}

/// POST /login/
///
/// Sets the session cookie and redirects to `next` on success; re-renders
/// the form with 401 otherwise.
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    if !check_credentials(&state.config, &form.username, &form.password) {
        tracing::warn!("Failed login attempt for '{}'", form.username.trim());
        return (
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                error: Some("Invalid email or password.".to_string()),
                username: form.username.trim().to_string(),
                next: form.next.unwrap_or_default(),
            },
        )
            .into_response();
    }

    tracing::info!("Operator signed in");
    let cookie = session_cookie(&state.sessions.issue(), state.config.secure_cookies);
    let target = safe_next(form.next.as_deref());
    ([(header::SET_COOKIE, cookie)], Redirect::to(&target)).into_response()
}

/// GET|POST /logout/
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cookie = clear_session_cookie(state.config.secure_cookies);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/login/")).into_response()
}

/// Raw form values, echoed back into the inputs after a search.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SearchFormValues {
    pub company_name: String,
    pub domains: String,
    pub locations_included: String,
    pub locations_excluded: String,
    pub employees_min: String,
    pub employees_max: String,
    pub revenue_min: String,
    pub revenue_max: String,
    pub organization_keyword: String,
    pub organization_job_titles: String,
    pub organization_job_locations: String,
    pub lookalike_organization_ids: String,
    pub industries: String,
    pub industries_exclude: String,
    pub page: String,
    pub per_page: String,
}

impl SearchFormValues {
    /// Converts the text inputs into search params through the same lenient
    /// parsing the JSON API uses.
    pub fn to_params(&self) -> CompanySearchParams {
        let value = serde_json::json!({
            "company_name": self.company_name,
            "domains": self.domains,
            "locations_included": self.locations_included,
            "locations_excluded": self.locations_excluded,
            "employees_min": self.employees_min,
            "employees_max": self.employees_max,
            "revenue_min": self.revenue_min,
            "revenue_max": self.revenue_max,
            "organization_keyword": self.organization_keyword,
            "organization_job_titles": self.organization_job_titles,
            "organization_job_locations": self.organization_job_locations,
            "lookalike_organization_ids": self.lookalike_organization_ids,
            "industries": self.industries,
            "industries_exclude": self.industries_exclude,
            "page": self.page,
            "per_page": self.per_page,
        });
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// One text input of the search form.
pub struct FormField {
    pub label: &'static str,
    pub name: &'static str,
    pub value: String,
    pub placeholder: &'static str,
}

pub struct TagOption {
    pub id: &'static str,
    pub name: &'static str,
}

/// A company flattened to display strings.
pub struct CompanyRow {
    pub name: String,
    pub domain: String,
    pub industry: String,
    pub employees: String,
    pub location: String,
    pub revenue: String,
}

impl From<&Company> for CompanyRow {
    fn from(company: &Company) -> Self {
        let location = [&company.city, &company.state, &company.country]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            name: company.name.clone().unwrap_or_default(),
            domain: company.primary_domain.clone().unwrap_or_default(),
            industry: company.industry.clone().unwrap_or_default(),
            employees: company
                .estimated_num_employees
                .map(|n| n.to_string())
                .unwrap_or_default(),
            location,
            revenue: company.annual_revenue_printed.clone().unwrap_or_default(),
        }
    }
}

pub struct ResultsView {
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
    pub rows: Vec<CompanyRow>,
}

impl From<&CompanySearchResponse> for ResultsView {
    fn from(result: &CompanySearchResponse) -> Self {
        Self {
            total_count: result.total_count,
            page: result.page,
            per_page: result.per_page,
            rows: result.companies.iter().map(CompanyRow::from).collect(),
        }
    }
}

/// Template for the company search screen.
///
/// Renders `templates/search.html` with:
/// - The filter form, pre-filled with the submitted values
/// - Industry tag and seniority reference lists
/// - Results table or error message, when a search ran
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchTemplate {
    pub fields: Vec<FormField>,
    pub industry_tags: Vec<TagOption>,
    pub seniorities: String,
    pub results: Option<ResultsView>,
    pub error: Option<String>,
}

impl SearchTemplate {
    pub fn new(
        values: &SearchFormValues,
        result: Option<&CompanySearchResponse>,
        error: Option<String>,
    ) -> Self {
        let field = |label, name, value: &String, placeholder| FormField {
            label,
            name,
            value: value.clone(),
            placeholder,
        };
        let fields = vec![
            field("Company Name", "company_name", &values.company_name, "e.g., Google, Microsoft"),
            field("Domains", "domains", &values.domains, "e.g., google.com, microsoft.com"),
            field("Locations (Include)", "locations_included", &values.locations_included, "e.g., United States, Germany"),
            field("Locations (Exclude)", "locations_excluded", &values.locations_excluded, "e.g., China, Russia"),
            field("Employees Min", "employees_min", &values.employees_min, "e.g., 10"),
            field("Employees Max", "employees_max", &values.employees_max, "e.g., 500"),
            field("Revenue Min ($M)", "revenue_min", &values.revenue_min, "e.g., 1"),
            field("Revenue Max ($M)", "revenue_max", &values.revenue_max, "e.g., 100"),
            field("Organization Keyword", "organization_keyword", &values.organization_keyword, "e.g., software, logistics"),
            field("Org job titles", "organization_job_titles", &values.organization_job_titles, "e.g., software, engineer"),
            field("Org job locations", "organization_job_locations", &values.organization_job_locations, "e.g., lahore, karachi"),
            field("Lookalike org IDs", "lookalike_organization_ids", &values.lookalike_organization_ids, "comma-separated ids"),
            field("Industry tag IDs (include)", "industries", &values.industries, "see the list below"),
            field("Industry tag IDs (exclude)", "industries_exclude", &values.industries_exclude, "see the list below"),
            field("Page", "page", &values.page, "1"),
            field("Per page (max 100)", "per_page", &values.per_page, "25"),
        ];

        Self {
            fields,
            industry_tags: INDUSTRY_TAGS
                .iter()
                .map(|&(id, name)| TagOption { id, name })
                .collect(),
            seniorities: SENIORITIES
                .iter()
                .map(|(value, _)| *value)
                .collect::<Vec<_>>()
                .join(", "),
            results: result.map(ResultsView::from),
            error,
        }
    }
}

/// GET /
pub async fn company_search_page() -> impl IntoResponse {
    SearchTemplate::new(&SearchFormValues::default(), None, None)
}

/// POST /
///
/// Runs the search and renders results (or the error) under the form.
pub async fn company_search_submit(
    State(state): State<Arc<AppState>>,
    Form(values): Form<SearchFormValues>,
) -> impl IntoResponse {
    let params = values.to_params();
    match run_company_search(&state, &params).await {
        Ok(result) => {
            credits::log_credits("POST / (company search)", credits::COMPANY_SEARCH, "");
            SearchTemplate::new(&values, Some(&result), None)
        }
        Err(e) => {
            tracing::error!("Company search from UI failed: {}", e);
            SearchTemplate::new(&values, None, Some(e.to_string()))
        }
    }
}
