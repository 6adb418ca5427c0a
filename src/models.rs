use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ============ Normalized Records ============

/// A company flattened from an Apollo organization/account record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Apollo organization id.
    pub id: Option<String>,
    pub name: Option<String>,
    pub primary_domain: Option<String>,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub estimated_num_employees: Option<i64>,
    /// HQ city (organization-prefixed field preferred).
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    /// Lower-cased concatenation of every address field, for client-side filtering.
    pub searchable_location_string: String,
    pub linkedin_url: Option<String>,
    pub founded_year: Option<i64>,
    pub annual_revenue: Option<f64>,
    pub annual_revenue_printed: Option<String>,
    pub phone: Option<String>,
    pub website_url: Option<String>,
}

/// A contact flattened from an Apollo person record.
///
/// `email` and `linkedin_url` are usually only filled in after the
/// enrichment merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub seniority: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub linkedin_url: Option<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub phone_numbers: Vec<String>,
    pub organization_name: Option<String>,
}

// ============ Request Inputs ============

/// A list-valued filter as sent by the UI: either one comma-separated string
/// or a JSON array.
#[derive(Debug, Clone, PartialEq)]
pub enum ListInput {
    Text(String),
    Items(Vec<String>),
}

impl ListInput {
    /// Trimmed, non-empty tokens. Text is split on commas.
    pub fn tokens(&self) -> Vec<String> {
        match self {
            ListInput::Text(text) => split_csv(text),
            ListInput::Items(items) => items
                .iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect(),
        }
    }
}

impl From<&str> for ListInput {
    fn from(value: &str) -> Self {
        ListInput::Text(value.to_string())
    }
}

impl From<Vec<&str>> for ListInput {
    fn from(values: Vec<&str>) -> Self {
        ListInput::Items(values.into_iter().map(str::to_string).collect())
    }
}

impl<'de> Deserialize<'de> for ListInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        Ok(match raw {
            Value::Array(items) => ListInput::Items(
                items
                    .into_iter()
                    .filter_map(|item| value_to_string(&item))
                    .collect(),
            ),
            other => ListInput::Text(value_to_string(&other).unwrap_or_default()),
        })
    }
}

/// Splits a comma-separated string into trimmed, non-empty parts.
pub fn split_csv(text: &str) -> Vec<String> {
    text.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Filters accepted by company search (JSON API and the HTML form).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanySearchParams {
    pub company_name: Option<String>,
    pub domains: Option<ListInput>,
    pub locations_included: Option<ListInput>,
    pub locations_excluded: Option<ListInput>,
    #[serde(deserialize_with = "lenient_int")]
    pub employees_min: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub employees_max: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub revenue_min: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub revenue_max: Option<i64>,
    pub organization_keyword: Option<ListInput>,
    #[serde(alias = "q_organization_job_titles")]
    pub organization_job_titles: Option<ListInput>,
    pub organization_job_locations: Option<ListInput>,
    pub lookalike_organization_ids: Option<ListInput>,
    pub industries: Option<ListInput>,
    pub industries_exclude: Option<ListInput>,
    #[serde(deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub per_page: Option<i64>,
}

/// Filters accepted by people search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PeopleSearchParams {
    #[serde(deserialize_with = "lenient_id")]
    pub organization_id: Option<String>,
    pub organization_ids: Option<ListInput>,
    pub domains: Option<ListInput>,
    pub job_titles: Option<ListInput>,
    pub seniorities: Option<ListInput>,
    #[serde(deserialize_with = "lenient_int")]
    pub page: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub per_page: Option<i64>,
}

/// Query string / body for tag search.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TagSearchParams {
    pub q: Option<String>,
    pub q_tag_fuzzy_name: Option<String>,
}

impl TagSearchParams {
    /// The fuzzy tag name, preferring `q`.
    pub fn query(&self) -> Option<String> {
        [&self.q, &self.q_tag_fuzzy_name]
            .into_iter()
            .flatten()
            .map(|q| q.trim().to_string())
            .find(|q| !q.is_empty())
    }
}

/// One company selected for export.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CompanyStub {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub primary_domain: Option<String>,
    /// Contacts already loaded by the UI; re-fetched server-side when empty.
    pub people: Option<Vec<Person>>,
}

impl CompanyStub {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or("company")
    }

    pub fn effective_domain(&self) -> Option<String> {
        [&self.domain, &self.primary_domain]
            .into_iter()
            .flatten()
            .map(|d| d.trim().to_string())
            .find(|d| !d.is_empty())
    }
}

/// Body of the export endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    #[serde(deserialize_with = "lenient_vec")]
    pub companies: Vec<CompanyStub>,
    pub job_titles: Option<ListInput>,
    pub seniorities: Option<ListInput>,
}

// ============ Responses ============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySearchResponse {
    pub companies: Vec<Company>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeopleSearchResponse {
    pub people: Vec<Person>,
    pub total_count: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSearchResponse {
    pub tags: Vec<Value>,
}

// ============ Lenient field parsing ============

/// Renders scalars as strings; `null` and blank strings become `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Integers from JSON numbers or numeric strings. Blank or unparseable → `None`.
pub fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(value_to_int))
}

/// `null` reads as an empty list.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(value_to_string))
}
