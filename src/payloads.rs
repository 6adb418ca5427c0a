//! Translation of UI/API filters into Apollo request bodies.
//!
//! Absent or blank inputs never produce a key: Apollo reads a missing key as
//! "no filter", while an empty string or empty array can trigger a 422.

use crate::models::{CompanySearchParams, ListInput, PeopleSearchParams};
use serde_json::{json, Map, Value};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 100;

pub const EMPLOYEES_FLOOR: i64 = 1;
pub const EMPLOYEES_CEILING: i64 = 1_000_000;
pub const REVENUE_FLOOR: i64 = 0;
pub const REVENUE_CEILING: i64 = 999_999;

/// Page number, defaulting to 1 and never below it.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE)
}

/// Page size, defaulting to 25 and capped at 100.
pub fn clamp_per_page(per_page: Option<i64>) -> i64 {
    match per_page {
        Some(n) if n >= 1 => n.min(MAX_PER_PAGE),
        _ => DEFAULT_PER_PAGE,
    }
}

fn tokens(input: &Option<ListInput>) -> Vec<String> {
    input.as_ref().map(ListInput::tokens).unwrap_or_default()
}

fn lowercase_tokens(input: &Option<ListInput>) -> Vec<String> {
    tokens(input).into_iter().map(|t| t.to_lowercase()).collect()
}

fn insert_list(payload: &mut Map<String, Value>, key: &str, values: Vec<String>) {
    if !values.is_empty() {
        payload.insert(key.to_string(), json!(values));
    }
}

/// Builds the `mixed_companies/search` body.
///
/// Job titles and seniorities belong to people search and are never sent here.
pub fn build_company_payload(params: &CompanySearchParams) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("page".into(), json!(clamp_page(params.page)));
    payload.insert("per_page".into(), json!(clamp_per_page(params.per_page)));

    if let Some(name) = params
        .company_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        payload.insert("q_organization_name".into(), json!(name));
    }

    insert_list(
        &mut payload,
        "q_organization_domains_list",
        tokens(&params.domains),
    );
    insert_list(
        &mut payload,
        "organization_locations",
        lowercase_tokens(&params.locations_included),
    );
    insert_list(
        &mut payload,
        "organization_not_locations",
        lowercase_tokens(&params.locations_excluded),
    );

    if params.employees_min.is_some() || params.employees_max.is_some() {
        let min = params.employees_min.unwrap_or(EMPLOYEES_FLOOR);
        let max = params.employees_max.unwrap_or(EMPLOYEES_CEILING);
        payload.insert(
            "organization_num_employees_ranges".into(),
            json!([format!("{},{}", min, max)]),
        );
    }

    if params.revenue_min.is_some() || params.revenue_max.is_some() {
        payload.insert(
            "revenue_range".into(),
            json!({
                "min": params.revenue_min.unwrap_or(REVENUE_FLOOR),
                "max": params.revenue_max.unwrap_or(REVENUE_CEILING),
            }),
        );
    }

    insert_list(
        &mut payload,
        "q_organization_keyword_tags",
        tokens(&params.organization_keyword),
    );
    insert_list(
        &mut payload,
        "q_organization_job_titles",
        tokens(&params.organization_job_titles),
    );
    insert_list(
        &mut payload,
        "organization_job_locations",
        tokens(&params.organization_job_locations),
    );
    insert_list(
        &mut payload,
        "lookalike_organization_ids",
        tokens(&params.lookalike_organization_ids),
    );
    insert_list(
        &mut payload,
        "organization_industry_tag_ids",
        tokens(&params.industries),
    );
    insert_list(
        &mut payload,
        "organization_not_industry_tag_ids",
        tokens(&params.industries_exclude),
    );

    payload
}

/// Builds the `mixed_people/api_search` body.
pub fn build_people_payload(params: &PeopleSearchParams) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("page".into(), json!(clamp_page(params.page)));
    payload.insert("per_page".into(), json!(clamp_per_page(params.per_page)));

    if let Some(org_id) = params
        .organization_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        payload.insert("organization_ids".into(), json!([org_id]));
    }
    // An explicit id list wins over the single id
    insert_list(
        &mut payload,
        "organization_ids",
        tokens(&params.organization_ids),
    );

    insert_list(
        &mut payload,
        "q_organization_domains_list",
        tokens(&params.domains),
    );
    insert_list(
        &mut payload,
        "person_titles",
        lowercase_tokens(&params.job_titles),
    );
    // Seniority values are enum-like (c_suite, vp) and keep their case
    insert_list(
        &mut payload,
        "person_seniorities",
        tokens(&params.seniorities),
    );

    payload
}

/// Apollo industry tags offered by the search form: (tag id, display name).
pub const INDUSTRY_TAGS: &[(&str, &str)] = &[
    ("5567e27c7369642ade490000", "alternative medicine"),
    ("5567cdf27369644cfd800000", "automotive"),
    ("5567e0dd73696416d3c20100", "aviation & aerospace"),
    ("5567ce237369644ee5490000", "banking"),
    ("5567d08e7369645dbc4b0000", "biotechnology"),
    ("5567cdb773696439a9080000", "capital markets"),
    ("5567e21e73696426a1030000", "chemicals"),
    ("5567e1887369641d68d40100", "commercial real estate"),
    ("5567cd877369644cf94b0000", "computer & network security"),
    ("5567cd8b736964540d0f0000", "computer games"),
    ("5567e0d47369641233eb0600", "computer hardware"),
    ("5567cdbe7369643b78360000", "computer networking"),
    ("5567cd4e7369643b70010000", "computer software"),
    ("5567cd4773696439dd350000", "construction"),
    ("5567e1947369641ead570000", "consumer electronics"),
    ("5567ce987369643b789e0000", "consumer goods"),
    ("5567d1127261697f2b1d0000", "consumer services"),
    ("5567e1097369641b5f810500", "defense & space"),
    ("5567cdbc73696439d90b0000", "design"),
    ("5567e1b3736964208b280000", "food production"),
    ("5567cd527369643981050000", "government administration"),
    ("5567cddb7369644d250c0000", "health, wellness & fitness"),
    ("5567cd4c73696453e1300000", "higher education"),
    ("5567cdde73696439812c0000", "hospital & health care"),
    ("5567ce9d7369643bc19c0000", "hospitality"),
    ("5567e0e37369640e5ac10c00", "human resources"),
    ("5567e1337369641ad2970000", "industrial automation"),
    ("5567e0c97369640d2b3b1600", "information services"),
    ("5567cd4773696439b10b0000", "information technology & services"),
    ("5567cdd973696453d93f0000", "insurance"),
    ("5567cd4d736964397e020000", "internet"),
    ("5567e1ab7369641f6d660100", "investment banking"),
    ("5567e0bc7369641d11550200", "investment management"),
    ("5567ce1f7369644d391c0000", "law practice"),
    ("5567ce2d7369644d25250000", "legal services"),
    ("5567cdd87369643bc12f0000", "leisure, travel & tourism"),
    ("5567cd4973696439b9010000", "logistics & supply chain"),
    ("5567cd4973696439d53c0000", "machinery"),
    ("5567e3f3736964395d7a0000", "mining & metals"),
    ("5567cd4773696454303a0000", "nonprofit organization management"),
    ("5567cdd97369645624020000", "oil & energy"),
    ("5567cdb373696439dd540000", "online media"),
    ("5567e0eb73696410e4bd1200", "pharmaceuticals"),
    ("5567cd49736964541d010000", "professional training & coaching"),
    ("5567cd477369645401010000", "real estate"),
    ("5567cd49736964540d020000", "renewables & environment"),
    ("5567e09f736964160ebb0100", "research"),
    ("5567e0e0736964198de70700", "restaurants"),
    ("5567ced173696450cb580000", "retail"),
    ("5567e0d87369640e5aa30c00", "semiconductors"),
    ("5567e09973696410db020800", "staffing & recruiting"),
    ("5567cd4c7369644d39080000", "telecommunications"),
    ("5567cd4e7369644cf93b0000", "transportation/trucking/railroad"),
    ("5567e2127369642420170000", "utilities"),
    ("5567e1587369641c48370000", "venture capital & private equity"),
    ("5567e127736964181e700200", "warehousing"),
    ("5567d01e73696457ee100000", "wholesale"),
];

/// Seniority values accepted by `person_seniorities`: (value, label).
pub const SENIORITIES: &[(&str, &str)] = &[
    ("owner", "Owner"),
    ("founder", "Founder"),
    ("c_suite", "C-Suite"),
    ("partner", "Partner"),
    ("vp", "VP"),
    ("head", "Head"),
    ("director", "Director"),
    ("manager", "Manager"),
    ("senior", "Senior"),
    ("entry", "Entry"),
    ("intern", "Intern"),
];

/// Common `person_titles` values suggested by the UI.
pub const JOB_TITLES: &[&str] = &[
    "manager",
    "project manager",
    "owner",
    "director",
    "software engineer",
    "consultant",
    "account manager",
    "engineer",
    "sales manager",
    "sales",
    "partner",
    "president",
    "general manager",
];
