//! Flattening of Apollo responses into `Company` / `Person` records, and the
//! enrichment merge.

use crate::models::{value_to_string, Company, Person};
use serde_json::Value;
use std::collections::HashMap;

/// Non-empty string field. Numbers are stringified so ids survive vendor drift.
fn text(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(value_to_string)
}

/// First non-empty field among `keys`.
fn first_text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(raw, key))
}

fn int(raw: &Value, key: &str) -> Option<i64> {
    raw.get(key).and_then(crate::models::value_to_int)
}

fn float(raw: &Value, key: &str) -> Option<f64> {
    match raw.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Raw company entries: `organizations` when non-empty, otherwise `accounts`.
pub fn company_records(response: &Value) -> &[Value] {
    let list = |key: &str| {
        response
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    };

    let organizations = list("organizations");
    if organizations.is_empty() {
        list("accounts")
    } else {
        organizations
    }
}

/// Raw person entries from a people search response.
pub fn person_records(response: &Value) -> &[Value] {
    response
        .get("people")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

const LOCATION_FIELDS: [&str; 8] = [
    "organization_raw_address",
    "raw_address",
    "organization_city",
    "organization_state",
    "organization_country",
    "city",
    "state",
    "country",
];

pub fn normalize_company(raw: &Value) -> Company {
    let searchable_location_string = LOCATION_FIELDS
        .iter()
        .filter_map(|key| text(raw, key))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    Company {
        id: text(raw, "id"),
        name: text(raw, "name"),
        primary_domain: text(raw, "primary_domain"),
        logo_url: text(raw, "logo_url"),
        industry: text(raw, "industry"),
        estimated_num_employees: int(raw, "estimated_num_employees"),
        city: first_text(raw, &["organization_city", "city"]),
        state: first_text(raw, &["organization_state", "state"]),
        country: first_text(raw, &["organization_country", "country"]),
        searchable_location_string,
        linkedin_url: text(raw, "linkedin_url"),
        founded_year: int(raw, "founded_year"),
        annual_revenue: float(raw, "organization_revenue"),
        annual_revenue_printed: text(raw, "organization_revenue_printed"),
        phone: text(raw, "phone"),
        website_url: text(raw, "website_url"),
    }
}

pub fn normalize_companies(response: &Value) -> Vec<Company> {
    company_records(response)
        .iter()
        .map(normalize_company)
        .collect()
}

/// Phone numbers, preferring `sanitized_number` over `raw_number` per entry.
pub fn phone_numbers(raw: &Value) -> Vec<String> {
    raw.get("phone_numbers")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| first_text(entry, &["sanitized_number", "raw_number"]))
                .collect()
        })
        .unwrap_or_default()
}

pub fn normalize_person(raw: &Value) -> Person {
    let first_name = text(raw, "first_name");
    let last_name = text(raw, "last_name");

    let name = text(raw, "name").or_else(|| {
        let joined = format!(
            "{} {}",
            first_name.as_deref().unwrap_or(""),
            last_name.as_deref().unwrap_or("")
        );
        let joined = joined.trim();
        (!joined.is_empty()).then(|| joined.to_string())
    });

    Person {
        id: text(raw, "id"),
        first_name,
        last_name,
        name,
        email: text(raw, "email"),
        title: text(raw, "title"),
        seniority: text(raw, "seniority"),
        city: text(raw, "city"),
        state: text(raw, "state"),
        country: text(raw, "country"),
        linkedin_url: text(raw, "linkedin_url"),
        phone_numbers: phone_numbers(raw),
        organization_name: raw.get("organization").and_then(|org| text(org, "name")),
    }
}

pub fn normalize_people(response: &Value) -> Vec<Person> {
    person_records(response)
        .iter()
        .map(normalize_person)
        .collect()
}

/// Total result count across Apollo response versions.
///
/// Checks `pagination.total_entries`, `pagination.total_count`, then the same
/// two keys at the top level.
pub fn total_count(response: &Value) -> Option<u64> {
    let pagination = response.get("pagination");
    [
        pagination.and_then(|p| p.get("total_entries")),
        pagination.and_then(|p| p.get("total_count")),
        response.get("total_entries"),
        response.get("total_count"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_u64)
}

/// `(page, per_page)` echoed back from `pagination`, defaulting to 1 / 25.
pub fn pagination(response: &Value) -> (u64, u64) {
    let field = |key: &str| {
        response
            .get("pagination")
            .and_then(|p| p.get(key))
            .and_then(Value::as_u64)
    };
    (field("page").unwrap_or(1), field("per_page").unwrap_or(25))
}

/// Overwrites person fields with non-empty values from the matching
/// enrichment payload. Fields absent from the payload are left as they are.
pub fn merge_enrichment(people: &mut [Person], enriched_by_id: &HashMap<String, Value>) {
    for person in people.iter_mut() {
        let Some(id) = person.id.as_deref() else {
            continue;
        };
        let Some(enriched) = enriched_by_id.get(id.trim()) else {
            continue;
        };

        let overwrite = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = text(enriched, key) {
                *slot = Some(value);
            }
        };
        overwrite(&mut person.email, "email");
        overwrite(&mut person.linkedin_url, "linkedin_url");
        overwrite(&mut person.seniority, "seniority");
        overwrite(&mut person.city, "city");
        overwrite(&mut person.state, "state");
        overwrite(&mut person.country, "country");

        let phones = phone_numbers(enriched);
        if !phones.is_empty() {
            person.phone_numbers = phones;
        }
    }
}

/// Ids worth sending to bulk enrichment, in result order.
pub fn enrichable_ids(people: &[Person]) -> Vec<String> {
    people.iter().filter_map(|p| p.id.clone()).collect()
}
