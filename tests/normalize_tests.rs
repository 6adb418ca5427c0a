/// Normalization of Apollo responses and the enrichment merge
use apollo_leads::normalize::{
    enrichable_ids, merge_enrichment, normalize_companies, normalize_people, total_count,
};
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_companies_fall_back_to_accounts() {
    let response = json!({
        "organizations": [],
        "accounts": [{"id": "acc-1", "name": "Saved Co"}]
    });
    let companies = normalize_companies(&response);

    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].name.as_deref(), Some("Saved Co"));
}

#[test]
fn test_organizations_win_over_accounts() {
    let response = json!({
        "organizations": [{"id": "org-1"}],
        "accounts": [{"id": "acc-1"}, {"id": "acc-2"}]
    });
    let companies = normalize_companies(&response);

    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].id.as_deref(), Some("org-1"));
}

#[test]
fn test_company_fields() {
    let response = json!({"organizations": [{
        "id": 77,
        "name": "Acme",
        "primary_domain": "acme.com",
        "organization_city": "Austin",
        "city": "Dallas",
        "state": "Texas",
        "organization_country": "United States",
        "raw_address": "1 Main St",
        "estimated_num_employees": "250",
        "founded_year": 1999,
        "organization_revenue": "1500000.5",
        "organization_revenue_printed": "1.5M"
    }]});
    let company = &normalize_companies(&response)[0];

    assert_eq!(company.id.as_deref(), Some("77"));
    assert_eq!(company.city.as_deref(), Some("Austin"));
    assert_eq!(company.state.as_deref(), Some("Texas"));
    assert_eq!(company.country.as_deref(), Some("United States"));
    assert_eq!(company.estimated_num_employees, Some(250));
    assert_eq!(company.founded_year, Some(1999));
    assert_eq!(company.annual_revenue, Some(1_500_000.5));
    assert_eq!(company.annual_revenue_printed.as_deref(), Some("1.5M"));
    assert_eq!(
        company.searchable_location_string,
        "1 main st austin united states dallas texas"
    );
}

#[test]
fn test_company_without_location_has_empty_search_string() {
    let companies = normalize_companies(&json!({"organizations": [{"id": "x"}]}));
    assert_eq!(companies[0].searchable_location_string, "");
    assert_eq!(companies[0].city, None);
}

#[test]
fn test_person_name_and_phones() {
    let response = json!({"people": [
        {
            "id": "p1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "phone_numbers": [
                {"raw_number": "(555) 010", "sanitized_number": "+1555010"},
                {"raw_number": "020 7946"},
                {"sanitized_number": ""}
            ],
            "organization": {"name": "Analytical Engines"}
        },
        {"id": "p2", "name": "Given Name", "first_name": "Ignored"},
        {"first_name": "  ", "last_name": null}
    ]});
    let people = normalize_people(&response);

    assert_eq!(people[0].name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(people[0].phone_numbers, vec!["+1555010", "020 7946"]);
    assert_eq!(
        people[0].organization_name.as_deref(),
        Some("Analytical Engines")
    );
    assert_eq!(people[1].name.as_deref(), Some("Given Name"));
    assert_eq!(people[2].name, None);

    assert_eq!(enrichable_ids(&people), vec!["p1", "p2"]);
}

#[test]
fn test_merge_only_overwrites_with_values() {
    let mut people = normalize_people(&json!({"people": [
        {"id": "p1", "email": "old@example.com", "city": "Paris", "seniority": "manager",
         "phone_numbers": [{"sanitized_number": "+331"}]},
        {"id": "p2", "email": "keep@example.com"}
    ]}));

    let mut enriched = HashMap::new();
    enriched.insert(
        "p1".to_string(),
        json!({
            "id": "p1",
            "email": "new@example.com",
            "city": "",
            "seniority": null,
            "linkedin_url": "https://linkedin.com/in/p1",
            "phone_numbers": []
        }),
    );
    merge_enrichment(&mut people, &enriched);

    let p1 = &people[0];
    assert_eq!(p1.email.as_deref(), Some("new@example.com"));
    assert_eq!(p1.city.as_deref(), Some("Paris"));
    assert_eq!(p1.seniority.as_deref(), Some("manager"));
    assert_eq!(p1.linkedin_url.as_deref(), Some("https://linkedin.com/in/p1"));
    assert_eq!(p1.phone_numbers, vec!["+331"]);

    // No enrichment entry: untouched
    assert_eq!(people[1].email.as_deref(), Some("keep@example.com"));
}

#[test]
fn test_total_count_fallbacks() {
    assert_eq!(
        total_count(&json!({"pagination": {"total_entries": 10, "total_count": 99}})),
        Some(10)
    );
    assert_eq!(
        total_count(&json!({"pagination": {"total_count": 7}})),
        Some(7)
    );
    assert_eq!(total_count(&json!({"total_entries": 5})), Some(5));
    assert_eq!(total_count(&json!({"total_count": 3})), Some(3));
    assert_eq!(total_count(&json!({})), None);
}
