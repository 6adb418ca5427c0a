//! Estimated Apollo credit usage, logged per inbound request.

pub const COMPANY_SEARCH: u64 = 1;
pub const PEOPLE_SEARCH: u64 = 1;
pub const TAGS_SEARCH: u64 = 0;
/// `bulk_match` bills roughly one credit per contact.
pub const ENRICH_PER_PERSON: u64 = 1;

/// Credits for `searches` people searches plus enrichment of `enriched_ids` ids.
pub fn people_lookup_cost(searches: u64, enriched_ids: usize) -> u64 {
    searches * PEOPLE_SEARCH + enriched_ids as u64 * ENRICH_PER_PERSON
}

pub fn log_credits(endpoint: &str, credits: u64, detail: &str) {
    if detail.is_empty() {
        tracing::info!(endpoint, credits, "Apollo credits (estimated)");
    } else {
        tracing::info!(endpoint, credits, detail, "Apollo credits (estimated)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_people_lookup_cost() {
        assert_eq!(people_lookup_cost(1, 0), 1);
        assert_eq!(people_lookup_cost(2, 25), 27);
    }
}
