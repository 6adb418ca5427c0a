//! Contact export: one workbook per selected company, bundled in a zip.

use crate::apollo_client::ApolloClient;
use crate::credits;
use crate::errors::AppError;
use crate::models::{ExportRequest, ListInput, PeopleSearchParams, Person};
use crate::normalize::{enrichable_ids, merge_enrichment, normalize_people};
use crate::payloads::build_people_payload;
use regex::Regex;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_NAME: &str = "companies_export.zip";
pub const SHEET_NAME: &str = "Contacts";
pub const HEADER: [&str; 6] = ["Name", "Email", "LinkedIn", "Job Title", "Seniority", "Location"];
/// Contacts fetched per company when the UI did not send them.
pub const EXPORT_PER_PAGE: i64 = 100;
const MAX_FILENAME_CHARS: usize = 200;

/// `city, state, country`, skipping blanks.
pub fn person_location(person: &Person) -> String {
    [&person.city, &person.state, &person.country]
        .into_iter()
        .flatten()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn contact_row(person: &Person) -> [String; 6] {
    let field = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        field(&person.name),
        field(&person.email),
        field(&person.linkedin_url),
        field(&person.title),
        field(&person.seniority),
        person_location(person),
    ]
}

/// Builds an xlsx workbook with the fixed header and one row per contact.
pub fn contacts_workbook(people: &[Person]) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in HEADER.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }

    for (idx, person) in people.iter().enumerate() {
        let row = idx as u32 + 1;
        for (col, value) in contact_row(person).iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(row, col as u16, value.as_str())?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Strips characters that are invalid in file names and truncates long names.
pub fn sanitize_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"));

    let cleaned = invalid.replace_all(name.trim(), "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return "company".to_string();
    }
    if cleaned.chars().count() > MAX_FILENAME_CHARS {
        let truncated: String = cleaned.chars().take(MAX_FILENAME_CHARS).collect();
        return format!("{}...", truncated);
    }
    cleaned.to_string()
}

/// Hands out archive entry names, suffixing repeats with ` (2)`, ` (3)`, ...
///
/// Every name handed out is unique, including against company names that
/// already end in a ` (n)` suffix.
#[derive(Debug, Default)]
struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    fn next(&mut self, company_name: &str) -> String {
        let stem = sanitize_filename(company_name);
        let mut candidate = format!("{}.xlsx", stem);
        let mut suffix = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{} ({}).xlsx", stem, suffix);
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Zips `(entry name, bytes)` pairs with deflate compression.
pub fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, AppError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in files {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// People search + enrichment for one company, as the people endpoint does it.
///
/// When the title/seniority filters find nobody, the search is repeated
/// without them so the export still lists the company's contacts.
pub async fn people_for_company(
    client: &ApolloClient,
    organization_id: Option<&str>,
    domain: Option<&str>,
    job_titles: &[String],
    seniorities: &[String],
) -> Result<Vec<Person>, AppError> {
    if organization_id.is_none() && domain.is_none() {
        tracing::warn!("Export: company has neither id nor domain, nothing to search");
        return Ok(Vec::new());
    }

    let filtered = PeopleSearchParams {
        organization_id: organization_id.map(str::to_string),
        domains: domain.map(ListInput::from),
        job_titles: Some(ListInput::Items(job_titles.to_vec())),
        seniorities: Some(ListInput::Items(seniorities.to_vec())),
        page: Some(1),
        per_page: Some(EXPORT_PER_PAGE),
        ..Default::default()
    };

    let mut searches = 1;
    let response = client.search_people(&build_people_payload(&filtered)).await?;
    let mut people = normalize_people(&response);

    if people.is_empty() && (!job_titles.is_empty() || !seniorities.is_empty()) {
        let unfiltered = PeopleSearchParams {
            job_titles: None,
            seniorities: None,
            ..filtered
        };
        let response = client
            .search_people(&build_people_payload(&unfiltered))
            .await?;
        people = normalize_people(&response);
        searches = 2;
    }

    let ids = enrichable_ids(&people);
    if !ids.is_empty() {
        let enriched = client.enrich_people_bulk(&ids, false, false).await?;
        merge_enrichment(&mut people, &enriched);
    }

    credits::log_credits(
        &format!(
            "export people lookup (org_id={})",
            organization_id.or(domain).unwrap_or("?")
        ),
        credits::people_lookup_cost(searches, ids.len()),
        &format!(
            "search={} enrich={} ({} contacts)",
            searches,
            ids.len() as u64 * credits::ENRICH_PER_PERSON,
            ids.len()
        ),
    );

    Ok(people)
}

/// Builds the export archive for `request`.
///
/// Companies whose contacts cannot be fetched are logged and left out; the
/// rest of the export still goes through.
pub async fn export_companies(
    client: &ApolloClient,
    request: &ExportRequest,
) -> Result<Vec<u8>, AppError> {
    if request.companies.is_empty() {
        return Err(AppError::BadRequest("No companies selected".to_string()));
    }

    let job_titles = request
        .job_titles
        .as_ref()
        .map(ListInput::tokens)
        .unwrap_or_default();
    let seniorities = request
        .seniorities
        .as_ref()
        .map(ListInput::tokens)
        .unwrap_or_default();

    tracing::info!("Export: request for {} company(ies)", request.companies.len());

    let mut names = EntryNames::default();
    let mut files = Vec::with_capacity(request.companies.len());

    for company in &request.companies {
        let name = company.display_name();
        let embedded = company.people.as_deref().unwrap_or(&[]);

        let people = if !embedded.is_empty() {
            embedded.to_vec()
        } else {
            tracing::info!(
                "Export: fetching people for company id={:?} name={}",
                company.id,
                name
            );
            let domain = company.effective_domain();
            match people_for_company(
                client,
                company.id.as_deref(),
                domain.as_deref(),
                &job_titles,
                &seniorities,
            )
            .await
            {
                Ok(people) => people,
                Err(e) => {
                    tracing::warn!(
                        "Export: skip company id={:?} name={}: {}",
                        company.id,
                        name,
                        e
                    );
                    continue;
                }
            }
        };

        files.push((names.next(name), contacts_workbook(&people)?));
    }

    tracing::info!("Export: archive holds {} workbook(s)", files.len());
    build_archive(&files)
}
