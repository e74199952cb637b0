//! Input validation and record sanitization.

use crate::error::{ExtractorError, Result};
use crate::output::OutputFormat;
use crate::record::ArticleRecord;
use crate::text::NOT_AVAILABLE;
use regex::Regex;
use std::sync::LazyLock;

const MIN_QUERY_LEN: usize = 2;
const MAX_QUERY_LEN: usize = 1000;
const MAX_FILENAME_LEN: usize = 255;

/// Characters rejected in search queries
const FORBIDDEN_QUERY_CHARS: &[char] = &['<', '>', '"', '\'', '&', '\0'];

static INVALID_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).expect("valid filename regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Validate and trim a PubMed search query
pub fn validate_query(query: &str) -> Result<String> {
    let query = query.trim();

    if query.is_empty() {
        return Err(ExtractorError::Validation("Search query cannot be empty".to_string()));
    }

    let len = query.chars().count();
    if len < MIN_QUERY_LEN {
        return Err(ExtractorError::Validation(format!(
            "Search query must be at least {} characters long",
            MIN_QUERY_LEN
        )));
    }
    if len > MAX_QUERY_LEN {
        return Err(ExtractorError::Validation(format!(
            "Search query cannot exceed {} characters",
            MAX_QUERY_LEN
        )));
    }

    if let Some(c) = query.chars().find(|c| FORBIDDEN_QUERY_CHARS.contains(c)) {
        return Err(ExtractorError::Validation(format!(
            "Search query contains invalid character: {:?}",
            c
        )));
    }

    Ok(query.to_string())
}

/// Validate an output filename.
///
/// Path separators are rejected: output always lands in the working directory.
pub fn validate_filename(filename: &str) -> Result<String> {
    let filename = filename.trim();

    if filename.is_empty() {
        return Err(ExtractorError::Validation("Filename cannot be empty".to_string()));
    }
    if INVALID_FILENAME_CHARS.is_match(filename) {
        return Err(ExtractorError::Validation(
            "Filename contains invalid characters".to_string(),
        ));
    }
    if filename.chars().count() > MAX_FILENAME_LEN {
        return Err(ExtractorError::Validation(format!(
            "Filename cannot exceed {} characters",
            MAX_FILENAME_LEN
        )));
    }
    if !filename.contains('.') {
        return Err(ExtractorError::Validation(
            "Filename must include an extension (e.g., .csv, .json)".to_string(),
        ));
    }

    Ok(filename.to_string())
}

/// Parse an output format name (case-insensitive)
pub fn validate_format(format: &str) -> Result<OutputFormat> {
    format.parse()
}

/// Check that a batch size lies within `min..=max`
pub fn validate_batch_size(size: u32, min: u32, max: u32) -> Result<u32> {
    if size < min {
        return Err(ExtractorError::Validation(format!(
            "Batch size must be at least {}",
            min
        )));
    }
    if size > max {
        return Err(ExtractorError::Validation(format!(
            "Batch size cannot exceed {}",
            max
        )));
    }
    Ok(size)
}

/// Basic email address shape check
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Trim every field, check the PubMed id and drop an implausible email.
///
/// # Errors
///
/// Returns [`ExtractorError::Validation`] if the PubMed id is neither
/// numeric nor `"N/A"`.
pub fn sanitize_record(mut record: ArticleRecord) -> Result<ArticleRecord> {
    record.pubmed_id = record.pubmed_id.trim().to_string();
    record.title = record.title.trim().to_string();
    record.publication_date = record.publication_date.trim().to_string();
    record.corresponding_email = record.corresponding_email.trim().to_string();
    record.map_authors(|value| value.trim().to_string());

    let pmid = &record.pubmed_id;
    if pmid != NOT_AVAILABLE && (pmid.is_empty() || !pmid.chars().all(|c| c.is_ascii_digit())) {
        return Err(ExtractorError::Validation(format!(
            "Invalid PubMed ID format: {}",
            pmid
        )));
    }

    let email = &record.corresponding_email;
    if !email.is_empty() && email != NOT_AVAILABLE && !is_valid_email(email) {
        record.corresponding_email.clear();
    }

    Ok(record)
}
