//! Constants and loadable configuration.

use crate::error::{ExtractorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// NCBI E-utilities base URL
pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/";

/// Tool name reported to NCBI
pub const TOOL_NAME: &str = "pharma-research-extractor";

/// Number of ids the search call asks NCBI to return alongside the history session
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Default number of articles fetched per efetch call
pub const DEFAULT_FETCH_LIMIT: u32 = 50;

/// Largest retmax NCBI accepts for a single call
pub const MAX_FETCH_LIMIT: u32 = 10_000;

/// Keywords identifying academic institutions.
pub const ACADEMIC_KEYWORDS: &[&str] = &[
    "school", "university", "college", "institute", "department", "faculty",
    "academy", "center", "centre", "hospital", "medical", "clinic", "grad",
    "postdoc", "fellow", "professor", "lecturer", "phd", "student", "library",
    "conservatory", "polytechnic", "laboratory", "lab",
];

/// Output column order
pub const CSV_FIELDNAMES: &[&str] = &[
    "PubmedID",
    "Title",
    "Publication Date",
    "Non-academicAuthor(s)",
    "CompanyAffiliation(s)",
    "Corresponding Author Email",
];

/// Separator used for multi-valued output fields
pub const MULTI_VALUE_SEPARATOR: &str = "; ";

/// Affiliation classification settings.
///
/// Can be loaded from a JSON file such as:
///
/// ```json
/// { "academic_keywords": ["university", "hospital"], "all_affiliations": false }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Substrings that mark an affiliation as academic (case-insensitive)
    pub academic_keywords: Vec<String>,
    /// Consult every affiliation of an author instead of only the first
    pub all_affiliations: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            academic_keywords: ACADEMIC_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            all_affiliations: false,
        }
    }
}

impl ClassifierConfig {
    /// Load a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: ClassifierConfig = serde_json::from_str(&content).map_err(|e| {
            ExtractorError::Config(format!("Invalid keywords file {}: {}", path.display(), e))
        })?;

        if config.academic_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ExtractorError::Config(format!(
                "Keywords file {} defines no academic keywords",
                path.display()
            )));
        }

        info!(
            path = %path.display(),
            keywords = config.academic_keywords.len(),
            "Loaded classifier config"
        );
        debug!(keywords = ?config.academic_keywords, "Academic keywords");
        Ok(config)
    }
}
