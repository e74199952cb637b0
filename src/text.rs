//! Text heuristics applied to PubMed author data.
//!
//! - [`AffiliationClassifier`] decides whether an affiliation is academic
//! - [`extract_email`] mines an email address out of affiliation text
//! - [`clean_title`] and [`format_publication_date`] normalize article fields

use crate::config::ClassifierConfig;
use serde::Serialize;

/// Characters stripped from both ends of an email token
const EMAIL_TRIM_CHARS: &[char] = &[';', '.', ',', '(', ')', '<', '>'];

/// Sentinel for missing identifiers and titles
pub const NOT_AVAILABLE: &str = "N/A";

/// Binary affiliation class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Affiliation {
    Academic,
    NonAcademic,
}

/// Keyword-based affiliation classifier.
///
/// An affiliation is academic when its lower-cased text contains any keyword
/// as a substring. Matching is not whole-word: "XYZ Research Institute Inc."
/// is academic.
#[derive(Debug, Clone)]
pub struct AffiliationClassifier {
    keywords: Vec<String>,
    all_affiliations: bool,
}

impl AffiliationClassifier {
    /// Create a classifier over the given keywords
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keywords,
            all_affiliations: false,
        }
    }

    /// Build a classifier from loaded configuration
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(&config.academic_keywords).with_all_affiliations(config.all_affiliations)
    }

    /// Consult every affiliation of an author, not only the first
    pub fn with_all_affiliations(mut self, enabled: bool) -> Self {
        self.all_affiliations = enabled;
        self
    }

    pub fn all_affiliations(&self) -> bool {
        self.all_affiliations
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Classify a non-blank affiliation string.
    ///
    /// Blank text is not classifiable and must be filtered out by the caller;
    /// debug builds panic on it. Use
    /// [`classify_nonempty`](Self::classify_nonempty) when the input may be blank.
    pub fn classify(&self, affiliation: &str) -> Affiliation {
        debug_assert!(
            !affiliation.trim().is_empty(),
            "classify called with a blank affiliation"
        );
        let lowered = affiliation.to_lowercase();
        if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
            Affiliation::Academic
        } else {
            Affiliation::NonAcademic
        }
    }

    /// Classify, returning `None` for blank text
    pub fn classify_nonempty(&self, affiliation: &str) -> Option<Affiliation> {
        if affiliation.trim().is_empty() {
            None
        } else {
            Some(self.classify(affiliation))
        }
    }

    /// `false` for blank text
    pub fn is_academic(&self, affiliation: &str) -> bool {
        self.classify_nonempty(affiliation) == Some(Affiliation::Academic)
    }
}

impl Default for AffiliationClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

/// Extract the first email-looking token from affiliation text.
///
/// Returns an empty string when nothing is found. No syntax validation is
/// done here; see [`crate::validation::is_valid_email`].
pub fn extract_email(text: &str) -> String {
    text.split_whitespace()
        .find(|word| word.contains('@') && word.contains('.'))
        .map(|word| word.trim_matches(EMAIL_TRIM_CHARS).to_string())
        .unwrap_or_default()
}

/// Trim a title, falling back to `"N/A"` when absent or blank
pub fn clean_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Join the present date components with `-`.
///
/// `("2020", "05", "")` gives `"2020-05"`; all empty gives `""`.
pub fn format_publication_date(year: &str, month: &str, day: &str) -> String {
    [year, month, day]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
