//! Extracted record types.

use crate::config::MULTI_VALUE_SEPARATOR;
use crate::text::NOT_AVAILABLE;
use serde::{Deserialize, Serialize, Serializer};

/// One author as seen during extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorAffiliation {
    /// "ForeName LastName", or whichever part is present
    pub full_name: String,
    /// First consulted affiliation text, trimmed; empty if absent
    pub affiliation: String,
    /// Non-empty consulted affiliation texts in document order
    pub affiliations: Vec<String>,
    /// First email embedded in the consulted affiliations
    pub email: Option<String>,
}

/// An article with at least one non-academic author.
///
/// Field names match the output columns exactly. The author and affiliation
/// lists are index-aligned and serialized as `"; "`-joined strings.
///
/// Reading a record back splits both cells on `"; "` and requires the two
/// lists to have the same length. A name or affiliation that itself contains
/// `"; "` (for example `"Pfizer Inc.; Groton, CT"`) is written as is but
/// cannot be read back: deserialization fails with a length mismatch instead
/// of returning misaligned lists. A nameless author is written as an empty
/// slot and reads back as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRow")]
pub struct ArticleRecord {
    #[serde(rename = "PubmedID")]
    pub pubmed_id: String,

    #[serde(rename = "Title")]
    pub title: String,

    #[serde(rename = "Publication Date")]
    pub publication_date: String,

    #[serde(rename = "Non-academicAuthor(s)", serialize_with = "join_values")]
    non_academic_authors: Vec<String>,

    #[serde(rename = "CompanyAffiliation(s)", serialize_with = "join_values")]
    company_affiliations: Vec<String>,

    #[serde(rename = "Corresponding Author Email")]
    pub corresponding_email: String,
}

/// Flat form of a record as it appears in a CSV row or JSON object
#[derive(Deserialize)]
struct RecordRow {
    #[serde(rename = "PubmedID")]
    pubmed_id: String,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Publication Date", default)]
    publication_date: String,
    #[serde(rename = "Non-academicAuthor(s)", default)]
    non_academic_authors: String,
    #[serde(rename = "CompanyAffiliation(s)", default)]
    company_affiliations: String,
    #[serde(rename = "Corresponding Author Email", default)]
    corresponding_email: String,
}

impl TryFrom<RecordRow> for ArticleRecord {
    type Error = String;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let (authors, affiliations) =
            if row.non_academic_authors.is_empty() && row.company_affiliations.is_empty() {
                (Vec::new(), Vec::new())
            } else {
                (
                    split_values(&row.non_academic_authors),
                    split_values(&row.company_affiliations),
                )
            };

        if authors.len() != affiliations.len() {
            return Err(format!(
                "PubmedID {}: {} author(s) but {} affiliation(s) after splitting on {:?}",
                row.pubmed_id,
                authors.len(),
                affiliations.len(),
                MULTI_VALUE_SEPARATOR
            ));
        }

        Ok(Self {
            pubmed_id: row.pubmed_id,
            title: row.title,
            publication_date: row.publication_date,
            non_academic_authors: authors,
            company_affiliations: affiliations,
            corresponding_email: row.corresponding_email,
        })
    }
}

impl ArticleRecord {
    pub fn new(
        pubmed_id: impl Into<String>,
        title: impl Into<String>,
        publication_date: impl Into<String>,
    ) -> Self {
        Self {
            pubmed_id: pubmed_id.into(),
            title: title.into(),
            publication_date: publication_date.into(),
            non_academic_authors: Vec::new(),
            company_affiliations: Vec::new(),
            corresponding_email: String::new(),
        }
    }

    /// Append a non-academic author and their affiliation
    pub fn push_non_academic(&mut self, name: impl Into<String>, affiliation: impl Into<String>) {
        self.non_academic_authors.push(name.into());
        self.company_affiliations.push(affiliation.into());
    }

    pub fn non_academic_authors(&self) -> &[String] {
        &self.non_academic_authors
    }

    pub fn company_affiliations(&self) -> &[String] {
        &self.company_affiliations
    }

    pub fn has_non_academic_authors(&self) -> bool {
        !self.non_academic_authors.is_empty()
    }

    /// Map each value list through `f`, keeping the lists aligned
    pub(crate) fn map_authors<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for name in &mut self.non_academic_authors {
            *name = f(name);
        }
        for affiliation in &mut self.company_affiliations {
            *affiliation = f(affiliation);
        }
    }
}

impl Default for ArticleRecord {
    fn default() -> Self {
        Self::new(NOT_AVAILABLE, NOT_AVAILABLE, "")
    }
}

fn join_values<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&values.join(MULTI_VALUE_SEPARATOR))
}

fn split_values(joined: &str) -> Vec<String> {
    joined
        .split(MULTI_VALUE_SEPARATOR)
        .map(str::to_string)
        .collect()
}
