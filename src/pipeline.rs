//! Search -> fetch -> parse orchestration.
//!
//! The source is passed in, so the same flow runs against [`PubMedClient`]
//! or any other [`LiteratureSource`].
//!
//! [`PubMedClient`]: crate::pubmed::PubMedClient

use crate::config::{DEFAULT_FETCH_LIMIT, MAX_FETCH_LIMIT};
use crate::error::Result;
use crate::parser;
use crate::pubmed::LiteratureSource;
use crate::record::ArticleRecord;
use crate::text::AffiliationClassifier;
use crate::validation;
use tracing::{debug, info};

/// How many articles to pull and in what page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound on articles requested from the source
    pub max_results: u32,
    /// Articles per fetch call
    pub batch_size: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_FETCH_LIMIT,
            batch_size: DEFAULT_FETCH_LIMIT,
        }
    }
}

/// Records plus the numbers reported to the user
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    pub records: Vec<ArticleRecord>,
    /// Matches reported by the search, if any
    pub total_found: Option<u64>,
    /// Articles actually requested across all fetch calls
    pub articles_requested: u32,
}

/// Search, fetch in pages and keep articles with non-academic authors.
///
/// Results are concatenated in fetch order. Stops once `max_results`
/// articles have been requested or the reported match count is exhausted.
pub async fn run<S: LiteratureSource>(
    source: &S,
    query: &str,
    options: &FetchOptions,
    classifier: &AffiliationClassifier,
) -> Result<PipelineOutcome> {
    let query = validation::validate_query(query)?;
    let max_results = validation::validate_batch_size(options.max_results, 1, MAX_FETCH_LIMIT)?;
    let batch_size = validation::validate_batch_size(options.batch_size, 1, MAX_FETCH_LIMIT)?;

    let session = source.search(&query).await?;

    let target = match session.count {
        Some(count) => max_results.min(u32::try_from(count).unwrap_or(u32::MAX)),
        None => max_results,
    };

    let mut outcome = PipelineOutcome {
        total_found: session.count,
        ..Default::default()
    };

    let mut offset = 0u32;
    while offset < target {
        let limit = batch_size.min(target - offset);
        debug!(offset, limit, "Fetching page");

        let xml = source.fetch(&session, offset, limit).await?;
        let records = parser::parse_articles(&xml, classifier)?;
        debug!(offset, kept = records.len(), "Parsed page");

        outcome.records.extend(records);
        offset += limit;
    }
    outcome.articles_requested = offset;

    info!(
        requested = outcome.articles_requested,
        kept = outcome.records.len(),
        "Pipeline complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;
    use crate::pubmed::SearchSession;
    use std::cell::RefCell;

    /// In-memory source that records fetch calls
    struct StubSource {
        count: Option<u64>,
        pages: RefCell<Vec<(u32, u32)>>,
    }

    impl StubSource {
        fn new(count: Option<u64>) -> Self {
            Self {
                count,
                pages: RefCell::new(Vec::new()),
            }
        }
    }

    impl LiteratureSource for StubSource {
        async fn search(&self, _query: &str) -> Result<SearchSession> {
            Ok(SearchSession {
                query_key: "1".to_string(),
                web_env: "ENV".to_string(),
                count: self.count,
            })
        }

        async fn fetch(&self, _session: &SearchSession, offset: u32, limit: u32) -> Result<String> {
            self.pages.borrow_mut().push((offset, limit));
            let articles: String = (offset..offset + limit)
                .map(|i| {
                    let affiliation = if i % 2 == 0 { "Pfizer Inc." } else { "Yale University" };
                    format!(
                        "<PubmedArticle><MedlineCitation><PMID>{}</PMID><Article>\
                         <ArticleTitle>T{}</ArticleTitle><AuthorList><Author>\
                         <LastName>L{}</LastName><AffiliationInfo><Affiliation>{}</Affiliation>\
                         </AffiliationInfo></Author></AuthorList></Article></MedlineCitation></PubmedArticle>",
                        1000 + i,
                        i,
                        i,
                        affiliation
                    )
                })
                .collect();
            Ok(format!("<PubmedArticleSet>{}</PubmedArticleSet>", articles))
        }
    }

    #[tokio::test]
    async fn test_pages_until_max_results() -> Result<()> {
        let source = StubSource::new(Some(1000));
        let options = FetchOptions {
            max_results: 25,
            batch_size: 10,
        };

        let outcome = run(&source, "cancer", &options, &AffiliationClassifier::default()).await?;

        assert_eq!(*source.pages.borrow(), vec![(0, 10), (10, 10), (20, 5)]);
        assert_eq!(outcome.articles_requested, 25);
        assert_eq!(outcome.total_found, Some(1000));
        // even indices are company authors
        assert_eq!(outcome.records.len(), 13);
        assert_eq!(outcome.records[0].pubmed_id, "1000");
        assert_eq!(outcome.records[1].pubmed_id, "1002");
        Ok(())
    }

    #[tokio::test]
    async fn test_stops_at_reported_count() -> Result<()> {
        let source = StubSource::new(Some(3));
        let outcome = run(
            &source,
            "rare disease",
            &FetchOptions::default(),
            &AffiliationClassifier::default(),
        )
        .await?;

        assert_eq!(*source.pages.borrow(), vec![(0, 3)]);
        assert_eq!(outcome.records.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_zero_matches_skips_fetch() -> Result<()> {
        let source = StubSource::new(Some(0));
        let outcome = run(
            &source,
            "nothing",
            &FetchOptions::default(),
            &AffiliationClassifier::default(),
        )
        .await?;

        assert!(source.pages.borrow().is_empty());
        assert!(outcome.records.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_query_rejected_before_search() {
        let source = StubSource::new(Some(10));
        let result = run(
            &source,
            "x",
            &FetchOptions::default(),
            &AffiliationClassifier::default(),
        )
        .await;
        assert!(matches!(result, Err(ExtractorError::Validation(_))));
        assert!(source.pages.borrow().is_empty());
    }
}
