//! # pharmaextract
//!
//! Find PubMed papers with pharmaceutical/biotech (non-academic) authors.
//!
//! ## Modules
//!
//! - [`parser`] - EFetch XML to [`ArticleRecord`]s, keeping only articles with company authors
//! - [`text`] - affiliation classifier and email extraction heuristics
//! - [`pubmed`] - E-utilities client with retry/backoff
//! - [`pipeline`] - search, paged fetch and parse
//! - [`output`] - CSV / JSON writers
//! - [`validation`] - user input checks and record sanitization
//! - [`error`] - error taxonomy and exit codes
//!
//! ## Usage
//!
//! ```rust
//! use pharmaextract::{parser, AffiliationClassifier};
//!
//! let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
//!   <PMID>1</PMID><Article><ArticleTitle>Trial</ArticleTitle><AuthorList>
//!   <Author><LastName>Doe</LastName><ForeName>Jane</ForeName>
//!   <AffiliationInfo><Affiliation>Pfizer Inc. jane.doe@pfizer.com</Affiliation></AffiliationInfo>
//!   </Author></AuthorList></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
//!
//! let records = parser::parse_articles(xml, &AffiliationClassifier::default())?;
//! assert_eq!(records[0].non_academic_authors(), &["Jane Doe".to_string()]);
//! assert_eq!(records[0].corresponding_email, "jane.doe@pfizer.com");
//! # Ok::<(), pharmaextract::ExtractorError>(())
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod pubmed;
pub mod record;
pub mod text;
pub mod validation;
pub mod xml;

pub use config::ClassifierConfig;
pub use error::{ExtractorError, Result};
pub use record::ArticleRecord;
pub use text::AffiliationClassifier;
