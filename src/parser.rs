//! PubMed EFetch XML parsing.
//!
//! [`parse_articles`] walks every `<PubmedArticle>` in a response and keeps the
//! ones with at least one non-academic author. [`extract_article`] builds the
//! record for a single article.
//!
//! Author handling:
//!
//! - only the first `AffiliationInfo/Affiliation` of an author is consulted
//!   unless the classifier is built with `all_affiliations`
//! - the corresponding email is the first one found across authors with an
//!   affiliation, whether or not that author is academic

use crate::error::{ExtractorError, Result};
use crate::record::{ArticleRecord, AuthorAffiliation};
use crate::text::{self, Affiliation, AffiliationClassifier, NOT_AVAILABLE};
use crate::xml::{self, Element};
use tracing::{debug, instrument, warn};

const ARTICLE_TAG: &str = "PubmedArticle";
const ARTICLE_SET_TAG: &str = "PubmedArticleSet";

/// Parse an EFetch response and return articles with non-academic authors.
///
/// Articles whose text cannot be decoded are logged and skipped.
///
/// # Errors
///
/// Returns [`ExtractorError::DataProcessing`] if the document is not
/// well-formed XML, and [`ExtractorError::Api`] if it is an error payload
/// (such as `<eFetchResult><ERROR>...</ERROR></eFetchResult>` for an expired
/// `WebEnv`) or any other document that is not an article set.
#[instrument(skip(xml, classifier), fields(xml_size = xml.len()))]
pub fn parse_articles(xml: &str, classifier: &AffiliationClassifier) -> Result<Vec<ArticleRecord>> {
    let root = xml::parse_document(xml)?;
    check_root(&root)?;

    let mut total = 0usize;
    let mut records = Vec::new();

    for (index, article) in articles(&root).enumerate() {
        total += 1;

        if let Some(reason) = article.first_invalid() {
            let pmid = article.find_text("PMID").unwrap_or_default();
            warn!(index, pmid = %pmid, error = reason, "Failed to decode article, skipping");
            continue;
        }

        let record = extract_article(article, classifier);
        if record.has_non_academic_authors() {
            records.push(record);
        } else {
            debug!(pmid = %record.pubmed_id, "No non-academic authors");
        }
    }

    debug!(total, kept = records.len(), "Parsed article batch");
    Ok(records)
}

fn check_root(root: &Element) -> Result<()> {
    if let Some(message) = root.child_text("ERROR").filter(|m| !m.is_empty()) {
        return Err(ExtractorError::Api(format!(
            "PubMed returned an error: {}",
            message
        )));
    }
    if root.name() != ARTICLE_SET_TAG && root.name() != ARTICLE_TAG {
        return Err(ExtractorError::Api(format!(
            "Unexpected EFetch response root <{}>",
            root.name()
        )));
    }
    Ok(())
}

/// `<PubmedArticle>` elements in document order, including the root itself
fn articles(root: &Element) -> Box<dyn Iterator<Item = &Element> + '_> {
    if root.name() == ARTICLE_TAG {
        Box::new(std::iter::once(root))
    } else {
        Box::new(root.find_all(ARTICLE_TAG))
    }
}

/// Build the record candidate for one `<PubmedArticle>` element.
///
/// The result may have no non-academic authors; [`parse_articles`] filters
/// those out.
pub fn extract_article(article: &Element, classifier: &AffiliationClassifier) -> ArticleRecord {
    let pubmed_id = article
        .find_text("PMID")
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let title = text::clean_title(article.find_text("ArticleTitle").as_deref());
    let publication_date = extract_publication_date(article);

    let mut record = ArticleRecord::new(pubmed_id, title, publication_date);

    for author in article.find_all("Author") {
        let author = extract_author(author, classifier.all_affiliations());
        if author.affiliation.is_empty() {
            continue;
        }

        if record.corresponding_email.is_empty() {
            if let Some(email) = &author.email {
                record.corresponding_email = email.clone();
            }
        }

        if let Some(affiliation) = company_affiliation(&author, classifier) {
            record.push_non_academic(author.full_name, affiliation);
        }
    }

    record
}

/// Name, affiliations and embedded email of one `<Author>`.
///
/// By default only the first affiliation node is consulted, even when its
/// text is empty. With `all_affiliations` every non-empty affiliation is.
pub fn extract_author(author: &Element, all_affiliations: bool) -> AuthorAffiliation {
    let fore = author.child_text("ForeName").unwrap_or_default();
    let last = author.child_text("LastName").unwrap_or_default();
    let full_name = format!("{} {}", fore, last).trim().to_string();

    let mut affiliations: Vec<String> = author
        .find_all("AffiliationInfo")
        .flat_map(|info| info.children_named("Affiliation"))
        .map(|affil| affil.text().trim().to_string())
        .collect();

    if all_affiliations {
        affiliations.retain(|a| !a.is_empty());
    } else {
        affiliations.truncate(1);
    }

    let affiliation = affiliations.first().cloned().unwrap_or_default();
    let email = affiliations
        .iter()
        .map(|a| text::extract_email(a))
        .find(|e| !e.is_empty());
    affiliations.retain(|a| !a.is_empty());

    AuthorAffiliation {
        full_name,
        affiliation,
        affiliations,
        email,
    }
}

/// The affiliation to report if the author is non-academic
fn company_affiliation(
    author: &AuthorAffiliation,
    classifier: &AffiliationClassifier,
) -> Option<String> {
    author
        .affiliations
        .iter()
        .find(|a| classifier.classify_nonempty(a) == Some(Affiliation::NonAcademic))
        .cloned()
}

fn extract_publication_date(article: &Element) -> String {
    match article.find("PubDate") {
        Some(pub_date) => {
            let part = |name: &str| pub_date.child_text(name).unwrap_or_default();
            text::format_publication_date(&part("Year"), &part("Month"), &part("Day"))
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractorError;

    fn author(fore: &str, last: &str, affiliations: &[&str]) -> String {
        let infos: String = affiliations
            .iter()
            .map(|a| format!("<AffiliationInfo><Affiliation>{}</Affiliation></AffiliationInfo>", a))
            .collect();
        format!(
            "<Author><LastName>{}</LastName><ForeName>{}</ForeName>{}</Author>",
            last, fore, infos
        )
    }

    fn article(pmid: &str, authors: &[String]) -> String {
        format!(
            r#"<PubmedArticle>
    <MedlineCitation>
        <PMID Version="1">{}</PMID>
        <Article>
            <Journal>
                <JournalIssue>
                    <PubDate><Year>2023</Year><Month>Mar</Month><Day>07</Day></PubDate>
                </JournalIssue>
            </Journal>
            <ArticleTitle>Industry trial {}</ArticleTitle>
            <AuthorList>{}</AuthorList>
        </Article>
    </MedlineCitation>
</PubmedArticle>"#,
            pmid,
            pmid,
            authors.concat()
        )
    }

    fn article_set(articles: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\" ?>\n<PubmedArticleSet>\n{}\n</PubmedArticleSet>",
            articles.concat()
        )
    }

    fn parse(xml: &str) -> Vec<ArticleRecord> {
        parse_articles(xml, &AffiliationClassifier::default()).expect("parse failed")
    }

    #[test]
    fn test_mixed_authors_keeps_only_company() {
        let xml = article_set(&[article(
            "111",
            &[
                author("John", "Harvard", &["Harvard University, Boston"]),
                author("Pat", "Smith", &["Pfizer Inc., New York"]),
            ],
        )]);

        let records = parse(&xml);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.pubmed_id, "111");
        assert_eq!(record.title, "Industry trial 111");
        assert_eq!(record.publication_date, "2023-Mar-07");
        assert_eq!(record.non_academic_authors(), &["Pat Smith".to_string()]);
        assert_eq!(record.company_affiliations(), &["Pfizer Inc., New York".to_string()]);
    }

    #[test]
    fn test_academic_only_article_is_dropped() {
        let xml = article_set(&[
            article(
                "1",
                &[
                    author("A", "One", &["Stanford University"]),
                    author("B", "Two", &[]),
                ],
            ),
            article("2", &[author("C", "Three", &["Roche Diagnostics GmbH"])]),
        ]);

        let records = parse(&xml);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pubmed_id, "2");
    }

    #[test]
    fn test_email_from_first_author_regardless_of_class() {
        let xml = article_set(&[article(
            "5",
            &[
                author("No", "Affil", &[]),
                author("Aca", "Demic", &["Dept of Biology, Yale University. aca@yale.edu"]),
                author("Com", "Pany", &["Merck & Co., Rahway, NJ. com@merck.com"]),
            ],
        )
        .replace("Merck & Co.", "Merck &amp; Co.")]);

        let records = parse(&xml);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].corresponding_email, "aca@yale.edu");
        assert_eq!(
            records[0].company_affiliations(),
            &["Merck & Co., Rahway, NJ. com@merck.com".to_string()]
        );
    }

    #[test]
    fn test_only_first_affiliation_consulted() {
        let xml = article_set(&[article(
            "9",
            &[author(
                "Dual",
                "Role",
                &["Harvard Medical School", "Moderna Inc. dual@modernatx.com"],
            )],
        )]);

        assert!(parse(&xml).is_empty());

        let classifier = AffiliationClassifier::default().with_all_affiliations(true);
        let records = parse_articles(&xml, &classifier).expect("parse failed");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].company_affiliations(),
            &["Moderna Inc. dual@modernatx.com".to_string()]
        );
        assert_eq!(records[0].corresponding_email, "dual@modernatx.com");
    }

    #[test]
    fn test_missing_fields_use_sentinels() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation><Article>
            <AuthorList><Author><LastName>Solo</LastName>
            <AffiliationInfo><Affiliation>  BioNTech SE  </Affiliation></AffiliationInfo>
            </Author></AuthorList></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;

        let records = parse(xml);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.pubmed_id, "N/A");
        assert_eq!(record.title, "N/A");
        assert_eq!(record.publication_date, "");
        assert_eq!(record.non_academic_authors(), &["Solo".to_string()]);
        assert_eq!(record.company_affiliations(), &["BioNTech SE".to_string()]);
        assert_eq!(record.corresponding_email, "");
    }

    #[test]
    fn test_partial_publication_date() {
        let xml = article_set(&[article("3", &[author("X", "Y", &["Amgen Inc."])])])
            .replace("<Month>Mar</Month><Day>07</Day>", "");
        assert_eq!(parse(&xml)[0].publication_date, "2023");
    }

    #[test]
    fn test_title_with_inline_markup() {
        let xml = article_set(&[article("4", &[author("X", "Y", &["Sanofi"])])])
            .replace("Industry trial 4", "Effect of <i>E. coli</i> on H<sub>2</sub>O");
        assert_eq!(parse(&xml)[0].title, "Effect of E. coli on H2O");
    }

    #[test]
    fn test_empty_set() {
        assert!(parse("<?xml version=\"1.0\" ?>\n<PubmedArticleSet>\n</PubmedArticleSet>").is_empty());
        assert!(parse("<PubmedArticleSet/>").is_empty());
    }

    #[test]
    fn test_malformed_xml_is_error() {
        let result = parse_articles(
            "<PubmedArticleSet><PubmedArticle></PubmedArticleSet>",
            &AffiliationClassifier::default(),
        );
        assert!(matches!(result, Err(ExtractorError::DataProcessing(_))));
    }

    #[test]
    fn test_error_payload_is_api_error() {
        let result = parse_articles(
            "<eFetchResult><ERROR>Unable to obtain query #1</ERROR></eFetchResult>",
            &AffiliationClassifier::default(),
        );
        assert!(matches!(
            result,
            Err(ExtractorError::Api(msg)) if msg.contains("Unable to obtain query #1")
        ));
    }

    #[test]
    fn test_unexpected_root_is_api_error() {
        let result = parse_articles("<eSearchResult/>", &AffiliationClassifier::default());
        assert!(matches!(result, Err(ExtractorError::Api(msg)) if msg.contains("eSearchResult")));
    }

    #[test]
    fn test_single_article_root() {
        let xml = article("9", &[author("Solo", "Root", &["Moderna Inc."])]);
        assert_eq!(parse(&xml)[0].pubmed_id, "9");
    }

    #[test]
    fn test_undecodable_article_is_skipped() {
        let bad = article("7", &[author("Bad", "Entity", &["Acme &nosuch; Corp"])]);
        let good = article("8", &[author("Good", "Author", &["GSK plc, London"])]);
        let records = parse(&article_set(&[bad, good]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pubmed_id, "8");
    }

    #[test]
    fn test_document_order_preserved() {
        let xml = article_set(&[
            article("30", &[author("A", "A", &["Bayer AG"])]),
            article("10", &[author("B", "B", &["Lilly Corp"]), author("C", "C", &["AbbVie"])]),
        ]);
        let records = parse(&xml);
        let ids: Vec<&str> = records.iter().map(|r| r.pubmed_id.as_str()).collect();
        assert_eq!(ids, vec!["30", "10"]);
        assert_eq!(
            records[1].non_academic_authors(),
            &["B B".to_string(), "C C".to_string()]
        );
    }

    #[test]
    fn test_same_input_same_output() {
        let xml = article_set(&[article("12", &[author("P", "Q", &["Biogen"])])]);
        assert_eq!(parse(&xml), parse(&xml));
    }
}
