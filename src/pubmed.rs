//! PubMed E-utilities client.
//!
//! Uses the history server: `esearch` stores the result set and returns a
//! `QueryKey`/`WebEnv` pair, `efetch` then pages through it as XML.
//!
//! Timeouts, connection failures, HTTP 429 and 5xx responses are retried
//! with exponential backoff. Other 4xx responses fail immediately.

use crate::config::{DEFAULT_SEARCH_LIMIT, EUTILS_BASE_URL, TOOL_NAME};
use crate::error::{ExtractorError, Result};
use crate::xml;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Session identifiers returned by a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSession {
    pub query_key: String,
    pub web_env: String,
    /// Total number of matching articles, when reported
    pub count: Option<u64>,
}

/// Source of raw article XML.
///
/// Implemented by [`PubMedClient`]; tests and alternative backends can
/// supply their own.
#[allow(async_fn_in_trait)]
pub trait LiteratureSource {
    /// Run a search and return the session identifiers for later fetches
    async fn search(&self, query: &str) -> Result<SearchSession>;

    /// Fetch `limit` articles starting at `offset` as raw EFetch XML
    async fn fetch(&self, session: &SearchSession, offset: u32, limit: u32) -> Result<String>;
}

/// Client settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// E-utilities base URL
    pub base_url: String,
    /// Tool name sent with every request
    pub tool: String,
    /// Contact email NCBI asks clients to provide
    pub email: Option<String>,
    /// NCBI API key for higher rate limits
    pub api_key: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts per request
    pub max_retries: u32,
    /// Delay before the first retry, doubled after each one
    pub initial_backoff: Duration,
    /// `retmax` sent with the search call
    pub search_limit: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: EUTILS_BASE_URL.to_string(),
            tool: TOOL_NAME.to_string(),
            email: None,
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

/// Outcome of a single failed attempt
enum Failure {
    /// Worth retrying; `factor` scales the current backoff
    Retry { error: ExtractorError, factor: u32 },
    Fatal(ExtractorError),
}

/// PubMed E-utilities client with retry and backoff
pub struct PubMedClient {
    client: reqwest::Client,
    config: ClientConfig,
    search_url: Url,
    fetch_url: Url,
}

impl PubMedClient {
    /// Create a new PubMedClient
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", config.tool, env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| ExtractorError::Config(format!("Invalid base URL '{}': {}", base, e)))?;
        let endpoint = |name: &str| {
            base.join(name)
                .map_err(|e| ExtractorError::Config(format!("Invalid endpoint {}: {}", name, e)))
        };

        Ok(Self {
            search_url: endpoint("esearch.fcgi")?,
            fetch_url: endpoint("efetch.fcgi")?,
            client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn common_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("retmode", "xml".to_string()),
            ("tool", self.config.tool.clone()),
        ];
        if let Some(email) = &self.config.email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.config.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// GET with retry and exponential backoff, returning the body text
    async fn get_with_retry(&self, url: &Url, params: &[(&'static str, String)]) -> Result<String> {
        let attempts = self.config.max_retries.max(1);
        let mut backoff = self.config.initial_backoff;

        for attempt in 1..=attempts {
            match self.get_once(url, params).await {
                Ok(body) => return Ok(body),
                Err(Failure::Fatal(error)) => return Err(error),
                Err(Failure::Retry { error, .. }) if attempt == attempts => {
                    warn!(attempts, error = %error, "Giving up after retries");
                    return Err(error);
                }
                Err(Failure::Retry { error, factor }) => {
                    let jitter = Duration::from_millis(rand::random::<u64>() % 100);
                    let wait = backoff * factor + jitter;
                    warn!(
                        endpoint = url.path(),
                        attempt,
                        attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    backoff *= 2;
                }
            }
        }

        Err(ExtractorError::Api("Maximum retries exceeded".to_string()))
    }

    async fn get_once(
        &self,
        url: &Url,
        params: &[(&'static str, String)],
    ) -> std::result::Result<String, Failure> {
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Failure::Retry {
                error: ExtractorError::Api("Rate limit exceeded after multiple retries".to_string()),
                factor: 2,
            });
        }
        if status.is_server_error() {
            return Err(Failure::Retry {
                error: ExtractorError::Api(format!("Server error: {}", status)),
                factor: 1,
            });
        }
        if !status.is_success() {
            return Err(Failure::Fatal(ExtractorError::Api(format!(
                "HTTP error {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown")
            ))));
        }

        response.text().await.map_err(classify_request_error)
    }
}

fn classify_request_error(e: reqwest::Error) -> Failure {
    if e.is_timeout() {
        Failure::Retry {
            error: ExtractorError::Network("Request timeout after multiple retries".to_string()),
            factor: 1,
        }
    } else if e.is_connect() {
        Failure::Retry {
            error: ExtractorError::Network(format!("Network connection failed: {}", e)),
            factor: 1,
        }
    } else {
        Failure::Fatal(ExtractorError::Network(format!("Request failed: {}", e)))
    }
}

impl LiteratureSource for PubMedClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<SearchSession> {
        let mut params = self.common_params();
        params.push(("term", query.to_string()));
        params.push(("usehistory", "y".to_string()));
        params.push(("retmax", self.config.search_limit.to_string()));

        let body = self.get_with_retry(&self.search_url, &params).await?;
        let session = parse_search_response(&body)?;

        info!(
            count = ?session.count,
            query_key = %session.query_key,
            "PubMed search complete"
        );
        Ok(session)
    }

    #[instrument(skip(self, session), fields(query_key = %session.query_key))]
    async fn fetch(&self, session: &SearchSession, offset: u32, limit: u32) -> Result<String> {
        let mut params = self.common_params();
        params.push(("query_key", session.query_key.clone()));
        params.push(("WebEnv", session.web_env.clone()));
        params.push(("retstart", offset.to_string()));
        params.push(("retmax", limit.to_string()));

        let body = self.get_with_retry(&self.fetch_url, &params).await?;
        if body.trim().is_empty() {
            return Err(ExtractorError::Api("Empty response from PubMed API".to_string()));
        }

        debug!(bytes = body.len(), "Fetched article batch");
        Ok(body)
    }
}

/// Extract session identifiers from an ESearch XML response
pub fn parse_search_response(body: &str) -> Result<SearchSession> {
    if body.trim().is_empty() {
        return Err(ExtractorError::Api("Empty response from PubMed API".to_string()));
    }

    let root = xml::parse_document(body)?;

    if let Some(message) = root.child_text("ERROR").filter(|m| !m.is_empty()) {
        return Err(ExtractorError::Api(format!("PubMed returned an error: {}", message)));
    }

    if let Some(error_list) = root.find("ErrorList") {
        let phrases: Vec<String> = error_list
            .find_all("PhraseNotFound")
            .map(|p| p.text().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        if !phrases.is_empty() {
            return Err(ExtractorError::Api(format!(
                "PubMed query errors: {}",
                phrases.join("; ")
            )));
        }
    }

    let query_key = root.child_text("QueryKey").filter(|k| !k.is_empty());
    let web_env = root.child_text("WebEnv").filter(|w| !w.is_empty());
    let (Some(query_key), Some(web_env)) = (query_key, web_env) else {
        return Err(ExtractorError::Api(
            "Missing QueryKey or WebEnv in API response".to_string(),
        ));
    };

    let count = root.child_text("Count").and_then(|c| c.parse().ok());

    Ok(SearchSession {
        query_key,
        web_env,
        count,
    })
}
