//! Error types for pharmaextract.
//!
//! Every failure is classified into one of a small set of categories so the
//! CLI can map it to a stable exit code.

use thiserror::Error;

/// Main error type for pharmaextract operations.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Bad user input (query, filename, format, batch size)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Connectivity problem or timeout talking to PubMed
    #[error("Network error: {0}")]
    Network(String),

    /// PubMed rejected the request or returned an error payload
    #[error("PubMed API error: {0}")]
    Api(String),

    /// Structural XML failure
    #[error("Data processing error: {0}")]
    DataProcessing(String),

    /// Filesystem, permission or encoding failure while writing results
    #[error("Output error: {0}")]
    Output(String),

    /// Invalid configuration file or client setup
    #[error("Config error: {0}")]
    Config(String),
}

impl ExtractorError {
    /// Process exit code reported by the CLI for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExtractorError::Validation(_) | ExtractorError::Config(_) => 2,
            ExtractorError::Network(_) => 3,
            ExtractorError::Api(_) => 4,
            ExtractorError::DataProcessing(_) => 5,
            ExtractorError::Output(_) => 6,
        }
    }

    /// Short hint shown to the user under the error message.
    pub fn hint(&self) -> &'static str {
        match self {
            ExtractorError::Validation(_) => "Check your query syntax and output filename",
            ExtractorError::Config(_) => "Check the keywords file and client options",
            ExtractorError::Network(_) => "Check your internet connection and try again",
            ExtractorError::Api(_) => "Try a different search query or check PubMed status",
            ExtractorError::DataProcessing(_) => "This might be a temporary issue with data format",
            ExtractorError::Output(_) => "Check file permissions and available disk space",
        }
    }
}

impl From<csv::Error> for ExtractorError {
    fn from(e: csv::Error) -> Self {
        ExtractorError::Output(format!("CSV error: {}", e))
    }
}

/// Result type alias using `ExtractorError`
pub type Result<T> = std::result::Result<T, ExtractorError>;
