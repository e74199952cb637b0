//! Result file writers (CSV and JSON).

use crate::error::{ExtractorError, Result};
use crate::record::ArticleRecord;
use crate::validation;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "" => Err(ExtractorError::Validation(
                "Output format cannot be empty".to_string(),
            )),
            other => Err(ExtractorError::Validation(format!(
                "Unsupported format '{}'. Supported formats: csv, json",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// What a write produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records written after sanitization
    pub written: usize,
    /// Records dropped by sanitization
    pub skipped: usize,
    /// Size of the file on disk, if one was written
    pub file_size: Option<u64>,
}

/// Writes article records to a file
#[derive(Debug, Clone)]
pub struct OutputWriter {
    path: PathBuf,
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Sanitize and write the records.
    ///
    /// For CSV nothing is written when no record survives sanitization; JSON
    /// always writes an array, possibly empty.
    pub fn write(&self, records: &[ArticleRecord]) -> Result<WriteSummary> {
        let mut valid = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match validation::sanitize_record(record.clone()) {
                Ok(record) => valid.push(record),
                Err(e) => warn!(index, error = %e, "Skipping invalid article"),
            }
        }
        let skipped = records.len() - valid.len();

        if valid.is_empty() && self.format == OutputFormat::Csv {
            info!(path = %self.path.display(), "No records to write");
            return Ok(WriteSummary {
                written: 0,
                skipped,
                file_size: None,
            });
        }

        self.prepare_parent()?;

        match self.format {
            OutputFormat::Csv => self.write_csv(&valid)?,
            OutputFormat::Json => self.write_json(&valid)?,
        }

        let file_size = std::fs::metadata(&self.path).ok().map(|m| m.len());
        info!(
            path = %self.path.display(),
            format = %self.format,
            written = valid.len(),
            skipped,
            "Results saved"
        );

        Ok(WriteSummary {
            written: valid.len(),
            skipped,
            file_size,
        })
    }

    fn prepare_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn write_csv(&self, records: &[ArticleRecord]) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        for record in records {
            wtr.serialize(record)?;
        }

        wtr.flush().map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), rows = records.len(), "CSV flushed");
        Ok(())
    }

    fn write_json(&self, records: &[ArticleRecord]) -> Result<()> {
        let file = File::create(&self.path).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer_pretty(&mut writer, records).map_err(|e| {
            ExtractorError::Output(format!("Failed to write JSON file: {}", e))
        })?;

        writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, e: std::io::Error) -> ExtractorError {
        let path = self.path.display();
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                ExtractorError::Output(format!("Permission denied writing to file: {}", path))
            }
            std::io::ErrorKind::NotFound => {
                ExtractorError::Output(format!("Directory not found for file: {}", path))
            }
            _ => ExtractorError::Output(format!("File system error for {}: {}", path, e)),
        }
    }
}

/// Read records back from a CSV file written by [`OutputWriter`].
///
/// # Errors
///
/// Returns [`ExtractorError::DataProcessing`] for a row that does not form a
/// valid record, including one whose author and affiliation cells split into
/// lists of different lengths.
pub fn read_csv(path: &Path) -> Result<Vec<ArticleRecord>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let records = rdr
        .deserialize()
        .collect::<std::result::Result<Vec<ArticleRecord>, csv::Error>>()
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Deserialize { .. } => ExtractorError::DataProcessing(format!(
                "Invalid record in {}: {}",
                path.display(),
                e
            )),
            _ => ExtractorError::from(e),
        })?;
    Ok(records)
}

/// Human-readable file size
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
