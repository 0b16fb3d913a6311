//! Plain-text extraction from source documents

use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported document format: {extension}")]
    UnsupportedFormat { extension: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("pdftotext failed for {path}: {message}")]
    PdfTool { path: String, message: String },

    #[error("No text could be extracted from {path}")]
    EmptyDocument { path: String },
}

/// Pulls UTF-8 text out of a source document.
///
/// A failed document must not abort the ingestion batch; the index builder
/// skips it and continues.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extractor for the corpus formats the platform ingests: PDF via the
/// `pdftotext` system binary (poppler), plain text read directly.
#[derive(Debug, Default)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        let display = path.display().to_string();

        let output = Command::new("pdftotext")
            .arg("-enc")
            .arg("UTF-8")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| ExtractionError::PdfTool {
                path: display.clone(),
                message: format!("{} (is poppler installed?)", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::PdfTool {
                path: display,
                message: stderr.trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument { path: display });
        }

        tracing::debug!("pdftotext extracted {} characters from {}", text.len(), display);
        Ok(text)
    }

    fn extract_plain(&self, path: &Path) -> Result<String, ExtractionError> {
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ExtractionError::Io {
            path: display.clone(),
            source: e,
        })?;

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument { path: display });
        }
        Ok(text)
    }
}

impl TextExtractor for DocumentExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "pdf" => self.extract_pdf(path),
            "txt" | "md" => self.extract_plain(path),
            _ => Err(ExtractionError::UnsupportedFormat { extension }),
        }
    }
}
