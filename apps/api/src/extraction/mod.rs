//! Resume text extraction.
//!
//! Uploaded bytes are spilled to a unique temp file inside the upload dir, the
//! page loader reads it back, and the pages are joined in loader order with no
//! separator. The temp file guard is dropped on every exit path, so nothing is
//! left behind even when the loader fails or panics.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("I/O error while staging upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF extraction aborted: {0}")]
    Aborted(String),
}

/// Splits a document on disk into the text of its pages, in reading order.
pub trait PageLoader: Send + Sync {
    fn load_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// Page loader backed by `pdf-extract`'s per-page text output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageLoader;

impl PageLoader for PdfPageLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| ExtractionError::Parse(format!("Failed to load PDF: {e}")))?;

        // The text backend frames every page with line breaks; pages join with no separator.
        Ok(pages
            .into_iter()
            .map(|page| strip_page_breaks(&page).to_string())
            .collect())
    }
}

fn strip_page_breaks(page: &str) -> &str {
    page.trim_matches(|c: char| c == '\n' || c == '\r')
}

#[derive(Clone)]
pub struct ResumeExtractor {
    upload_dir: PathBuf,
    loader: Arc<dyn PageLoader>,
}

impl ResumeExtractor {
    pub fn new(upload_dir: impl Into<PathBuf>, loader: Arc<dyn PageLoader>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            loader,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Extracts the full text of an uploaded PDF on the blocking pool.
    pub async fn extract(&self, data: Bytes) -> Result<String, ExtractionError> {
        let upload_dir = self.upload_dir.clone();
        let loader = Arc::clone(&self.loader);

        tokio::task::spawn_blocking(move || stage_and_load(&upload_dir, loader.as_ref(), &data))
            .await
            .map_err(|e| {
                if e.is_panic() {
                    ExtractionError::Aborted("PDF loader panicked".to_string())
                } else {
                    ExtractionError::Aborted(e.to_string())
                }
            })?
    }
}

fn stage_and_load(
    upload_dir: &Path,
    loader: &dyn PageLoader,
    data: &[u8],
) -> Result<String, ExtractionError> {
    let mut staged = tempfile::Builder::new()
        .prefix("resume-")
        .suffix(".pdf")
        .tempfile_in(upload_dir)?;
    staged.write_all(data)?;
    staged.flush()?;

    let pages = loader.load_pages(staged.path())?;
    debug!(
        "Extracted {} page(s) from {}",
        pages.len(),
        staged.path().display()
    );

    Ok(pages.concat())
}
