// Document loading
// Extracts plain text from uploaded PDF and text files


use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use tracing::{debug, warn};

/// Form feed, emitted by pdf-extract between pages
const PAGE_SEPARATOR: char = '\u{c}';

/// Document formats the ingestion pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Classify a path by its extension, ignoring case. Anything else is unsupported.
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Return the full extracted text of the document at `path`
#[inline]
pub fn load_document(path: &Path, kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::Text => fs::read_to_string(path)
            .with_context(|| format!("Failed to read text file: {}", path.display())),
        DocumentKind::Pdf => {
            let data = fs::read(path)
                .with_context(|| format!("Failed to read PDF file: {}", path.display()))?;
            extract_pdf_text(&data)
                .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))
        }
    }
}

/// Extract text from an in-memory PDF, page by page.
///
/// Pages are trimmed, empty pages dropped, and the rest joined with newlines.
#[inline]
pub fn extract_pdf_text(data: &[u8]) -> Result<String> {
    match extract_pages(data) {
        Ok(pages) => {
            debug!("Extracted {} PDF pages", pages.len());
            Ok(join_pages(pages))
        }
        Err(err) => {
            warn!(
                "Page-by-page PDF extraction failed ({:#}), trying whole-document extraction",
                err
            );
            let text = extract_whole_document(data)?;
            Ok(join_pages(text.split(PAGE_SEPARATOR)))
        }
    }
}

fn extract_pages(data: &[u8]) -> Result<Vec<String>> {
    let document =
        lopdf::Document::load_mem(data).map_err(|e| anyhow!("Failed to parse PDF: {}", e))?;

    document
        .get_pages()
        .keys()
        .map(|&page_number| {
            document
                .extract_text(&[page_number])
                .map_err(|e| anyhow!("Failed to extract page {}: {}", page_number, e))
        })
        .collect()
}

fn extract_whole_document(data: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed font tables
    panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)))
        .map_err(|_| anyhow!("PDF text extraction panicked"))?
        .map_err(|e| anyhow!("PDF text extraction failed: {}", e))
}

/// Trim each page, drop the empty ones and join the rest with newlines
#[inline]
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pages
        .into_iter()
        .filter_map(|page| {
            let trimmed = page.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .join("\n")
}
