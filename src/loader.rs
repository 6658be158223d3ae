//! Document loaders: the trait seam and built-in PDF/plain-text
//! implementations.
//!
//! A loader turns a document path into an ordered sequence of raw
//! [`Page`]s. Loading is synchronous local parsing; network-backed
//! loaders are not part of the core.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Page;

/// Trait for document loaders.
pub trait DocumentLoader: Send + Sync {
    /// Short name of the loader (e.g. `"pdf"`).
    fn name(&self) -> &str;

    /// Load the document at `path` into raw, unnormalized pages in
    /// document order. The page texts may be empty (blank pages); the
    /// pipeline filters those out after normalization.
    fn load(&self, path: &Path) -> Result<Vec<Page>>;
}

/// PDF loader backed by `pdf-extract`, one page of text per PDF page.
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn name(&self) -> &str {
        "pdf"
    }

    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let source = path.display().to_string();
        let pages = pdf_extract::extract_text_by_pages(path)
            .with_context(|| format!("failed to extract text from {}", source))?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(page_index, text)| Page::new(text, source.clone(), page_index))
            .collect())
    }
}

/// Plain-text loader: the whole file becomes a single page.
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn name(&self) -> &str {
        "text"
    }

    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let source = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", source))?;
        Ok(vec![Page::new(text, source, 0)])
    }
}

/// Pick a built-in loader for `path` by file extension: `.pdf` maps to
/// [`PdfLoader`], anything else is treated as plain text.
pub fn loader_for_path(path: &Path) -> Box<dyn DocumentLoader> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => Box::new(PdfLoader),
        _ => Box::new(TextLoader),
    }
}
