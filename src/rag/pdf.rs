//! PDF text extraction.

use super::types::PageText;
use anyhow::{Context, Result, anyhow};
use pdf_oxide::converters::ConversionOptions;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PdfText {
    /// Every page in the file, including those without extractable text.
    pub total_pages: usize,
    pub pages: Vec<PageText>,
}

fn text_options() -> ConversionOptions {
    ConversionOptions {
        include_images: false,
        ..ConversionOptions::default()
    }
}

/// Extracts the text of every non-blank page. Blocking; run it off the async runtime.
pub fn extract_pages(path: &Path) -> Result<PdfText> {
    let path_str = path
        .to_str()
        .with_context(|| format!("PDF path is not valid UTF-8: {:?}", path))?;
    let mut doc = pdf_oxide::PdfDocument::open(path_str)
        .map_err(|e| anyhow!("Failed to open PDF {}: {}", path.display(), e))?;
    let total_pages = doc
        .page_count()
        .map_err(|e| anyhow!("Failed to read page count of {}: {}", path.display(), e))?;
    let options = text_options();
    let mut pages = Vec::new();

    for page_index in 0..total_pages {
        let text = doc.to_markdown(page_index, &options).map_err(|e| {
            anyhow!(
                "Failed to extract page {} of {}: {}",
                page_index + 1,
                path.display(),
                e
            )
        })?;
        if text.trim().is_empty() {
            log::debug!("Skipping blank page {} of {}", page_index + 1, path.display());
            continue;
        }
        pages.push(PageText {
            page_number: page_index + 1,
            text,
        });
    }

    if pages.is_empty() {
        anyhow::bail!("PDF {} contains no extractable text", path.display());
    }

    log::info!(
        "Extracted text from {}/{} pages of {}",
        pages.len(),
        total_pages,
        path.display()
    );
    Ok(PdfText { total_pages, pages })
}
