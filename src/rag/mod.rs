use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub mod chunking;
pub mod pdf;
pub mod persistence;
pub mod search;
pub mod service;
pub mod store;
pub mod types;
pub mod utils;

pub use service::RagService;
pub use types::{Chunk, DocumentMetadata, DocumentStats};

/// Turns text into vectors for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One embedding per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f64>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding generated"))
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::config::Config;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Defaults with every storage path moved under `root`.
    pub fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.storage.index_dir = root.join("vector_index").to_string_lossy().into_owned();
        config.storage.metadata_path = root
            .join("metadata")
            .join("document_metadata.json")
            .to_string_lossy()
            .into_owned();
        config.storage.upload_dir = root.join("uploads").to_string_lossy().into_owned();
        config.embedding.model = "keyword-test".to_string();
        config
    }

    const VOCABULARY: &[&str] = &[
        "rust",
        "python",
        "ownership",
        "borrow",
        "garbage",
        "alpha",
        "beta",
        "volcano",
        "photosynthesis",
        "explanation",
        "definition",
        "factual",
        "statement",
        "assertion",
    ];

    /// Counts vocabulary words; texts sharing a keyword end up close together.
    pub struct KeywordEmbedder;

    pub fn keyword_vector(text: &str) -> Vec<f64> {
        let lower = text.to_lowercase();
        VOCABULARY
            .iter()
            .map(|word| lower.matches(word).count() as f64)
            .collect()
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
    }

    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f64>>> {
            Err(anyhow!("embedding service unavailable"))
        }
    }

    /// [`KeywordEmbedder`] that records how often it was called.
    #[derive(Default)]
    pub struct CountingEmbedder {
        pub calls: AtomicUsize,
    }

    impl CountingEmbedder {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            KeywordEmbedder.embed_documents(texts).await
        }
    }

    /// Fails while `fail` is set, otherwise behaves like [`KeywordEmbedder`].
    #[derive(Default)]
    pub struct FlakyEmbedder {
        pub fail: AtomicBool,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(anyhow!("embedding service unavailable"));
            }
            KeywordEmbedder.embed_documents(texts).await
        }
    }

    /// A minimal PDF with one page per entry, set in Helvetica. Empty strings
    /// give pages with no text. Entries must not contain `(`, `)` or `\`.
    pub fn pdf_fixture(pages: &[&str]) -> Vec<u8> {
        let font_id = 3;
        let first_page_id = 4;
        let page_ids: Vec<usize> = (0..pages.len()).map(|i| first_page_id + 2 * i).collect();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");

        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        ];
        for (text, page_id) in pages.iter().zip(&page_ids) {
            let content = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text)
            };
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 {} 0 R >> >> /Contents {} 0 R >>",
                font_id,
                page_id + 1
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        pdf
    }
}
