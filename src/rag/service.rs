//! Owns the single live [`VectorSession`] and the ingestion history.
//!
//! Every ingestion closes the previous session before building the next one,
//! so at most one collection exists at a time and queries never see chunks
//! from an earlier document.

use super::{
    Embedder,
    chunking::Chunker,
    pdf,
    persistence::MetadataStore,
    store::{self, VectorSession},
    types::{Chunk, DocumentMetadata, DocumentStats},
    utils,
};
use crate::{
    config::Config,
    error::{ServiceError, ServiceResult},
    generation::QuestionKind,
};
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct RagService {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    embedding_model: String,
    index_dir: PathBuf,
    metadata_store: MetadataStore,
    session: Option<VectorSession>,
    current_metadata: Option<DocumentMetadata>,
}

impl RagService {
    /// Builds the service and picks up the last collection if it survived a restart.
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
        let mut service = Self {
            chunker,
            embedder,
            embedding_model: config.embedding.model.clone(),
            index_dir: PathBuf::from(&config.storage.index_dir),
            metadata_store: MetadataStore::new(&config.storage.metadata_path),
            session: None,
            current_metadata: None,
        };
        service.restore_last_session()?;
        Ok(service)
    }

    fn restore_last_session(&mut self) -> Result<()> {
        if let Some(metadata) = self.metadata_store.load_all().pop() {
            match VectorSession::open(&self.index_dir, &metadata.collection_name) {
                Ok(session) => {
                    log::info!(
                        "Restored collection {} with {} chunks",
                        session.collection_name(),
                        session.len()
                    );
                    self.session = Some(session);
                    self.current_metadata = Some(metadata);
                }
                Err(e) => {
                    log::info!(
                        "Last collection {} is not reusable: {:#}",
                        metadata.collection_name,
                        e
                    );
                }
            }
        }

        let keep = self.session.as_ref().map(|s| s.collection_name().to_string());
        let removed = store::purge_collections(&self.index_dir, keep.as_deref())?;
        if removed > 0 {
            log::info!("Purged {} stale collection files", removed);
        }
        Ok(())
    }

    pub fn has_document(&self) -> bool {
        self.session.is_some()
    }

    pub async fn process_text(&mut self, text: &str) -> ServiceResult<DocumentMetadata> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::MissingInput("Text content is required".to_string()));
        }

        log::info!(
            "Processing text input ({} chars): '{}'",
            text.chars().count(),
            utils::preview(text, 70)
        );
        let chunks = self.chunker.split_text(text);
        self.ingest(chunks, utils::content_hash(text), "text", None, None).await
    }

    pub async fn process_pdf(&mut self, pdf_path: &Path) -> ServiceResult<DocumentMetadata> {
        log::info!("Processing PDF: {}", pdf_path.display());
        let path = pdf_path.to_path_buf();
        let pdf_text = tokio::task::spawn_blocking(move || pdf::extract_pages(&path))
            .await
            .context("PDF extraction task failed")?
            .map_err(ServiceError::Extraction)?;

        let full_text: String = pdf_text
            .pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = self.chunker.split_pages(&pdf_text.pages);
        let filename = pdf_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        self.ingest(
            chunks,
            utils::content_hash(&full_text),
            "pdf",
            filename,
            Some(pdf_text.total_pages),
        )
        .await
    }

    async fn ingest(
        &mut self,
        chunks: Vec<Chunk>,
        content_hash: String,
        prefix: &str,
        filename: Option<String>,
        total_pages: Option<usize>,
    ) -> ServiceResult<DocumentMetadata> {
        if chunks.is_empty() {
            return Err(ServiceError::MissingInput(
                "Document contains no text to process".to_string(),
            ));
        }

        self.release_session();

        let processed_date = Utc::now();
        let collection_name = format!(
            "{}_{}_{}",
            prefix,
            processed_date.format("%Y%m%d_%H%M%S"),
            &content_hash[..8]
        );
        let total_chunks = chunks.len();

        let session = VectorSession::create(
            &self.index_dir,
            &collection_name,
            &self.embedding_model,
            chunks,
            self.embedder.as_ref(),
        )
        .await
        .map_err(ServiceError::Ingestion)?;

        let metadata = DocumentMetadata {
            filename,
            processed_date,
            total_pages,
            total_chunks,
            chunk_size: self.chunker.chunk_size(),
            chunk_overlap: self.chunker.chunk_overlap(),
            collection_name,
            content_hash,
        };

        if let Err(e) = self.metadata_store.append(&metadata) {
            if let Err(close_err) = session.close() {
                log::warn!("Failed to clean up after metadata error: {:#}", close_err);
            }
            return Err(ServiceError::Ingestion(e));
        }

        log::info!(
            "Ingested {} chunks into {}",
            metadata.total_chunks,
            metadata.collection_name
        );
        self.session = Some(session);
        self.current_metadata = Some(metadata.clone());
        Ok(metadata)
    }

    /// Closes the live session, if any. Failure to delete its file is logged;
    /// the next startup purge removes whatever is left.
    pub fn release_session(&mut self) {
        self.current_metadata = None;
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close() {
                log::warn!("Failed to release previous collection: {:#}", e);
            }
        }
    }

    /// Texts of the `k` chunks closest to `query`, best first.
    pub async fn relevant_chunks(&self, query: &str, k: usize) -> ServiceResult<Vec<String>> {
        let session = self.session.as_ref().ok_or(ServiceError::NoDocument)?;
        let query_embedding = self
            .embedder
            .embed_query(query)
            .await
            .context("Failed to embed similarity query")?;
        Ok(session
            .similarity_search(&query_embedding, k)
            .into_iter()
            .map(|chunk| chunk.text.clone())
            .collect())
    }

    pub async fn context_for(
        &self,
        kind: QuestionKind,
        num_questions: usize,
    ) -> ServiceResult<Vec<String>> {
        if self.session.is_none() {
            return Err(ServiceError::NoDocument);
        }
        self.relevant_chunks(kind.retrieval_query(), num_questions).await
    }

    pub fn document_stats(&self) -> Option<DocumentStats> {
        self.current_metadata.as_ref().map(DocumentStats::from)
    }

    pub fn metadata_history(&self) -> Vec<DocumentMetadata> {
        self.metadata_store.load_all()
    }
}
