use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A retrieval unit: a span of the source text, with its page when it came from a PDF.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

/// Text of a single PDF page. Page numbers start at 1.
#[derive(Clone, Debug, PartialEq)]
pub struct PageText {
    pub page_number: usize,
    pub text: String,
}

/// One entry of the persisted ingestion history. Never edited once written.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub processed_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub collection_name: String,
    pub content_hash: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DocumentStats {
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub processed_date: DateTime<Utc>,
}

impl From<&DocumentMetadata> for DocumentStats {
    fn from(metadata: &DocumentMetadata) -> Self {
        Self {
            total_chunks: metadata.total_chunks,
            chunk_size: metadata.chunk_size,
            chunk_overlap: metadata.chunk_overlap,
            processed_date: metadata.processed_date,
        }
    }
}
