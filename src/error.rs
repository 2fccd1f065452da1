use thiserror::Error;

/// Failures the HTTP layer needs to tell apart.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    MissingInput(String),

    #[error("No documents have been processed yet")]
    NoDocument,

    #[error("Error reading PDF: {0:#}")]
    Extraction(anyhow::Error),

    #[error("Error creating vector store: {0:#}")]
    Ingestion(anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
