use crate::error::ServiceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::MissingInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Service(ServiceError::NoDocument) => StatusCode::CONFLICT,
            ApiError::Service(ServiceError::Extraction(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Service(ServiceError::Ingestion(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Service(ServiceError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Service(ServiceError::Internal(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = format!("{:#}", self);
        if status.is_server_error() {
            log::error!("Request failed: {}", message);
        } else {
            log::info!("Rejected request: {}", message);
        }
        (status, Json(json!({ "status": "error", "error": message }))).into_response()
    }
}
