use super::{
    AppState,
    error::ApiError,
    types::{GenerateRequest, GenerateResponse, counts_or_defaults},
};
use crate::rag::DocumentMetadata;
use axum::{
    Form, Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Request, State},
    http::header,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /generate`: ingest `text_content` and generate questions from it.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body = read_generate_request(request).await?;
    let counts = counts_or_defaults(
        &state.config.generation,
        body.num_open_questions,
        body.num_yes_no_questions,
    );
    log::info!(
        "Generate request: {} chars, {} open, {} yes/no",
        body.text_content.chars().count(),
        counts.open,
        counts.yes_no
    );

    let mut service = state.questions.lock().await;
    let (_, questions) = service
        .generate_from_text(&body.text_content, counts)
        .await?;
    let stats = service.rag().document_stats();
    Ok(Json(GenerateResponse::success(questions, counts, None, stats)))
}

async fn read_generate_request(request: Request) -> Result<GenerateRequest, ApiError> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"));

    if is_json {
        let Json(body) = Json::<GenerateRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(body)
    } else {
        let Form(body) = Form::<GenerateRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(body)
    }
}

struct UploadedFile {
    filename: String,
    data: Bytes,
}

/// `POST /upload`: multipart PDF upload, then the same flow as `/generate`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, ApiError> {
    let mut file: Option<UploadedFile> = None;
    let mut num_open_questions = None;
    let mut num_yes_no_questions = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                file = Some(UploadedFile { filename, data });
            }
            "num_open_questions" | "num_yes_no_questions" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                let count = parse_count(&name, &text)?;
                if name == "num_open_questions" {
                    num_open_questions = count;
                } else {
                    num_yes_no_questions = count;
                }
            }
            other => log::debug!("Ignoring multipart field '{}'", other),
        }
    }

    let file = file.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let filename = sanitize_filename(&file.filename)
        .ok_or_else(|| ApiError::BadRequest("No file selected".to_string()))?;
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are supported".to_string()));
    }
    if file.data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let counts = counts_or_defaults(
        &state.config.generation,
        num_open_questions,
        num_yes_no_questions,
    );
    log::info!(
        "Upload request: {} ({} bytes), {} open, {} yes/no",
        filename,
        file.data.len(),
        counts.open,
        counts.yes_no
    );

    let mut service = state.questions.lock().await;
    service.validate_counts(counts)?;

    let upload_dir = PathBuf::from(&state.config.storage.upload_dir);
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create upload directory {:?}: {}", upload_dir, e))?;
    let pdf_path = upload_dir.join(&filename);
    tokio::fs::write(&pdf_path, &file.data)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save upload {:?}: {}", pdf_path, e))?;

    let result = service.generate_from_pdf(&pdf_path, counts).await;
    remove_upload(&pdf_path).await;
    let (metadata, questions) = result?;

    let stats = service.rag().document_stats();
    Ok(Json(GenerateResponse::success(
        questions,
        counts,
        metadata.filename,
        stats,
    )))
}

fn parse_count(field: &str, text: &str) -> Result<Option<u32>, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<u32>()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("{} must be a non-negative integer", field)))
}

/// Keeps only the final path component and replaces anything unusual with `_`.
fn sanitize_filename(raw: &str) -> Option<String> {
    let base = Path::new(raw).file_name()?.to_string_lossy();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

async fn remove_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        log::warn!("Failed to remove uploaded file {}: {}", path.display(), e);
    }
}

/// `GET /documents`: every ingestion recorded so far, oldest first.
pub async fn documents(State(state): State<Arc<AppState>>) -> Json<Vec<DocumentMetadata>> {
    let service = state.questions.lock().await;
    Json(service.rag().metadata_history())
}

/// `GET /stats`: chunking stats of the current document, or `{}`.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let service = state.questions.lock().await;
    let value = match service.rag().document_stats() {
        Some(stats) => serde_json::to_value(stats)
            .map_err(|e| anyhow::anyhow!("Failed to serialize document stats: {}", e))?,
        None => json!({}),
    };
    Ok(Json(value))
}
