//! Axum route handlers for the ATS API.

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::ats::analyzer::{analyze_resume, ResumeSubmission};
use crate::errors::AppError;
use crate::memory::normalize_session_id;
use crate::state::AppState;

pub const MEMORY_CLEARED_MESSAGE: &str = "Memory cleared successfully.";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_result: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearMemoryParams {
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClearMemoryResponse {
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze_ats
///
/// Multipart form: `pdf_file`, `job_description`, `experience_level`, and an
/// optional `session_id` naming the conversation to continue.
pub async fn handle_analyze_ats(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let request_id = Uuid::new_v4();

    async move {
        let submission = read_submission(multipart).await?;
        let analysis_result = analyze_resume(&state, submission).await?;
        Ok::<_, AppError>(Json(AnalyzeResponse { analysis_result }))
    }
    .instrument(info_span!("analyze_ats", %request_id))
    .await
}

/// POST /clear_memory
///
/// Clears one session when `?session_id=` is given, otherwise every session.
pub async fn handle_clear_memory(
    State(state): State<AppState>,
    Query(params): Query<ClearMemoryParams>,
) -> Json<ClearMemoryResponse> {
    match params.session_id.as_deref().map(str::trim) {
        Some(session_id) if !session_id.is_empty() => {
            state.memory.clear_session(session_id);
            info!("Memory cleared for session '{session_id}'");
        }
        _ => {
            state.memory.clear_all();
        }
    }

    Json(ClearMemoryResponse {
        message: MEMORY_CLEARED_MESSAGE.to_string(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart parsing
// ────────────────────────────────────────────────────────────────────────────

async fn read_submission(mut multipart: Multipart) -> Result<ResumeSubmission, AppError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut job_description: Option<String> = None;
    let mut experience_level: Option<String> = None;
    let mut session_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf_file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file data: {e}")))?;
                file = Some((filename, data));
            }
            "job_description" | "experience_level" | "session_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))?;
                match name.as_str() {
                    "job_description" => job_description = Some(value),
                    "experience_level" => experience_level = Some(value),
                    _ => session_id = Some(value),
                }
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, data) = file.ok_or_else(|| missing("pdf_file"))?;
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| missing("job_description"))?;
    let experience_level = experience_level.ok_or_else(|| missing("experience_level"))?;
    let session_id = normalize_session_id(session_id.as_deref()).map_err(AppError::Validation)?;

    Ok(ResumeSubmission {
        filename,
        data,
        job_description,
        experience_level,
        session_id,
    })
}

fn missing(field: &str) -> AppError {
    AppError::Validation(format!("Missing required field '{field}'"))
}
