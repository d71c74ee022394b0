//! Axum route handlers for the Screening API.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::screening::catalog;
use crate::screening::orchestrator::{EvaluationOutcome, UploadOutcome};
use crate::screening::session::{ApplicationSession, SessionHandle};
use crate::state::AppState;

/// Multipart field carrying the resume file.
const RESUME_FIELD: &str = "resume";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RoleRequirementResponse {
    pub role: String,
    pub requirements: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    /// Kept as a raw string so an unknown role is reported as a screening outcome.
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub outcome: UploadOutcome,
    pub session: ApplicationSession,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
    pub session: ApplicationSession,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/roles
pub async fn handle_list_roles() -> Json<Vec<RoleRequirementResponse>> {
    Json(
        catalog::roles()
            .map(|(role, requirements)| RoleRequirementResponse {
                role: role.to_string(),
                requirements,
            })
            .collect(),
    )
}

/// GET /api/v1/roles/:role
pub async fn handle_get_role(
    Path(role): Path<String>,
) -> Result<Json<RoleRequirementResponse>, AppError> {
    let requirements =
        catalog::requirements_for(&role).map_err(|e| AppError::NotFound(e.to_string()))?;
    Ok(Json(RoleRequirementResponse { role, requirements }))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApplicationSession>) {
    let handle = state.sessions.create().await;
    let session = handle.lock().await.clone();
    info!(session_id = %session.id(), "Session created");
    (StatusCode::CREATED, Json(session))
}

/// GET /api/v1/sessions/:id
///
/// Read-only view. Never extracts or evaluates.
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationSession>, AppError> {
    let handle = find_session(&state, id).await?;
    let session = handle.lock().await.clone();
    Ok(Json(session))
}

/// POST /api/v1/sessions/:id/document
///
/// Multipart upload; the file goes in the `resume` field.
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let handle = find_session(&state, id).await?;
    let (file_name, document) = read_resume_field(&mut multipart).await?;

    let mut session = handle.lock().await;
    let outcome = state
        .orchestrator
        .upload_document(&mut session, &file_name, document)
        .await;

    Ok(Json(UploadResponse {
        outcome,
        session: session.clone(),
    }))
}

/// POST /api/v1/sessions/:id/evaluate
///
/// Holds the session lock for the whole model call (bounded by the evaluation
/// timeout). Concurrent requests on the same session, views included, wait for
/// it, so `evaluating` is never observed from outside.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let handle = find_session(&state, id).await?;

    let mut session = handle.lock().await;
    let outcome = state
        .orchestrator
        .evaluate(&mut session, &request.role)
        .await
        .map_err(|e| AppError::Conflict(e.to_string()))?;

    Ok(Json(EvaluateResponse {
        outcome,
        session: session.clone(),
    }))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationSession>, AppError> {
    let handle = find_session(&state, id).await?;
    let mut session = handle.lock().await;
    state.orchestrator.reset(&mut session);
    Ok(Json(session.clone()))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        info!(session_id = %id, "Session abandoned");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

async fn read_resume_field(multipart: &mut Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let is_pdf = field.content_type() == Some("application/pdf")
            || file_name.to_ascii_lowercase().ends_with(".pdf");
        if !is_pdf {
            return Err(AppError::Validation(format!(
                "'{file_name}' is not a PDF document"
            )));
        }
        let document = field.bytes().await?;
        return Ok((file_name, document));
    }
    Err(AppError::Validation(format!(
        "multipart field '{RESUME_FIELD}' is required"
    )))
}
