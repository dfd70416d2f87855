//! JSON API mirroring every wizard operation.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::playbook::GeneratedDocument;
use crate::session::{Session, SessionSnapshot};
use crate::wizard::FieldUpdates;

/// Body of `POST /api/sessions/{id}/credential`. Deliberately not `Debug`.
#[derive(Deserialize)]
struct CredentialBody {
    #[serde(default)]
    api_key: String,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/answers", put(update_answers))
        .route("/api/sessions/{id}/advance", post(advance))
        .route("/api/sessions/{id}/retreat", post(retreat))
        .route("/api/sessions/{id}/credential", post(set_credential))
        .route("/api/sessions/{id}/submit", post(submit))
        .route("/api/sessions/{id}/document", get(download_document))
}

async fn snapshot(state: &AppState, session: &Session) -> Json<SessionSnapshot> {
    Json(
        session
            .snapshot(state.generator.has_shared_credential())
            .await,
    )
}

async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.store.create().await;
    (StatusCode::CREATED, snapshot(&state, &session).await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(id).await?;
    Ok(snapshot(&state, &session).await)
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.store.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_answers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(updates): Json<FieldUpdates>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(id).await?;
    session.update_answers(&updates).await?;
    Ok(snapshot(&state, &session).await)
}

async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(id).await?;
    session.advance().await?;
    Ok(snapshot(&state, &session).await)
}

async fn retreat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(id).await?;
    session.retreat().await?;
    Ok(snapshot(&state, &session).await)
}

async fn set_credential(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CredentialBody>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session = state.store.get(id).await?;
    session
        .set_credential(Some(SecretString::from(body.api_key)))
        .await;
    Ok(snapshot(&state, &session).await)
}

async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.store.get(id).await?;
    state.generator.submit(Arc::clone(&session)).await?;
    info!(session_id = %id, "Generation submitted via API");
    Ok((StatusCode::ACCEPTED, snapshot(&state, &session).await))
}

async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let session = state.store.get(id).await?;
    Ok(match session.document().await {
        Some(document) => pdf_response(&document),
        None => no_document(),
    })
}

/// `application/pdf` attachment response for a generated playbook.
pub(crate) fn pdf_response(document: &GeneratedDocument) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        Body::from(document.pdf.clone()),
    )
        .into_response()
}

pub(crate) fn no_document() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "No playbook has been generated for this session" })),
    )
        .into_response()
}
