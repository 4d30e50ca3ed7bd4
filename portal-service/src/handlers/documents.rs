use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::dtos::content::{CreateDocumentRequest, DocumentResponse, UpdateDocumentRequest};
use crate::dtos::{PageParams, Paginated};
use crate::models::content::dedup_tags;
use crate::models::{new_id, Document};
use crate::policy::Principal;
use crate::services::content::{get_visible, list_visible};
use crate::services::PageRequest;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn list_documents(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<PageParams>,
) -> Result<Json<Paginated<DocumentResponse>>, AppError> {
    let page = PageRequest::from(params);
    let result =
        list_visible(state.repos.documents.as_ref(), &state.policy, &principal, page).await?;
    Ok(Json(Paginated::from_page(result, page)))
}

pub async fn get_document(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document =
        get_visible(state.repos.documents.as_ref(), &state.policy, &principal, &id, "Document")
            .await?;
    Ok(Json(document.into()))
}

pub async fn create_document(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let now = Utc::now();
    let document = Document {
        id: new_id(),
        title: payload.title.trim().to_string(),
        description: payload.description,
        file_url: payload.file_url,
        meant_for: dedup_tags(payload.meant_for),
        created_at: now,
        updated_at: now,
    };

    state.repos.documents.insert(&document).await?;
    tracing::info!(document_id = %document.id, "Document published");

    Ok((StatusCode::CREATED, Json(document.into())))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentResponse>, AppError> {
    let mut document = state
        .repos
        .documents
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    if let Some(title) = payload.title {
        document.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        document.description = Some(description);
    }
    if let Some(file_url) = payload.file_url {
        document.file_url = file_url;
    }
    if let Some(meant_for) = payload.meant_for {
        document.meant_for = dedup_tags(meant_for);
    }
    document.updated_at = Utc::now();

    if !state.repos.documents.replace(&document).await? {
        return Err(AppError::NotFound("Document not found".to_string()));
    }
    Ok(Json(document.into()))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.repos.documents.delete(&id).await? {
        return Err(AppError::NotFound("Document not found".to_string()));
    }
    tracing::info!(document_id = %id, "Document removed");
    Ok(StatusCode::NO_CONTENT)
}
