//! Admin content CRUD: `/api/admin/{resource}` with `?id=` selecting a document.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use ngo_core::content::{ContentQuery, Resource, prepare_insert, prepare_update};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::handlers::{ApiResponse, ok, ok_with};
use crate::middleware::auth::AdminContext;
use crate::middleware::session::SessionId;
use crate::services::content::with_store;

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

pub(crate) fn parse_resource(name: &str) -> AppResult<Resource> {
    Ok(name.parse::<Resource>()?)
}

fn require_id(resource: Resource, query: IdQuery) -> AppResult<String> {
    query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("{} ID is required", resource.label())))
}

pub(crate) fn not_found(resource: Resource) -> AppError {
    AppError::NotFound(format!("{} not found", resource.label()))
}

/// `GET /api/admin/{resource}`: list, or one document with `?id=`.
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(resource): Path<String>,
    Query(id): Query<IdQuery>,
    Query(filters): Query<ContentQuery>,
) -> AppResult<Response> {
    let resource = parse_resource(&resource)?;
    match id.id {
        Some(id) => {
            let doc = with_store(&state, &session, move |store| async move {
                store.get(resource, &id).await
            })
            .await?
            .ok_or_else(|| not_found(resource))?;
            Ok(ok(doc).into_response())
        }
        None => {
            let docs = with_store(&state, &session, move |store| async move {
                store.list(resource, &filters).await
            })
            .await?;
            Ok(ok(docs).into_response())
        }
    }
}

/// `POST /api/admin/{resource}`
pub async fn create_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Extension(ctx): Extension<AdminContext>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<(StatusCode, Response)> {
    let resource = parse_resource(&resource)?;
    let data = prepare_insert(resource, body)?;
    let doc = with_store(&state, &session, move |store| async move {
        store.insert(resource, data).await
    })
    .await?;
    info!(%resource, id = %doc.id, by = %ctx.username, "content created");
    let message = format!("{} created successfully", resource.label());
    Ok((StatusCode::CREATED, ok_with(doc, message).into_response()))
}

/// `PUT /api/admin/{resource}?id=`: merge fields into the document.
pub async fn update_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Extension(ctx): Extension<AdminContext>,
    Path(resource): Path<String>,
    Query(id): Query<IdQuery>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let resource = parse_resource(&resource)?;
    let id = require_id(resource, id)?;
    let patch = prepare_update(resource, body)?;
    let doc = with_store(&state, &session, move |store| async move {
        store.update(resource, &id, patch).await
    })
    .await?
    .ok_or_else(|| not_found(resource))?;
    info!(%resource, id = %doc.id, by = %ctx.username, "content updated");
    let message = format!("{} updated successfully", resource.label());
    Ok(ok_with(doc, message).into_response())
}

/// `DELETE /api/admin/{resource}?id=`
pub async fn delete_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Extension(ctx): Extension<AdminContext>,
    Path(resource): Path<String>,
    Query(id): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    let resource = parse_resource(&resource)?;
    let id = require_id(resource, id)?;
    let target = id.clone();
    let deleted = with_store(&state, &session, move |store| async move {
        store.delete(resource, &target).await
    })
    .await?;
    if !deleted {
        return Err(not_found(resource));
    }
    info!(%resource, %id, by = %ctx.username, "content deleted");
    Ok(ok_with((), format!("{} deleted successfully", resource.label())))
}
