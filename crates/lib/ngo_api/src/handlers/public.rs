//! Read-only public mirrors of the content collections.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use ngo_core::content::{ContentQuery, Document};

use crate::AppState;
use crate::error::AppResult;
use crate::handlers::content::{not_found, parse_resource};
use crate::handlers::{ApiResponse, ok};
use crate::middleware::session::SessionId;
use crate::services::content::with_store;

/// `GET /api/{resource}?limit=&showOnHome=&homepage=&category=&status=`
pub async fn list_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path(resource): Path<String>,
    Query(filters): Query<ContentQuery>,
) -> AppResult<Json<ApiResponse<Vec<Document>>>> {
    let resource = parse_resource(&resource)?;
    let docs = with_store(&state, &session, move |store| async move {
        store.list(resource, &filters).await
    })
    .await?;
    Ok(ok(docs))
}

/// `GET /api/{resource}/{id}`
pub async fn get_handler(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Path((resource, id)): Path<(String, String)>,
) -> AppResult<Json<ApiResponse<Document>>> {
    let resource = parse_resource(&resource)?;
    let doc = with_store(&state, &session, move |store| async move {
        store.get(resource, &id).await
    })
    .await?
    .ok_or_else(|| not_found(resource))?;
    Ok(ok(doc))
}
