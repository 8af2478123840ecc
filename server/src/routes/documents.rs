//! Document routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use eventdeck_engine::Document;

use crate::auth::{AuthUser, MaybeAuthUser};
use crate::error::Result;
use crate::handlers::{
    handle_create, handle_delete, handle_get, handle_list, handle_update, CreatedResponse,
    ListQuery, WriteRequest,
};
use crate::AppState;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{collection}/documents",
            get(list_handler).post(create_handler),
        )
        .route(
            "/collections/{collection}/documents/{id}",
            get(get_handler).patch(update_handler).delete(delete_handler),
        )
}

/// GET /collections/{collection}/documents - One-shot filtered read.
async fn list_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Document>>> {
    let documents =
        handle_list(state.documents.as_ref(), &state.schema, &collection, query).await?;
    Ok(Json(documents))
}

/// POST /collections/{collection}/documents - Create a document.
async fn create_handler(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(collection): Path<String>,
    Json(request): Json<WriteRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let id = handle_create(
        state.documents.as_ref(),
        &state.schema,
        &collection,
        user.uid(),
        request.fields,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// GET /collections/{collection}/documents/{id} - Point read.
async fn get_handler(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Document>> {
    let document = handle_get(state.documents.as_ref(), &state.schema, &collection, &id).await?;
    Ok(Json(document))
}

/// PATCH /collections/{collection}/documents/{id} - Merge fields.
async fn update_handler(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path((collection, id)): Path<(String, String)>,
    Json(request): Json<WriteRequest>,
) -> Result<StatusCode> {
    handle_update(
        state.documents.as_ref(),
        &state.schema,
        &collection,
        &id,
        user.uid(),
        request.fields,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /collections/{collection}/documents/{id} - Delete an owned document.
async fn delete_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path((collection, id)): Path<(String, String)>,
) -> Result<StatusCode> {
    handle_delete(
        state.documents.as_ref(),
        &state.schema,
        &collection,
        &id,
        user.uid(),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
