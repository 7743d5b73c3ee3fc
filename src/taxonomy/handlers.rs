use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Extension, Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    state::AppState,
    taxonomy::{
        dto::{ListQuery, NameRequest, TaxonomyResponse},
        repo_types::TaxonomyKind,
        services,
    },
};

/// `/recipe/tags` or `/recipe/ingredients`, depending on `kind`.
pub fn kind_routes(kind: TaxonomyKind) -> Router<AppState> {
    let base = format!("/recipe/{}", kind.plural());
    Router::new()
        .route(&base, get(list_items).post(create_item))
        .route(&format!("{base}/:id"), patch(rename_item).delete(delete_item))
        .layer(Extension(kind))
}

#[instrument(skip(query, state, user), fields(user_id = %user.id))]
pub async fn list_items(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<TaxonomyResponse>>, AppError> {
    let Query(q) = query?;
    let assigned_only = services::parse_assigned_only(q.assigned_only.as_deref())?;
    let items = services::list(state.taxonomy.as_ref(), kind, user.id, assigned_only).await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_item(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaxonomyResponse>), AppError> {
    let Json(req) = payload?;
    let item = services::create(state.taxonomy.as_ref(), kind, user.id, req.name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip(path, state, user, payload), fields(user_id = %user.id))]
pub async fn rename_item(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<NameRequest>, JsonRejection>,
) -> Result<Json<TaxonomyResponse>, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let item =
        services::rename(state.taxonomy.as_ref(), kind, user.id, id, req.name.as_deref()).await?;
    Ok(Json(item.into()))
}

#[instrument(skip(path, state, user), fields(user_id = %user.id))]
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(kind): Extension<TaxonomyKind>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    services::delete(state.taxonomy.as_ref(), kind, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
