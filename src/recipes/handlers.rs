use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    images::services::UploadItem,
    recipes::{
        dto::{
            PatchRecipeRequest, RecipeDetailResponse, RecipeFilter, RecipeImageResponse,
            RecipeRequest, RecipeResponse,
        },
        services,
    },
    state::AppState,
};

const IMAGE_FIELD: &str = "image";

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/recipe/recipes/:id",
            get(get_recipe)
                .put(replace_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
        .route("/recipe/recipes/:id/image", get(get_recipe_image))
}

pub fn upload_routes(limit_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/recipe/recipes/:id/upload-image", post(upload_image))
        .layer(DefaultBodyLimit::max(limit_bytes))
}

#[instrument(skip(query, state, user), fields(user_id = %user.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: Result<Query<RecipeFilter>, QueryRejection>,
) -> Result<Json<Vec<RecipeResponse>>, AppError> {
    let Query(filter) = query?;
    let recipes = services::list(state.recipes.as_ref(), user.id, &filter).await?;
    Ok(Json(recipes.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeResponse>), AppError> {
    let Json(req) = payload?;
    let recipe =
        services::create(state.recipes.as_ref(), state.taxonomy.as_ref(), user.id, req).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

#[instrument(skip(path, state, user), fields(user_id = %user.id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let Path(id) = path?;
    let recipe = services::detail(state.recipes.as_ref(), user.id, id).await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(path, state, user, payload), fields(user_id = %user.id))]
pub async fn replace_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let recipe =
        services::replace(state.recipes.as_ref(), state.taxonomy.as_ref(), user.id, id, req)
            .await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(path, state, user, payload), fields(user_id = %user.id))]
pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<PatchRecipeRequest>, JsonRejection>,
) -> Result<Json<RecipeDetailResponse>, AppError> {
    let Path(id) = path?;
    let Json(req) = payload?;
    let recipe =
        services::update(state.recipes.as_ref(), state.taxonomy.as_ref(), user.id, id, req)
            .await?;
    Ok(Json(recipe.into()))
}

#[instrument(skip(path, state, user), fields(user_id = %user.id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    services::delete(state.recipes.as_ref(), state.storage.as_ref(), user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /recipe/recipes/:id/upload-image (multipart, field `image`)
#[instrument(skip(path, state, user, mp), fields(user_id = %user.id))]
pub async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
    mut mp: Multipart,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let Path(id) = path?;
    let mut upload = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await?;
        upload = Some((body, file_name, content_type));
    }

    let Some((body, file_name, content_type)) = upload else {
        return Err(AppError::validation(IMAGE_FIELD, "no file was submitted"));
    };
    let item = UploadItem {
        body,
        file_name: file_name.as_deref(),
        content_type: &content_type,
    };

    let image =
        services::upload_image(state.recipes.as_ref(), state.storage.as_ref(), user.id, id, item)
            .await?;
    Ok(Json(RecipeImageResponse { id, image }))
}

/// 307 to a short-lived URL for the stored image.
#[instrument(skip(path, state, user), fields(user_id = %user.id))]
pub async fn get_recipe_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Redirect, AppError> {
    let Path(id) = path?;
    let url = services::image_url(
        state.recipes.as_ref(),
        state.storage.as_ref(),
        user.id,
        id,
        state.config.image_url_ttl_secs,
    )
    .await?;
    Ok(Redirect::temporary(&url))
}
