use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{CreateUserRequest, PatchMeRequest, TokenRequest, TokenResponse, UserResponse},
        extractors::CurrentUser,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user))
        .route("/user/token", post(create_token))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/user/me", get(get_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let Json(req) = payload?;
    let user = services::register(
        state.users.as_ref(),
        req.email.as_deref(),
        req.password.as_deref(),
        req.name.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Json(req) = payload?;
    let token = services::issue_token(
        state.users.as_ref(),
        state.tokens.as_ref(),
        req.email.as_deref(),
        req.password.as_deref(),
    )
    .await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<PatchMeRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AppError> {
    let Json(req) = payload?;
    let updated = services::update_profile(
        state.users.as_ref(),
        &user,
        req.email.as_deref(),
        req.name.as_deref(),
        req.password.as_deref(),
    )
    .await?;
    Ok(Json(updated.into()))
}
