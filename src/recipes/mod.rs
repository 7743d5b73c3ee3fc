pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(upload_limit_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::recipe_routes())
        .merge(handlers::upload_routes(upload_limit_bytes))
}
