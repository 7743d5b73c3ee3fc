pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

use repo_types::TaxonomyKind;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::kind_routes(TaxonomyKind::Tag))
        .merge(handlers::kind_routes(TaxonomyKind::Ingredient))
}
