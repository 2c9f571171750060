mod dto;
pub mod handlers;
pub mod repo;
pub(crate) mod repo_types;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::ingredient_routes())
        .merge(handlers::recipe_routes())
}
