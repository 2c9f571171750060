mod dto;
pub mod handlers;
pub mod repo;
pub mod spending;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::store_routes())
        .merge(handlers::inventory_routes())
        .merge(handlers::purchase_routes())
        .merge(handlers::shopping_routes())
}
