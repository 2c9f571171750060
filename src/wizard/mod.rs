pub mod handlers;
pub mod machine;
pub mod submit;

pub use submit::EntrySink;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
