pub mod dto;
pub mod handlers;
pub mod memory;
pub mod object_id;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::movie_routes()
}
