use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod memory;
pub mod repo;
pub mod repo_types;
mod services;

pub fn router(maintenance: bool) -> Router<AppState> {
    let router = Router::new().merge(handlers::user_routes());
    if maintenance {
        router.merge(handlers::maintenance_routes())
    } else {
        router
    }
}
