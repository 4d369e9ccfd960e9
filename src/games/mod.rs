use crate::state::AppState;
use axum::Router;

pub mod client;
mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::games_routes()
}
