//! Registration, login and the bearer-token gate.

use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
mod services;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
