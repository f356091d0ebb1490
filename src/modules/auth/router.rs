use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use super::controller::{login, logout, profile, reset};

pub fn init_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login).post(login).put(reset))
        .route("/profile", get(profile))
        .route("/logout", post(logout))
}
