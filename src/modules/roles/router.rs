use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

use super::controller::{create_role, list_roles, update_role};

pub fn init_roles_router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{name}", put(update_role))
}
