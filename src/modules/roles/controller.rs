use anyhow::anyhow;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::middleware::auth::CurrentUser;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::validator::ValidatedJson;

use super::model::{CreateRoleDto, RoleView, UpdateRoleDto};
use super::service::RolesService;

/// Capability scope guarding registry administration.
pub const ROLES_SCOPE: &str = "api://roles";

fn require_roles_access(user: &CurrentUser) -> Result<(), AppError> {
    if user.grants(ROLES_SCOPE) {
        Ok(())
    } else {
        Err(AppError::forbidden(anyhow!(
            "missing required permission: {}",
            ROLES_SCOPE
        )))
    }
}

/// List all principals in the registry
#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "All principal documents", body = [RoleView]),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 403, description = "Missing permission", body = ErrorResponse)
    ),
    tag = "Roles"
)]
#[instrument(skip_all)]
pub async fn list_roles(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<RoleView>>, AppError> {
    require_roles_access(&user)?;
    let roles = RolesService::list(state.store.as_ref()).await?;
    Ok(Json(roles))
}

/// Create a user or role
#[utoipa::path(
    post,
    path = "/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Principal created", body = RoleView),
        (status = 400, description = "Duplicate name or bad role reference", body = ErrorResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 403, description = "Missing permission", body = ErrorResponse)
    ),
    tag = "Roles"
)]
#[instrument(skip_all)]
pub async fn create_role(
    State(state): State<AppState>,
    user: CurrentUser,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<RoleView>), AppError> {
    require_roles_access(&user)?;
    let created = RolesService::create(state.store.as_ref(), dto).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a user or role
///
/// The supplied `etag` must match the currently stored document; a
/// mismatch is answered with 409 and nothing is applied.
#[utoipa::path(
    put,
    path = "/roles/{name}",
    request_body = UpdateRoleDto,
    params(("name" = String, Path, description = "Principal name")),
    responses(
        (status = 200, description = "Principal updated", body = RoleView),
        (status = 401, description = "Authentication failed", body = ErrorResponse),
        (status = 403, description = "Missing permission", body = ErrorResponse),
        (status = 404, description = "Unknown principal", body = ErrorResponse),
        (status = 409, description = "Stale etag", body = ErrorResponse)
    ),
    tag = "Roles"
)]
#[instrument(skip_all, fields(name = %name))]
pub async fn update_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(name): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<RoleView>, AppError> {
    require_roles_access(&user)?;
    let updated = RolesService::update(state.store.as_ref(), &name, dto).await?;
    Ok(Json(updated))
}
