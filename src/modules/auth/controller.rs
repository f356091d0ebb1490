use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::IntoResponse;
use tracing::instrument;
use utoipa::ToSchema;

use crate::middleware::auth::CurrentUser;
use crate::registry::resolver::effective_permissions;
use crate::state::AppState;
use crate::utils::errors::AppError;

use super::model::{LoginParams, LoginResponse, MessageResponse, Profile, ResetParams};
use super::service::AuthService;

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Header carrying a newly issued or refreshed session token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("token");

/// Log in with username and password
///
/// Credentials are taken from query parameters or, on POST, a JSON body.
/// Any failure (bad credentials, inactive account, missing parameters)
/// is a generic 401.
#[utoipa::path(
    post,
    path = "/login",
    params(
        ("username" = Option<String>, Query, description = "Principal name"),
        ("password" = Option<String>, Query, description = "Password"),
    ),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
    body: Option<Json<LoginParams>>,
) -> Result<Json<LoginResponse>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let username = body.username.or(params.username);
    let password = body.password.or(params.password);
    let (Some(username), Some(password)) = (username, password) else {
        return Err(AppError::unauthorized());
    };

    let (principal, session) = AuthService::login(&state, &username, &password).await?;
    let perms = effective_permissions(state.store.as_ref(), &principal).await?;

    Ok(Json(LoginResponse {
        token: session.token,
        profile: Profile::new(principal, perms),
    }))
}

/// Fetch the authenticated principal's profile
///
/// The `perm` field is the cascaded effective permission set. When this
/// request triggered a sliding refresh, the response carries the new
/// session token in the `token` header.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "Authenticated principal's profile", body = Profile),
        (status = 401, description = "Authentication failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn profile(user: CurrentUser) -> Result<impl IntoResponse, AppError> {
    let mut headers = HeaderMap::new();
    if let Some(session) = &user.refreshed {
        if let Ok(value) = HeaderValue::from_str(&session.token) {
            headers.insert(TOKEN_HEADER, value);
        }
    }

    let profile = Profile::new(user.principal, user.permissions);
    Ok((headers, Json(profile)))
}

/// Log out
///
/// Clears the stored session expiry; every outstanding token for the
/// principal stops validating immediately.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MessageResponse>, AppError> {
    AuthService::logout(&state, &user.principal.name).await?;
    Ok(Json(MessageResponse {
        message: "Logged out.".to_string(),
    }))
}

/// Password-reset entry point
///
/// `PUT /login?email=` requests a reset (uniform 200 whether or not the
/// email exists); `PUT /login?token=&password=` redeems the delivered
/// token.
#[utoipa::path(
    put,
    path = "/login",
    params(
        ("email" = Option<String>, Query, description = "Request a reset for this email"),
        ("token" = Option<String>, Query, description = "Reset token to redeem"),
        ("password" = Option<String>, Query, description = "New password"),
    ),
    responses(
        (status = 200, description = "Reset requested or completed", body = MessageResponse),
        (status = 400, description = "Neither form of the request was given", body = ErrorResponse),
        (status = 401, description = "Invalid or expired reset token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    Query(params): Query<ResetParams>,
) -> Result<Json<MessageResponse>, AppError> {
    if let Some(email) = params.email {
        AuthService::request_reset(&state, &email).await?;
        return Ok(Json(MessageResponse {
            message: "If an account exists with that email, a reset token has been sent."
                .to_string(),
        }));
    }

    if let (Some(token), Some(password)) = (params.token, params.password) {
        AuthService::complete_reset(&state, &token, &password).await?;
        return Ok(Json(MessageResponse {
            message: "Password has been reset.".to_string(),
        }));
    }

    Err(AppError::bad_request(anyhow::anyhow!(
        "expected either email or token and password"
    )))
}
