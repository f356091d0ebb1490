//! Per-request authentication gate.
//!
//! [`CurrentUser`] is an extractor: any handler taking it only runs for an
//! authenticated, active principal. A request may carry a bearer token, a
//! `token` query parameter, or `username`+`password` query parameters;
//! absence and invalidity are both the same generic 401.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};

use crate::modules::auth::model::SessionToken;
use crate::modules::auth::service::AuthService;
use crate::registry::resolver::{effective_permissions, grants};
use crate::registry::Principal;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// How a request identified itself, in precedence order.
#[derive(Debug)]
pub enum AuthAttempt {
    Token(String),
    Credentials { username: String, password: String },
    None,
}

impl AuthAttempt {
    pub fn from_parts(parts: &Parts) -> Self {
        if let Some(token) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        {
            return Self::Token(token.to_string());
        }

        let query: HashMap<String, String> = Query::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        if let Some(token) = query.get("token") {
            return Self::Token(token.clone());
        }
        if let (Some(username), Some(password)) = (query.get("username"), query.get("password")) {
            return Self::Credentials {
                username: username.clone(),
                password: password.clone(),
            };
        }
        Self::None
    }
}

/// The authenticated principal for this request, with its cascaded
/// permission set resolved.
///
/// `refreshed` is set when this request's validation extended the session
/// (sliding refresh) or when the request authenticated with raw
/// credentials; handlers surface it as a `token` response header.
pub struct CurrentUser {
    pub principal: Principal,
    pub permissions: Vec<String>,
    pub refreshed: Option<SessionToken>,
}

impl CurrentUser {
    /// Capability check against the cascaded permission set.
    pub fn grants(&self, target: &str) -> bool {
        grants(&self.permissions, target)
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (principal, refreshed) = match AuthAttempt::from_parts(parts) {
            AuthAttempt::Token(token) => AuthService::validate(state, &token).await?,
            AuthAttempt::Credentials { username, password } => {
                let (principal, token) = AuthService::login(state, &username, &password).await?;
                (principal, Some(token))
            }
            AuthAttempt::None => return Err(AppError::unauthorized()),
        };

        let permissions = effective_permissions(state.store.as_ref(), &principal)
            .await
            .map_err(AppError::from)?;

        Ok(Self {
            principal,
            permissions,
            refreshed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(uri: &str, bearer: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_header_wins_over_query() {
        let parts = parts_for("/profile?token=from-query", Some("from-header"));
        match AuthAttempt::from_parts(&parts) {
            AuthAttempt::Token(t) => assert_eq!(t, "from-header"),
            other => panic!("unexpected attempt: {other:?}"),
        }
    }

    #[test]
    fn token_query_parameter() {
        let parts = parts_for("/profile?token=abc", None);
        assert!(matches!(
            AuthAttempt::from_parts(&parts),
            AuthAttempt::Token(t) if t == "abc"
        ));
    }

    #[test]
    fn credential_query_parameters() {
        let parts = parts_for("/profile?username=jane&password=pw", None);
        match AuthAttempt::from_parts(&parts) {
            AuthAttempt::Credentials { username, password } => {
                assert_eq!(username, "jane");
                assert_eq!(password, "pw");
            }
            other => panic!("unexpected attempt: {other:?}"),
        }
    }

    #[test]
    fn username_without_password_is_none() {
        let parts = parts_for("/profile?username=jane", None);
        assert!(matches!(AuthAttempt::from_parts(&parts), AuthAttempt::None));
    }

    #[test]
    fn bare_request_is_none() {
        let parts = parts_for("/profile", None);
        assert!(matches!(AuthAttempt::from_parts(&parts), AuthAttempt::None));
    }
}
