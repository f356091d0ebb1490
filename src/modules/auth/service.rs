//! Session lifecycle and password-reset orchestration.
//!
//! Expiry is evaluated lazily at validation time; there is no background
//! sweeper. All persistence goes through the registry's etag CAS. Writes
//! that merely extend a session (refresh) drop a lost race silently, since
//! a refresh can only lengthen the effective session, never shorten it.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::registry::{Principal, PrincipalPatch, RegistryStore, StoreError};
use crate::state::AppState;
use crate::utils::email::EmailService;
use crate::utils::errors::AppError;
use crate::utils::jwt::{
    create_reset_token, create_session_token, verify_reset_token, verify_session_token,
};
use crate::utils::password::{hash_password, verify_password};

use super::model::SessionToken;

/// Bound on CAS re-read retries for writes that must eventually land
/// (login bookkeeping, logout, reset redemption).
const MAX_CAS_RETRIES: usize = 3;

pub struct AuthService;

impl AuthService {
    /// Credential login. Issues a fresh session token, persists the new
    /// `token_expires` and bumps `last_login`. Every failure is the same
    /// generic 401.
    #[instrument(skip(state, password))]
    pub async fn login(
        state: &AppState,
        username: &str,
        password: &str,
    ) -> Result<(Principal, SessionToken), AppError> {
        let principal = match state.store.find_by_name(username).await {
            Ok(p) => p,
            Err(StoreError::NotFound) => return Err(AppError::unauthorized()),
            Err(err) => return Err(err.into()),
        };

        let hash = principal.password.as_deref().ok_or_else(AppError::unauthorized)?;
        if !verify_password(password, hash)? {
            return Err(AppError::unauthorized());
        }
        if !principal.is_active {
            return Err(AppError::unauthorized());
        }

        let now = Utc::now();
        let expires = now + Duration::seconds(state.token_config.expiration);
        let token = create_session_token(&principal.name, expires, &state.token_config)?;

        let patch = PrincipalPatch {
            token_expires: Some(Some(expires)),
            last_login: Some(now),
            ..Default::default()
        };
        let updated = update_with_retry(state.store.as_ref(), &principal.name, patch).await?;

        info!(principal = %updated.name, "login succeeded");
        Ok((updated, SessionToken { token, expires }))
    }

    /// Token validation with sliding refresh.
    ///
    /// The signature/expiry check is stateless; the registry read re-checks
    /// `is_active` on every request and rejects principals that logged out
    /// (`token_expires` cleared). When the stored expiry is within the
    /// refresh window the session is extended and a fresh token returned.
    #[instrument(skip(state, token))]
    pub async fn validate(
        state: &AppState,
        token: &str,
    ) -> Result<(Principal, Option<SessionToken>), AppError> {
        let claims = verify_session_token(token, &state.token_config)?;

        let principal = match state.store.find_by_name(&claims.sub).await {
            Ok(p) => p,
            Err(StoreError::NotFound) => return Err(AppError::unauthorized()),
            Err(err) => return Err(err.into()),
        };

        let stored_expiry = principal.token_expires.ok_or_else(AppError::unauthorized)?;
        if !principal.is_active {
            return Err(AppError::unauthorized());
        }

        let now = Utc::now();
        let remaining = stored_expiry - now;
        if remaining > Duration::seconds(state.token_config.refresh) {
            // Read-only validation, no write.
            return Ok((principal, None));
        }

        let expires = now + Duration::seconds(state.token_config.expiration);
        let patch = PrincipalPatch {
            token_expires: Some(Some(expires)),
            ..Default::default()
        };
        match state
            .store
            .update_if_match(&principal.name, &principal.etag, patch)
            .await
        {
            Ok(updated) => {
                let fresh = create_session_token(&updated.name, expires, &state.token_config)?;
                debug!(principal = %updated.name, "session refreshed");
                Ok((
                    updated,
                    Some(SessionToken {
                        token: fresh,
                        expires,
                    }),
                ))
            }
            // A concurrent writer got there first; their refresh already
            // extended the session, so skipping ours is safe.
            Err(StoreError::StaleVersion) => Ok((principal, None)),
            Err(err) => Err(err.into()),
        }
    }

    /// Clears `token_expires`, which invalidates every outstanding session
    /// token for the principal on its next validation.
    #[instrument(skip(state))]
    pub async fn logout(state: &AppState, name: &str) -> Result<(), AppError> {
        let patch = PrincipalPatch {
            token_expires: Some(None),
            ..Default::default()
        };
        update_with_retry(state.store.as_ref(), name, patch).await?;
        info!(principal = %name, "logged out");
        Ok(())
    }

    /// First half of the reset handshake. Returns the issued token so the
    /// test harness can drive the flow directly; the HTTP layer discards it
    /// and answers uniformly whether or not the email was known.
    #[instrument(skip(state))]
    pub async fn request_reset(state: &AppState, email: &str) -> Result<Option<String>, AppError> {
        let principal = match state.store.find_by_email(email).await {
            Ok(p) => p,
            Err(StoreError::NotFound) => {
                debug!("reset requested for unknown email");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let reset_id = Uuid::new_v4().to_string();
        let patch = PrincipalPatch {
            reset_id: Some(Some(reset_id.clone())),
            ..Default::default()
        };
        let updated = update_with_retry(state.store.as_ref(), &principal.name, patch).await?;

        let token = create_reset_token(&updated.name, &reset_id, &state.token_config)?;

        if state.email_config.enabled {
            let mailer = EmailService::new(state.email_config.clone());
            let display_name = updated.realname.clone().unwrap_or_else(|| updated.name.clone());
            if let Err(err) = mailer
                .send_password_reset_email(email, &display_name, &token)
                .await
            {
                warn!(principal = %updated.name, error = %err.error, "reset email delivery failed");
            }
        } else {
            // Development/test delivery path: the token is retrievable from
            // the log stream.
            info!(principal = %updated.name, token = %token, "password reset token issued");
        }

        Ok(Some(token))
    }

    /// Second half of the reset handshake. Replaces the password hash and
    /// consumes the reset token in one CAS; existing session tokens are
    /// left to their own expiry.
    #[instrument(skip(state, token, new_password))]
    pub async fn complete_reset(
        state: &AppState,
        token: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let claims = verify_reset_token(token, &state.token_config)?;
        let hash = hash_password(new_password)?;

        let mut attempts = 0;
        loop {
            let principal = match state.store.find_by_name(&claims.sub).await {
                Ok(p) => p,
                Err(StoreError::NotFound) => return Err(AppError::unauthorized()),
                Err(err) => return Err(err.into()),
            };

            // Single-use: the stored reset id must still match this token.
            if principal.reset_id.as_deref() != Some(claims.rid.as_str()) {
                return Err(AppError::unauthorized());
            }

            let patch = PrincipalPatch {
                password: Some(hash.clone()),
                reset_id: Some(None),
                ..Default::default()
            };
            match state
                .store
                .update_if_match(&principal.name, &principal.etag, patch)
                .await
            {
                Ok(updated) => {
                    info!(principal = %updated.name, "password reset completed");
                    return Ok(());
                }
                Err(StoreError::StaleVersion) if attempts < MAX_CAS_RETRIES => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// Re-read-and-retry wrapper around the CAS for writes that should survive
/// benign concurrent mutations.
async fn update_with_retry(
    store: &dyn RegistryStore,
    name: &str,
    patch: PrincipalPatch,
) -> Result<Principal, AppError> {
    let mut attempts = 0;
    loop {
        let current = store.find_by_name(name).await.map_err(AppError::from)?;
        match store.update_if_match(name, &current.etag, patch.clone()).await {
            Err(StoreError::StaleVersion) if attempts < MAX_CAS_RETRIES => {
                attempts += 1;
            }
            Err(StoreError::StaleVersion) => {
                return Err(AppError::internal(anyhow!(
                    "persistent write conflict on principal {}",
                    name
                )));
            }
            other => return other.map_err(AppError::from),
        }
    }
}
