use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::registry::Principal;

/// A freshly issued or refreshed session token together with its expiry.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires: DateTime<Utc>,
}

/// Public view of a principal. `perm` is the cascaded effective set, not
/// the document's own entries; the password hash is never exposed.
#[derive(Debug, Serialize, ToSchema)]
pub struct Profile {
    pub name: String,
    pub realname: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub perm: Vec<String>,
    pub role: Vec<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub token_expires: Option<DateTime<Utc>>,
    pub etag: String,
}

impl Profile {
    pub fn new(principal: Principal, effective_perm: Vec<String>) -> Self {
        Self {
            name: principal.name,
            realname: principal.realname,
            email: principal.email,
            is_active: principal.is_active,
            perm: effective_perm,
            role: principal.role,
            last_login: principal.last_login,
            token_expires: principal.token_expires,
            etag: principal.etag,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    #[serde(flatten)]
    pub profile: Profile,
}

/// Credentials may arrive as query parameters or as a JSON body; both are
/// optional at the parsing layer so that their absence surfaces as the
/// uniform 401 rather than a shape error.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginParams {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Query parameters of the password-reset entry point (`PUT /login`):
/// `email` requests a reset, `token` + `password` redeems one.
#[derive(Debug, Deserialize)]
pub struct ResetParams {
    pub email: Option<String>,
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
