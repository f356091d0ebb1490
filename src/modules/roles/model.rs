use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::registry::Principal;

/// Administrative view of a principal document. Unlike the profile view,
/// `perm` here is the document's own entries (what an administrator edits),
/// not the cascaded set.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleView {
    pub name: String,
    pub realname: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub perm: Vec<String>,
    pub role: Vec<String>,
    pub token_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub etag: String,
}

impl From<Principal> for RoleView {
    fn from(p: Principal) -> Self {
        Self {
            name: p.name,
            realname: p.realname,
            email: p.email,
            is_active: p.is_active,
            perm: p.perm,
            role: p.role,
            token_expires: p.token_expires,
            last_login: p.last_login,
            etag: p.etag,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
    pub realname: Option<String>,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
    #[serde(default)]
    pub perm: Vec<String>,
    #[serde(default)]
    pub role: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update. `etag` must be the value read from the current document;
/// a mismatch is a conflict, never a merge.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleDto {
    #[validate(length(min = 1, message = "etag is required"))]
    pub etag: String,
    pub realname: Option<String>,
    #[validate(email(message = "Email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
    pub perm: Option<Vec<String>>,
    pub role: Option<Vec<String>>,
    pub is_active: Option<bool>,
}
