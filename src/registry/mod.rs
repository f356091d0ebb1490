//! Principal registry: the shared user/role document store.
//!
//! Every user and role is a single `Principal` document keyed by its
//! immutable `name`. All mutation goes through [`RegistryStore::update_if_match`],
//! an etag-guarded compare-and-swap; there is no field-level merging and no
//! cross-document transaction. Session and reset-token state live on the
//! document itself (`token_expires`, `reset_id`), so no separate session
//! store exists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod memory;
pub mod postgres;
pub mod resolver;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A user or role document.
///
/// Users carry a password hash and can log in; roles usually don't. Both can
/// hold permissions and reference further roles by name, forming a directed
/// (possibly cyclic) graph that [`resolver::effective_permissions`] walks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    /// Bcrypt hash. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub realname: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub perm: Vec<String>,
    pub role: Vec<String>,
    /// None when the principal never logged in or has logged out.
    pub token_expires: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    /// Version stamp, regenerated on every successful mutation.
    pub etag: String,
    /// Correlation id of the outstanding password-reset token, if any.
    #[serde(skip_serializing)]
    pub reset_id: Option<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: None,
            realname: None,
            email: None,
            is_active: true,
            perm: Vec::new(),
            role: Vec::new(),
            token_expires: None,
            last_login: None,
            etag: new_etag(),
            reset_id: None,
        }
    }
}

pub fn new_etag() -> String {
    Uuid::new_v4().to_string()
}

/// Partial update applied by [`RegistryStore::update_if_match`].
///
/// `Option<Option<_>>` fields distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct PrincipalPatch {
    pub password: Option<String>,
    pub realname: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub perm: Option<Vec<String>>,
    pub role: Option<Vec<String>>,
    pub token_expires: Option<Option<DateTime<Utc>>>,
    pub last_login: Option<DateTime<Utc>>,
    pub reset_id: Option<Option<String>>,
}

impl PrincipalPatch {
    /// Applies the patch in place and rotates the etag.
    pub fn apply_to(&self, principal: &mut Principal) {
        if let Some(password) = &self.password {
            principal.password = Some(password.clone());
        }
        if let Some(realname) = &self.realname {
            principal.realname = Some(realname.clone());
        }
        if let Some(email) = &self.email {
            principal.email = Some(email.clone());
        }
        if let Some(is_active) = self.is_active {
            principal.is_active = is_active;
        }
        if let Some(perm) = &self.perm {
            principal.perm = perm.clone();
        }
        if let Some(role) = &self.role {
            principal.role = role.clone();
        }
        if let Some(token_expires) = self.token_expires {
            principal.token_expires = token_expires;
        }
        if let Some(last_login) = self.last_login {
            principal.last_login = Some(last_login);
        }
        if let Some(reset_id) = &self.reset_id {
            principal.reset_id = reset_id.clone();
        }
        principal.etag = new_etag();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("principal not found")]
    NotFound,
    #[error("a principal with this name already exists")]
    DuplicateName,
    #[error("the document was modified since it was read")]
    StaleVersion,
    #[error("storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Narrow interface over the document store backing the registry.
///
/// Reads are lock-free snapshot reads; `update_if_match` is the sole
/// concurrency-control mechanism (single-document CAS on the etag).
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Principal, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Principal, StoreError>;

    /// Fails with [`StoreError::DuplicateName`] when `name` is taken.
    async fn insert(&self, principal: Principal) -> Result<Principal, StoreError>;

    /// Applies `patch` only if the stored etag still equals `etag`.
    /// A mismatch fails with [`StoreError::StaleVersion`]; the patch is
    /// never partially applied.
    async fn update_if_match(
        &self,
        name: &str,
        etag: &str,
        patch: PrincipalPatch,
    ) -> Result<Principal, StoreError>;

    async fn list_all(&self) -> Result<Vec<Principal>, StoreError>;
}
