//! Postgres-backed registry store.
//!
//! One row per principal; `perm` and `role` are text arrays. The etag guard
//! is a single conditional `UPDATE .. WHERE name = $1 AND etag = $2`, which
//! is the compare-and-swap the rest of the system relies on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;

use super::{Principal, PrincipalPatch, RegistryStore, StoreError};

const COLUMNS: &str = "name, password, realname, email, is_active, perm, role, \
                       token_expires, last_login, etag, reset_id";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(storage)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Storage(e.into()))?;

        info!("connected to postgres registry");
        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct PrincipalRow {
    name: String,
    password: Option<String>,
    realname: Option<String>,
    email: Option<String>,
    is_active: bool,
    perm: Vec<String>,
    role: Vec<String>,
    token_expires: Option<DateTime<Utc>>,
    last_login: Option<DateTime<Utc>>,
    etag: String,
    reset_id: Option<String>,
}

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            name: row.name,
            password: row.password,
            realname: row.realname,
            email: row.email,
            is_active: row.is_active,
            perm: row.perm,
            role: row.role,
            token_expires: row.token_expires,
            last_login: row.last_login,
            etag: row.etag,
            reset_id: row.reset_id,
        }
    }
}

fn storage(err: sqlx::Error) -> StoreError {
    StoreError::Storage(err.into())
}

#[async_trait]
impl RegistryStore for PgStore {
    async fn find_by_name(&self, name: &str) -> Result<Principal, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM principals WHERE name = $1");
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(Principal::from)
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Principal, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM principals WHERE email = $1 LIMIT 1");
        sqlx::query_as::<_, PrincipalRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(Principal::from)
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, principal: Principal) -> Result<Principal, StoreError> {
        let sql = format!(
            "INSERT INTO principals ({COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(&principal.name)
            .bind(&principal.password)
            .bind(&principal.realname)
            .bind(&principal.email)
            .bind(principal.is_active)
            .bind(&principal.perm)
            .bind(&principal.role)
            .bind(principal.token_expires)
            .bind(principal.last_login)
            .bind(&principal.etag)
            .bind(&principal.reset_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return StoreError::DuplicateName;
                    }
                }
                storage(e)
            })?;

        Ok(principal)
    }

    async fn update_if_match(
        &self,
        name: &str,
        etag: &str,
        patch: PrincipalPatch,
    ) -> Result<Principal, StoreError> {
        // Read the current document, apply the patch locally, then write the
        // whole row back guarded by the etag. The conditional UPDATE is the
        // only step that has to be atomic.
        let mut next = self.find_by_name(name).await?;
        patch.apply_to(&mut next);

        let sql = "UPDATE principals SET \
                   password = $3, realname = $4, email = $5, is_active = $6, \
                   perm = $7, role = $8, token_expires = $9, last_login = $10, \
                   etag = $11, reset_id = $12 \
                   WHERE name = $1 AND etag = $2";
        let result = sqlx::query(sql)
            .bind(name)
            .bind(etag)
            .bind(&next.password)
            .bind(&next.realname)
            .bind(&next.email)
            .bind(next.is_active)
            .bind(&next.perm)
            .bind(&next.role)
            .bind(next.token_expires)
            .bind(next.last_login)
            .bind(&next.etag)
            .bind(&next.reset_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::StaleVersion);
        }
        Ok(next)
    }

    async fn list_all(&self) -> Result<Vec<Principal>, StoreError> {
        let sql = format!("SELECT {COLUMNS} FROM principals ORDER BY name");
        let rows = sqlx::query_as::<_, PrincipalRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Principal::from).collect())
    }
}
