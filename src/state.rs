use std::sync::Arc;

use tracing::info;

use crate::config::cors::CorsConfig;
use crate::config::email::EmailConfig;
use crate::config::token::TokenConfig;
use crate::registry::resolver::SUPERUSER;
use crate::registry::{MemoryStore, PgStore, Principal, RegistryStore, StoreError};
use crate::utils::password::hash_password;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RegistryStore>,
    pub token_config: TokenConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
}

pub async fn init_app_state() -> AppState {
    let store: Arc<dyn RegistryStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => Arc::new(
            PgStore::connect(&url)
                .await
                .expect("failed to connect to registry database"),
        ),
        Err(_) => {
            info!("DATABASE_URL not set, using in-memory registry");
            Arc::new(MemoryStore::new())
        }
    };

    let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    ensure_admin(store.as_ref(), &admin_password)
        .await
        .expect("failed to seed administrator");

    AppState {
        store,
        token_config: TokenConfig::from_env(),
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
    }
}

/// Seeds the bootstrap `admin` principal (superuser permission) when the
/// registry does not already hold one.
pub async fn ensure_admin(store: &dyn RegistryStore, password: &str) -> anyhow::Result<()> {
    match store.find_by_name("admin").await {
        Ok(_) => return Ok(()),
        Err(StoreError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let mut admin = Principal::new("admin");
    admin.realname = Some("administrator".to_string());
    admin.perm = vec![SUPERUSER.to_string()];
    admin.password = Some(hash_password(password).map_err(|e| e.error)?);

    match store.insert(admin).await {
        Ok(_) => {
            info!("seeded bootstrap administrator");
            Ok(())
        }
        // Another instance bootstrapped concurrently.
        Err(StoreError::DuplicateName) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
