use anyhow::anyhow;
use tracing::{info, instrument};

use crate::registry::{Principal, PrincipalPatch, RegistryStore, StoreError};
use crate::utils::errors::AppError;
use crate::utils::password::hash_password;

use super::model::{CreateRoleDto, RoleView, UpdateRoleDto};

pub struct RolesService;

impl RolesService {
    #[instrument(skip(store))]
    pub async fn list(store: &dyn RegistryStore) -> Result<Vec<RoleView>, AppError> {
        let all = store.list_all().await?;
        Ok(all.into_iter().map(RoleView::from).collect())
    }

    #[instrument(skip(store, dto), fields(name = %dto.name))]
    pub async fn create(store: &dyn RegistryStore, dto: CreateRoleDto) -> Result<RoleView, AppError> {
        check_role_refs(store, &dto.role).await?;

        let mut principal = Principal::new(dto.name);
        principal.realname = dto.realname;
        principal.email = dto.email;
        principal.is_active = dto.is_active;
        principal.perm = dto.perm;
        principal.role = dto.role;
        if let Some(password) = dto.password {
            principal.password = Some(hash_password(&password)?);
        }

        let created = store.insert(principal).await?;
        info!(name = %created.name, "principal created");
        Ok(created.into())
    }

    #[instrument(skip(store, dto))]
    pub async fn update(
        store: &dyn RegistryStore,
        name: &str,
        dto: UpdateRoleDto,
    ) -> Result<RoleView, AppError> {
        if let Some(role) = &dto.role {
            check_role_refs(store, role).await?;
        }

        let password = match dto.password {
            Some(password) => Some(hash_password(&password)?),
            None => None,
        };
        let patch = PrincipalPatch {
            password,
            realname: dto.realname,
            email: dto.email,
            is_active: dto.is_active,
            perm: dto.perm,
            role: dto.role,
            ..Default::default()
        };

        let updated = store.update_if_match(name, &dto.etag, patch).await?;
        info!(name = %updated.name, "principal updated");
        Ok(updated.into())
    }
}

/// Every referenced sub-role must exist up front; dangling references are
/// tolerated at resolution time but not accepted from an administrator.
async fn check_role_refs(store: &dyn RegistryStore, roles: &[String]) -> Result<(), AppError> {
    for role in roles {
        match store.find_by_name(role).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => {
                return Err(AppError::bad_request(anyhow!(
                    "unknown role reference: {}",
                    role
                )));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
