//! In-memory registry store, used for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Principal, PrincipalPatch, RegistryStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, Principal>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Principal, StoreError> {
        self.docs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Principal, StoreError> {
        self.docs
            .read()
            .await
            .values()
            .find(|p| p.email.as_deref() == Some(email))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, principal: Principal) -> Result<Principal, StoreError> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&principal.name) {
            return Err(StoreError::DuplicateName);
        }
        docs.insert(principal.name.clone(), principal.clone());
        Ok(principal)
    }

    async fn update_if_match(
        &self,
        name: &str,
        etag: &str,
        patch: PrincipalPatch,
    ) -> Result<Principal, StoreError> {
        let mut docs = self.docs.write().await;
        let principal = docs.get_mut(name).ok_or(StoreError::NotFound)?;
        if principal.etag != etag {
            return Err(StoreError::StaleVersion);
        }
        patch.apply_to(principal);
        Ok(principal.clone())
    }

    async fn list_all(&self) -> Result<Vec<Principal>, StoreError> {
        let mut all: Vec<Principal> = self.docs.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_rejects_duplicate_name() {
        let store = MemoryStore::new();
        store.insert(Principal::new("ops")).await.unwrap();

        let err = store.insert(Principal::new("ops")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateName));
    }

    #[tokio::test]
    async fn update_rotates_etag() {
        let store = MemoryStore::new();
        let created = store.insert(Principal::new("ops")).await.unwrap();

        let patch = PrincipalPatch {
            realname: Some("Operations".to_string()),
            ..Default::default()
        };
        let updated = store
            .update_if_match("ops", &created.etag, patch)
            .await
            .unwrap();

        assert_ne!(updated.etag, created.etag);
        assert_eq!(updated.realname.as_deref(), Some("Operations"));
    }

    #[tokio::test]
    async fn stale_etag_is_rejected_and_patch_not_applied() {
        let store = MemoryStore::new();
        let created = store.insert(Principal::new("ops")).await.unwrap();

        // First writer wins.
        store
            .update_if_match(
                "ops",
                &created.etag,
                PrincipalPatch {
                    realname: Some("first".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Second writer still holds the original etag.
        let err = store
            .update_if_match(
                "ops",
                &created.etag,
                PrincipalPatch {
                    realname: Some("second".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion));

        let current = store.find_by_name("ops").await.unwrap();
        assert_eq!(current.realname.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn update_unknown_name_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_if_match("ghost", "whatever", PrincipalPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn find_by_email() {
        let store = MemoryStore::new();
        let mut p = Principal::new("jane");
        p.email = Some("jane@example.com".to_string());
        store.insert(p).await.unwrap();

        let found = store.find_by_email("jane@example.com").await.unwrap();
        assert_eq!(found.name, "jane");

        let err = store.find_by_email("nobody@example.com").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn clearing_optional_fields_via_patch() {
        let store = MemoryStore::new();
        let mut p = Principal::new("jane");
        p.token_expires = Some(chrono::Utc::now());
        p.reset_id = Some("rid".to_string());
        let created = store.insert(p).await.unwrap();

        let updated = store
            .update_if_match(
                "jane",
                &created.etag,
                PrincipalPatch {
                    token_expires: Some(None),
                    reset_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(updated.token_expires.is_none());
        assert!(updated.reset_id.is_none());
    }
}
