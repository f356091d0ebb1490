//! Role-graph traversal and permission resolution.
//!
//! Role references form a directed graph that may contain cycles; the
//! breadth-first walk keeps a visited set so traversal always terminates.
//! The effective permission set is the deduplicated, lexicographically
//! sorted union over the whole reachable graph, which keeps the output
//! deterministic for clients.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::warn;

use super::{Principal, RegistryStore, StoreError};

/// The reserved superuser permission. A principal holding it passes every
/// capability check.
pub const SUPERUSER: &str = "cop";

/// Returns every principal reachable from `start` through `role`
/// references, including `start` itself. Each document is visited at most
/// once; dangling references are skipped with a warning.
pub async fn resolve_role_graph(
    store: &dyn RegistryStore,
    start: &Principal,
) -> Result<Vec<Principal>, StoreError> {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(start.name.clone());

    let mut queue: VecDeque<String> = start.role.iter().cloned().collect();
    let mut reachable = vec![start.clone()];

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name.clone()) {
            continue;
        }
        match store.find_by_name(&name).await {
            Ok(principal) => {
                queue.extend(principal.role.iter().cloned());
                reachable.push(principal);
            }
            Err(StoreError::NotFound) => {
                warn!(role = %name, "role reference points to a missing principal");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(reachable)
}

/// Cascaded permission set for a principal: the union of `perm` across its
/// resolved role graph, deduplicated and sorted ascending. An empty graph
/// yields an empty list.
pub async fn effective_permissions(
    store: &dyn RegistryStore,
    principal: &Principal,
) -> Result<Vec<String>, StoreError> {
    let graph = resolve_role_graph(store, principal).await?;
    let set: BTreeSet<String> = graph.into_iter().flat_map(|p| p.perm).collect();
    Ok(set.into_iter().collect())
}

/// Capability check: `perms` grants `target` when it holds the superuser
/// permission or a prefix of the target scope.
pub fn grants(perms: &[String], target: &str) -> bool {
    perms
        .iter()
        .any(|p| p == SUPERUSER || target.starts_with(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryStore;

    async fn seed(store: &MemoryStore, name: &str, perm: &[&str], role: &[&str]) {
        let mut p = Principal::new(name);
        p.perm = perm.iter().map(|s| s.to_string()).collect();
        p.role = role.iter().map(|s| s.to_string()).collect();
        store.insert(p).await.unwrap();
    }

    #[tokio::test]
    async fn cascade_is_sorted_and_deduplicated() {
        let store = MemoryStore::new();
        seed(&store, "a", &["api://app.abc"], &[]).await;
        seed(&store, "b", &["api://app.aaa", "api://app.abc"], &[]).await;
        seed(&store, "user", &["api://app.request"], &["a", "b"]).await;

        let user = store.find_by_name("user").await.unwrap();
        let perms = effective_permissions(&store, &user).await.unwrap();

        assert_eq!(
            perms,
            vec!["api://app.aaa", "api://app.abc", "api://app.request"]
        );
    }

    #[tokio::test]
    async fn cyclic_role_graph_terminates() {
        let store = MemoryStore::new();
        seed(&store, "a", &["x"], &["b"]).await;
        seed(&store, "b", &["y"], &["a"]).await;
        seed(&store, "user", &[], &["a"]).await;

        let user = store.find_by_name("user").await.unwrap();
        let perms = effective_permissions(&store, &user).await.unwrap();

        assert_eq!(perms, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn self_referencing_role_terminates() {
        let store = MemoryStore::new();
        seed(&store, "narcissus", &["mirror"], &["narcissus"]).await;

        let p = store.find_by_name("narcissus").await.unwrap();
        let perms = effective_permissions(&store, &p).await.unwrap();
        assert_eq!(perms, vec!["mirror"]);
    }

    #[tokio::test]
    async fn missing_role_reference_is_skipped() {
        let store = MemoryStore::new();
        seed(&store, "user", &["own"], &["gone"]).await;

        let user = store.find_by_name("user").await.unwrap();
        let perms = effective_permissions(&store, &user).await.unwrap();
        assert_eq!(perms, vec!["own"]);
    }

    #[tokio::test]
    async fn empty_graph_yields_empty_list() {
        let store = MemoryStore::new();
        seed(&store, "bare", &[], &[]).await;

        let p = store.find_by_name("bare").await.unwrap();
        let perms = effective_permissions(&store, &p).await.unwrap();
        assert!(perms.is_empty());
    }

    #[tokio::test]
    async fn diamond_graph_visits_each_role_once() {
        let store = MemoryStore::new();
        seed(&store, "base", &["shared"], &[]).await;
        seed(&store, "left", &["l"], &["base"]).await;
        seed(&store, "right", &["r"], &["base"]).await;
        seed(&store, "user", &[], &["left", "right"]).await;

        let user = store.find_by_name("user").await.unwrap();
        let perms = effective_permissions(&store, &user).await.unwrap();
        assert_eq!(perms, vec!["l", "r", "shared"]);
    }

    #[test]
    fn grants_matches_prefix_or_superuser() {
        let perms = vec!["api://roles".to_string()];
        assert!(grants(&perms, "api://roles"));
        assert!(grants(&perms, "api://roles/ops"));
        assert!(!grants(&perms, "api://users"));

        let cop = vec![SUPERUSER.to_string()];
        assert!(grants(&cop, "api://anything"));

        assert!(!grants(&[], "api://roles"));
    }
}
