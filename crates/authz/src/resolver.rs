//! Role-based permission resolution.
//!
//! [`RbacResolver`] walks the user-to-role-to-permission graph. Users hold
//! roles, roles hold permissions, and a user's effective permissions are
//! the union of the permissions of their roles. Resolution is read-only
//! and order-preserving: roles are walked in assignment order and grants
//! in grant order, so the result is deterministic for a given history of
//! mutations.
//!
//! The resolver also owns the mutation side of the graph. Assignments and
//! grants are checked against the referenced rows before the pair store is
//! touched, and concurrent duplicate mutations admit exactly one winner.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tessera_storage::{
    PermissionId, PermissionRecord, PermissionStore, RoleId, RolePermissionStore, RoleRecord,
    RoleStore, StorageError, UserId, UserRoleStore, UserStore,
};

use crate::{
    error::{AuthzError, Result},
    validation::validate_permission_name,
};

/// Resolves and mutates the user-role-permission graph.
pub struct RbacResolver {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    user_roles: Arc<dyn UserRoleStore>,
    role_permissions: Arc<dyn RolePermissionStore>,
}

#[bon::bon]
impl RbacResolver {
    /// Assembles a resolver over the five backing stores.
    #[builder]
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        user_roles: Arc<dyn UserRoleStore>,
        role_permissions: Arc<dyn RolePermissionStore>,
    ) -> Self {
        Self { users, roles, permissions, user_roles, role_permissions }
    }
}

impl RbacResolver {
    /// IDs of the roles assigned to a user, in assignment order.
    ///
    /// Resolution does not check that the user row exists: an unknown user
    /// has no assignments and resolves to an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Storage`] if the lookup fails.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn roles_of(&self, user_id: UserId) -> Result<Vec<RoleId>> {
        Ok(self.user_roles.roles_of(user_id).await?)
    }

    /// Effective permissions of a user.
    ///
    /// Walks the user's roles in assignment order and each role's grants
    /// in grant order, keeping the first occurrence of every permission. A
    /// permission granted through several roles appears once, at the
    /// position of its earliest grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Storage`] if any lookup fails.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn permissions_of(&self, user_id: UserId) -> Result<Vec<PermissionRecord>> {
        let roles = self.user_roles.roles_of(user_id).await?;
        let per_role = self.permissions_of_roles(&roles).await?;

        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for permissions in per_role {
            for permission in permissions {
                if seen.insert(permission.id) {
                    merged.push(permission);
                }
            }
        }
        Ok(merged)
    }

    /// Permissions of several roles, aligned with `role_ids`.
    ///
    /// Each entry lists one role's permissions in grant order; a role with
    /// no grants, or one that does not exist, gets an empty list. Grants
    /// whose permission row is missing are dropped. Permission rows are
    /// fetched in one batch no matter how many roles are asked about.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::Storage`] if any lookup fails.
    #[tracing::instrument(skip(self, role_ids), fields(count = role_ids.len()))]
    pub async fn permissions_of_roles(
        &self,
        role_ids: &[RoleId],
    ) -> Result<Vec<Vec<PermissionRecord>>> {
        let id_lists = self.role_permissions.permissions_of_many(role_ids).await?;

        let mut unique: Vec<PermissionId> = id_lists.iter().flatten().copied().collect();
        unique.sort_unstable();
        unique.dedup();

        let rows = self.permissions.get_many(&unique).await?;
        let by_id: HashMap<PermissionId, PermissionRecord> = unique
            .into_iter()
            .zip(rows)
            .filter_map(|(id, row)| row.map(|record| (id, record)))
            .collect();

        Ok(id_lists
            .into_iter()
            .map(|ids| ids.into_iter().filter_map(|id| by_id.get(&id).cloned()).collect())
            .collect())
    }

    /// Assigns a role to a user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the user or the role does not
    /// exist, and [`AuthzError::AlreadyExists`] if the user already holds
    /// the role. Concurrent duplicate assignments admit exactly one
    /// winner; every loser observes the conflict.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, role_id = %role_id))]
    pub async fn assign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        if self.users.get(user_id).await?.is_none() {
            return Err(AuthzError::user_not_found(user_id));
        }
        if self.roles.get(role_id).await?.is_none() {
            return Err(AuthzError::role_not_found(role_id));
        }

        match self.user_roles.add(user_id, role_id).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthzError::already_exists(format!(
                    "user {user_id} already has role {role_id}"
                )));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "assign_role",
            audit.resource = %format_args!("user_role/{user_id}/{role_id}"),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }

    /// Removes a role assignment.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the user or the role does not
    /// exist, and [`AuthzError::FailedPrecondition`] if the user does not
    /// hold the role.
    #[tracing::instrument(skip(self), fields(user_id = %user_id, role_id = %role_id))]
    pub async fn unassign_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        if self.users.get(user_id).await?.is_none() {
            return Err(AuthzError::user_not_found(user_id));
        }
        if self.roles.get(role_id).await?.is_none() {
            return Err(AuthzError::role_not_found(role_id));
        }

        match self.user_roles.remove(user_id, role_id).await {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                return Err(AuthzError::failed_precondition(format!(
                    "user {user_id} does not have role {role_id}"
                )));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "unassign_role",
            audit.resource = %format_args!("user_role/{user_id}/{role_id}"),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }

    /// Grants a permission to a role.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the role or the permission does
    /// not exist, and [`AuthzError::AlreadyExists`] if the role already
    /// holds the permission.
    #[tracing::instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id))]
    pub async fn grant_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<()> {
        if self.roles.get(role_id).await?.is_none() {
            return Err(AuthzError::role_not_found(role_id));
        }
        if self.permissions.get(permission_id).await?.is_none() {
            return Err(AuthzError::permission_not_found(permission_id));
        }

        match self.role_permissions.add(role_id, permission_id).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthzError::already_exists(format!(
                    "role {role_id} already has permission {permission_id}"
                )));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "grant_permission",
            audit.resource = %format_args!("role_permission/{role_id}/{permission_id}"),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }

    /// Removes a permission grant.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::NotFound`] if the role or the permission does
    /// not exist, and [`AuthzError::FailedPrecondition`] if the role does
    /// not hold the permission.
    #[tracing::instrument(skip(self), fields(role_id = %role_id, permission_id = %permission_id))]
    pub async fn revoke_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> Result<()> {
        if self.roles.get(role_id).await?.is_none() {
            return Err(AuthzError::role_not_found(role_id));
        }
        if self.permissions.get(permission_id).await?.is_none() {
            return Err(AuthzError::permission_not_found(permission_id));
        }

        match self.role_permissions.remove(role_id, permission_id).await {
            Ok(()) => {}
            Err(StorageError::NotFound { .. }) => {
                return Err(AuthzError::failed_precondition(format!(
                    "role {role_id} does not have permission {permission_id}"
                )));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "revoke_permission",
            audit.resource = %format_args!("role_permission/{role_id}/{permission_id}"),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }

    /// Persists a new role.
    ///
    /// Display names are free-form text and are not validated here.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::AlreadyExists`] if the ID is taken.
    #[tracing::instrument(skip(self, role), fields(role_id = %role.id))]
    pub async fn create_role(&self, role: &RoleRecord) -> Result<()> {
        match self.roles.create(role).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthzError::already_exists(format!("role {}", role.id)));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "create_role",
            audit.resource = %format_args!("role/{}", role.id),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }

    /// Validates the name and persists a new permission.
    ///
    /// # Errors
    ///
    /// Returns [`AuthzError::InvalidArgument`] for a malformed name,
    /// rejected before the store is touched, and
    /// [`AuthzError::AlreadyExists`] if the ID or the name is taken.
    #[tracing::instrument(
        skip(self, permission),
        fields(permission_id = %permission.id, name = %permission.name)
    )]
    pub async fn create_permission(&self, permission: &PermissionRecord) -> Result<()> {
        validate_permission_name(&permission.name)?;

        match self.permissions.create(permission).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists { .. }) => {
                return Err(AuthzError::already_exists(format!(
                    "permission {} (name '{}')",
                    permission.id, permission.name
                )));
            }
            Err(other) => return Err(AuthzError::storage(other)),
        }

        tracing::info!(
            audit.action = "create_permission",
            audit.resource = %format_args!("permission/{}", permission.id),
            audit.result = "success",
            "audit_event"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use tessera_storage::{
        MemoryPermissionStore, MemoryRolePermissionStore, MemoryRoleStore, MemoryUserRoleStore,
        MemoryUserStore, UserStore,
        testutil::{make_permission, make_role, make_user},
    };

    use super::*;

    struct Fixture {
        resolver: Arc<RbacResolver>,
        users: Arc<MemoryUserStore>,
        role_permissions: Arc<MemoryRolePermissionStore>,
        permissions: Arc<MemoryPermissionStore>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MemoryUserStore::new());
        let roles = Arc::new(MemoryRoleStore::new());
        let permissions = Arc::new(MemoryPermissionStore::new());
        let user_roles = Arc::new(MemoryUserRoleStore::new());
        let role_permissions = Arc::new(MemoryRolePermissionStore::new());

        let resolver = RbacResolver::builder()
            .users(users.clone())
            .roles(roles)
            .permissions(Arc::clone(&permissions) as Arc<dyn PermissionStore>)
            .user_roles(user_roles)
            .role_permissions(Arc::clone(&role_permissions) as Arc<dyn RolePermissionStore>)
            .build();

        Fixture { resolver: Arc::new(resolver), users, role_permissions, permissions }
    }

    /// Seeds user 1 holding roles 10 and 20, where role 10 grants
    /// permissions 100 and 101 and role 20 grants 101 and 102.
    async fn seeded() -> Fixture {
        let fx = fixture();
        let r = &fx.resolver;

        fx.users.create(&make_user(1)).await.unwrap();
        r.create_role(&make_role(10)).await.unwrap();
        r.create_role(&make_role(20)).await.unwrap();
        r.create_permission(&make_permission(100, "articles.read")).await.unwrap();
        r.create_permission(&make_permission(101, "articles.write")).await.unwrap();
        r.create_permission(&make_permission(102, "articles.publish")).await.unwrap();

        r.grant_permission(RoleId::from(10), PermissionId::from(100)).await.unwrap();
        r.grant_permission(RoleId::from(10), PermissionId::from(101)).await.unwrap();
        r.grant_permission(RoleId::from(20), PermissionId::from(101)).await.unwrap();
        r.grant_permission(RoleId::from(20), PermissionId::from(102)).await.unwrap();

        r.assign_role(UserId::from(1), RoleId::from(10)).await.unwrap();
        r.assign_role(UserId::from(1), RoleId::from(20)).await.unwrap();

        fx
    }

    #[tokio::test]
    async fn test_permissions_of_dedups_preserving_first_seen_order() {
        let fx = seeded().await;

        // 101 is granted through both roles and must appear once, at the
        // position of its grant through role 10.
        let got = fx.resolver.permissions_of(UserId::from(1)).await.unwrap();
        let ids: Vec<i64> = got.iter().map(|p| i64::from(p.id)).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    #[tokio::test]
    async fn test_permissions_of_equals_union_over_assigned_roles() {
        let fx = seeded().await;
        let user = UserId::from(1);

        let direct = fx.resolver.permissions_of(user).await.unwrap();

        let roles = fx.resolver.roles_of(user).await.unwrap();
        let per_role = fx.resolver.permissions_of_roles(&roles).await.unwrap();
        let mut seen = std::collections::HashSet::new();
        let union: Vec<_> =
            per_role.into_iter().flatten().filter(|p| seen.insert(p.id)).collect();

        assert_eq!(direct, union);
    }

    #[tokio::test]
    async fn test_permissions_of_unknown_user_is_empty() {
        let fx = seeded().await;
        let got = fx.resolver.permissions_of(UserId::from(999)).await.unwrap();
        assert!(got.is_empty(), "unknown user must resolve to no permissions");
    }

    #[tokio::test]
    async fn test_roles_of_preserves_assignment_order() {
        let fx = seeded().await;
        let got = fx.resolver.roles_of(UserId::from(1)).await.unwrap();
        assert_eq!(got, vec![RoleId::from(10), RoleId::from(20)]);
    }

    #[tokio::test]
    async fn test_permissions_of_roles_aligns_with_input() {
        let fx = seeded().await;

        let got = fx
            .resolver
            .permissions_of_roles(&[RoleId::from(20), RoleId::from(99), RoleId::from(10)])
            .await
            .unwrap();

        assert_eq!(got.len(), 3);
        let ids = |slot: &[PermissionRecord]| -> Vec<i64> {
            slot.iter().map(|p| i64::from(p.id)).collect()
        };
        assert_eq!(ids(&got[0]), vec![101, 102]);
        assert!(got[1].is_empty(), "unknown role gets an empty slot, not an error");
        assert_eq!(ids(&got[2]), vec![100, 101]);
    }

    #[tokio::test]
    async fn test_grants_without_permission_rows_are_dropped() {
        let fx = seeded().await;

        // A grant whose permission row is gone resolves to nothing.
        fx.role_permissions.add(RoleId::from(10), PermissionId::from(777)).await.unwrap();

        let got = fx.resolver.permissions_of(UserId::from(1)).await.unwrap();
        let ids: Vec<i64> = got.iter().map(|p| i64::from(p.id)).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    #[tokio::test]
    async fn test_assign_role_requires_existing_user() {
        let fx = seeded().await;

        let err = fx.resolver.assign_role(UserId::from(999), RoleId::from(10)).await.unwrap_err();
        assert!(
            matches!(err, AuthzError::NotFound { entity: "User", .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_assign_role_requires_existing_role() {
        let fx = seeded().await;

        let err = fx.resolver.assign_role(UserId::from(1), RoleId::from(999)).await.unwrap_err();
        assert!(
            matches!(err, AuthzError::NotFound { entity: "Role", .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_duplicate_assignment_is_already_exists() {
        let fx = seeded().await;

        let err = fx.resolver.assign_role(UserId::from(1), RoleId::from(10)).await.unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyExists { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_unassign_missing_role_is_failed_precondition() {
        let fx = fixture();
        fx.users.create(&make_user(1)).await.unwrap();
        fx.resolver.create_role(&make_role(10)).await.unwrap();

        let err = fx.resolver.unassign_role(UserId::from(1), RoleId::from(10)).await.unwrap_err();
        assert!(matches!(err, AuthzError::FailedPrecondition { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_unassign_then_resolve_drops_that_roles_grants() {
        let fx = seeded().await;

        fx.resolver.unassign_role(UserId::from(1), RoleId::from(10)).await.unwrap();

        let got = fx.resolver.permissions_of(UserId::from(1)).await.unwrap();
        let ids: Vec<i64> = got.iter().map(|p| i64::from(p.id)).collect();
        assert_eq!(ids, vec![101, 102], "only role 20's grants remain");
    }

    #[tokio::test]
    async fn test_grant_requires_existing_role() {
        let fx = seeded().await;

        let err = fx
            .resolver
            .grant_permission(RoleId::from(999), PermissionId::from(100))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthzError::NotFound { entity: "Role", .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_grant_requires_existing_permission() {
        let fx = seeded().await;

        let err = fx
            .resolver
            .grant_permission(RoleId::from(10), PermissionId::from(999))
            .await
            .unwrap_err();
        assert!(
            matches!(err, AuthzError::NotFound { entity: "Permission", .. }),
            "got: {err:?}"
        );
    }

    #[tokio::test]
    async fn test_duplicate_grant_is_already_exists() {
        let fx = seeded().await;

        let err = fx
            .resolver
            .grant_permission(RoleId::from(10), PermissionId::from(100))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyExists { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_revoke_missing_grant_is_failed_precondition() {
        let fx = seeded().await;

        let err = fx
            .resolver
            .revoke_permission(RoleId::from(10), PermissionId::from(102))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::FailedPrecondition { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_create_permission_rejects_malformed_name_before_store() {
        let fx = fixture();

        let err = fx
            .resolver
            .create_permission(&make_permission(1, "Articles..Read"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidArgument { .. }), "got: {err:?}");

        // The rejected row must not have landed.
        assert!(fx.permissions.get(PermissionId::from(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_permission_duplicate_name_is_already_exists() {
        let fx = fixture();
        fx.resolver.create_permission(&make_permission(1, "articles.read")).await.unwrap();

        let err = fx
            .resolver
            .create_permission(&make_permission(2, "articles.read"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyExists { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_create_role_duplicate_id_is_already_exists() {
        let fx = fixture();
        fx.resolver.create_role(&make_role(10)).await.unwrap();

        let err = fx.resolver.create_role(&make_role(10)).await.unwrap_err();
        assert!(matches!(err, AuthzError::AlreadyExists { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_assignments_admit_exactly_one() {
        let fx = seeded().await;
        fx.resolver.create_role(&make_role(30)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let resolver = Arc::clone(&fx.resolver);
            handles.push(tokio::spawn(async move {
                resolver.assign_role(UserId::from(1), RoleId::from(30)).await
            }));
        }

        let mut won = 0;
        for handle in handles {
            match handle.await.expect("join") {
                Ok(()) => won += 1,
                Err(AuthzError::AlreadyExists { .. }) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(won, 1, "exactly one concurrent assignment must win");
        let roles = fx.resolver.roles_of(UserId::from(1)).await.unwrap();
        assert_eq!(roles.iter().filter(|r| **r == RoleId::from(30)).count(), 1);
    }
}
