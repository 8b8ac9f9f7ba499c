//! Namespace permission checks

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::application_id::ApplicationId;
use crate::error::Result;

/// Identity of the caller, supplied by the embedding service
pub trait Claims: Send + Sync {
    fn user(&self) -> &str;

    fn current_account(&self) -> &str;

    /// Whether the caller belongs to `namespace`, as an admin if `require_admin`
    fn is_authorized(&self, namespace: &str, require_admin: bool) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
}

/// Claims backed by a fixed namespace membership map
#[derive(Debug, Clone, Default)]
pub struct StaticClaims {
    user: String,
    current_account: String,
    memberships: BTreeMap<String, Role>,
}

impl StaticClaims {
    pub fn new(user: impl Into<String>, current_account: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            current_account: current_account.into(),
            memberships: BTreeMap::new(),
        }
    }

    pub fn with_membership(mut self, namespace: impl Into<String>, role: Role) -> Self {
        self.memberships.insert(namespace.into(), role);
        self
    }
}

impl Claims for StaticClaims {
    fn user(&self) -> &str {
        &self.user
    }

    fn current_account(&self) -> &str {
        &self.current_account
    }

    fn is_authorized(&self, namespace: &str, require_admin: bool) -> bool {
        match self.memberships.get(namespace) {
            Some(Role::Admin) => true,
            Some(Role::Member) => !require_admin,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionResolver {
    auth_enabled: bool,
    privileged_users: BTreeSet<String>,
    team_namespaces: BTreeSet<String>,
}

impl PermissionResolver {
    pub fn new<U, N>(auth_enabled: bool, privileged_users: U, team_namespaces: N) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            auth_enabled,
            privileged_users: privileged_users.into_iter().map(Into::into).collect(),
            team_namespaces: team_namespaces.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolver that allows everything
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Whether `claims` may act on the namespace of `raw_id`
    ///
    /// Privileged users act on team namespaces without membership. Fails
    /// only when the id cannot be decoded.
    pub fn check_permission(
        &self,
        claims: &dyn Claims,
        raw_id: &str,
        require_owner: bool,
    ) -> Result<bool> {
        if !self.auth_enabled {
            return Ok(true);
        }

        let (_, id) = ApplicationId::decompose(raw_id)?;
        if self.privileged_users.contains(claims.user())
            && self.team_namespaces.contains(&id.namespace)
        {
            debug!(user = claims.user(), namespace = %id.namespace, "privileged access");
            return Ok(true);
        }

        Ok(claims.is_authorized(&id.namespace, require_owner))
    }
}
