//! Request-time gates.
//!
//! Every project-scoped handler composes them explicitly:
//!
//! ```text
//! AccessGuard::enter  →  PermissionGuard::authorize  →  component method
//! ```
//!
//! `AccessGuard` resolves the caller's role once and returns a
//! [`ProjectContext`]; that value is passed to every later check instead of
//! being stashed on the request.

use uuid::Uuid;

use crate::error::ExpenseError;
use crate::permissions::{Permission, PermissionMatrix};
use crate::ports::Result;
use crate::resolver::RoleResolver;
use crate::types::{Project, Role};

// ── ProjectContext ────────────────────────────────────────────

/// Validated caller identity on one project, computed once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectContext {
    pub user_id: Uuid,
    pub project: Project,
    pub role: Role,
}

impl ProjectContext {
    pub fn project_id(&self) -> Uuid {
        self.project.id
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }

    /// Owner holds every permission; everyone else goes through the matrix.
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_owner() || PermissionMatrix::global().has_permission(self.role, permission)
    }

    /// Fail unless the caller's role is one of `allowed`.
    pub fn require_role(&self, allowed: &[Role], action: &str) -> Result<()> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(ExpenseError::Forbidden(format!(
                "role '{}' may not {action} (requires {})",
                self.role,
                join_roles(allowed)
            )))
        }
    }
}

// ── AccessGuard ───────────────────────────────────────────────

#[derive(Clone)]
pub struct AccessGuard {
    resolver: RoleResolver,
}

impl AccessGuard {
    pub fn new(resolver: RoleResolver) -> Self {
        Self { resolver }
    }

    /// Resolve the caller's role or fail (`NotFound` / `Forbidden`).
    pub async fn enter(&self, user_id: Uuid, project_id: Uuid) -> Result<ProjectContext> {
        let resolved = self.resolver.resolve(user_id, project_id).await?;
        Ok(ProjectContext {
            user_id,
            project: resolved.project,
            role: resolved.role,
        })
    }
}

// ── EndpointPolicy / PermissionGuard ──────────────────────────

/// What an endpoint declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointPolicy {
    /// No role or permission check at all.
    Public,
    /// Any-of semantics within each list; an empty list imposes nothing.
    Members {
        roles: &'static [Role],
        permissions: &'static [Permission],
    },
}

impl EndpointPolicy {
    pub const fn any_member() -> Self {
        Self::Members {
            roles: &[],
            permissions: &[],
        }
    }

    pub const fn permissions(permissions: &'static [Permission]) -> Self {
        Self::Members {
            roles: &[],
            permissions,
        }
    }

    pub const fn roles(roles: &'static [Role]) -> Self {
        Self::Members {
            roles,
            permissions: &[],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PermissionGuard {
    matrix: &'static PermissionMatrix,
}

impl Default for PermissionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGuard {
    pub fn new() -> Self {
        Self {
            matrix: PermissionMatrix::global(),
        }
    }

    pub fn authorize(&self, ctx: &ProjectContext, policy: &EndpointPolicy) -> Result<()> {
        self.authorize_role(ctx.role, policy).inspect_err(|_| {
            tracing::warn!(
                user_id = %ctx.user_id,
                project_id = %ctx.project_id(),
                role = %ctx.role,
                ?policy,
                "permission denied"
            );
        })
    }

    /// Pure decision for a resolved role.
    pub fn authorize_role(&self, role: Role, policy: &EndpointPolicy) -> Result<()> {
        let EndpointPolicy::Members { roles, permissions } = policy else {
            return Ok(());
        };

        if !roles.is_empty() && !roles.contains(&role) {
            return Err(ExpenseError::Forbidden(format!(
                "requires role {}, caller is '{role}'",
                join_roles(roles)
            )));
        }

        if permissions.is_empty() || role == Role::Owner {
            return Ok(());
        }

        if self.matrix.has_any(role, permissions) {
            Ok(())
        } else {
            let wanted: Vec<&str> = permissions.iter().map(|p| p.as_str()).collect();
            Err(ExpenseError::Forbidden(format!(
                "role '{role}' lacks permission {}",
                wanted.join(" or ")
            )))
        }
    }
}

fn join_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.as_ref())
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::{CollaboratorRole, ProjectCollaborator};

    const CYCLE_UPDATE: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CycleUpdate]);
    const OWNER_ONLY: EndpointPolicy = EndpointPolicy::roles(&[Role::Owner]);

    #[test]
    fn public_skips_every_check() {
        let guard = PermissionGuard::new();
        for role in [Role::Owner, Role::Editor, Role::Commenter, Role::Viewer] {
            assert!(guard.authorize_role(role, &EndpointPolicy::Public).is_ok());
        }
    }

    #[test]
    fn empty_requirement_passes_any_member() {
        let guard = PermissionGuard::new();
        assert!(guard
            .authorize_role(Role::Viewer, &EndpointPolicy::any_member())
            .is_ok());
    }

    #[test]
    fn permission_requirement_uses_matrix() {
        let guard = PermissionGuard::new();
        assert!(guard.authorize_role(Role::Editor, &CYCLE_UPDATE).is_ok());
        let err = guard.authorize_role(Role::Viewer, &CYCLE_UPDATE).unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(ref m) if m.contains("cycle:update")));
    }

    #[test]
    fn any_listed_permission_suffices() {
        const EITHER: EndpointPolicy =
            EndpointPolicy::permissions(&[Permission::ExpenseDelete, Permission::CommentCreate]);
        let guard = PermissionGuard::new();
        assert!(guard.authorize_role(Role::Commenter, &EITHER).is_ok());
        assert!(guard.authorize_role(Role::Viewer, &EITHER).is_err());
    }

    #[test]
    fn role_requirement_names_the_role() {
        let guard = PermissionGuard::new();
        assert!(guard.authorize_role(Role::Owner, &OWNER_ONLY).is_ok());
        let err = guard.authorize_role(Role::Editor, &OWNER_ONLY).unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(ref m) if m.contains("owner")));
    }

    #[test]
    fn owner_passes_permission_checks() {
        const DELETE_PROJECT: EndpointPolicy =
            EndpointPolicy::permissions(&[Permission::ProjectDelete]);
        assert!(PermissionGuard::new()
            .authorize_role(Role::Owner, &DELETE_PROJECT)
            .is_ok());
    }

    #[tokio::test]
    async fn access_guard_produces_context_once() {
        let store = Arc::new(MemoryStore::new());
        let project = Project::new(Uuid::new_v4(), "Groceries");
        store.put_project(project.clone()).unwrap();
        let editor = Uuid::new_v4();
        store
            .put_collaborator(ProjectCollaborator::new(
                project.id,
                editor,
                CollaboratorRole::Editor,
            ))
            .unwrap();

        let guard = AccessGuard::new(RoleResolver::new(store.clone(), store.clone()));
        let ctx = guard.enter(editor, project.id).await.unwrap();
        assert_eq!(ctx.role, Role::Editor);
        assert_eq!(ctx.project_id(), project.id);
        assert!(!ctx.is_owner());
        assert!(ctx.has_permission(Permission::CycleCreate));
        assert!(!ctx.has_permission(Permission::CycleDelete));
        assert!(ctx
            .require_role(&[Role::Owner, Role::Editor], "update cycles")
            .is_ok());
        assert!(ctx.require_role(&[Role::Owner], "lock cycles").is_err());

        let err = guard.enter(Uuid::new_v4(), project.id).await.unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(_)));
    }
}
