//! RoleResolver — a user's effective role on a project.
//!
//! Unknown project → `NotFound`; known project without membership →
//! `Forbidden`. The asymmetry is deliberate: a missing project leaks nothing,
//! while a caller who already knows the project learns only that access is denied.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::ExpenseError;
use crate::ports::{CollaboratorStore, ProjectStore, Result};
use crate::types::{Project, Role};

/// Project row plus the role it grants the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRole {
    pub project: Project,
    pub role: Role,
}

#[derive(Clone)]
pub struct RoleResolver {
    projects: Arc<dyn ProjectStore>,
    collaborators: Arc<dyn CollaboratorStore>,
}

impl RoleResolver {
    pub fn new(projects: Arc<dyn ProjectStore>, collaborators: Arc<dyn CollaboratorStore>) -> Self {
        Self {
            projects,
            collaborators,
        }
    }

    pub async fn load_project(&self, project_id: Uuid) -> Result<Project> {
        self.projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| ExpenseError::NotFound(format!("project {project_id} not found")))
    }

    pub async fn resolve(&self, user_id: Uuid, project_id: Uuid) -> Result<ResolvedRole> {
        let project = self.load_project(project_id).await?;

        if project.is_owner(user_id) {
            tracing::debug!(%user_id, %project_id, "resolved role owner");
            return Ok(ResolvedRole {
                project,
                role: Role::Owner,
            });
        }

        match self
            .collaborators
            .find_collaborator(project_id, user_id)
            .await?
        {
            Some(row) => {
                let role = Role::from(row.role);
                tracing::debug!(%user_id, %project_id, %role, "resolved collaborator role");
                Ok(ResolvedRole { project, role })
            }
            None => {
                tracing::warn!(%user_id, %project_id, "no access to project");
                Err(ExpenseError::Forbidden(
                    "you do not have access to this project".into(),
                ))
            }
        }
    }

    pub async fn resolve_role(&self, user_id: Uuid, project_id: Uuid) -> Result<Role> {
        Ok(self.resolve(user_id, project_id).await?.role)
    }
}
