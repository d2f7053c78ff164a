//! CollaboratorAdmin — project membership management.
//!
//! Mutations are owner-only and re-derive ownership from `project.owner_id`
//! on every call, whatever a coarse guard decided earlier. The owner is
//! structural: never a collaborator row, never re-roled, never removed.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::ExpenseError;
use crate::ports::{CollaboratorStore, ProjectStore, Result, UserDirectory};
use crate::types::*;

#[derive(Clone)]
pub struct CollaboratorAdmin {
    projects: Arc<dyn ProjectStore>,
    users: Arc<dyn UserDirectory>,
    collaborators: Arc<dyn CollaboratorStore>,
}

impl CollaboratorAdmin {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        users: Arc<dyn UserDirectory>,
        collaborators: Arc<dyn CollaboratorStore>,
    ) -> Self {
        Self {
            projects,
            users,
            collaborators,
        }
    }

    async fn load_project(&self, project_id: Uuid) -> Result<Project> {
        self.projects
            .get_project(project_id)
            .await?
            .ok_or_else(|| ExpenseError::NotFound(format!("project {project_id} not found")))
    }

    /// Invite a user (by email) with `role`, defaulting to viewer.
    pub async fn add(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        email: &str,
        role: Option<CollaboratorRole>,
    ) -> Result<Mutation<CollaboratorView>> {
        let project = self.load_project(project_id).await?;
        project.require_owner(requester_id, "add collaborators")?;

        let email = email.trim();
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| ExpenseError::NotFound(format!("no user with email {email}")))?;

        if project.is_owner(user.id) {
            return Err(ExpenseError::Conflict(
                "the project owner cannot be added as a collaborator".into(),
            ));
        }

        if self
            .collaborators
            .find_collaborator(project_id, user.id)
            .await?
            .is_some()
        {
            return Err(already_member(&user));
        }

        let row = ProjectCollaborator::new(project_id, user.id, role.unwrap_or_default());
        // The store re-checks uniqueness atomically; a concurrent add surfaces as Conflict.
        self.collaborators.insert_collaborator(&row).await?;

        tracing::info!(
            %project_id,
            user_id = %user.id,
            role = %row.role,
            "collaborator added"
        );
        Ok(Mutation::new(
            format!("{} added as {}", user.email, row.role),
            CollaboratorView::new(row, user),
        ))
    }

    /// Owner plus every collaborator row. Any member may list.
    pub async fn list(&self, requester_id: Uuid, project_id: Uuid) -> Result<ProjectMembers> {
        let project = self.load_project(project_id).await?;

        let rows = self.collaborators.list_collaborators(project_id).await?;
        let is_member =
            project.is_owner(requester_id) || rows.iter().any(|r| r.user_id == requester_id);
        if !is_member {
            return Err(ExpenseError::Forbidden(
                "you do not have access to this project".into(),
            ));
        }

        let mut ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();
        ids.push(project.owner_id);
        let mut users: HashMap<Uuid, PublicUser> = self
            .users
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let owner = users.remove(&project.owner_id).ok_or_else(|| {
            ExpenseError::Internal(anyhow::anyhow!(
                "owner {} of project {project_id} missing from user directory",
                project.owner_id
            ))
        })?;

        let collaborators = rows
            .into_iter()
            .filter_map(|row| match users.remove(&row.user_id) {
                Some(user) => Some(CollaboratorView::new(row, user)),
                None => {
                    tracing::warn!(%project_id, user_id = %row.user_id, "collaborator without user record");
                    None
                }
            })
            .collect();

        Ok(ProjectMembers {
            project_id,
            owner,
            collaborators,
        })
    }

    pub async fn update_role(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        target_user_id: Uuid,
        new_role: CollaboratorRole,
    ) -> Result<Mutation<CollaboratorView>> {
        let project = self.load_project(project_id).await?;
        project.require_owner(requester_id, "change collaborator roles")?;
        if project.is_owner(target_user_id) {
            return Err(ExpenseError::Forbidden(
                "the project owner's role cannot be changed".into(),
            ));
        }

        // Resolve the public projection first so a failed lookup leaves the row untouched.
        let user = self
            .users
            .find_by_id(target_user_id)
            .await?
            .ok_or_else(|| not_a_collaborator(target_user_id))?;
        let row = self
            .collaborators
            .update_collaborator_role(project_id, target_user_id, new_role)
            .await?
            .ok_or_else(|| not_a_collaborator(target_user_id))?;

        tracing::info!(%project_id, user_id = %target_user_id, role = %new_role, "collaborator role updated");
        Ok(Mutation::new(
            format!("{} is now {}", user.email, new_role),
            CollaboratorView::new(row, user),
        ))
    }

    pub async fn remove(
        &self,
        requester_id: Uuid,
        project_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<Mutation<Uuid>> {
        let project = self.load_project(project_id).await?;
        project.require_owner(requester_id, "remove collaborators")?;
        if project.is_owner(target_user_id) {
            return Err(ExpenseError::Forbidden(
                "the project owner cannot be removed".into(),
            ));
        }

        if !self
            .collaborators
            .delete_collaborator(project_id, target_user_id)
            .await?
        {
            return Err(not_a_collaborator(target_user_id));
        }

        tracing::info!(%project_id, user_id = %target_user_id, "collaborator removed");
        Ok(Mutation::new("collaborator removed", target_user_id))
    }
}

fn already_member(user: &PublicUser) -> ExpenseError {
    ExpenseError::Conflict(format!(
        "{} is already a collaborator on this project",
        user.email
    ))
}

fn not_a_collaborator(user_id: Uuid) -> ExpenseError {
    ExpenseError::NotFound(format!("user {user_id} is not a collaborator on this project"))
}
