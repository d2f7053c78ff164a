//! Core domain types for project collaboration and budget cycles.
//! Pure value types — no sqlx, no DB dependencies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::error::ExpenseError;

// ── Roles ─────────────────────────────────────────────────────

/// Effective role of a user on a project.
///
/// `Owner` is structural (derived from `Project::owner_id`), the other three
/// come from a collaborator row.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Owner,
    Editor,
    Commenter,
    Viewer,
}

/// Role carried by a collaborator row. `owner` is not representable here.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CollaboratorRole {
    Editor,
    Commenter,
    #[default]
    Viewer,
}

impl From<CollaboratorRole> for Role {
    fn from(role: CollaboratorRole) -> Self {
        match role {
            CollaboratorRole::Editor => Role::Editor,
            CollaboratorRole::Commenter => Role::Commenter,
            CollaboratorRole::Viewer => Role::Viewer,
        }
    }
}

/// How a cycle's leftover or overrun carries into the next cycle.
/// Tracked only; no arithmetic is applied.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    AsRefStr,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RolloverMode {
    #[default]
    None,
    RolloverPositive,
    RolloverNegative,
}

// ── Projects & users ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(owner_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            is_archived: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Direct ownership comparison, independent of any previously resolved role.
    pub fn require_owner(&self, user_id: Uuid, action: &str) -> Result<(), ExpenseError> {
        if self.is_owner(user_id) {
            Ok(())
        } else {
            Err(ExpenseError::Forbidden(format!(
                "only the project owner may {action}"
            )))
        }
    }
}

/// Public projection of a user. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

// ── Collaborators ─────────────────────────────────────────────

/// Membership row. Unique per (project_id, user_id); never the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCollaborator {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
}

impl ProjectCollaborator {
    pub fn new(project_id: Uuid, user_id: Uuid, role: CollaboratorRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Collaborator row joined with the member's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaboratorView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub role: CollaboratorRole,
    pub created_at: DateTime<Utc>,
    pub user: PublicUser,
}

impl CollaboratorView {
    pub fn new(row: ProjectCollaborator, user: PublicUser) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            project_id: row.project_id,
            role: row.role,
            created_at: row.created_at,
            user,
        }
    }
}

/// Everyone with access to a project: the owner plus collaborator rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMembers {
    pub project_id: Uuid,
    pub owner: PublicUser,
    pub collaborators: Vec<CollaboratorView>,
}

// ── Budget cycles ─────────────────────────────────────────────

/// A bounded budget window. Invariant: `cycle_start < cycle_end`.
/// `budget_amount` is in currency minor units and serializes as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCycle {
    pub id: Uuid,
    pub project_id: Uuid,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
    pub budget_amount: Decimal,
    pub rollover_mode: RolloverMode,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectCycle {
    /// Inclusive on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.cycle_start <= at && at <= self.cycle_end
    }
}

// ── Expenses ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub project_id: Uuid,
    pub cycle_id: Option<Uuid>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub incurred_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// ── Response envelope ─────────────────────────────────────────

/// Result of a successful mutation: the entity plus a confirmation for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation<T> {
    pub message: String,
    pub data: T,
}

impl<T> Mutation<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}
