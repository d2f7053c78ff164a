//! Storage port traits. Implemented by `expense_postgres` and by
//! [`crate::memory::MemoryStore`]; core logic depends only on these traits.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ExpenseError;
use crate::types::*;

pub type Result<T> = std::result::Result<T, ExpenseError>;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>>;

    async fn insert_project(&self, project: &Project) -> Result<()>;
}

/// Read-only view over the user directory. Returns public profile fields only.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<PublicUser>>;

    /// Case-insensitive email lookup.
    async fn find_by_email(&self, email: &str) -> Result<Option<PublicUser>>;

    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<PublicUser>>;
}

#[async_trait]
pub trait CollaboratorStore: Send + Sync {
    async fn find_collaborator(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectCollaborator>>;

    async fn list_collaborators(&self, project_id: Uuid) -> Result<Vec<ProjectCollaborator>>;

    /// Insert a membership row.
    /// Must fail with `Conflict` if a row for (project_id, user_id) exists,
    /// atomically with the write.
    async fn insert_collaborator(&self, collaborator: &ProjectCollaborator) -> Result<()>;

    /// Returns `None` if no row exists.
    async fn update_collaborator_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Option<ProjectCollaborator>>;

    /// Returns `false` if no row existed.
    async fn delete_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait CycleStore: Send + Sync {
    /// Cycles are always addressed within their project; a cycle id from
    /// another project yields `None`.
    async fn get_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<Option<ProjectCycle>>;

    /// Ordered by `cycle_start` ascending.
    async fn list_cycles(&self, project_id: Uuid) -> Result<Vec<ProjectCycle>>;

    /// Must fail with `Conflict` if another cycle of the project starts at the
    /// same instant, atomically with the write.
    async fn insert_cycle(&self, cycle: &ProjectCycle) -> Result<()>;

    /// Overwrite the editable fields (start, end, budget, rollover mode,
    /// updated_at) of an unlocked cycle.
    ///
    /// Returns `None` if the cycle is gone or became locked before the write.
    /// Must fail with `Conflict` if the new start collides with another cycle.
    async fn update_cycle(&self, cycle: &ProjectCycle) -> Result<Option<ProjectCycle>>;

    /// Set the lock flag; `None` flips the current value in a single write.
    async fn set_cycle_lock(
        &self,
        project_id: Uuid,
        cycle_id: Uuid,
        locked: Option<bool>,
    ) -> Result<Option<ProjectCycle>>;

    /// Returns `false` if no row existed.
    /// Must fail with `BadRequest` if expenses still reference the cycle.
    async fn delete_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn count_by_cycle(&self, cycle_id: Uuid) -> Result<u64>;

    /// Must fail with `BadRequest` if the expense names a cycle that is
    /// missing, belongs to another project, is locked, or does not contain
    /// `incurred_at`, checked atomically with the write.
    async fn insert_expense(&self, expense: &Expense) -> Result<()>;
}

/// Bundle of port implementations handed to the components at startup.
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub users: Arc<dyn UserDirectory>,
    pub collaborators: Arc<dyn CollaboratorStore>,
    pub cycles: Arc<dyn CycleStore>,
    pub expenses: Arc<dyn ExpenseStore>,
}

impl Stores {
    /// All ports served by one in-memory store.
    pub fn in_memory(store: Arc<crate::memory::MemoryStore>) -> Self {
        Self {
            projects: store.clone(),
            users: store.clone(),
            collaborators: store.clone(),
            cycles: store.clone(),
            expenses: store,
        }
    }
}
