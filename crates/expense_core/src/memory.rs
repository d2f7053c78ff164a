//! In-memory implementation of every storage port, for tests and local runs.
//!
//! All state sits behind one `RwLock`, so each check-then-write below is
//! atomic with respect to concurrent callers, which is the same guarantee the
//! Postgres unique indexes and foreign keys give.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::cycles::has_expenses;
use crate::error::ExpenseError;
use crate::expenses::check_expense_against_cycle;
use crate::ports::*;
use crate::types::*;

#[derive(Default)]
struct State {
    projects: HashMap<Uuid, Project>,
    users: HashMap<Uuid, PublicUser>,
    collaborators: HashMap<(Uuid, Uuid), ProjectCollaborator>,
    cycles: HashMap<Uuid, ProjectCycle>,
    expenses: HashMap<Uuid, Expense>,
}

impl State {
    fn start_taken(&self, cycle: &ProjectCycle) -> bool {
        self.cycles.values().any(|c| {
            c.id != cycle.id && c.project_id == cycle.project_id && c.cycle_start == cycle.cycle_start
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|e| ExpenseError::Internal(anyhow!("Lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|e| ExpenseError::Internal(anyhow!("Lock: {}", e)))
    }

    // ── Seeding (the user directory is read-only through its port) ──

    pub fn put_user(&self, user: PublicUser) -> Result<()> {
        self.write()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn put_project(&self, project: Project) -> Result<()> {
        self.write()?.projects.insert(project.id, project);
        Ok(())
    }

    pub fn put_collaborator(&self, collaborator: ProjectCollaborator) -> Result<()> {
        self.write()?.collaborators.insert(
            (collaborator.project_id, collaborator.user_id),
            collaborator,
        );
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>> {
        Ok(self.read()?.projects.get(&project_id).cloned())
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        let mut state = self.write()?;
        if state.projects.contains_key(&project.id) {
            return Err(ExpenseError::Conflict(format!(
                "project {} already exists",
                project.id
            )));
        }
        state.projects.insert(project.id, project.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<PublicUser>> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PublicUser>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<PublicUser>> {
        let state = self.read()?;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl CollaboratorStore for MemoryStore {
    async fn find_collaborator(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectCollaborator>> {
        Ok(self
            .read()?
            .collaborators
            .get(&(project_id, user_id))
            .cloned())
    }

    async fn list_collaborators(&self, project_id: Uuid) -> Result<Vec<ProjectCollaborator>> {
        let mut rows: Vec<_> = self
            .read()?
            .collaborators
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows)
    }

    async fn insert_collaborator(&self, collaborator: &ProjectCollaborator) -> Result<()> {
        let key = (collaborator.project_id, collaborator.user_id);
        let mut state = self.write()?;
        if state.collaborators.contains_key(&key) {
            return Err(ExpenseError::Conflict(format!(
                "user {} is already a collaborator on this project",
                collaborator.user_id
            )));
        }
        state.collaborators.insert(key, collaborator.clone());
        Ok(())
    }

    async fn update_collaborator_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Option<ProjectCollaborator>> {
        let mut state = self.write()?;
        Ok(state
            .collaborators
            .get_mut(&(project_id, user_id))
            .map(|row| {
                row.role = role;
                row.clone()
            }))
    }

    async fn delete_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(self
            .write()?
            .collaborators
            .remove(&(project_id, user_id))
            .is_some())
    }
}

#[async_trait]
impl CycleStore for MemoryStore {
    async fn get_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<Option<ProjectCycle>> {
        Ok(self
            .read()?
            .cycles
            .get(&cycle_id)
            .filter(|c| c.project_id == project_id)
            .cloned())
    }

    async fn list_cycles(&self, project_id: Uuid) -> Result<Vec<ProjectCycle>> {
        let mut cycles: Vec<_> = self
            .read()?
            .cycles
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        cycles.sort_by_key(|c| c.cycle_start);
        Ok(cycles)
    }

    async fn insert_cycle(&self, cycle: &ProjectCycle) -> Result<()> {
        let mut state = self.write()?;
        if state.start_taken(cycle) {
            return Err(start_conflict(cycle));
        }
        state.cycles.insert(cycle.id, cycle.clone());
        Ok(())
    }

    async fn update_cycle(&self, cycle: &ProjectCycle) -> Result<Option<ProjectCycle>> {
        let mut state = self.write()?;
        if state.start_taken(cycle) {
            return Err(start_conflict(cycle));
        }
        let Some(row) = state
            .cycles
            .get_mut(&cycle.id)
            .filter(|c| c.project_id == cycle.project_id && !c.is_locked)
        else {
            return Ok(None);
        };
        row.cycle_start = cycle.cycle_start;
        row.cycle_end = cycle.cycle_end;
        row.budget_amount = cycle.budget_amount;
        row.rollover_mode = cycle.rollover_mode;
        row.updated_at = cycle.updated_at;
        Ok(Some(row.clone()))
    }

    async fn set_cycle_lock(
        &self,
        project_id: Uuid,
        cycle_id: Uuid,
        locked: Option<bool>,
    ) -> Result<Option<ProjectCycle>> {
        let mut state = self.write()?;
        Ok(state
            .cycles
            .get_mut(&cycle_id)
            .filter(|c| c.project_id == project_id)
            .map(|row| {
                row.is_locked = locked.unwrap_or(!row.is_locked);
                row.updated_at = Utc::now();
                row.clone()
            }))
    }

    async fn delete_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<bool> {
        let mut state = self.write()?;
        if !state
            .cycles
            .get(&cycle_id)
            .is_some_and(|c| c.project_id == project_id)
        {
            return Ok(false);
        }
        let attached = state
            .expenses
            .values()
            .filter(|e| e.cycle_id == Some(cycle_id))
            .count() as u64;
        if attached > 0 {
            return Err(has_expenses(attached));
        }
        state.cycles.remove(&cycle_id);
        Ok(true)
    }
}

#[async_trait]
impl ExpenseStore for MemoryStore {
    async fn count_by_cycle(&self, cycle_id: Uuid) -> Result<u64> {
        Ok(self
            .read()?
            .expenses
            .values()
            .filter(|e| e.cycle_id == Some(cycle_id))
            .count() as u64)
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        let mut state = self.write()?;
        if let Some(cycle_id) = expense.cycle_id {
            let cycle = state.cycles.get(&cycle_id).ok_or_else(|| {
                ExpenseError::BadRequest(format!("cycle {cycle_id} does not exist"))
            })?;
            check_expense_against_cycle(expense.project_id, expense.incurred_at, cycle)?;
        }
        state.expenses.insert(expense.id, expense.clone());
        Ok(())
    }
}

fn start_conflict(cycle: &ProjectCycle) -> ExpenseError {
    ExpenseError::Conflict(format!(
        "a cycle starting at {} already exists in this project",
        cycle.cycle_start
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use rust_decimal::Decimal;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 0, 0, 0).unwrap()
    }

    fn cycle(project_id: Uuid, start: u32) -> ProjectCycle {
        ProjectCycle {
            id: Uuid::new_v4(),
            project_id,
            cycle_start: day(start),
            cycle_end: day(start + 1),
            budget_amount: Decimal::ZERO,
            rollover_mode: RolloverMode::None,
            is_locked: false,
            created_at: day(1),
            updated_at: day(1),
        }
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let store = MemoryStore::new();
        let user = PublicUser {
            id: Uuid::new_v4(),
            email: "Dana@Example.com".into(),
            first_name: Some("Dana".into()),
            last_name: None,
            avatar_url: None,
        };
        store.put_user(user.clone()).unwrap();
        assert_eq!(
            store.find_by_email("dana@example.com").await.unwrap(),
            Some(user)
        );
    }

    #[tokio::test]
    async fn duplicate_collaborator_insert_conflicts() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        store
            .insert_collaborator(&ProjectCollaborator::new(
                project_id,
                user_id,
                CollaboratorRole::Viewer,
            ))
            .await
            .unwrap();
        let err = store
            .insert_collaborator(&ProjectCollaborator::new(
                project_id,
                user_id,
                CollaboratorRole::Editor,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_skips_locked_rows() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        let c = cycle(project_id, 1);
        store.insert_cycle(&c).await.unwrap();
        store.set_cycle_lock(project_id, c.id, Some(true)).await.unwrap();

        let mut patched = c.clone();
        patched.budget_amount = Decimal::from(9);
        assert!(store.update_cycle(&patched).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_ordered_by_start() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        for start in [9, 3, 6] {
            store.insert_cycle(&cycle(project_id, start)).await.unwrap();
        }
        let starts: Vec<_> = store
            .list_cycles(project_id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.cycle_start)
            .collect();
        assert_eq!(starts, vec![day(3), day(6), day(9)]);
    }

    #[tokio::test]
    async fn delete_refuses_referenced_cycle() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        let c = cycle(project_id, 1);
        store.insert_cycle(&c).await.unwrap();
        store
            .insert_expense(&Expense {
                id: Uuid::new_v4(),
                project_id,
                cycle_id: Some(c.id),
                amount: Decimal::ONE,
                description: None,
                incurred_at: day(1),
                created_by: Uuid::new_v4(),
                created_at: day(1),
            })
            .await
            .unwrap();
        assert!(matches!(
            store.delete_cycle(project_id, c.id).await,
            Err(ExpenseError::BadRequest(_))
        ));
        assert!(!store.delete_cycle(Uuid::new_v4(), c.id).await.unwrap());
    }

    #[tokio::test]
    async fn insert_expense_rechecks_cycle_under_the_write_lock() {
        let store = MemoryStore::new();
        let project_id = Uuid::new_v4();
        let c = cycle(project_id, 1);
        store.insert_cycle(&c).await.unwrap();
        // Locked after the caller validated against the unlocked row.
        store
            .set_cycle_lock(project_id, c.id, Some(true))
            .await
            .unwrap();

        let expense = Expense {
            id: Uuid::new_v4(),
            project_id,
            cycle_id: Some(c.id),
            amount: Decimal::ONE,
            description: None,
            incurred_at: day(1),
            created_by: Uuid::new_v4(),
            created_at: day(1),
        };
        assert!(matches!(
            store.insert_expense(&expense).await,
            Err(ExpenseError::BadRequest(_))
        ));
        assert_eq!(store.count_by_cycle(c.id).await.unwrap(), 0);

        store
            .set_cycle_lock(project_id, c.id, Some(false))
            .await
            .unwrap();
        let late = Expense {
            id: Uuid::new_v4(),
            incurred_at: day(5),
            ..expense.clone()
        };
        assert!(store.insert_expense(&late).await.is_err());
        store.insert_expense(&expense).await.unwrap();
        assert_eq!(store.count_by_cycle(c.id).await.unwrap(), 1);
    }
}
