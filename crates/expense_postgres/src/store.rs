//! Postgres implementations of the expense_core port traits.
//!
//! Each adapter wraps a `PgPool`. All SQL is runtime-checked
//! (`sqlx::query_as`, not `sqlx::query!`) so building needs no live database.
//! Uniqueness and the cycle/expense reference are enforced by constraints, so
//! the check and the write are a single statement.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use expense_core::error::ExpenseError;
use expense_core::ports::{
    CollaboratorStore, CycleStore, ExpenseStore, ProjectStore, Result, UserDirectory,
};
use expense_core::types::*;

use crate::sqlx_types::{PgCollaboratorRow, PgCycleRow, PgProjectRow, PgUserRow};

const CYCLE_COLUMNS: &str = "id, project_id, cycle_start, cycle_end, budget_amount, \
                             rollover_mode, is_locked, created_at, updated_at";

/// Map a write failure, turning constraint violations into domain errors.
fn write_error(e: sqlx::Error, conflict: impl FnOnce() -> String) -> ExpenseError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => ExpenseError::Conflict(conflict()),
        Some(db) if db.is_foreign_key_violation() => {
            ExpenseError::BadRequest(db.message().to_string())
        }
        _ => ExpenseError::Internal(anyhow!(e)),
    }
}

fn to_cycle(row: PgCycleRow) -> Result<ProjectCycle> {
    row.try_into()
        .map_err(|e: String| ExpenseError::Internal(anyhow!(e)))
}

fn to_collaborator(row: PgCollaboratorRow) -> Result<ProjectCollaborator> {
    row.try_into()
        .map_err(|e: String| ExpenseError::Internal(anyhow!(e)))
}

// ── PgProjectStore ────────────────────────────────────────────

pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, PgProjectRow>(
            r#"
            SELECT id, owner_id, name, is_archived, created_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(Project::from))
    }

    async fn insert_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, owner_id, name, is_archived, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(project.id)
        .bind(project.owner_id)
        .bind(&project.name)
        .bind(project.is_archived)
        .bind(project.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("project {} already exists", project.id)))?;
        Ok(())
    }
}

// ── PgUserDirectory ───────────────────────────────────────────

/// Reads the public columns of `users`; never selects credentials.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<PublicUser>> {
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT id, email, first_name, last_name, avatar_url
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(PublicUser::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<PublicUser>> {
        let row = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT id, email, first_name, last_name, avatar_url
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(row.map(PublicUser::from))
    }

    async fn find_many(&self, user_ids: &[Uuid]) -> Result<Vec<PublicUser>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PgUserRow>(
            r#"
            SELECT id, email, first_name, last_name, avatar_url
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(PublicUser::from).collect())
    }
}

// ── PgCollaboratorStore ───────────────────────────────────────

pub struct PgCollaboratorStore {
    pool: PgPool,
}

impl PgCollaboratorStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CollaboratorStore for PgCollaboratorStore {
    async fn find_collaborator(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectCollaborator>> {
        let row = sqlx::query_as::<_, PgCollaboratorRow>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_collaborators
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(to_collaborator).transpose()
    }

    async fn list_collaborators(&self, project_id: Uuid) -> Result<Vec<ProjectCollaborator>> {
        let rows = sqlx::query_as::<_, PgCollaboratorRow>(
            r#"
            SELECT id, project_id, user_id, role, created_at
            FROM project_collaborators
            WHERE project_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(to_collaborator).collect()
    }

    async fn insert_collaborator(&self, collaborator: &ProjectCollaborator) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_collaborators (id, project_id, user_id, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(collaborator.id)
        .bind(collaborator.project_id)
        .bind(collaborator.user_id)
        .bind(collaborator.role.as_ref())
        .bind(collaborator.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            write_error(e, || {
                format!(
                    "user {} is already a collaborator on this project",
                    collaborator.user_id
                )
            })
        })?;
        Ok(())
    }

    async fn update_collaborator_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: CollaboratorRole,
    ) -> Result<Option<ProjectCollaborator>> {
        let row = sqlx::query_as::<_, PgCollaboratorRow>(
            r#"
            UPDATE project_collaborators
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING id, project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        row.map(to_collaborator).transpose()
    }

    async fn delete_collaborator(&self, project_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM project_collaborators WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!(e))?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgCycleStore ──────────────────────────────────────────────

pub struct PgCycleStore {
    pool: PgPool,
}

impl PgCycleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn start_conflict(cycle: &ProjectCycle) -> String {
    format!(
        "a cycle starting at {} already exists in this project",
        cycle.cycle_start
    )
}

#[async_trait]
impl CycleStore for PgCycleStore {
    async fn get_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<Option<ProjectCycle>> {
        let query = format!(
            "SELECT {CYCLE_COLUMNS} FROM project_cycles WHERE id = $1 AND project_id = $2"
        );
        let row = sqlx::query_as::<_, PgCycleRow>(&query)
            .bind(cycle_id)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(to_cycle).transpose()
    }

    async fn list_cycles(&self, project_id: Uuid) -> Result<Vec<ProjectCycle>> {
        let query = format!(
            "SELECT {CYCLE_COLUMNS} FROM project_cycles WHERE project_id = $1 ORDER BY cycle_start"
        );
        let rows = sqlx::query_as::<_, PgCycleRow>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        rows.into_iter().map(to_cycle).collect()
    }

    async fn insert_cycle(&self, cycle: &ProjectCycle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_cycles
                (id, project_id, cycle_start, cycle_end, budget_amount,
                 rollover_mode, is_locked, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(cycle.id)
        .bind(cycle.project_id)
        .bind(cycle.cycle_start)
        .bind(cycle.cycle_end)
        .bind(cycle.budget_amount)
        .bind(cycle.rollover_mode.as_ref())
        .bind(cycle.is_locked)
        .bind(cycle.created_at)
        .bind(cycle.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || start_conflict(cycle)))?;
        Ok(())
    }

    async fn update_cycle(&self, cycle: &ProjectCycle) -> Result<Option<ProjectCycle>> {
        let query = format!(
            r#"
            UPDATE project_cycles
            SET cycle_start = $3, cycle_end = $4, budget_amount = $5,
                rollover_mode = $6, updated_at = $7
            WHERE id = $1 AND project_id = $2 AND is_locked = FALSE
            RETURNING {CYCLE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgCycleRow>(&query)
            .bind(cycle.id)
            .bind(cycle.project_id)
            .bind(cycle.cycle_start)
            .bind(cycle.cycle_end)
            .bind(cycle.budget_amount)
            .bind(cycle.rollover_mode.as_ref())
            .bind(cycle.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| write_error(e, || start_conflict(cycle)))?;
        row.map(to_cycle).transpose()
    }

    async fn set_cycle_lock(
        &self,
        project_id: Uuid,
        cycle_id: Uuid,
        locked: Option<bool>,
    ) -> Result<Option<ProjectCycle>> {
        let query = format!(
            r#"
            UPDATE project_cycles
            SET is_locked = COALESCE($3, NOT is_locked), updated_at = now()
            WHERE id = $1 AND project_id = $2
            RETURNING {CYCLE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, PgCycleRow>(&query)
            .bind(cycle_id)
            .bind(project_id)
            .bind(locked)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        row.map(to_cycle).transpose()
    }

    async fn delete_cycle(&self, project_id: Uuid, cycle_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM project_cycles WHERE id = $1 AND project_id = $2")
            .bind(cycle_id)
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_foreign_key_violation() => ExpenseError::BadRequest(
                    "cycle still has expenses; reassign or delete them first".into(),
                ),
                _ => ExpenseError::Internal(anyhow!(e)),
            })?;
        Ok(result.rows_affected() > 0)
    }
}

// ── PgExpenseStore ────────────────────────────────────────────

pub struct PgExpenseStore {
    pool: PgPool,
}

impl PgExpenseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    async fn count_by_cycle(&self, cycle_id: Uuid) -> Result<u64> {
        let (count,) =
            sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM expenses WHERE cycle_id = $1")
                .bind(cycle_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| anyhow!(e))?;
        Ok(count.max(0) as u64)
    }

    async fn insert_expense(&self, expense: &Expense) -> Result<()> {
        let Some(cycle_id) = expense.cycle_id else {
            sqlx::query(
                r#"
                INSERT INTO expenses
                    (id, project_id, cycle_id, amount, description, incurred_at, created_by, created_at)
                VALUES ($1, $2, NULL, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(expense.id)
            .bind(expense.project_id)
            .bind(expense.amount)
            .bind(&expense.description)
            .bind(expense.incurred_at)
            .bind(expense.created_by)
            .bind(expense.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(e, || format!("expense {} already exists", expense.id)))?;
            return Ok(());
        };

        // The cycle row is share-locked, so a concurrent lock waits for this
        // insert or is seen by it; never both.
        let result = sqlx::query(
            r#"
            INSERT INTO expenses
                (id, project_id, cycle_id, amount, description, incurred_at, created_by, created_at)
            SELECT $1, $2, c.id, $4, $5, $6, $7, $8
            FROM project_cycles c
            WHERE c.id = $3
              AND c.project_id = $2
              AND c.is_locked = FALSE
              AND $6 BETWEEN c.cycle_start AND c.cycle_end
            FOR SHARE
            "#,
        )
        .bind(expense.id)
        .bind(expense.project_id)
        .bind(cycle_id)
        .bind(expense.amount)
        .bind(&expense.description)
        .bind(expense.incurred_at)
        .bind(expense.created_by)
        .bind(expense.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(e, || format!("expense {} already exists", expense.id)))?;

        if result.rows_affected() == 0 {
            return Err(ExpenseError::BadRequest(format!(
                "cycle {cycle_id} does not accept this expense (missing, locked, or out of range)"
            )));
        }
        Ok(())
    }
}
