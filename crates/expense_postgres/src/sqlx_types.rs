//! Row types decoded by sqlx and their conversions into core types.
//!
//! Enum columns are stored as TEXT and parsed through the strum `FromStr`
//! impls on the core enums; an unknown value is a schema drift and surfaces
//! as an internal error.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use expense_core::types::*;

#[derive(Debug, sqlx::FromRow)]
pub struct PgProjectRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PgProjectRow> for Project {
    fn from(row: PgProjectRow) -> Self {
        Project {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            is_archived: row.is_archived,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgUserRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<PgUserRow> for PublicUser {
    fn from(row: PgUserRow) -> Self {
        PublicUser {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            avatar_url: row.avatar_url,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgCollaboratorRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgCollaboratorRow> for ProjectCollaborator {
    type Error = String;

    fn try_from(row: PgCollaboratorRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<CollaboratorRole>()
            .map_err(|_| format!("invalid collaborator role '{}' on row {}", row.role, row.id))?;
        Ok(ProjectCollaborator {
            id: row.id,
            project_id: row.project_id,
            user_id: row.user_id,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PgCycleRow {
    pub id: Uuid,
    pub project_id: Uuid,
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
    pub budget_amount: Decimal,
    pub rollover_mode: String,
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<PgCycleRow> for ProjectCycle {
    type Error = String;

    fn try_from(row: PgCycleRow) -> Result<Self, Self::Error> {
        let rollover_mode = row.rollover_mode.parse::<RolloverMode>().map_err(|_| {
            format!(
                "invalid rollover_mode '{}' on cycle {}",
                row.rollover_mode, row.id
            )
        })?;
        Ok(ProjectCycle {
            id: row.id,
            project_id: row.project_id,
            cycle_start: row.cycle_start,
            cycle_end: row.cycle_end,
            budget_amount: row.budget_amount,
            rollover_mode,
            is_locked: row.is_locked,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_row(mode: &str) -> PgCycleRow {
        let now = Utc::now();
        PgCycleRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            cycle_start: now,
            cycle_end: now + chrono::Duration::days(30),
            budget_amount: Decimal::from(500),
            rollover_mode: mode.into(),
            is_locked: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn cycle_row_parses_stored_mode() {
        let cycle = ProjectCycle::try_from(cycle_row("rollover_negative")).unwrap();
        assert_eq!(cycle.rollover_mode, RolloverMode::RolloverNegative);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = ProjectCycle::try_from(cycle_row("carry_all")).unwrap_err();
        assert!(err.contains("carry_all"));
    }

    #[test]
    fn collaborator_row_never_decodes_owner() {
        let row = PgCollaboratorRow {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: "owner".into(),
            created_at: Utc::now(),
        };
        assert!(ProjectCollaborator::try_from(row).is_err());
    }
}
