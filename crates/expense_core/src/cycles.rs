//! CycleLifecycle — budget cycle state machine.
//!
//! ```text
//!   create ──▶ unlocked ◀──set_lock──▶ locked
//!                 │                      │
//!                 └──────── delete ──────┘──▶ (deleted)
//! ```
//!
//! - create / read: any member.
//! - update / delete: owner or editor. Update is blocked by the lock flag;
//!   delete is blocked by referencing expenses but NOT by the lock flag.
//! - set_lock: owner only, the one way out of the locked state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ExpenseError;
use crate::guards::ProjectContext;
use crate::ports::{CycleStore, ExpenseStore, Result};
use crate::types::*;

const CYCLE_WRITERS: &[Role] = &[Role::Owner, Role::Editor];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCycleInput {
    pub cycle_start: DateTime<Utc>,
    pub cycle_end: DateTime<Utc>,
    #[serde(default)]
    pub budget_amount: Option<Decimal>,
    #[serde(default)]
    pub rollover_mode: Option<RolloverMode>,
}

/// Partial update; every field is independently optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCycleInput {
    #[serde(default)]
    pub cycle_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cycle_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub budget_amount: Option<Decimal>,
    #[serde(default)]
    pub rollover_mode: Option<RolloverMode>,
}

impl UpdateCycleInput {
    pub fn is_empty(&self) -> bool {
        self.cycle_start.is_none()
            && self.cycle_end.is_none()
            && self.budget_amount.is_none()
            && self.rollover_mode.is_none()
    }
}

pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start < end {
        Ok(())
    } else {
        Err(ExpenseError::BadRequest(format!(
            "cycle start {start} must be before cycle end {end}"
        )))
    }
}

/// Integer digits a stored amount may carry (`NUMERIC(20, 0)` columns).
const MAX_AMOUNT_DIGITS: u32 = 20;

/// A money amount: a non-negative whole number of currency minor units that
/// fits the storage column. `label` names the field in error messages.
pub fn validate_amount(label: &str, amount: Decimal) -> Result<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ExpenseError::BadRequest(format!(
            "{label} {amount} must not be negative"
        )));
    }
    if !amount.fract().is_zero() {
        return Err(ExpenseError::BadRequest(format!(
            "{label} {amount} must be a whole number of minor units"
        )));
    }
    let limit = Decimal::from_i128_with_scale(10_i128.pow(MAX_AMOUNT_DIGITS), 0);
    if amount >= limit {
        return Err(ExpenseError::BadRequest(format!(
            "{label} {amount} exceeds {MAX_AMOUNT_DIGITS} digits"
        )));
    }
    Ok(amount.normalize())
}

pub fn validate_budget(amount: Decimal) -> Result<Decimal> {
    validate_amount("budget amount", amount)
}

#[derive(Clone)]
pub struct CycleLifecycle {
    cycles: Arc<dyn CycleStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl CycleLifecycle {
    pub fn new(cycles: Arc<dyn CycleStore>, expenses: Arc<dyn ExpenseStore>) -> Self {
        Self { cycles, expenses }
    }

    async fn load(&self, ctx: &ProjectContext, cycle_id: Uuid) -> Result<ProjectCycle> {
        self.cycles
            .get_cycle(ctx.project_id(), cycle_id)
            .await?
            .ok_or_else(|| ExpenseError::NotFound(format!("cycle {cycle_id} not found")))
    }

    pub async fn create(
        &self,
        ctx: &ProjectContext,
        input: CreateCycleInput,
    ) -> Result<Mutation<ProjectCycle>> {
        validate_range(input.cycle_start, input.cycle_end)?;
        let budget_amount = validate_budget(input.budget_amount.unwrap_or(Decimal::ZERO))?;

        let now = Utc::now();
        let cycle = ProjectCycle {
            id: Uuid::new_v4(),
            project_id: ctx.project_id(),
            cycle_start: input.cycle_start,
            cycle_end: input.cycle_end,
            budget_amount,
            rollover_mode: input.rollover_mode.unwrap_or_default(),
            is_locked: false,
            created_at: now,
            updated_at: now,
        };
        self.cycles.insert_cycle(&cycle).await?;

        tracing::info!(
            project_id = %cycle.project_id,
            cycle_id = %cycle.id,
            user_id = %ctx.user_id,
            "cycle created"
        );
        Ok(Mutation::new("cycle created", cycle))
    }

    pub async fn get(&self, ctx: &ProjectContext, cycle_id: Uuid) -> Result<ProjectCycle> {
        self.load(ctx, cycle_id).await
    }

    pub async fn list(&self, ctx: &ProjectContext) -> Result<Vec<ProjectCycle>> {
        self.cycles.list_cycles(ctx.project_id()).await
    }

    pub async fn update(
        &self,
        ctx: &ProjectContext,
        cycle_id: Uuid,
        patch: UpdateCycleInput,
    ) -> Result<Mutation<ProjectCycle>> {
        ctx.require_role(CYCLE_WRITERS, "update cycles")?;
        let existing = self.load(ctx, cycle_id).await?;
        if existing.is_locked {
            return Err(locked(cycle_id));
        }

        let mut merged = existing.clone();
        if let Some(start) = patch.cycle_start {
            merged.cycle_start = start;
        }
        if let Some(end) = patch.cycle_end {
            merged.cycle_end = end;
        }
        if let Some(amount) = patch.budget_amount {
            merged.budget_amount = validate_budget(amount)?;
        }
        if let Some(mode) = patch.rollover_mode {
            merged.rollover_mode = mode;
        }
        validate_range(merged.cycle_start, merged.cycle_end)?;
        merged.updated_at = Utc::now();

        // Uniqueness of a moved start is re-checked by the store, excluding this cycle.
        let updated = match self.cycles.update_cycle(&merged).await? {
            Some(updated) => updated,
            None => return Err(self.missed_update(ctx, cycle_id).await),
        };

        tracing::info!(
            project_id = %updated.project_id,
            cycle_id = %updated.id,
            user_id = %ctx.user_id,
            "cycle updated"
        );
        Ok(Mutation::new("cycle updated", updated))
    }

    /// Set (`Some`) or flip (`None`) the lock flag. Owner only.
    /// Setting a flag to its current value still succeeds.
    pub async fn set_lock(
        &self,
        ctx: &ProjectContext,
        cycle_id: Uuid,
        locked: Option<bool>,
    ) -> Result<Mutation<ProjectCycle>> {
        ctx.project
            .require_owner(ctx.user_id, "lock or unlock cycles")?;

        let cycle = self
            .cycles
            .set_cycle_lock(ctx.project_id(), cycle_id, locked)
            .await?
            .ok_or_else(|| ExpenseError::NotFound(format!("cycle {cycle_id} not found")))?;

        let message = if cycle.is_locked {
            "cycle locked"
        } else {
            "cycle unlocked"
        };
        tracing::info!(
            project_id = %cycle.project_id,
            cycle_id = %cycle.id,
            is_locked = cycle.is_locked,
            "{message}"
        );
        Ok(Mutation::new(message, cycle))
    }

    pub async fn delete(
        &self,
        ctx: &ProjectContext,
        cycle_id: Uuid,
    ) -> Result<Mutation<ProjectCycle>> {
        ctx.require_role(CYCLE_WRITERS, "delete cycles")?;
        let cycle = self.load(ctx, cycle_id).await?;

        let attached = self.expenses.count_by_cycle(cycle_id).await?;
        if attached > 0 {
            return Err(has_expenses(attached));
        }

        // The store refuses too if an expense slipped in since the count.
        if !self.cycles.delete_cycle(ctx.project_id(), cycle_id).await? {
            return Err(ExpenseError::NotFound(format!("cycle {cycle_id} not found")));
        }

        tracing::info!(
            project_id = %cycle.project_id,
            cycle_id = %cycle.id,
            user_id = %ctx.user_id,
            "cycle deleted"
        );
        Ok(Mutation::new("cycle deleted", cycle))
    }

    /// Explain an update that matched no unlocked row.
    async fn missed_update(&self, ctx: &ProjectContext, cycle_id: Uuid) -> ExpenseError {
        match self.cycles.get_cycle(ctx.project_id(), cycle_id).await {
            Ok(Some(c)) if c.is_locked => locked(cycle_id),
            Ok(_) => ExpenseError::NotFound(format!("cycle {cycle_id} not found")),
            Err(e) => e,
        }
    }
}

fn locked(cycle_id: Uuid) -> ExpenseError {
    ExpenseError::Forbidden(format!(
        "cycle {cycle_id} is locked; unlock it before editing"
    ))
}

pub(crate) fn has_expenses(count: u64) -> ExpenseError {
    ExpenseError::BadRequest(format!(
        "cycle still has {count} expense(s); reassign or delete them first"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, 0, 0, 0).unwrap()
    }

    fn ctx(project: &Project, user_id: Uuid, role: Role) -> ProjectContext {
        ProjectContext {
            user_id,
            project: project.clone(),
            role,
        }
    }

    fn january() -> CreateCycleInput {
        CreateCycleInput {
            cycle_start: day(1),
            cycle_end: day(31),
            budget_amount: Some(Decimal::from(10_000)),
            rollover_mode: None,
        }
    }

    fn setup() -> (Arc<MemoryStore>, CycleLifecycle, Project) {
        let store = Arc::new(MemoryStore::new());
        let project = Project::new(Uuid::new_v4(), "Household");
        store.put_project(project.clone()).unwrap();
        let lifecycle = CycleLifecycle::new(store.clone(), store.clone());
        (store, lifecycle, project)
    }

    #[test]
    fn budget_validation() {
        assert!(validate_budget(Decimal::from(0)).is_ok());
        assert!(validate_budget(Decimal::from(-1)).is_err());
        assert!(validate_budget(Decimal::new(1050, 2)).is_err());
        assert_eq!(
            validate_budget(Decimal::new(120_000, 1)).unwrap(),
            Decimal::from(12_000)
        );
    }

    #[test]
    fn amounts_must_fit_twenty_digits() {
        let largest = Decimal::from_i128_with_scale(10_i128.pow(20) - 1, 0);
        assert_eq!(validate_budget(largest).unwrap(), largest);
        let too_big = Decimal::from_i128_with_scale(10_i128.pow(20), 0);
        assert!(matches!(
            validate_budget(too_big),
            Err(ExpenseError::BadRequest(ref m)) if m.contains("20 digits")
        ));
        assert!(matches!(
            validate_amount("expense amount", Decimal::new(1250, 2)),
            Err(ExpenseError::BadRequest(ref m)) if m.starts_with("expense amount")
        ));
    }

    #[test]
    fn range_must_be_strict() {
        assert!(validate_range(day(1), day(2)).is_ok());
        assert!(validate_range(day(2), day(2)).is_err());
        assert!(validate_range(day(3), day(2)).is_err());
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let (_, lc, project) = setup();
        let viewer = ctx(&project, Uuid::new_v4(), Role::Viewer);
        let created = lc
            .create(
                &viewer,
                CreateCycleInput {
                    budget_amount: None,
                    ..january()
                },
            )
            .await
            .unwrap()
            .data;
        assert_eq!(created.budget_amount, Decimal::ZERO);
        assert_eq!(created.rollover_mode, RolloverMode::None);
        assert!(!created.is_locked);
    }

    #[tokio::test]
    async fn create_rejects_inverted_or_empty_range() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        for (start, end) in [(day(31), day(1)), (day(5), day(5))] {
            let err = lc
                .create(
                    &owner,
                    CreateCycleInput {
                        cycle_start: start,
                        cycle_end: end,
                        ..january()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ExpenseError::BadRequest(_)));
        }
    }

    #[tokio::test]
    async fn duplicate_start_conflicts() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        lc.create(&owner, january()).await.unwrap();
        let err = lc
            .create(
                &owner,
                CreateCycleInput {
                    cycle_end: day(15),
                    ..january()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::Conflict(_)));
    }

    #[tokio::test]
    async fn same_start_in_other_project_is_fine() {
        let (store, lc, project) = setup();
        let other = Project::new(Uuid::new_v4(), "Other");
        store.put_project(other.clone()).unwrap();
        lc.create(&ctx(&project, project.owner_id, Role::Owner), january())
            .await
            .unwrap();
        lc.create(&ctx(&other, other.owner_id, Role::Owner), january())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_requires_owner_or_editor() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;
        let patch = UpdateCycleInput {
            budget_amount: Some(Decimal::from(5)),
            ..Default::default()
        };
        for role in [Role::Commenter, Role::Viewer] {
            let err = lc
                .update(&ctx(&project, Uuid::new_v4(), role), cycle.id, patch.clone())
                .await
                .unwrap_err();
            assert!(matches!(err, ExpenseError::Forbidden(_)));
        }
        let editor = ctx(&project, Uuid::new_v4(), Role::Editor);
        let updated = lc.update(&editor, cycle.id, patch).await.unwrap().data;
        assert_eq!(updated.budget_amount, Decimal::from(5));
    }

    #[tokio::test]
    async fn update_revalidates_merged_range() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;
        let err = lc
            .update(
                &owner,
                cycle.id,
                UpdateCycleInput {
                    cycle_end: Some(day(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::BadRequest(_)));
    }

    #[tokio::test]
    async fn moving_start_onto_another_cycle_conflicts() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        lc.create(&owner, january()).await.unwrap();
        let feb = lc
            .create(
                &owner,
                CreateCycleInput {
                    cycle_start: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
                    cycle_end: Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap(),
                    budget_amount: None,
                    rollover_mode: Some(RolloverMode::RolloverPositive),
                },
            )
            .await
            .unwrap()
            .data;
        let err = lc
            .update(
                &owner,
                feb.id,
                UpdateCycleInput {
                    cycle_start: Some(day(1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::Conflict(_)));

        // Re-submitting its own start is not a collision.
        let same = lc
            .update(
                &owner,
                feb.id,
                UpdateCycleInput {
                    cycle_start: Some(feb.cycle_start),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(same.data.cycle_start, feb.cycle_start);
    }

    #[tokio::test]
    async fn locked_cycle_rejects_every_update_including_noop() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;
        lc.set_lock(&owner, cycle.id, Some(true)).await.unwrap();

        let err = lc
            .update(&owner, cycle.id, UpdateCycleInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn set_lock_is_owner_only_and_idempotent() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;

        let editor = ctx(&project, Uuid::new_v4(), Role::Editor);
        let err = lc.set_lock(&editor, cycle.id, None).await.unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(_)));

        assert!(lc.set_lock(&owner, cycle.id, None).await.unwrap().data.is_locked);
        assert!(lc.set_lock(&owner, cycle.id, Some(true)).await.unwrap().data.is_locked);
        assert!(!lc.set_lock(&owner, cycle.id, None).await.unwrap().data.is_locked);
        assert!(!lc.set_lock(&owner, cycle.id, Some(false)).await.unwrap().data.is_locked);

        let err = lc.set_lock(&owner, Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, ExpenseError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_ignores_lock_but_not_expenses() {
        let (store, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;

        store
            .insert_expense(&Expense {
                id: Uuid::new_v4(),
                project_id: project.id,
                cycle_id: Some(cycle.id),
                amount: Decimal::from(250),
                description: None,
                incurred_at: day(10),
                created_by: project.owner_id,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        lc.set_lock(&owner, cycle.id, Some(true)).await.unwrap();
        let err = lc.delete(&owner, cycle.id).await.unwrap_err();
        assert!(matches!(err, ExpenseError::BadRequest(_)));

        let other = lc
            .create(
                &owner,
                CreateCycleInput {
                    cycle_start: day(2),
                    ..january()
                },
            )
            .await
            .unwrap()
            .data;
        lc.set_lock(&owner, other.id, Some(true)).await.unwrap();
        lc.delete(&owner, other.id).await.unwrap();
        assert!(lc.get(&owner, other.id).await.is_err());
    }

    #[tokio::test]
    async fn delete_requires_owner_or_editor() {
        let (_, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;
        let commenter = ctx(&project, Uuid::new_v4(), Role::Commenter);
        let err = lc.delete(&commenter, cycle.id).await.unwrap_err();
        assert!(matches!(err, ExpenseError::Forbidden(_)));
        let editor = ctx(&project, Uuid::new_v4(), Role::Editor);
        lc.delete(&editor, cycle.id).await.unwrap();
    }

    #[tokio::test]
    async fn cycles_are_scoped_to_their_project() {
        let (store, lc, project) = setup();
        let owner = ctx(&project, project.owner_id, Role::Owner);
        let cycle = lc.create(&owner, january()).await.unwrap().data;

        let other = Project::new(Uuid::new_v4(), "Other");
        store.put_project(other.clone()).unwrap();
        let outsider = ctx(&other, other.owner_id, Role::Owner);
        assert!(matches!(
            lc.get(&outsider, cycle.id).await.unwrap_err(),
            ExpenseError::NotFound(_)
        ));
        assert!(lc.list(&outsider).await.unwrap().is_empty());
        assert_eq!(lc.list(&owner).await.unwrap().len(), 1);
    }
}
