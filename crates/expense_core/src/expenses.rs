//! Expense write path — the side that enforces the expense ↔ cycle contract.
//!
//! An expense attached to a cycle must belong to the cycle's project, the
//! cycle must be unlocked, and `incurred_at` must fall inside
//! `[cycle_start, cycle_end]`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::cycles::validate_amount;
use crate::error::ExpenseError;
use crate::guards::ProjectContext;
use crate::permissions::Permission;
use crate::ports::{CycleStore, ExpenseStore, Result};
use crate::types::{Expense, Mutation, ProjectCycle};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseInput {
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    pub incurred_at: DateTime<Utc>,
    #[serde(default)]
    pub cycle_id: Option<Uuid>,
}

/// Check an expense against the cycle it is being attached to.
pub fn check_expense_against_cycle(
    project_id: Uuid,
    incurred_at: DateTime<Utc>,
    cycle: &ProjectCycle,
) -> Result<()> {
    if cycle.project_id != project_id {
        return Err(ExpenseError::BadRequest(format!(
            "cycle {} belongs to a different project",
            cycle.id
        )));
    }
    if cycle.is_locked {
        return Err(ExpenseError::BadRequest(format!(
            "cycle {} is locked; expenses cannot be attached",
            cycle.id
        )));
    }
    if !cycle.contains(incurred_at) {
        return Err(ExpenseError::BadRequest(format!(
            "expense date {incurred_at} is outside cycle {} ({} – {})",
            cycle.id, cycle.cycle_start, cycle.cycle_end
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ExpenseLedger {
    cycles: Arc<dyn CycleStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl ExpenseLedger {
    pub fn new(cycles: Arc<dyn CycleStore>, expenses: Arc<dyn ExpenseStore>) -> Self {
        Self { cycles, expenses }
    }

    pub async fn record(
        &self,
        ctx: &ProjectContext,
        input: NewExpenseInput,
    ) -> Result<Mutation<Expense>> {
        if !ctx.has_permission(Permission::ExpenseCreate) {
            return Err(ExpenseError::Forbidden(format!(
                "role '{}' lacks permission {}",
                ctx.role,
                Permission::ExpenseCreate
            )));
        }
        let amount = validate_amount("expense amount", input.amount)?;

        if let Some(cycle_id) = input.cycle_id {
            let cycle = self
                .cycles
                .get_cycle(ctx.project_id(), cycle_id)
                .await?
                .ok_or_else(|| ExpenseError::NotFound(format!("cycle {cycle_id} not found")))?;
            check_expense_against_cycle(ctx.project_id(), input.incurred_at, &cycle)?;
        }

        let expense = Expense {
            id: Uuid::new_v4(),
            project_id: ctx.project_id(),
            cycle_id: input.cycle_id,
            amount,
            description: input.description,
            incurred_at: input.incurred_at,
            created_by: ctx.user_id,
            created_at: Utc::now(),
        };
        self.expenses.insert_expense(&expense).await?;

        tracing::info!(
            project_id = %expense.project_id,
            expense_id = %expense.id,
            cycle_id = ?expense.cycle_id,
            "expense recorded"
        );
        Ok(Mutation::new("expense recorded", expense))
    }
}
