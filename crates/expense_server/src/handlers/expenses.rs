//! POST /projects/:project_id/expenses — record an expense, optionally pinned to a cycle.

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use expense_core::expenses::NewExpenseInput;
use expense_core::{EndpointPolicy, Expense, Mutation, Permission, ProjectServices};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::jwt::Principal;

const CREATE: EndpointPolicy = EndpointPolicy::permissions(&[Permission::ExpenseCreate]);

pub async fn create(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<NewExpenseInput>,
) -> Result<(StatusCode, Json<Mutation<Expense>>), AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &CREATE)
        .await?;
    let resp = services.expenses.record(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
