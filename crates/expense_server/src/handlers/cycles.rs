//! Budget cycle handlers.
//!
//! GET    /projects/:project_id/cycles                 — list, ordered by start
//! POST   /projects/:project_id/cycles                 — create (any member)
//! GET    /projects/:project_id/cycles/:cycle_id       — fetch one
//! PATCH  /projects/:project_id/cycles/:cycle_id       — partial update (owner/editor, unlocked)
//! DELETE /projects/:project_id/cycles/:cycle_id       — delete (owner/editor, no expenses)
//! POST   /projects/:project_id/cycles/:cycle_id/lock  — set or flip the lock (owner only)

use std::sync::Arc;

use axum::{body::Bytes, extract::Path, http::StatusCode, Extension, Json};
use expense_core::cycles::{CreateCycleInput, UpdateCycleInput};
use expense_core::{
    EndpointPolicy, ExpenseError, Mutation, Permission, ProjectCycle, ProjectServices, Role,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::jwt::Principal;

const CREATE: EndpointPolicy = EndpointPolicy::any_member();
const READ: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CycleRead]);
const UPDATE: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CycleUpdate]);
const DELETE: EndpointPolicy = EndpointPolicy::roles(&[Role::Owner, Role::Editor]);
const LOCK: EndpointPolicy = EndpointPolicy::roles(&[Role::Owner]);

/// Omit `locked` (or send no body) to flip the current state.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockRequest {
    #[serde(default)]
    pub locked: Option<bool>,
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ProjectCycle>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &READ)
        .await?;
    Ok(Json(services.cycles.list(&ctx).await?))
}

pub async fn create(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateCycleInput>,
) -> Result<(StatusCode, Json<Mutation<ProjectCycle>>), AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &CREATE)
        .await?;
    let resp = services.cycles.create(&ctx, body).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn get(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, cycle_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ProjectCycle>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &READ)
        .await?;
    Ok(Json(services.cycles.get(&ctx, cycle_id).await?))
}

pub async fn update(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, cycle_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateCycleInput>,
) -> Result<Json<Mutation<ProjectCycle>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &UPDATE)
        .await?;
    Ok(Json(services.cycles.update(&ctx, cycle_id, body).await?))
}

pub async fn delete(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, cycle_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Mutation<ProjectCycle>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &DELETE)
        .await?;
    Ok(Json(services.cycles.delete(&ctx, cycle_id).await?))
}

pub async fn set_lock(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, cycle_id)): Path<(Uuid, Uuid)>,
    body: Bytes,
) -> Result<Json<Mutation<ProjectCycle>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &LOCK)
        .await?;
    let request = parse_lock_request(&body)?;
    Ok(Json(
        services
            .cycles
            .set_lock(&ctx, cycle_id, request.locked)
            .await?,
    ))
}

/// Only an empty body flips; anything else must be a valid `LockRequest`.
fn parse_lock_request(body: &[u8]) -> Result<LockRequest, ExpenseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LockRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ExpenseError::BadRequest(format!("invalid lock request: {e}")))
}
