//! Collaborator management handlers.
//!
//! GET    /projects/:project_id/collaborators           — owner + members
//! POST   /projects/:project_id/collaborators           — invite by email (owner only)
//! PATCH  /projects/:project_id/collaborators/:user_id  — change role (owner only)
//! DELETE /projects/:project_id/collaborators/:user_id  — remove (owner only)

use std::sync::Arc;

use axum::{extract::Path, http::StatusCode, Extension, Json};
use expense_core::{
    CollaboratorRole, CollaboratorView, EndpointPolicy, Mutation, Permission, ProjectMembers,
    ProjectServices,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::jwt::Principal;

const LIST: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CollaboratorRead]);
const ADD: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CollaboratorCreate]);
const UPDATE: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CollaboratorUpdate]);
const REMOVE: EndpointPolicy = EndpointPolicy::permissions(&[Permission::CollaboratorDelete]);

#[derive(Debug, Deserialize)]
pub struct AddCollaboratorRequest {
    pub email: String,
    #[serde(default)]
    pub role: Option<CollaboratorRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: CollaboratorRole,
}

pub async fn list(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectMembers>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &LIST)
        .await?;
    let members = services
        .collaborators
        .list(ctx.user_id, ctx.project_id())
        .await?;
    Ok(Json(members))
}

pub async fn add(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<AddCollaboratorRequest>,
) -> Result<(StatusCode, Json<Mutation<CollaboratorView>>), AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &ADD)
        .await?;
    let resp = services
        .collaborators
        .add(ctx.user_id, ctx.project_id(), &body.email, body.role)
        .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn update_role(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<UpdateRoleRequest>,
) -> Result<Json<Mutation<CollaboratorView>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &UPDATE)
        .await?;
    let resp = services
        .collaborators
        .update_role(ctx.user_id, ctx.project_id(), user_id, body.role)
        .await?;
    Ok(Json(resp))
}

pub async fn remove(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Mutation<Uuid>>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &REMOVE)
        .await?;
    let resp = services
        .collaborators
        .remove(ctx.user_id, ctx.project_id(), user_id)
        .await?;
    Ok(Json(resp))
}
