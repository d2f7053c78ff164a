//! GET /projects/:project_id/role — the caller's resolved role.

use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use expense_core::{EndpointPolicy, ProjectServices, Role};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::jwt::Principal;

const ANY_MEMBER: EndpointPolicy = EndpointPolicy::any_member();

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: Role,
}

pub async fn get_role(
    Extension(principal): Extension<Principal>,
    Extension(services): Extension<Arc<ProjectServices>>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<RoleResponse>, AppError> {
    let ctx = services
        .authorize(principal.user_id, project_id, &ANY_MEMBER)
        .await?;
    Ok(Json(RoleResponse { role: ctx.role }))
}
