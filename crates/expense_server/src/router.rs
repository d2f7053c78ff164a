//! Router construction for the expense server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, patch, post},
    Extension, Router,
};
use expense_core::ProjectServices;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(services: Arc<ProjectServices>, jwt_config: JwtConfig) -> Router {
    // Routes that require JWT authentication
    let protected = Router::new()
        .route("/projects/:project_id/role", get(handlers::roles::get_role))
        .route(
            "/projects/:project_id/collaborators",
            get(handlers::collaborators::list).post(handlers::collaborators::add),
        )
        .route(
            "/projects/:project_id/collaborators/:user_id",
            patch(handlers::collaborators::update_role).delete(handlers::collaborators::remove),
        )
        .route(
            "/projects/:project_id/cycles",
            get(handlers::cycles::list).post(handlers::cycles::create),
        )
        .route(
            "/projects/:project_id/cycles/:cycle_id",
            get(handlers::cycles::get)
                .patch(handlers::cycles::update)
                .delete(handlers::cycles::delete),
        )
        .route(
            "/projects/:project_id/cycles/:cycle_id/lock",
            post(handlers::cycles::set_lock),
        )
        .route(
            "/projects/:project_id/expenses",
            post(handlers::expenses::create),
        )
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .merge(protected)
        .layer(Extension(services))
        .layer(TraceLayer::new_for_http())
}
