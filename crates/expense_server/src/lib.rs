//! expense_server — REST surface over expense_core.
//!
//! Every project-scoped handler composes the guards explicitly:
//! JWT principal → AccessGuard → PermissionGuard → component method.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
