//! ProjectServices — every component wired against one set of stores.
//!
//! Constructed once at startup in `expense_server/src/main.rs` and shared by
//! all handlers. Holds no per-request state.

use uuid::Uuid;

use crate::collaborators::CollaboratorAdmin;
use crate::cycles::CycleLifecycle;
use crate::expenses::ExpenseLedger;
use crate::guards::{AccessGuard, EndpointPolicy, PermissionGuard, ProjectContext};
use crate::ports::{Result, Stores};
use crate::resolver::RoleResolver;

#[derive(Clone)]
pub struct ProjectServices {
    pub resolver: RoleResolver,
    pub access: AccessGuard,
    pub permissions: PermissionGuard,
    pub collaborators: CollaboratorAdmin,
    pub cycles: CycleLifecycle,
    pub expenses: ExpenseLedger,
}

impl ProjectServices {
    pub fn new(stores: Stores) -> Self {
        let resolver = RoleResolver::new(stores.projects.clone(), stores.collaborators.clone());
        Self {
            access: AccessGuard::new(resolver.clone()),
            resolver,
            permissions: PermissionGuard::new(),
            collaborators: CollaboratorAdmin::new(
                stores.projects.clone(),
                stores.users.clone(),
                stores.collaborators.clone(),
            ),
            cycles: CycleLifecycle::new(stores.cycles.clone(), stores.expenses.clone()),
            expenses: ExpenseLedger::new(stores.cycles, stores.expenses),
        }
    }

    /// AccessGuard then PermissionGuard, in that order.
    /// The returned context is the only role fact later steps may use.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        policy: &EndpointPolicy,
    ) -> Result<ProjectContext> {
        let ctx = self.access.enter(user_id, project_id).await?;
        self.permissions.authorize(&ctx, policy)?;
        Ok(ctx)
    }
}
