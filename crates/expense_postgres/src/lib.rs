//! expense_postgres — PostgreSQL adapters for the expense_core ports.

pub mod sqlx_types;
pub mod store;

use std::sync::Arc;

use expense_core::ports::Stores;
use sqlx::PgPool;

pub use store::{PgCollaboratorStore, PgCycleStore, PgExpenseStore, PgProjectStore, PgUserDirectory};

/// Embedded schema migrations (`migrations/`).
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Every port implementation over one shared pool.
pub struct PgStores {
    pub projects: Arc<PgProjectStore>,
    pub users: Arc<PgUserDirectory>,
    pub collaborators: Arc<PgCollaboratorStore>,
    pub cycles: Arc<PgCycleStore>,
    pub expenses: Arc<PgExpenseStore>,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            projects: Arc::new(PgProjectStore::new(pool.clone())),
            users: Arc::new(PgUserDirectory::new(pool.clone())),
            collaborators: Arc::new(PgCollaboratorStore::new(pool.clone())),
            cycles: Arc::new(PgCycleStore::new(pool.clone())),
            expenses: Arc::new(PgExpenseStore::new(pool)),
        }
    }

    pub fn into_stores(self) -> Stores {
        Stores {
            projects: self.projects,
            users: self.users,
            collaborators: self.collaborators,
            cycles: self.cycles,
            expenses: self.expenses,
        }
    }
}
