//! expense_core — project collaboration and budget-cycle integrity.
//!
//! Pure domain logic over storage port traits:
//!
//! - [`permissions`]: static role → permission matrix
//! - [`resolver`]: effective role of a user on a project
//! - [`guards`]: AccessGuard / PermissionGuard and the per-request [`guards::ProjectContext`]
//! - [`collaborators`]: owner-only membership management
//! - [`cycles`]: budget cycle lifecycle (create, update, lock, delete)
//! - [`expenses`]: expense write path and the expense ↔ cycle contract
//!
//! Storage adapters live in `expense_postgres`; [`memory::MemoryStore`] backs tests.

pub mod collaborators;
pub mod cycles;
pub mod error;
pub mod expenses;
pub mod guards;
pub mod memory;
pub mod permissions;
pub mod ports;
pub mod resolver;
pub mod service;
pub mod types;

pub use error::ExpenseError;
pub use guards::{AccessGuard, EndpointPolicy, PermissionGuard, ProjectContext};
pub use permissions::{Permission, PermissionMatrix};
pub use service::ProjectServices;
pub use types::*;
