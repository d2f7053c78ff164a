//! Static role → permission matrix.
//!
//! Built once per process and immutable afterwards. Ownership is NOT encoded
//! here as a bypass; the owner simply holds every permission, and callers check
//! `Project::owner_id` before consulting the matrix.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::types::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    Project,
    Collaborator,
    Expense,
    Task,
    Category,
    Cycle,
    Receipt,
    Comment,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, Display, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

macro_rules! permissions {
    ($($variant:ident => ($resource:ident, $action:ident, $wire:literal)),+ $(,)?) => {
        /// One permission per (resource, action) pair. Wire form is `resource:action`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $($variant),+
        }

        impl Permission {
            pub const ALL: &'static [Permission] = &[$(Permission::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $wire),+
                }
            }

            pub fn resource(&self) -> Resource {
                match self {
                    $(Permission::$variant => Resource::$resource),+
                }
            }

            pub fn action(&self) -> Action {
                match self {
                    $(Permission::$variant => Action::$action),+
                }
            }
        }
    };
}

permissions! {
    ProjectCreate => (Project, Create, "project:create"),
    ProjectRead => (Project, Read, "project:read"),
    ProjectUpdate => (Project, Update, "project:update"),
    ProjectDelete => (Project, Delete, "project:delete"),
    CollaboratorCreate => (Collaborator, Create, "collaborator:create"),
    CollaboratorRead => (Collaborator, Read, "collaborator:read"),
    CollaboratorUpdate => (Collaborator, Update, "collaborator:update"),
    CollaboratorDelete => (Collaborator, Delete, "collaborator:delete"),
    ExpenseCreate => (Expense, Create, "expense:create"),
    ExpenseRead => (Expense, Read, "expense:read"),
    ExpenseUpdate => (Expense, Update, "expense:update"),
    ExpenseDelete => (Expense, Delete, "expense:delete"),
    TaskCreate => (Task, Create, "task:create"),
    TaskRead => (Task, Read, "task:read"),
    TaskUpdate => (Task, Update, "task:update"),
    TaskDelete => (Task, Delete, "task:delete"),
    CategoryCreate => (Category, Create, "category:create"),
    CategoryRead => (Category, Read, "category:read"),
    CategoryUpdate => (Category, Update, "category:update"),
    CategoryDelete => (Category, Delete, "category:delete"),
    CycleCreate => (Cycle, Create, "cycle:create"),
    CycleRead => (Cycle, Read, "cycle:read"),
    CycleUpdate => (Cycle, Update, "cycle:update"),
    CycleDelete => (Cycle, Delete, "cycle:delete"),
    ReceiptCreate => (Receipt, Create, "receipt:create"),
    ReceiptRead => (Receipt, Read, "receipt:read"),
    ReceiptUpdate => (Receipt, Update, "receipt:update"),
    ReceiptDelete => (Receipt, Delete, "receipt:delete"),
    CommentCreate => (Comment, Create, "comment:create"),
    CommentRead => (Comment, Read, "comment:read"),
    CommentDelete => (Comment, Delete, "comment:delete"),
}

impl Permission {
    /// Look up the permission for a pair. `None` for pairs that do not exist
    /// (e.g. `comment:update`).
    pub fn for_pair(resource: Resource, action: Action) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.resource() == resource && p.action() == action)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown permission '{s}'"))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ── PermissionMatrix ──────────────────────────────────────────

/// Resources an editor may create, read and update (but not delete).
const EDITOR_WRITABLE: &[Resource] = &[
    Resource::Expense,
    Resource::Task,
    Resource::Category,
    Resource::Cycle,
    Resource::Receipt,
];

static MATRIX: OnceLock<PermissionMatrix> = OnceLock::new();

#[derive(Debug)]
pub struct PermissionMatrix {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl PermissionMatrix {
    /// Process-wide matrix, built on first use.
    pub fn global() -> &'static PermissionMatrix {
        MATRIX.get_or_init(Self::build)
    }

    fn build() -> Self {
        let reads: BTreeSet<Permission> = Permission::ALL
            .iter()
            .copied()
            .filter(|p| p.action() == Action::Read)
            .collect();

        let owner: BTreeSet<Permission> = Permission::ALL.iter().copied().collect();

        let mut editor: BTreeSet<Permission> = EDITOR_WRITABLE
            .iter()
            .flat_map(|r| {
                [Action::Create, Action::Read, Action::Update]
                    .into_iter()
                    .filter_map(move |a| Permission::for_pair(*r, a))
            })
            .collect();
        editor.extend([
            Permission::ProjectRead,
            Permission::CollaboratorRead,
            Permission::CommentCreate,
            Permission::CommentRead,
            Permission::CommentDelete,
        ]);

        let mut commenter = reads.clone();
        commenter.extend([Permission::CommentCreate, Permission::CommentDelete]);

        let viewer = reads;

        let grants = HashMap::from([
            (Role::Owner, owner),
            (Role::Editor, editor),
            (Role::Commenter, commenter),
            (Role::Viewer, viewer),
        ]);
        Self { grants }
    }

    pub fn permissions_for(&self, role: Role) -> &BTreeSet<Permission> {
        // every Role variant is populated in build()
        &self.grants[&role]
    }

    /// Lookup by role name. Unknown names get the empty set.
    pub fn permissions_for_name(&self, role: &str) -> BTreeSet<Permission> {
        role.parse::<Role>()
            .map(|r| self.permissions_for(r).clone())
            .unwrap_or_default()
    }

    pub fn has_permission(&self, role: Role, permission: Permission) -> bool {
        self.permissions_for(role).contains(&permission)
    }

    /// True if the role holds at least one of `permissions`. False for an empty slice.
    pub fn has_any(&self, role: Role, permissions: &[Permission]) -> bool {
        let granted = self.permissions_for(role);
        permissions.iter().any(|p| granted.contains(p))
    }

    /// True if the role holds every one of `permissions`. True for an empty slice.
    pub fn has_all(&self, role: Role, permissions: &[Permission]) -> bool {
        let granted = self.permissions_for(role);
        permissions.iter().all(|p| granted.contains(p))
    }

    pub fn roles(&self) -> impl Iterator<Item = Role> {
        Role::iter()
    }
}
