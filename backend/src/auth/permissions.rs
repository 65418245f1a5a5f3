//! Roles and the single role → permission lookup table.
//!
//! Authorization decisions anywhere in the backend go through
//! [`Role::has_permission`]; no module branches on role names directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Principal role, stored as snake_case text.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

/// Capabilities granted to roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadContent,
    WriteContent,
    ModerateContent,
    ViewUsers,
    ManageUsers,
    ViewDashboard,
    ManageRoles,
}

const USER_PERMISSIONS: &[Permission] = &[Permission::ReadContent, Permission::WriteContent];

const MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ModerateContent,
    Permission::ViewUsers,
];

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ModerateContent,
    Permission::ViewUsers,
    Permission::ManageUsers,
    Permission::ViewDashboard,
];

const SUPER_ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::ReadContent,
    Permission::WriteContent,
    Permission::ModerateContent,
    Permission::ViewUsers,
    Permission::ManageUsers,
    Permission::ViewDashboard,
    Permission::ManageRoles,
];

impl Role {
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Role::User => USER_PERMISSIONS,
            Role::Moderator => MODERATOR_PERMISSIONS,
            Role::Admin => ADMIN_PERMISSIONS,
            Role::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
        }
    }

    pub fn has_permission(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
