//! Static permission table and the single enforcement function.

use serde::Serialize;

use crate::types::{Resource, Role};

const ALL_ROLES: &[Role] = &[Role::Admin, Role::Normal, Role::Tercerizado];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Resource tag to allowed roles.
pub static PERMISSIONS: &[(&str, &[Role])] = &[
    ("dashboard", ALL_ROLES),
    ("faturas", ALL_ROLES),
    ("contratos", ALL_ROLES),
    ("telefonia", ALL_ROLES),
    ("historico", ALL_ROLES),
    ("credenciais", &[Role::Admin, Role::Tercerizado]),
    ("credenciais_gestao", ADMIN_ONLY),
    ("usuarios", ADMIN_ONLY),
    ("logs", ADMIN_ONLY),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub tag: String,
}

/// Allow `role` on `tag` only when the tag is listed and contains the role.
pub fn authorize(role: &str, tag: &str) -> Result<(), Forbidden> {
    let role: Role = role.parse().map_err(|_| Forbidden { tag: tag.to_string() })?;
    authorize_role(role, tag)
}

pub fn authorize_role(role: Role, tag: &str) -> Result<(), Forbidden> {
    PERMISSIONS
        .iter()
        .find(|(t, _)| *t == tag)
        .filter(|(_, roles)| roles.contains(&role))
        .map(|_| ())
        .ok_or_else(|| Forbidden { tag: tag.to_string() })
}

pub fn allows(role: Role, resource: Resource) -> bool {
    authorize_role(role, resource.tag()).is_ok()
}

#[derive(Debug, Serialize)]
pub struct PermissionEntry {
    pub resource: &'static str,
    pub roles: Vec<Role>,
}

pub fn table() -> Vec<PermissionEntry> {
    PERMISSIONS
        .iter()
        .map(|(tag, roles)| PermissionEntry { resource: tag, roles: roles.to_vec() })
        .collect()
}
