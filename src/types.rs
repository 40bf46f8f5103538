/// Shared vocabulary used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Caller roles. Anything else fails to parse and is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Normal,
    Tercerizado,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Normal, Role::Tercerizado];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Normal => "normal",
            Role::Tercerizado => "tercerizado",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::Admin => "Full access, including users, logs and credential management",
            Role::Normal => "Dashboard, invoices, contracts, telephony and history",
            Role::Tercerizado => "Same as normal, plus read access to credentials",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "normal" => Ok(Role::Normal),
            "tercerizado" => Ok(Role::Tercerizado),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Functional areas guarded by the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Dashboard,
    Faturas,
    Contratos,
    Telefonia,
    Historico,
    Credenciais,
    CredenciaisGestao,
    Usuarios,
    Logs,
}

impl Resource {
    pub fn tag(self) -> &'static str {
        match self {
            Resource::Dashboard => "dashboard",
            Resource::Faturas => "faturas",
            Resource::Contratos => "contratos",
            Resource::Telefonia => "telefonia",
            Resource::Historico => "historico",
            Resource::Credenciais => "credenciais",
            Resource::CredenciaisGestao => "credenciais_gestao",
            Resource::Usuarios => "usuarios",
            Resource::Logs => "logs",
        }
    }
}

/// Entity kinds recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditTarget {
    User,
    Contrato,
    Fatura,
    Telefonia,
    Credencial,
    Tim,
    Inventario,
}

impl AuditTarget {
    /// Target types visible in history to non-admin roles.
    pub const BUSINESS: [AuditTarget; 3] = [AuditTarget::Contrato, AuditTarget::Fatura, AuditTarget::Telefonia];

    pub fn as_str(self) -> &'static str {
        match self {
            AuditTarget::User => "USER",
            AuditTarget::Contrato => "CONTRATO",
            AuditTarget::Fatura => "FATURA",
            AuditTarget::Telefonia => "TELEFONIA",
            AuditTarget::Credencial => "CREDENCIAL",
            AuditTarget::Tim => "TIM",
            AuditTarget::Inventario => "INVENTARIO",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Upload,
    Ativar,
    Inativar,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Upload => "UPLOAD",
            AuditAction::Ativar => "ATIVAR",
            AuditAction::Inativar => "INATIVAR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_parse_exactly() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("Admin".parse::<Role>().is_err());
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn vocabulary_serializes_as_stored() {
        assert_eq!(serde_json::to_value(AuditTarget::Inventario).unwrap(), "INVENTARIO");
        assert_eq!(serde_json::to_value(AuditAction::Inativar).unwrap(), "INATIVAR");
        assert_eq!(serde_json::to_value(Resource::CredenciaisGestao).unwrap(), "credenciais_gestao");
        assert_eq!(serde_json::to_value(Role::Tercerizado).unwrap(), "tercerizado");
    }
}
