use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Stored user. `role` is kept as text so an unrecognised value
/// round-trips and is denied at authorization time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: i64,
    pub username: String,
    pub hashed_password: String,
    pub role: String,
    #[serde(default = "super::default_true")]
    pub active: bool,
    #[serde(default)]
    pub avatar_path: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, hashed_password: String, role: Role) -> Self {
        Self {
            id: 0,
            username: username.into(),
            hashed_password,
            role: role.as_str().to_string(),
            active: true,
            avatar_path: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin.as_str()
    }

    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            role: self.role.clone(),
            active: self.active,
            avatar_path: self.avatar_path.clone(),
        }
    }
}

/// Client-facing user; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub active: bool,
    pub avatar_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_omits_hash() {
        let user = User::new("ana", "$2b$04$hash".to_string(), Role::Normal);
        let json = serde_json::to_value(user.view()).unwrap();
        assert!(json.get("hashedPassword").is_none());
        assert_eq!(json["role"], "normal");
    }
}
