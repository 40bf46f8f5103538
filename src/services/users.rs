use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::ServiceError;
use crate::audit::AuditLog;
use crate::auth::{hash_password, issue_token, verify_password};
use crate::config::SecurityConfig;
use crate::database::models::{User, UserView};
use crate::database::{from_document, from_documents, to_document, Collection, DatabaseError, Store};
use crate::filter::FilterData;
use crate::types::{AuditAction, AuditTarget, Role};

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Signed-in user plus the token to present on later requests.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    audit: AuditLog,
    security: SecurityConfig,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog, security: SecurityConfig) -> Self {
        Self { store, audit, security }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let mut docs = self
            .store
            .list(Collection::Users, FilterData::matching(json!({ "username": username })).limit(1))
            .await?;
        Ok(docs.pop().map(from_document::<User>).transpose()?)
    }

    pub async fn get(&self, id: i64) -> Result<User, ServiceError> {
        let doc = self
            .store
            .get(Collection::Users, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        Ok(from_document(doc)?)
    }

    pub async fn list(&self) -> Result<Vec<UserView>, ServiceError> {
        let docs = self.store.list(Collection::Users, FilterData::all().order_by("id")).await?;
        let users: Vec<User> = from_documents(docs)?;
        Ok(users.iter().map(User::view).collect())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ServiceError> {
        let user = match self.find_by_username(username).await? {
            Some(user) if user.active && verify_password(password, &user.hashed_password) => user,
            _ => {
                warn!(username, "Rejected login");
                return Err(ServiceError::InvalidCredentials);
            }
        };
        let token = self.token_for(&user)?;
        Ok(Session { user, token })
    }

    /// Open registration while no user exists; afterwards only admins may register.
    pub async fn register(&self, actor: Option<&User>, username: &str, password: &str) -> Result<Session, ServiceError> {
        if self.store.count(Collection::Users, FilterData::all()).await? == 0 {
            let mut user = self.prepare(username, password, Role::Admin)?;
            if let Some(id) = self.store.insert_first(Collection::Users, to_document(&user)?).await? {
                user.id = id;
                info!(username = %user.username, "Bootstrapped first administrator");
                let token = self.token_for(&user)?;
                return Ok(Session { user, token });
            }
            // Another registration bootstrapped first; fall through to the closed path
        }

        let actor = match actor {
            None => return Err(ServiceError::Forbidden("Registration is closed; ask an administrator".to_string())),
            Some(actor) if !actor.is_admin() => {
                return Err(ServiceError::Forbidden("Only administrators can register users".to_string()))
            }
            Some(actor) => actor,
        };

        let user = self.insert(username, password, Role::Normal).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::User,
                Some(user.id),
                format!("New user created: {}", user.username),
            )
            .await;

        let token = self.token_for(&user)?;
        Ok(Session { user, token })
    }

    pub async fn create(&self, actor: &User, username: &str, password: &str, role: Option<&str>) -> Result<User, ServiceError> {
        let role = match role.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => parse_role(r)?,
            None => Role::Normal,
        };
        let user = self.insert(username, password, role).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::User,
                Some(user.id),
                format!("New user: {} ({})", user.username, user.role),
            )
            .await;
        Ok(user)
    }

    /// Create an administrator without an acting user (CLI bootstrap).
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        self.insert(username, password, Role::Admin).await
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ServiceError> {
        if actor.id == id {
            return Err(ServiceError::invalid("id", "You cannot delete your own account"));
        }
        let user = self.get(id).await?;
        self.store.delete_many(Collection::Users, FilterData::by_id(id)).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Delete,
                AuditTarget::User,
                Some(id),
                format!("User deleted: {}", user.username),
            )
            .await;
        Ok(())
    }

    /// Delete by name without an acting user (CLI).
    pub async fn delete_by_username(&self, username: &str) -> Result<(), ServiceError> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User '{}'", username)))?;
        self.store.delete_many(Collection::Users, FilterData::by_id(user.id)).await?;
        Ok(())
    }

    pub async fn update_role(&self, actor: &User, id: i64, role: &str) -> Result<User, ServiceError> {
        if actor.id == id {
            return Err(ServiceError::invalid("id", "You cannot change your own role"));
        }
        let role = parse_role(role.trim())?;
        let mut user = self.get(id).await?;
        let previous = std::mem::replace(&mut user.role, role.as_str().to_string());

        self.update_fields(id, json!({ "role": role.as_str() })).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Update,
                AuditTarget::User,
                Some(id),
                format!("Role changed: {}→{}", previous, user.role),
            )
            .await;
        Ok(user)
    }

    pub async fn change_password(&self, user: &User, current: &str, new: &str) -> Result<(), ServiceError> {
        validate_password(new)?;
        if !verify_password(current, &user.hashed_password) {
            return Err(ServiceError::invalid("currentPassword", "Current password is incorrect"));
        }
        let hashed = hash_password(new, self.security.bcrypt_cost)?;
        self.update_fields(user.id, json!({ "hashedPassword": hashed })).await?;
        self.audit
            .record(&user.username, AuditAction::Update, AuditTarget::User, Some(user.id), "Changed password")
            .await;
        Ok(())
    }

    pub async fn set_avatar(&self, user: &User, path: &str) -> Result<(), ServiceError> {
        self.update_fields(user.id, json!({ "avatarPath": path })).await?;
        self.audit
            .record(&user.username, AuditAction::Update, AuditTarget::User, Some(user.id), "Updated profile photo")
            .await;
        Ok(())
    }

    /// Validated, hashed user that has not been stored yet.
    fn prepare(&self, username: &str, password: &str, role: Role) -> Result<User, ServiceError> {
        let username = username.trim();
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(ServiceError::invalid(
                "username",
                format!("Username must have at least {} characters", MIN_USERNAME_CHARS),
            ));
        }
        validate_password(password)?;
        Ok(User::new(username, hash_password(password, self.security.bcrypt_cost)?, role))
    }

    async fn insert(&self, username: &str, password: &str, role: Role) -> Result<User, ServiceError> {
        let mut user = self.prepare(username, password, role)?;
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(ServiceError::Conflict("User already exists".to_string()));
        }

        user.id = match self.store.insert(Collection::Users, to_document(&user)?).await {
            Ok(id) => id,
            // Lost a race with a concurrent insert of the same name
            Err(DatabaseError::Duplicate(_)) => return Err(ServiceError::Conflict("User already exists".to_string())),
            Err(e) => return Err(e.into()),
        };
        Ok(user)
    }

    async fn update_fields(&self, id: i64, changes: serde_json::Value) -> Result<(), ServiceError> {
        let changes = changes.as_object().cloned().unwrap_or_default();
        let updated = self.store.update_many(Collection::Users, FilterData::by_id(id), changes).await?;
        if updated == 0 {
            return Err(ServiceError::not_found("User"));
        }
        Ok(())
    }

    fn token_for(&self, user: &User) -> Result<String, ServiceError> {
        let role = parse_role(&user.role)?;
        Ok(issue_token(&user.username, role, &self.security)?)
    }
}

fn parse_role(role: &str) -> Result<Role, ServiceError> {
    role.parse::<Role>().map_err(|_| {
        let valid: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        ServiceError::invalid("role", format!("Invalid role. Must be one of: {}", valid.join(", ")))
    })
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ServiceError::invalid(
            "password",
            format!("Password must have at least {} characters", MIN_PASSWORD_CHARS),
        ));
    }
    Ok(())
}
