use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::ServiceError;
use crate::audit::AuditLog;
use crate::database::models::{Credential, User};
use crate::database::{from_document, from_documents, to_document, Collection, Store};
use crate::filter::FilterData;
use crate::types::{AuditAction, AuditTarget};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInput {
    pub service_name: String,
    pub access_url: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

impl CredentialInput {
    fn validate(&self) -> Result<(), ServiceError> {
        let required = [
            ("serviceName", &self.service_name),
            ("accessUrl", &self.access_url),
            ("username", &self.username),
            ("password", &self.password),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ServiceError::invalid(field, "This field is required"));
            }
        }
        Ok(())
    }

    fn apply(self, credential: &mut Credential) {
        credential.service_name = self.service_name.trim().to_string();
        credential.access_url = self.access_url.trim().to_string();
        credential.username = self.username;
        credential.password = self.password;
        credential.description = self.description;
        credential.email = self.email;
        credential.phone = self.phone;
        credential.owner = self.owner;
    }
}

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn Store>,
    audit: AuditLog,
}

impl CredentialService {
    pub fn new(store: Arc<dyn Store>, audit: AuditLog) -> Self {
        Self { store, audit }
    }

    pub async fn list_active(&self) -> Result<Vec<Credential>, ServiceError> {
        let docs = self
            .store
            .list(Collection::Credentials, FilterData::matching(json!({ "active": true })).order_by("serviceName"))
            .await?;
        Ok(from_documents(docs)?)
    }

    pub async fn get(&self, id: i64) -> Result<Credential, ServiceError> {
        let doc = self
            .store
            .get(Collection::Credentials, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Credential"))?;
        Ok(from_document(doc)?)
    }

    pub async fn create(&self, actor: &User, input: CredentialInput) -> Result<Credential, ServiceError> {
        input.validate()?;
        let now = Utc::now();
        let mut credential = Credential {
            id: 0,
            service_name: String::new(),
            description: None,
            access_url: String::new(),
            username: String::new(),
            password: String::new(),
            email: None,
            phone: None,
            owner: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        input.apply(&mut credential);
        credential.id = self.store.insert(Collection::Credentials, to_document(&credential)?).await?;

        self.audit
            .record(
                &actor.username,
                AuditAction::Create,
                AuditTarget::Credencial,
                Some(credential.id),
                format!("New credential: {}", credential.service_name),
            )
            .await;
        Ok(credential)
    }

    pub async fn update(&self, actor: &User, id: i64, input: CredentialInput) -> Result<Credential, ServiceError> {
        input.validate()?;
        let mut credential = self.get(id).await?;
        input.apply(&mut credential);
        credential.updated_at = Utc::now();

        self.store
            .update_many(Collection::Credentials, FilterData::by_id(id), to_document(&credential)?)
            .await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Update,
                AuditTarget::Credencial,
                Some(id),
                format!("Edited credential: {}", credential.service_name),
            )
            .await;
        Ok(credential)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> Result<(), ServiceError> {
        let credential = self.get(id).await?;
        self.store.delete_many(Collection::Credentials, FilterData::by_id(id)).await?;
        self.audit
            .record(
                &actor.username,
                AuditAction::Delete,
                AuditTarget::Credencial,
                Some(id),
                format!("Deleted credential: {}", credential.service_name),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::store;
    use crate::types::Role;

    fn admin() -> User {
        User::new("root", String::new(), Role::Admin)
    }

    fn input(service: &str) -> CredentialInput {
        serde_json::from_value(json!({
            "serviceName": service,
            "accessUrl": "https://portal.example.com",
            "username": "ti",
            "password": "s3cret",
            "owner": "Infra"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn lists_by_service_name() {
        let (store, audit) = store();
        let credentials = CredentialService::new(store, audit.clone());
        credentials.create(&admin(), input("Zabbix")).await.unwrap();
        let firewall = credentials.create(&admin(), input("Firewall")).await.unwrap();

        let names: Vec<String> = credentials.list_active().await.unwrap().into_iter().map(|c| c.service_name).collect();
        assert_eq!(names, vec!["Firewall", "Zabbix"]);
        assert_eq!(firewall.owner.as_deref(), Some("Infra"));
        assert_eq!(audit.recent(1).await.unwrap()[0].target_type, "CREDENCIAL");
    }

    #[tokio::test]
    async fn update_bumps_timestamp_and_delete_removes() {
        let (store, audit) = store();
        let credentials = CredentialService::new(store, audit);
        let created = credentials.create(&admin(), input("VPN")).await.unwrap();

        let mut changed = input("VPN");
        changed.password = "rotated".to_string();
        let updated = credentials.update(&admin(), created.id, changed).await.unwrap();
        assert_eq!(updated.password, "rotated");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        credentials.delete(&admin(), created.id).await.unwrap();
        assert!(credentials.list_active().await.unwrap().is_empty());
        assert!(matches!(credentials.delete(&admin(), created.id).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn blank_required_fields_are_rejected() {
        let (store, audit) = store();
        let credentials = CredentialService::new(store, audit);
        let mut blank = input("VPN");
        blank.password = "  ".to_string();
        assert!(matches!(
            credentials.create(&admin(), blank).await,
            Err(ServiceError::Invalid { field: "password", .. })
        ));
    }
}
