//! Shared application state handed to every handler through axum `State`.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::database::Store;
use crate::files::FileStorage;
use crate::ingest::Importer;
use crate::services::{
    ContractService, CredentialService, DashboardService, InvoiceService, TelephonyService, UserService,
};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub files: FileStorage,
    pub audit: AuditLog,
    pub importer: Importer,
    pub users: UserService,
    pub telephony: TelephonyService,
    pub contracts: ContractService,
    pub invoices: InvoiceService,
    pub credentials: CredentialService,
    pub dashboard: DashboardService,
}

impl AppContext {
    pub fn build(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let audit = AuditLog::new(store.clone());
        let files = FileStorage::new(
            config.server.upload_dir.clone(),
            config.server.max_request_size_bytes,
        );

        Self {
            importer: Importer::new(store.clone(), audit.clone()),
            users: UserService::new(store.clone(), audit.clone(), config.security.clone()),
            telephony: TelephonyService::new(store.clone(), audit.clone()),
            contracts: ContractService::new(store.clone(), audit.clone()),
            invoices: InvoiceService::new(store.clone(), audit.clone()),
            credentials: CredentialService::new(store.clone(), audit.clone()),
            dashboard: DashboardService::new(store.clone()),
            config: Arc::new(config),
            files,
            audit,
            store,
        }
    }
}
