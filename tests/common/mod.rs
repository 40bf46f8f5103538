#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::Value;

use portal_ti_api::config::AppConfig;
use portal_ti_api::database::{MemoryStore, Store};
use portal_ti_api::{app, AppContext};

pub const ADMIN: &str = "root";
pub const PASSWORD: &str = "secret1";

/// Router served in-process on a free port, backed by a fresh in-memory store.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub ctx: AppContext,
    upload_dir: PathBuf,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let upload_dir = std::env::temp_dir().join(format!("portal-it-{}", port));

        let mut vars = HashMap::new();
        vars.insert("STORAGE_BACKEND", "memory".to_string());
        vars.insert("JWT_SECRET", "integration-secret".to_string());
        vars.insert("SECURITY_BCRYPT_COST", "4".to_string());
        vars.insert("UPLOAD_DIR", upload_dir.display().to_string());
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned())?;

        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let ctx = AppContext::build(config, store);
        ctx.files.ensure_root().await?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let router = app(ctx.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            ctx,
            upload_dir,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Form login, returning the bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/token"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["access_token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from login response")
    }

    /// Bootstrap the first admin through `/register` and return its token.
    pub async fn bootstrap_admin(&self) -> Result<String> {
        let res = self
            .client
            .post(self.url("/register"))
            .json(&serde_json::json!({ "username": ADMIN, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "bootstrap failed: {}", res.status());
        let body: Value = res.json().await?;
        body["data"]["access_token"]
            .as_str()
            .map(str::to_string)
            .context("token missing from register response")
    }

    /// Create a user with `role` as the admin and log in as them.
    pub async fn user_with_role(&self, admin_token: &str, username: &str, role: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/users"))
            .bearer_auth(admin_token)
            .json(&serde_json::json!({ "username": username, "password": PASSWORD, "role": role }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "user creation failed: {}", res.status());
        self.login(username, PASSWORD).await
    }

    pub async fn get_json(&self, path: &str, token: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        let status = res.status();
        Ok((status, res.json().await?))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}
