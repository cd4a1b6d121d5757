// Shared by several test binaries; each uses a subset.
#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Integration tests run against a real database only when this is set.
pub const DATABASE_URL_VAR: &str = "TRACKER_TEST_DATABASE_URL";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    database_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(database_url: String) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let child = Command::new(env!("CARGO_BIN_EXE_project-tracker"))
            .env("DATABASE_URL", &database_url)
            .env("DATABASE_RUN_MIGRATIONS", "true")
            .env("TRACKER_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to spawn server binary")?;

        Ok(Self { port, base_url, database_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a user through the `tracker` CLI against the server's database.
    pub fn create_user(&self, username: &str, password: &str, roles: &[&str]) -> Result<()> {
        let status = Command::new(env!("CARGO_BIN_EXE_tracker"))
            .env("DATABASE_URL", &self.database_url)
            .args(["user", "create", username, password])
            .args(roles)
            .stdout(Stdio::null())
            .status()
            .context("failed to run tracker CLI")?;
        anyhow::ensure!(status.success(), "tracker user create {} failed: {}", username, status);
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<String> {
        let body: Value = reqwest::Client::new()
            .post(self.url("/user/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }
}

/// The shared server, or `None` when no test database is configured.
pub async fn ensure_server() -> Result<Option<&'static TestServer>> {
    let Ok(database_url) = std::env::var(DATABASE_URL_VAR) else {
        eprintln!("{} not set, skipping integration test", DATABASE_URL_VAR);
        return Ok(None);
    };

    let server = SERVER.get_or_init(|| TestServer::spawn(database_url).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(Some(server))
}

/// Name unique to this run, so tests can share one database.
pub fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}_{}_{}", prefix, std::process::id(), nanos)
}
