#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Password of every account created by `--seed-demo`
pub const DEMO_PASSWORD: &str = "desk-demo";

/// A server process with its own in-memory store, killed on drop
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_desk-api-rust"));
        cmd.args(["serve", "--store", "memory", "--seed-demo", "--port", &port.to_string()])
            .env("APP_ENV", "development")
            .env("DESK_HOST", "127.0.0.1")
            .env_remove("DESK_CONFIG_FILE")
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = self.client.get(&url).send().await {
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

    /// Bearer token for a seeded account
    pub async fn login(&self, username: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": DEMO_PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login as {} failed: {}", username, res.status());

        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    pub async fn get(&self, token: &str, path: &str) -> Result<(StatusCode, Value)> {
        let res = self.client.get(self.url(path)).bearer_auth(token).send().await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    pub async fn put(&self, token: &str, path: &str, body: Value) -> Result<(StatusCode, Value)> {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }

    /// Id of the first request type with this name, from the public catalog
    pub async fn request_type_id(&self, token: &str, name: &str) -> Result<i64> {
        let (_, body) = self.get(token, "/api/catalog/request-types").await?;
        body["data"]
            .as_array()
            .and_then(|types| types.iter().find(|t| t["name"] == name))
            .and_then(|t| t["id"].as_i64())
            .with_context(|| format!("request type {} not in catalog", name))
    }

    /// Submits a request through the multipart endpoint
    pub async fn create_request(
        &self,
        token: &str,
        type_id: i64,
        subject: &str,
        file: Option<(&str, Vec<u8>)>,
    ) -> Result<(StatusCode, Value)> {
        let mut form = reqwest::multipart::Form::new()
            .text("typeId", type_id.to_string())
            .text("subject", subject.to_string())
            .text("description", "Created from the integration tests")
            .text("priority", "High");
        if let Some((name, bytes)) = file {
            let part = reqwest::multipart::Part::bytes(bytes)
                .file_name(name.to_string())
                .mime_str("text/plain")?;
            form = form.part("file", part);
        }

        let res = self
            .client
            .post(self.url("/api/requests"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        Ok((res.status(), res.json().await?))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Fresh server per test so the seeded data starts clean
pub async fn start_server() -> Result<TestServer> {
    let server = TestServer::spawn()?;
    server.wait_ready(Duration::from_secs(15)).await?;
    Ok(server)
}
