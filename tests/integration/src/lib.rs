//! Integration tests for the Dirgate server.
//!
//! Each test writes a configuration file, starts the server binary and
//! drives it over HTTP. The configured directory listens nowhere, so every
//! lookup fails with a connection error.

// Allow unwrap() in tests - panics are acceptable for test assertions
#![allow(clippy::disallowed_methods)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::{redirect, Client};
use serde::Deserialize;
use tempfile::NamedTempFile;

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backends: usize,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Test Server
// ============================================================================

/// Server options written to the configuration file.
pub struct ServerOptions {
    pub context_path: &'static str,
    pub bypass_header: Option<&'static str>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            context_path: "/app",
            bypass_header: Some("X-Forwarded-User"),
        }
    }
}

impl ServerOptions {
    fn render(&self, port: u16) -> String {
        let reverse_proxy = match self.bypass_header {
            Some(header) => format!("enabled = true\nheader_name = \"{header}\""),
            None => "enabled = false".to_string(),
        };

        format!(
            r#"
bind = "127.0.0.1:{port}"
context_path = "{context_path}"

[reverse_proxy]
{reverse_proxy}

[[backends]]
key = "offline"
url = "ldap://127.0.0.1:1"
bind_mode = "anonymous"
timeout_seconds = 2

[backends.user_mapping]
base_dn = "ou=people,dc=example,dc=org"
"#,
            context_path = self.context_path,
        )
    }
}

/// A running server and its configuration file.
pub struct TestServer {
    process: Child,
    pub base_url: String,
    pub port: u16,
    _config: NamedTempFile,
}

impl TestServer {
    /// Start a server on the specified port.
    pub async fn start(port: u16, options: ServerOptions) -> Result<Self> {
        let config = write_config(&options.render(port))?;

        let process = Command::new(find_server_binary()?)
            .arg("--config")
            .arg(config.path())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to start server")?;

        let server = Self {
            process,
            base_url: format!("http://127.0.0.1:{port}{}", options.context_path),
            port,
            _config: config,
        };

        server.wait_for_ready().await?;

        Ok(server)
    }

    /// Wait for the server to be ready to accept connections.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = Client::new();
        let url = format!("{}/health", self.base_url);

        for _ in 0..50 {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                _ => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }

        bail!("Server failed to start within 5 seconds")
    }

    /// HTTP client that does not follow redirects.
    pub fn client(&self) -> Client {
        Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

fn write_config(contents: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .context("Failed to create config file")?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Find the server binary in the target directory.
fn find_server_binary() -> Result<PathBuf> {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    // Try debug build first, then release
    let candidates = [
        std::path::Path::new(&manifest_dir).join("../../target/debug/dirgate-server"),
        std::path::Path::new(&manifest_dir).join("../../target/debug/dirgate-server.exe"),
        std::path::Path::new(&manifest_dir).join("../../target/release/dirgate-server"),
        std::path::Path::new(&manifest_dir).join("../../target/release/dirgate-server.exe"),
    ];

    for candidate in &candidates {
        if candidate.exists() {
            return Ok(candidate.canonicalize()?);
        }
    }

    bail!(
        "Could not find dirgate-server binary. Run 'cargo build -p dirgate-server' first. Searched in: {:?}",
        candidates
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU16, Ordering};

    // Port counter to avoid conflicts between parallel tests
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(19300);

    fn next_port() -> u16 {
        PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_health() {
        let server = TestServer::start(next_port(), ServerOptions::default())
            .await
            .unwrap();

        let health: HealthResponse = server
            .client()
            .get(server.url("/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.backends, 1);
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_login_page_redirects_trusted_user() {
        let server = TestServer::start(next_port(), ServerOptions::default())
            .await
            .unwrap();

        let resp = server
            .client()
            .get(server.url("/sessions/new"))
            .header("X-Forwarded-User", "godin")
            .header("X-Forwarded-Proto", "https")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
        assert_eq!(
            resp.headers()["location"].to_str().unwrap(),
            format!("https://127.0.0.1:{}/app/ldap/validate", server.port)
        );
    }

    #[tokio::test]
    async fn test_login_page_without_trusted_user() {
        let server = TestServer::start(next_port(), ServerOptions::default())
            .await
            .unwrap();

        let resp = server
            .client()
            .get(server.url("/sessions/new"))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert!(resp.text().await.unwrap().contains("/app/sessions/login"));
    }

    #[tokio::test]
    async fn test_header_ignored_when_bypass_disabled() {
        let options = ServerOptions {
            context_path: "",
            bypass_header: None,
        };
        let server = TestServer::start(next_port(), options).await.unwrap();

        let resp = server
            .client()
            .get(server.url("/sessions/new"))
            .header("X-Forwarded-User", "godin")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unreachable_directory_rejects_trusted_user() {
        let server = TestServer::start(next_port(), ServerOptions::default())
            .await
            .unwrap();

        let resp = server
            .client()
            .get(server.url("/ldap/validate"))
            .header("X-Forwarded-User", "godin")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unreachable_directory_rejects_credentials() {
        let server = TestServer::start(next_port(), ServerOptions::default())
            .await
            .unwrap();

        let resp = server
            .client()
            .post(server.url("/sessions/login"))
            .form(&[("login", "godin"), ("password", "secret1")])
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(body.error, "not authenticated");
    }

    #[tokio::test]
    async fn test_bypass_without_header_name_refuses_to_start() {
        let port = next_port();
        let config = write_config(&format!(
            r#"
bind = "127.0.0.1:{port}"

[reverse_proxy]
enabled = true

[[backends]]
key = "offline"
url = "ldap://127.0.0.1:1"
bind_mode = "anonymous"

[backends.user_mapping]
base_dn = "ou=people,dc=example,dc=org"
"#
        ))
        .unwrap();

        let output = tokio::process::Command::new(find_server_binary().unwrap())
            .arg("--config")
            .arg(config.path())
            .output();
        let output = tokio::time::timeout(Duration::from_secs(10), output)
            .await
            .unwrap()
            .unwrap();

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("no header name"), "stderr: {stderr}");
    }
}
