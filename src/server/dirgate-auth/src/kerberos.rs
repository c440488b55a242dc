//! Kerberos login facility.
//!
//! The login configuration is built in process and installed once for the
//! lifetime of the process. It is never read from the ambient environment.
//!
//! [`KinitLogin`] performs the password handshake with the system `kinit`
//! tool against a private credential cache, and releases the credentials
//! with `kdestroy`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use zeroize::Zeroizing;

use crate::KerberosError;

/// Default handshake timeout in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

static LOGIN_CONFIGURATION: OnceLock<Krb5LoginConfiguration> = OnceLock::new();

/// Process-wide Kerberos login options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Krb5LoginConfiguration {
    /// Request forwardable tickets.
    pub forwardable: bool,
    /// Requested ticket lifetime, in `kinit` duration syntax (`10m`, `1h`).
    pub lifetime: Option<String>,
    /// Upper bound on a single handshake.
    pub timeout: Duration,
}

impl Default for Krb5LoginConfiguration {
    fn default() -> Self {
        Self {
            forwardable: false,
            lifetime: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        }
    }
}

/// Installs the login configuration.
///
/// The first installation wins; later calls return the configuration
/// already in place.
pub fn install_login_configuration(
    config: Krb5LoginConfiguration,
) -> &'static Krb5LoginConfiguration {
    let mut candidate = Some(config);
    let installed = LOGIN_CONFIGURATION.get_or_init(|| candidate.take().unwrap_or_default());

    if candidate.is_some_and(|c| &c != installed) {
        debug!("Kerberos login configuration already installed, keeping the first one");
    }

    installed
}

/// Returns the installed login configuration, installing the defaults on
/// first use.
pub fn login_configuration() -> &'static Krb5LoginConfiguration {
    LOGIN_CONFIGURATION.get_or_init(Krb5LoginConfiguration::default)
}

/// Kerberos section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KerberosConfig {
    /// Path or name of the `kinit` program.
    pub kinit_path: PathBuf,
    /// Path or name of the `kdestroy` program.
    pub kdestroy_path: PathBuf,
    /// Handshake timeout in seconds.
    pub timeout_seconds: u64,
    /// Request forwardable tickets.
    pub forwardable: bool,
    /// Requested ticket lifetime.
    pub lifetime: Option<String>,
}

impl Default for KerberosConfig {
    fn default() -> Self {
        Self {
            kinit_path: PathBuf::from("kinit"),
            kdestroy_path: PathBuf::from("kdestroy"),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            forwardable: false,
            lifetime: None,
        }
    }
}

impl KerberosConfig {
    /// Builds the process-wide login configuration from this section.
    pub fn to_login_configuration(&self) -> Krb5LoginConfiguration {
        Krb5LoginConfiguration {
            forwardable: self.forwardable,
            lifetime: self.lifetime.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
        }
    }

    /// Builds the `kinit` based login facility.
    pub fn login_facility(&self) -> KinitLogin {
        KinitLogin::new(&self.kinit_path, &self.kdestroy_path)
    }
}

/// Supplies the principal and password to a login handshake.
pub struct LoginCallback<'a> {
    /// Principal to log in as, e.g. `user@EXAMPLE.ORG`.
    pub principal: &'a str,
    /// Password of the principal.
    pub password: &'a str,
}

impl fmt::Debug for LoginCallback<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCallback")
            .field("principal", &self.principal)
            .field("password", &"***")
            .finish()
    }
}

/// Credentials obtained by a successful login.
#[async_trait]
pub trait KerberosSession: Send {
    /// Releases the credentials.
    async fn logout(self: Box<Self>) -> Result<(), KerberosError>;
}

/// Performs Kerberos password logins.
#[async_trait]
pub trait KerberosLogin: Send + Sync {
    /// Logs in with the principal and password supplied by `callback`.
    async fn login(
        &self,
        config: &Krb5LoginConfiguration,
        callback: &LoginCallback<'_>,
    ) -> Result<Box<dyn KerberosSession>, KerberosError>;

    /// Returns the name of this facility for logging.
    fn name(&self) -> &'static str;
}

/// Login facility backed by the MIT/Heimdal command line tools.
#[derive(Debug, Clone)]
pub struct KinitLogin {
    kinit: PathBuf,
    kdestroy: PathBuf,
}

impl Default for KinitLogin {
    fn default() -> Self {
        Self::new("kinit", "kdestroy")
    }
}

impl KinitLogin {
    /// Creates the facility with explicit program paths.
    pub fn new(kinit: impl AsRef<Path>, kdestroy: impl AsRef<Path>) -> Self {
        Self {
            kinit: kinit.as_ref().to_path_buf(),
            kdestroy: kdestroy.as_ref().to_path_buf(),
        }
    }

    fn command(program: &Path, cache_name: &str) -> Command {
        let mut command = Command::new(program);
        command
            .env_remove("KRB5CCNAME")
            .arg("-c")
            .arg(cache_name)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl KerberosLogin for KinitLogin {
    async fn login(
        &self,
        config: &Krb5LoginConfiguration,
        callback: &LoginCallback<'_>,
    ) -> Result<Box<dyn KerberosSession>, KerberosError> {
        let cache_dir = tempfile::Builder::new().prefix("dirgate-krb5-").tempdir()?;
        let cache_name = format!("FILE:{}", cache_dir.path().join("ccache").display());

        let mut command = Self::command(&self.kinit, &cache_name);
        command.arg(if config.forwardable { "-f" } else { "-F" });
        if let Some(lifetime) = &config.lifetime {
            command.arg("-l").arg(lifetime);
        }
        command.arg(callback.principal).stdin(Stdio::piped());

        let mut child = command.spawn().map_err(|source| KerberosError::Spawn {
            program: self.kinit.display().to_string(),
            source,
        })?;

        let mut input = Zeroizing::new(String::with_capacity(callback.password.len() + 1));
        input.push_str(callback.password);
        input.push('\n');

        let handshake = async move {
            if let Some(mut stdin) = child.stdin.take() {
                // kinit may exit before reading; its status decides.
                match stdin.write_all(input.as_bytes()).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(config.timeout, handshake)
            .await
            .map_err(|_| KerberosError::Timeout)??;

        if !output.status.success() {
            return Err(KerberosError::LoginFailed(failure_detail(
                &output.stderr,
                output.status,
            )));
        }

        debug!(principal = callback.principal, "Kerberos login succeeded");

        Ok(Box::new(KinitSession {
            kdestroy: self.kdestroy.clone(),
            cache_name,
            timeout: config.timeout,
            _cache_dir: cache_dir,
        }))
    }

    fn name(&self) -> &'static str {
        "kinit"
    }
}

/// Credential cache obtained by `kinit`.
///
/// The cache directory is removed when the session is dropped.
struct KinitSession {
    kdestroy: PathBuf,
    cache_name: String,
    timeout: Duration,
    _cache_dir: TempDir,
}

#[async_trait]
impl KerberosSession for KinitSession {
    async fn logout(self: Box<Self>) -> Result<(), KerberosError> {
        let child = KinitLogin::command(&self.kdestroy, &self.cache_name)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| KerberosError::Spawn {
                program: self.kdestroy.display().to_string(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| KerberosError::Timeout)??;

        if !output.status.success() {
            return Err(KerberosError::LogoutFailed(failure_detail(
                &output.stderr,
                output.status,
            )));
        }

        Ok(())
    }
}

fn failure_detail(stderr: &[u8], status: std::process::ExitStatus) -> String {
    let message = String::from_utf8_lossy(stderr);
    let message = message.trim();
    if message.is_empty() {
        status.to_string()
    } else {
        message.to_string()
    }
}
