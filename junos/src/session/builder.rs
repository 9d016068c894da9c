//! Builder for opening device sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::manager::Session;
use crate::error::{Result, SessionError};
use crate::transport::{AuthMethod, HostKeyVerification, NETCONF_PORT, NetconfTransport, SshConfig};

/// Builder for NETCONF sessions.
///
/// # Example
///
/// ```rust,no_run
/// use junos::SessionBuilder;
///
/// # async fn example() -> Result<(), junos::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .open()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    auth: AuthMethod,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: NETCONF_PORT,
            username: None,
            auth: AuthMethod::None,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set the SSH port (default: 830).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.auth = AuthMethod::Password(password.into());
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<SecretString>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(passphrase.into()),
        };
        self
    }

    /// Set the connect and per-RPC timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file instead of `~/.ssh/known_hosts`.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Validate the settings and produce the SSH configuration.
    pub fn build(self) -> Result<SshConfig> {
        let username = self.username.ok_or_else(|| SessionError::InvalidArgument {
            message: "Username is required".to_string(),
        })?;

        if self.host.trim().is_empty() {
            return Err(SessionError::InvalidArgument {
                message: "Host is required".to_string(),
            }
            .into());
        }

        Ok(SshConfig {
            host: self.host,
            port: self.port,
            username,
            auth: self.auth,
            timeout: self.timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        })
    }

    /// Connect, authenticate and gather facts.
    pub async fn open(self) -> Result<Session<NetconfTransport>> {
        let config = self.build()?;
        let host = config.host.clone();
        let transport = NetconfTransport::connect(config).await?;
        Session::with_transport(host, transport).await
    }
}
