//! Session handle: connection lifecycle, operational commands and reads.

use std::sync::LazyLock;
use std::time::Instant;

use log::{debug, warn};
use regex::Regex;
use secrecy::SecretString;

use super::builder::SessionBuilder;
use super::facts::Facts;
use super::response::Response;
use super::transaction::TxState;
use crate::error::{Result, SessionError};
use crate::rpc::{Rpc, RpcReply, xml};
use crate::transport::{NetconfTransport, RpcTransport};
use crate::types::{ConfigScope, OutputFormat, RollbackTarget};

/// An authenticated session to one Junos device.
///
/// Every operation takes `&mut self`, so requests on one session are
/// strictly sequential. Open one session per device to work in parallel.
///
/// The configuration transaction (lock, load, commit, ...) lives in the
/// same handle; see [`TxState`] for the state machine.
pub struct Session<T: RpcTransport = NetconfTransport> {
    host: String,

    /// Transport (None once closed or after a fatal transport error).
    pub(super) transport: Option<T>,

    facts: Facts,

    pub(super) state: TxState,
}

impl Session<NetconfTransport> {
    /// Open a NETCONF session with password authentication on port 830.
    ///
    /// Use [`SessionBuilder`] for keys, ports and host-key policy.
    pub async fn open(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<SecretString>,
    ) -> Result<Self> {
        SessionBuilder::new(host)
            .username(username)
            .password(password)
            .open()
            .await
    }
}

impl<T: RpcTransport> Session<T> {
    /// Wrap an established transport and gather device facts.
    pub async fn with_transport(host: impl Into<String>, transport: T) -> Result<Self> {
        let mut session = Self {
            host: host.into(),
            transport: Some(transport),
            facts: Facts::default(),
            state: TxState::Unlocked,
        };

        let reply = session.call(Rpc::GetSoftwareInformation).await?;
        if !reply.is_ok() {
            return Err(SessionError::Rpc {
                message: reply.failure_message(),
            }
            .into());
        }
        session.facts = Facts::from_software_information(&reply.content);
        debug!(
            "session to {} open ({})",
            session.host,
            if session.facts.hostname.is_empty() {
                "unknown hostname"
            } else {
                session.facts.hostname.as_str()
            }
        );

        Ok(session)
    }

    /// Target host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Facts gathered at open time.
    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    /// Hostname reported by the device.
    pub fn hostname(&self) -> &str {
        &self.facts.hostname
    }

    /// Check if the session is open and its transport usable.
    pub fn is_alive(&self) -> bool {
        self.transport.as_ref().is_some_and(|t| t.is_alive())
    }

    /// Current configuration transaction state.
    pub fn tx_state(&self) -> &TxState {
        &self.state
    }

    /// Send one RPC. A transport failure closes the session.
    pub(super) async fn call(&mut self, rpc: Rpc) -> Result<RpcReply> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;

        match transport.send_rpc(&rpc).await {
            Ok(reply) => {
                for warning in reply.warnings() {
                    debug!("{} warning: {}", rpc.name(), warning);
                }
                Ok(reply)
            }
            Err(e) => {
                if e.is_fatal() {
                    warn!("session to {} lost during {}: {}", self.host, rpc.name(), e);
                    self.transport = None;
                    self.state = TxState::Unlocked;
                }
                Err(e)
            }
        }
    }

    /// Run an operational-mode command (`show ...`, `request ...`).
    pub async fn command(&mut self, command: &str, format: OutputFormat) -> Result<Response> {
        let command = command.trim();
        if command.is_empty() {
            return Err(SessionError::InvalidArgument {
                message: "empty command".to_string(),
            }
            .into());
        }

        let start = Instant::now();
        let reply = self
            .call(Rpc::Command {
                command: command.to_string(),
                format,
            })
            .await?;

        if !reply.is_ok() {
            return Err(SessionError::Command {
                command: command.to_string(),
                message: reply.failure_message(),
            }
            .into());
        }

        let warnings = reply.warnings().map(ToString::to_string).collect();
        Ok(Response::new(command, format, reply.content, start.elapsed()).with_warnings(warnings))
    }

    /// Read the committed configuration.
    ///
    /// `scope` is `"full"` or a top-level stanza such as `"security"`.
    pub async fn get_config(
        &mut self,
        scope: impl Into<ConfigScope>,
        format: OutputFormat,
    ) -> Result<String> {
        let scope = scope.into();
        if let ConfigScope::Stanza(name) = &scope
            && !is_stanza_name(name)
        {
            return Err(SessionError::NotFound {
                what: format!("configuration stanza '{name}'"),
            }
            .into());
        }

        let reply = self
            .call(Rpc::GetConfiguration {
                scope: scope.clone(),
                format,
            })
            .await?;

        if !reply.is_ok() {
            return Err(match reply.failures().find(|e| e.has_tag("data-missing")) {
                Some(_) => SessionError::NotFound {
                    what: format!("configuration stanza '{scope}'"),
                },
                None => SessionError::Rpc {
                    message: reply.failure_message(),
                },
            }
            .into());
        }

        if let ConfigScope::Stanza(name) = &scope
            && is_empty_config(&reply.content, format)
        {
            return Err(SessionError::NotFound {
                what: format!("configuration stanza '{name}'"),
            }
            .into());
        }

        Ok(reply.content)
    }

    /// Close the session.
    ///
    /// A lock still held is released first: uncommitted candidate changes
    /// are discarded (`rollback 0`) and the database unlocked. The transport
    /// is closed even when that cleanup fails; the first error is returned.
    pub async fn close(mut self) -> Result<()> {
        self.shutdown().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        if self.transport.is_none() {
            return Ok(());
        }

        let mut first_error = None;
        if self.state.holds_lock() {
            warn!(
                "closing session to {} while {}; releasing configuration lock",
                self.host, self.state
            );
            if self.state.has_uncommitted_changes()
                && let Err(e) = self.discard_changes().await
            {
                first_error.get_or_insert(e);
            }
            if self.transport.is_some()
                && let Err(e) = self.call(Rpc::UnlockConfiguration).await
            {
                first_error.get_or_insert(e);
            }
            self.state = TxState::Unlocked;
        }

        if let Some(mut transport) = self.transport.take()
            && let Err(e) = transport.close().await
        {
            first_error.get_or_insert(e);
        }
        debug!("session to {} closed", self.host);

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub(super) async fn discard_changes(&mut self) -> Result<()> {
        let reply = self.call(Rpc::LoadRollback(RollbackTarget::Index(0))).await?;
        if !reply.is_ok() {
            return Err(SessionError::Rpc {
                message: reply.failure_message(),
            }
            .into());
        }
        Ok(())
    }
}

impl<T: RpcTransport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.transport.is_some() && self.state.holds_lock() {
            warn!(
                "Session to {} dropped while holding the configuration lock ({})",
                self.host, self.state
            );
        }
    }
}

static STANZA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]*$").expect("stanza name pattern"));

fn is_stanza_name(name: &str) -> bool {
    STANZA_NAME.is_match(name)
}

fn is_empty_config(content: &str, format: OutputFormat) -> bool {
    match format {
        OutputFormat::Text => content
            .lines()
            .all(|line| line.trim().is_empty() || line.trim_start().starts_with('#')),
        OutputFormat::Xml => xml::elements(content, "configuration")
            .first()
            .is_none_or(|c| c.inner.trim().is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stanza_names() {
        assert!(is_stanza_name("security"));
        assert!(is_stanza_name("routing-options"));
        assert!(!is_stanza_name("Security"));
        assert!(!is_stanza_name("system/host"));
        assert!(!is_stanza_name(""));
    }

    #[test]
    fn test_empty_config_detection() {
        assert!(is_empty_config("\n## Last changed: 2026-10-18\n", OutputFormat::Text));
        assert!(!is_empty_config("system {\n    host-name r1;\n}", OutputFormat::Text));
        assert!(is_empty_config("<configuration/>", OutputFormat::Xml));
        assert!(!is_empty_config(
            "<configuration><system/></configuration>",
            OutputFormat::Xml
        ));
    }
}
