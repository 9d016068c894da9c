//! NETCONF transport over an SSH `netconf` subsystem using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::RpcTransport;
use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::channel::{FrameBuffer, frame};
use crate::error::{Result, TransportError};
use crate::rpc::{Rpc, RpcReply};

const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.0";

/// NETCONF 1.0 session carried by an SSH channel.
pub struct NetconfTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// Channel bound to the `netconf` subsystem.
    channel: Channel<Msg>,

    /// Bytes received but not yet framed into a message.
    buffer: FrameBuffer,

    /// Next `message-id` attribute.
    next_message_id: u64,

    /// Session id announced in the server hello.
    session_id: Option<String>,

    /// Capabilities announced in the server hello.
    capabilities: Vec<String>,

    /// Configuration used for this connection.
    config: SshConfig,

    closed: bool,
}

impl NetconfTransport {
    /// Connect, authenticate, start the subsystem and exchange hellos.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(3600)),
            keepalive_interval: Some(Duration::from_secs(30)),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", config.socket_addr());
        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error stored by check_server_key
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: config.host.clone(),
                    port: config.port,
                    source,
                },
                (None, e) => TransportError::Ssh(e),
            }
        })?;

        Self::authenticate(&mut session, &config).await?;

        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_subsystem(true, "netconf")
            .await
            .map_err(|_| TransportError::SubsystemRejected("netconf".to_string()))?;

        let mut transport = Self {
            session,
            channel,
            buffer: FrameBuffer::default(),
            next_message_id: 1,
            session_id: None,
            capabilities: Vec::new(),
            config,
            closed: false,
        };
        transport.exchange_hello().await?;

        Ok(transport)
    }

    /// Session id assigned by the server.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Capabilities announced by the server.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn exchange_hello(&mut self) -> Result<()> {
        let hello = format!(
            "<hello xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\"><capabilities>\
             <capability>{BASE_CAPABILITY}</capability></capabilities></hello>"
        );
        self.write_message(&hello).await?;

        let server_hello = self.read_message().await?;
        self.capabilities = crate::rpc::xml::elements_text(&server_hello, "capability");
        self.session_id = crate::rpc::xml::element_text(&server_hello, "session-id");

        if !self.capabilities.iter().any(|c| c == BASE_CAPABILITY) {
            return Err(TransportError::Framing {
                message: "server does not announce NETCONF base:1.0".to_string(),
            }
            .into());
        }

        debug!(
            "NETCONF session {:?} established ({} capabilities)",
            self.session_id,
            self.capabilities.len()
        );
        Ok(())
    }

    async fn write_message(&mut self, xml: &str) -> Result<()> {
        trace!("netconf >> {}", xml);
        let framed = frame(xml);
        self.channel
            .data(framed.as_bytes())
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<String> {
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        loop {
            if let Some(message) = self.buffer.next_message() {
                let text = String::from_utf8(message).map_err(|e| TransportError::Framing {
                    message: format!("reply is not UTF-8: {e}"),
                })?;
                trace!("netconf << {}", text);
                return Ok(text);
            }

            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| TransportError::Timeout(self.config.timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(&data[..]),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    warn!("netconf stderr: {}", String::from_utf8_lossy(&data[..]));
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    self.closed = true;
                    return Err(TransportError::Disconnected.into());
                }
                Some(_) => {}
            }
        }
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let success = match &config.auth {
            AuthMethod::None => session
                .authenticate_none(&config.username)
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::Password(password) => session
                .authenticate_password(&config.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            AuthMethod::PrivateKey { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &config.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }

        Ok(())
    }
}

impl RpcTransport for NetconfTransport {
    async fn send_rpc(&mut self, rpc: &Rpc) -> Result<RpcReply> {
        if self.closed {
            return Err(TransportError::Disconnected.into());
        }

        let message_id = self.next_message_id;
        self.next_message_id += 1;
        debug!("rpc {} -> {}", message_id, rpc.name());

        self.write_message(&rpc.to_xml(message_id)).await?;
        let reply = self.read_message().await?;
        let reply = RpcReply::parse(&reply)?;

        if let Some(id) = reply.message_id.as_deref()
            && id != message_id.to_string()
        {
            return Err(TransportError::Framing {
                message: format!("reply message-id {id} does not match request {message_id}"),
            }
            .into());
        }

        Ok(reply)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Best effort: the device may drop the channel before answering
        let close = Rpc::CloseSession.to_xml(self.next_message_id);
        if self.write_message(&close).await.is_ok() {
            let _ = tokio::time::timeout(Duration::from_secs(5), self.read_message()).await;
        }

        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed && !self.session.is_closed()
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found.
    fn check_known_hosts(
        &self,
        pubkey: &PublicKey,
    ) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
