//! Error types for junos.

use std::io;
use thiserror::Error;

/// Main error type for junos operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH / NETCONF transport errors (fatal to the session)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session-level errors (commands, reads, replies)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Configuration transaction errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Junos Space REST errors
    #[error("Space error: {0}")]
    Space(#[from] SpaceError),
}

impl Error {
    /// Whether this error leaves the session unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Transport layer errors (SSH connection, authentication, framing).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key differs from the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// The server refused the netconf subsystem
    #[error("Server rejected the '{0}' subsystem")]
    SubsystemRejected(String),

    /// A NETCONF message could not be framed or decoded
    #[error("Framing error: {message}")]
    Framing { message: String },

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session errors (operational commands, configuration reads, RPC replies).
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session not connected or already closed
    #[error("Session not connected")]
    NotConnected,

    /// Operational command rejected by the device
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// Requested configuration scope or snapshot does not exist
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Caller supplied an invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Device returned an rpc-error not mapped to a more specific kind
    #[error("RPC error: {message}")]
    Rpc { message: String },

    /// Reply could not be interpreted
    #[error("Malformed reply: {message}")]
    MalformedReply { message: String },
}

/// Configuration transaction errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration database is already locked
    #[error("Configuration already locked: {holder}")]
    AlreadyLocked { holder: String },

    /// Unlock or edit attempted without holding the lock
    #[error("Configuration is not locked by this session")]
    NotLocked,

    /// Configuration input is malformed
    #[error("Configuration parse error: {message}")]
    Parse { message: String },

    /// Configuration source could not be read or fetched
    #[error("Configuration source '{location}' unavailable: {message}")]
    Source { location: String, message: String },

    /// Commit rejected by the device
    #[error("Commit failed: {}", errors.join("; "))]
    CommitFailed { errors: Vec<String> },

    /// Operation not allowed in the current transaction state
    #[error("Cannot {operation} while {state}")]
    InvalidState { operation: String, state: String },
}

/// Junos Space REST errors.
#[derive(Error, Debug)]
pub enum SpaceError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// No managed device with this name
    #[error("Device '{name}' not found")]
    DeviceNotFound { name: String },

    /// No software package with this file name
    #[error("Software package '{name}' not found")]
    PackageNotFound { name: String },

    /// Response body could not be interpreted
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },
}

/// Result type alias using junos's Error.
pub type Result<T> = std::result::Result<T, Error>;
