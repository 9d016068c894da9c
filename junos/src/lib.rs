//! # junos
//!
//! Async client for Juniper Junos devices over NETCONF, and for the Junos
//! Space management platform over REST.
//!
//! ## Features
//!
//! - NETCONF 1.0 over SSH via russh
//! - Operational commands in text or XML
//! - Configuration transactions: lock, load (set / text / XML, inline, file
//!   or URL), commit check, commit, commit at, commit confirm, rollback,
//!   rescue and diff
//! - In-process simulated device for tests and demos
//! - Junos Space device inventory and software upgrades
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use junos::{ConfigFormat, ConfigSource, OutputFormat, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), junos::Error> {
//!     let mut session = Session::open("192.168.1.1", "admin", "secret").await?;
//!     println!("{}", session.facts());
//!
//!     let response = session.command("show version", OutputFormat::Text).await?;
//!     println!("{}", response.result);
//!
//!     session.lock().await?;
//!     session
//!         .load_config(
//!             ConfigSource::inline("set system name-server 1.1.1.1"),
//!             ConfigFormat::Set,
//!             false,
//!         )
//!         .await?;
//!     session.commit().await?;
//!     session.unlock().await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod rpc;
pub mod session;
pub mod sim;
pub mod space;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use error::{ConfigError, Error, Result, SessionError, SpaceError, TransportError};
pub use session::{
    ConfigSource, Facts, PendingCommit, Response, RollbackEntry, RoutingEngine, Session,
    SessionBuilder, TxState, ValidationResult,
};
pub use space::{Job, JobStatus, SoftwareUpgrade, SpaceServer};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
pub use types::{
    CommitMode, CommitOptions, ConfigFormat, ConfigScope, LoadAction, OutputFormat, RescueAction,
    RollbackTarget,
};
