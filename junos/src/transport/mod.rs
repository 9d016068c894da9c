//! Transport layer carrying Junos XML RPCs.
//!
//! [`RpcTransport`] is the seam between a [`Session`](crate::Session) and
//! the wire. [`NetconfTransport`] speaks NETCONF over SSH; the simulated
//! device in [`crate::sim`] implements the same trait in-process.

pub mod config;
mod ssh;

use std::future::Future;

pub use config::{AuthMethod, HostKeyVerification, NETCONF_PORT, SshConfig};
pub use ssh::NetconfTransport;

use crate::error::Result;
use crate::rpc::{Rpc, RpcReply};

/// A connection that executes one RPC at a time.
///
/// Methods take `&mut self`: a transport never has two requests in flight.
pub trait RpcTransport: Send {
    /// Send an RPC and wait for its reply.
    ///
    /// `rpc-error` elements are returned inside the reply, not as `Err`;
    /// `Err` means the transport itself failed.
    fn send_rpc(&mut self, rpc: &Rpc) -> impl Future<Output = Result<RpcReply>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Check if the connection is still usable.
    fn is_alive(&self) -> bool;
}
