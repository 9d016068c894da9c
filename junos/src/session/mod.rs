//! Device sessions.
//!
//! A [`Session`] owns one connection to one device. It runs operational
//! commands, reads configuration, and drives the configuration transaction
//! (see [`transaction`]).

mod builder;
mod facts;
mod manager;
mod response;
mod source;
pub mod transaction;

pub use builder::SessionBuilder;
pub use facts::{Facts, RoutingEngine};
pub use manager::Session;
pub use response::Response;
pub use source::ConfigSource;
pub use transaction::{PendingCommit, RollbackEntry, TxState, ValidationResult};
