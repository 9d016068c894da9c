//! Junos Space network management platform.
//!
//! [`SpaceServer`] wraps the device-management and software-management
//! REST APIs. Operations that Space runs in the background return a
//! [`Job`].

mod client;
mod job;
mod types;

pub use client::{SpaceConfig, SpaceServer};
pub use job::{Job, JobPoller, JobStatus};
pub use types::{SoftwarePackage, SoftwareUpgrade, SpaceDevice};
