//! In-process Junos device for tests and demos.
//!
//! [`SimulatedDevice`] keeps an active configuration, a shared candidate,
//! rollback history, a rescue slot and the device-wide lock. Sessions reach
//! it through [`SimTransport`], which implements
//! [`RpcTransport`](crate::transport::RpcTransport), so the same
//! [`Session`](crate::Session) code drives both real and simulated devices.

mod clock;
mod config;
mod device;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Configuration, LoadError};
pub use device::{SimTransport, SimulatedDevice, SimulatedDeviceBuilder};
