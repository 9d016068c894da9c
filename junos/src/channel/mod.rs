//! Channel layer for NETCONF message framing.
//!
//! Splits the SSH byte stream into complete XML messages.

mod buffer;

pub use buffer::{DELIMITER, FrameBuffer, frame};
