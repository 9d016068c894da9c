//! Response type for operational command results.

use std::time::Duration;

use crate::types::OutputFormat;

/// Response from an operational command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Requested output format.
    pub format: OutputFormat,

    /// Command output: plain text, or the reply XML for `OutputFormat::Xml`.
    pub result: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Warning messages the device attached to the reply.
    pub warnings: Vec<String>,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        format: OutputFormat,
        result: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            format,
            result: result.into(),
            elapsed,
            warnings: Vec::new(),
        }
    }

    /// Attach device warnings.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}
