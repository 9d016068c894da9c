//! Value types shared by the session, RPC and simulator layers.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, SessionError};

/// Highest rollback index the device keeps (50 entries, 0..=49).
pub const MAX_ROLLBACK_INDEX: u8 = 49;

/// Longest confirmed-commit timeout Junos accepts, in minutes.
pub const MAX_CONFIRM_MINUTES: u32 = 65535;

fn invalid(message: impl Into<String>) -> Error {
    SessionError::InvalidArgument {
        message: message.into(),
    }
    .into()
}

/// Output format for operational commands and configuration reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Xml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Xml => "xml",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "xml" => Ok(OutputFormat::Xml),
            other => Err(invalid(format!("unknown output format '{other}'"))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format of configuration being loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// `set system name-server 1.1.1.1`
    Set,
    /// Curly-brace hierarchy.
    Text,
    /// Junos XML configuration elements.
    Xml,
}

impl ConfigFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFormat::Set => "set",
            ConfigFormat::Text => "text",
            ConfigFormat::Xml => "xml",
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "set" => Ok(ConfigFormat::Set),
            "text" => Ok(ConfigFormat::Text),
            "xml" => Ok(ConfigFormat::Xml),
            other => Err(invalid(format!("unknown configuration format '{other}'"))),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How loaded configuration combines with the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadAction {
    /// Merge into the existing candidate.
    #[default]
    Merge,
    /// Replace the whole candidate.
    Override,
}

impl LoadAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadAction::Merge => "merge",
            LoadAction::Override => "override",
        }
    }
}

/// Part of the configuration to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    /// Entire configuration.
    Full,
    /// One top-level stanza such as `system` or `security`.
    Stanza(String),
}

impl From<&str> for ConfigScope {
    fn from(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("full") {
            ConfigScope::Full
        } else {
            ConfigScope::Stanza(s.to_string())
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Full => f.write_str("full"),
            ConfigScope::Stanza(name) => f.write_str(name),
        }
    }
}

/// A rollback snapshot: numbered history or the rescue slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollbackTarget {
    Index(u8),
    Rescue,
}

impl RollbackTarget {
    /// Numbered rollback, checked against the history limit.
    pub fn index(n: u32) -> Result<Self, Error> {
        if n > u32::from(MAX_ROLLBACK_INDEX) {
            return Err(invalid(format!(
                "rollback index {n} out of range 0..={MAX_ROLLBACK_INDEX}"
            )));
        }
        Ok(RollbackTarget::Index(n as u8))
    }
}

impl FromStr for RollbackTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("rescue") {
            return Ok(RollbackTarget::Rescue);
        }
        let n: u32 = s
            .parse()
            .map_err(|_| invalid(format!("invalid rollback target '{s}'")))?;
        RollbackTarget::index(n)
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackTarget::Index(n) => write!(f, "{n}"),
            RollbackTarget::Rescue => f.write_str("rescue"),
        }
    }
}

/// Operation on the rescue configuration slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RescueAction {
    /// Store the active configuration as the rescue configuration.
    Save,
    /// Remove the rescue configuration.
    Delete,
}

impl FromStr for RescueAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "save" => Ok(RescueAction::Save),
            "delete" => Ok(RescueAction::Delete),
            other => Err(invalid(format!("unknown rescue action '{other}'"))),
        }
    }
}

/// Time for a scheduled commit, in device local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTime {
    /// `hh:mm[:ss]`, today.
    TimeOfDay(NaiveTime),
    /// `yyyy-mm-dd hh:mm[:ss]`.
    DateTime(NaiveDateTime),
}

impl CommitTime {
    /// Absolute commit time given the device's current time.
    pub fn resolve(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            CommitTime::TimeOfDay(t) => now.date().and_time(*t),
            CommitTime::DateTime(dt) => *dt,
        }
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

impl FromStr for CommitTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parsed = match s.split_once(' ') {
            Some((date, time)) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .zip(parse_time(time.trim()))
                .map(|(d, t)| CommitTime::DateTime(d.and_time(t))),
            None => parse_time(s).map(CommitTime::TimeOfDay),
        };
        parsed.ok_or_else(|| {
            invalid(format!(
                "invalid commit time '{s}', expected hh:mm[:ss] or yyyy-mm-dd hh:mm[:ss]"
            ))
        })
    }
}

impl fmt::Display for CommitTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitTime::TimeOfDay(t) => write!(f, "{}", t.format("%H:%M:%S")),
            CommitTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Commit variants. Exactly one applies to a commit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    #[default]
    Normal,
    /// Validate only.
    Check,
    /// Apply at a later time.
    At(CommitTime),
    /// Apply now, revert unless confirmed within `minutes`.
    Confirm { minutes: u16 },
}

impl CommitMode {
    /// Confirmed commit with a checked timeout (1..=65535 minutes).
    pub fn confirm(minutes: u32) -> Result<Self, Error> {
        if minutes == 0 || minutes > MAX_CONFIRM_MINUTES {
            return Err(invalid(format!(
                "commit confirm timeout must be 1..={MAX_CONFIRM_MINUTES} minutes, got {minutes}"
            )));
        }
        Ok(CommitMode::Confirm {
            minutes: minutes as u16,
        })
    }
}

/// Commit request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOptions {
    pub mode: CommitMode,
    /// Log comment recorded in the commit history.
    pub comment: Option<String>,
}

impl CommitOptions {
    pub fn new(mode: CommitMode) -> Self {
        Self {
            mode,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Where the device reads configuration from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Configuration sent in the RPC body.
    Inline(String),
    /// URL the device fetches itself.
    Url(String),
}
