//! Configuration transaction: lock, load, validate, commit, unlock.
//!
//! The client tracks where it is in the protocol with [`TxState`]:
//!
//! ```text
//!            lock            load / rollback        commit_check (ok)
//! Unlocked ───────► Locked ───────────────► Edited ─────────────────► Validated
//!    ▲                                        │  ▲                        │
//!    │ unlock                commit_at /      │  └──── load / rollback ───┤
//!    │                       commit_confirm   ▼                           │
//!    └──────────── Committed ◄──── commit ── CommitPending ◄──────────────┘
//! ```
//!
//! Every state except `Unlocked` holds the device lock. The device enforces
//! the lock across sessions and clients; the client-side state only
//! catches sequencing mistakes before they reach the wire.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::manager::Session;
use super::source::ConfigSource;
use crate::error::{ConfigError, Error, Result, SessionError};
use crate::rpc::{Rpc, RpcReply, xml};
use crate::transport::RpcTransport;
use crate::types::{
    CommitMode, CommitOptions, CommitTime, ConfigFormat, LoadAction, LoadSource,
    MAX_ROLLBACK_INDEX, RescueAction, RollbackTarget,
};

/// Commit that has been issued but is not final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingCommit {
    /// Reverts unless followed by `commit()` within `minutes`.
    Confirm { minutes: u16 },
    /// Applied by the device at the given time.
    At(CommitTime),
}

/// Client-side configuration transaction state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxState {
    #[default]
    Unlocked,
    /// Lock held, candidate untouched by this session.
    Locked,
    /// Candidate modified and not validated.
    Edited,
    /// Candidate passed `commit_check`.
    Validated,
    CommitPending(PendingCommit),
    /// Candidate committed; lock still held.
    Committed,
}

impl TxState {
    /// Whether this session holds the configuration lock.
    pub fn holds_lock(&self) -> bool {
        !matches!(self, TxState::Unlocked)
    }

    /// Whether the candidate carries changes not yet committed.
    pub fn has_uncommitted_changes(&self) -> bool {
        matches!(self, TxState::Edited | TxState::Validated)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Unlocked => f.write_str("unlocked"),
            TxState::Locked => f.write_str("locked"),
            TxState::Edited => f.write_str("edited"),
            TxState::Validated => f.write_str("validated"),
            TxState::CommitPending(PendingCommit::Confirm { minutes }) => {
                write!(f, "awaiting commit confirmation ({minutes} min)")
            }
            TxState::CommitPending(PendingCommit::At(time)) => {
                write!(f, "commit scheduled at {time}")
            }
            TxState::Committed => f.write_str("committed"),
        }
    }
}

/// Result of a `commit check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the configuration is valid.
    pub valid: bool,
    /// Validation errors.
    pub errors: Vec<String>,
    /// Validation warnings.
    pub warnings: Vec<String>,
}

/// One entry of the device's commit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackEntry {
    /// Rollback index; 0 is the active configuration.
    pub index: u8,
    pub user: String,
    /// Commit client (`cli`, `netconf`, `junoscript`, ...).
    pub client: String,
    /// Commit time as reported by the device.
    pub timestamp: String,
    pub comment: Option<String>,
}

impl<T: RpcTransport> Session<T> {
    /// Lock the candidate configuration.
    ///
    /// Fails with [`ConfigError::AlreadyLocked`] if this session already
    /// holds the lock or the device reports another holder.
    pub async fn lock(&mut self) -> Result<()> {
        if self.state.holds_lock() {
            return Err(ConfigError::AlreadyLocked {
                holder: "this session".to_string(),
            }
            .into());
        }

        let reply = self.call(Rpc::LockConfiguration).await?;
        if !reply.is_ok() {
            let locked = reply.failures().any(|e| e.has_tag("lock-denied"));
            return Err(if locked {
                ConfigError::AlreadyLocked {
                    holder: reply.failure_message(),
                }
                .into()
            } else {
                rpc_error(&reply)
            });
        }

        debug!("{}: configuration locked", self.host());
        self.state = TxState::Locked;
        Ok(())
    }

    /// Release the configuration lock.
    ///
    /// Uncommitted changes are discarded (`rollback 0`) first so the next
    /// transaction starts from the active configuration.
    pub async fn unlock(&mut self) -> Result<()> {
        if !self.state.holds_lock() {
            return Err(ConfigError::NotLocked.into());
        }
        if self.state.has_uncommitted_changes() {
            warn!("{}: unlocking with uncommitted changes, discarding them", self.host());
            self.discard_changes().await?;
            self.state = TxState::Locked;
        }

        let reply = self.call(Rpc::UnlockConfiguration).await?;
        if !reply.is_ok() {
            if reply.failures().any(|e| e.has_tag("operation-failed")) {
                // The device no longer considers us the holder
                self.state = TxState::Unlocked;
                return Err(ConfigError::NotLocked.into());
            }
            return Err(rpc_error(&reply));
        }

        debug!("{}: configuration unlocked", self.host());
        self.state = TxState::Unlocked;
        Ok(())
    }

    /// Merge configuration into the candidate.
    ///
    /// `source` is a local path, an `ftp://` / `http://` URL the device
    /// fetches, or [`ConfigSource::inline`] text. With `commit_on_load`
    /// a normal commit follows the load.
    pub async fn load_config(
        &mut self,
        source: impl Into<ConfigSource>,
        format: ConfigFormat,
        commit_on_load: bool,
    ) -> Result<()> {
        self.load_config_with(source, LoadAction::Merge, format, commit_on_load)
            .await
    }

    /// Load configuration with an explicit merge / override action.
    pub async fn load_config_with(
        &mut self,
        source: impl Into<ConfigSource>,
        action: LoadAction,
        format: ConfigFormat,
        commit_on_load: bool,
    ) -> Result<()> {
        self.require_lock()?;
        if format == ConfigFormat::Set && action == LoadAction::Override {
            return Err(SessionError::InvalidArgument {
                message: "set-format configuration cannot override the candidate".to_string(),
            }
            .into());
        }

        let source = source.into();
        let load_source = source.resolve().await?;
        let from_url = matches!(load_source, LoadSource::Url(_));

        debug!(
            "{}: loading {} configuration from {} ({})",
            self.host(),
            format,
            source.location(),
            action.as_str()
        );
        let reply = self
            .call(Rpc::LoadConfiguration {
                action,
                format,
                source: load_source,
            })
            .await?;

        if !reply.is_ok() {
            if reply.failures().any(|e| e.has_tag("lock-denied")) {
                return Err(ConfigError::AlreadyLocked {
                    holder: reply.failure_message(),
                }
                .into());
            }
            if from_url && reply.failures().any(|e| e.has_tag("operation-failed")) {
                return Err(ConfigError::Source {
                    location: source.location(),
                    message: reply.failure_message(),
                }
                .into());
            }
            return Err(ConfigError::Parse {
                message: reply.failure_message(),
            }
            .into());
        }

        self.state = TxState::Edited;

        if commit_on_load {
            self.commit().await?;
        }
        Ok(())
    }

    /// Validate the candidate without committing it.
    ///
    /// Validation failures are reported in the result, not as `Err`.
    pub async fn commit_check(&mut self) -> Result<ValidationResult> {
        let reply = self
            .call(Rpc::CommitConfiguration(CommitOptions::new(CommitMode::Check)))
            .await?;

        let result = ValidationResult {
            valid: reply.is_ok(),
            errors: reply.failures().map(ToString::to_string).collect(),
            warnings: reply.warnings().map(ToString::to_string).collect(),
        };

        debug!(
            "{}: commit check {}",
            self.host(),
            if result.valid { "succeeded" } else { "failed" }
        );
        if result.valid && self.state == TxState::Edited {
            self.state = TxState::Validated;
        }
        Ok(result)
    }

    /// Commit the candidate. Confirms a pending `commit_confirm`.
    pub async fn commit(&mut self) -> Result<()> {
        self.commit_with(CommitOptions::default()).await
    }

    /// Schedule the commit for `time` (`hh:mm[:ss]` or `yyyy-mm-dd hh:mm[:ss]`).
    pub async fn commit_at(&mut self, time: &str) -> Result<()> {
        let time: CommitTime = time.parse()?;
        self.commit_with(CommitOptions::new(CommitMode::At(time)))
            .await
    }

    /// Commit, reverting automatically unless `commit()` follows within
    /// `minutes` (1..=65535).
    pub async fn commit_confirm(&mut self, minutes: u32) -> Result<()> {
        let mode = CommitMode::confirm(minutes)?;
        self.commit_with(CommitOptions::new(mode)).await
    }

    /// Commit with explicit options.
    pub async fn commit_with(&mut self, options: CommitOptions) -> Result<()> {
        if options.mode == CommitMode::Check {
            return Err(SessionError::InvalidArgument {
                message: "use commit_check() to validate without committing".to_string(),
            }
            .into());
        }
        self.require_lock()?;
        if let (CommitMode::At(_), TxState::CommitPending(PendingCommit::At(_))) =
            (options.mode, self.state)
        {
            return Err(ConfigError::InvalidState {
                operation: "schedule a commit".to_string(),
                state: self.state.to_string(),
            }
            .into());
        }

        debug!("{}: commit {:?}", self.host(), options.mode);
        let reply = self.call(Rpc::CommitConfiguration(options.clone())).await?;
        if !reply.is_ok() {
            if reply.failures().any(|e| e.has_tag("lock-denied")) {
                return Err(ConfigError::AlreadyLocked {
                    holder: reply.failure_message(),
                }
                .into());
            }
            return Err(ConfigError::CommitFailed {
                errors: reply.failures().map(ToString::to_string).collect(),
            }
            .into());
        }

        self.state = match options.mode {
            CommitMode::Confirm { minutes } => {
                TxState::CommitPending(PendingCommit::Confirm { minutes })
            }
            CommitMode::At(time) => TxState::CommitPending(PendingCommit::At(time)),
            CommitMode::Normal | CommitMode::Check => TxState::Committed,
        };
        Ok(())
    }

    /// Diff of the active configuration against rollback `index`.
    ///
    /// Empty when the two are identical.
    pub async fn config_diff(&mut self, index: u32) -> Result<String> {
        let index = u8::try_from(index)
            .ok()
            .filter(|n| *n <= MAX_ROLLBACK_INDEX)
            .ok_or_else(|| SessionError::InvalidArgument {
                message: format!("rollback index {index} out of range 0..={MAX_ROLLBACK_INDEX}"),
            })?;

        let reply = self.call(Rpc::CompareRollback { index }).await?;
        if !reply.is_ok() {
            return Err(not_found_or_rpc(&reply, format!("rollback {index}")));
        }
        Ok(reply.content.trim_end().to_string())
    }

    /// Load a rollback snapshot or the rescue configuration into the
    /// candidate. A commit is still required for it to take effect.
    pub async fn rollback_config(&mut self, target: RollbackTarget) -> Result<()> {
        if let RollbackTarget::Index(n) = target
            && n > MAX_ROLLBACK_INDEX
        {
            return Err(SessionError::InvalidArgument {
                message: format!("rollback index {n} out of range 0..={MAX_ROLLBACK_INDEX}"),
            }
            .into());
        }
        self.require_lock()?;

        debug!("{}: rollback {}", self.host(), target);
        let reply = self.call(Rpc::LoadRollback(target)).await?;
        if !reply.is_ok() {
            let what = match target {
                RollbackTarget::Index(n) => format!("rollback {n}"),
                RollbackTarget::Rescue => "rescue configuration".to_string(),
            };
            return Err(not_found_or_rpc(&reply, what));
        }

        self.state = TxState::Edited;
        Ok(())
    }

    /// Save the active configuration as the rescue configuration, or delete it.
    pub async fn rescue(&mut self, action: RescueAction) -> Result<()> {
        let rpc = match action {
            RescueAction::Save => Rpc::SaveRescue,
            RescueAction::Delete => Rpc::DeleteRescue,
        };
        let reply = self.call(rpc).await?;
        if !reply.is_ok() {
            return Err(rpc_error(&reply));
        }
        debug!("{}: rescue configuration {:?}", self.host(), action);
        Ok(())
    }

    /// Commit history, newest (rollback 0) first.
    pub async fn commit_history(&mut self) -> Result<Vec<RollbackEntry>> {
        let reply = self.call(Rpc::GetCommitInformation).await?;
        if !reply.is_ok() {
            return Err(rpc_error(&reply));
        }

        let mut entries = Vec::new();
        for item in xml::elements(&reply.content, "commit-history") {
            let index = item
                .child_text("sequence-number")
                .and_then(|n| n.parse::<u8>().ok())
                .ok_or_else(|| SessionError::MalformedReply {
                    message: "commit-history entry without sequence-number".to_string(),
                })?;
            entries.push(RollbackEntry {
                index,
                user: item.child_text("user").unwrap_or_default(),
                client: item.child_text("client").unwrap_or_default(),
                timestamp: item.child_text("date-time").unwrap_or_default(),
                comment: item.child_text("log").filter(|c| !c.is_empty()),
            });
        }
        entries.sort_by_key(|e| e.index);
        Ok(entries)
    }

    fn require_lock(&self) -> Result<()> {
        if !self.state.holds_lock() {
            return Err(ConfigError::NotLocked.into());
        }
        Ok(())
    }
}

fn rpc_error(reply: &RpcReply) -> Error {
    SessionError::Rpc {
        message: reply.failure_message(),
    }
    .into()
}

fn not_found_or_rpc(reply: &RpcReply, what: String) -> Error {
    if reply.failures().any(|e| e.has_tag("data-missing")) {
        SessionError::NotFound { what }.into()
    } else {
        rpc_error(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers each RPC with the next canned reply.
    struct Scripted(VecDeque<RpcReply>);

    impl RpcTransport for Scripted {
        async fn send_rpc(&mut self, _rpc: &Rpc) -> Result<RpcReply> {
            Ok(self.0.pop_front().unwrap_or_else(RpcReply::ok))
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_alive(&self) -> bool {
            true
        }
    }

    async fn scripted_session(replies: Vec<RpcReply>) -> Session<Scripted> {
        let mut script = VecDeque::from(replies);
        script.push_front(RpcReply::with_content(
            "<software-information><host-name>r1</host-name></software-information>",
        ));
        Session::with_transport("r1", Scripted(script)).await.unwrap()
    }

    #[tokio::test]
    async fn test_lock_failures_keyed_on_error_tag() {
        let mut session = scripted_session(vec![
            RpcReply::error("lock-denied", "exclusive access held by session 4711"),
            RpcReply::error("in-use", "database is locked for maintenance"),
        ])
        .await;

        assert!(matches!(
            session.lock().await.unwrap_err(),
            Error::Config(ConfigError::AlreadyLocked { .. })
        ));
        assert!(matches!(
            session.lock().await.unwrap_err(),
            Error::Session(SessionError::Rpc { .. })
        ));
        assert_eq!(*session.tx_state(), TxState::Unlocked);
    }

    #[tokio::test]
    async fn test_unlock_rejected_by_device_is_not_locked() {
        let mut session = scripted_session(vec![
            RpcReply::ok(),
            RpcReply::error("operation-failed", "lock held by another session"),
        ])
        .await;

        session.lock().await.unwrap();
        assert!(matches!(
            session.unlock().await.unwrap_err(),
            Error::Config(ConfigError::NotLocked)
        ));
        assert_eq!(*session.tx_state(), TxState::Unlocked);
    }

    #[test]
    fn test_lock_held_in_every_state_but_unlocked() {
        assert!(!TxState::Unlocked.holds_lock());
        for state in [
            TxState::Locked,
            TxState::Edited,
            TxState::Validated,
            TxState::CommitPending(PendingCommit::Confirm { minutes: 5 }),
            TxState::Committed,
        ] {
            assert!(state.holds_lock(), "{state} should hold the lock");
        }
    }

    #[test]
    fn test_uncommitted_changes() {
        assert!(TxState::Edited.has_uncommitted_changes());
        assert!(TxState::Validated.has_uncommitted_changes());
        assert!(!TxState::Committed.has_uncommitted_changes());
        assert!(!TxState::Locked.has_uncommitted_changes());
    }

    #[test]
    fn test_state_display() {
        let at: CommitTime = "16:30".parse().unwrap();
        assert_eq!(
            TxState::CommitPending(PendingCommit::At(at)).to_string(),
            "commit scheduled at 16:30:00"
        );
        assert_eq!(
            TxState::CommitPending(PendingCommit::Confirm { minutes: 15 }).to_string(),
            "awaiting commit confirmation (15 min)"
        );
    }
}
