//! In-memory Junos device.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, trace, warn};
use regex::Regex;

use super::clock::{Clock, SystemClock};
use super::config::{Configuration, LoadError};
use crate::channel::{FrameBuffer, frame};
use crate::error::{ConfigError, Result, SessionError, TransportError};
use crate::rpc::{Rpc, RpcError, RpcReply, Severity, xml};
use crate::transport::RpcTransport;
use crate::types::{
    CommitMode, CommitOptions, ConfigFormat, ConfigScope, LoadAction, LoadSource,
    MAX_ROLLBACK_INDEX, OutputFormat, RollbackTarget,
};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One committed configuration in the rollback history.
#[derive(Debug, Clone)]
struct Commit {
    config: Configuration,
    user: String,
    client: String,
    time: NaiveDateTime,
    comment: Option<String>,
}

#[derive(Debug)]
struct PendingConfirm {
    deadline: NaiveDateTime,
    /// Active configuration before the first unconfirmed commit.
    revert_to: Configuration,
    user: String,
}

#[derive(Debug)]
struct ScheduledCommit {
    at: NaiveDateTime,
    config: Configuration,
    user: String,
    comment: Option<String>,
}

#[derive(Debug)]
struct CommitRule {
    pattern: Regex,
    message: String,
}

#[derive(Debug)]
struct DeviceState {
    hostname: String,
    model: String,
    version: String,
    users: HashMap<String, String>,
    commands: HashMap<String, String>,
    remote_files: HashMap<String, String>,
    rules: Vec<CommitRule>,

    candidate: Configuration,
    /// Newest first; entry 0 is the active configuration.
    history: VecDeque<Commit>,
    rescue: Option<Configuration>,
    lock: Option<u64>,
    sessions: HashMap<u64, String>,
    next_session: u64,
    confirm: Option<PendingConfirm>,
    scheduled: Option<ScheduledCommit>,
}

impl DeviceState {
    fn active(&self) -> &Configuration {
        &self.history[0].config
    }

    fn user(&self, session: u64) -> String {
        self.sessions.get(&session).cloned().unwrap_or_default()
    }

    fn record_commit(&mut self, commit: Commit) {
        self.history.push_front(commit);
        self.history.truncate(usize::from(MAX_ROLLBACK_INDEX) + 1);
    }

    /// Apply expired confirm timeouts and due scheduled commits.
    fn fire_timers(&mut self, now: NaiveDateTime) {
        if let Some(confirm) = self.confirm.take_if(|c| now >= c.deadline) {
            debug!("{}: commit not confirmed, rolling back", self.hostname);
            if self.candidate == *self.active() {
                self.candidate = confirm.revert_to.clone();
            } else {
                warn!(
                    "{}: keeping uncommitted changes of {} across commit confirmed rollback",
                    self.hostname,
                    self.lock.map(|holder| self.user(holder)).unwrap_or_default()
                );
            }
            self.record_commit(Commit {
                config: confirm.revert_to,
                user: confirm.user,
                client: "other".to_string(),
                time: confirm.deadline,
                comment: Some("commit confirmed rollback".to_string()),
            });
        }

        if let Some(scheduled) = self.scheduled.take_if(|s| now >= s.at) {
            debug!("{}: applying commit scheduled for {}", self.hostname, scheduled.at);
            if self.candidate == *self.active() {
                self.candidate = scheduled.config.clone();
            }
            self.record_commit(Commit {
                config: scheduled.config,
                user: scheduled.user,
                client: "netconf".to_string(),
                time: scheduled.at,
                comment: scheduled.comment,
            });
        }
    }

    /// `lock-denied` when another session holds the lock.
    fn check_lock(&self, session: u64) -> Option<RpcReply> {
        match self.lock {
            Some(holder) if holder != session => Some(RpcReply::error(
                "lock-denied",
                format!("configuration database locked by: {}", self.user(holder)),
            )),
            _ => None,
        }
    }

    /// Drop the lock along with any changes its holder left uncommitted.
    fn release_lock(&mut self) {
        if self.candidate != *self.active() {
            debug!("{}: discarding uncommitted changes of lock holder", self.hostname);
            self.candidate = self.active().clone();
        }
        self.lock = None;
    }

    fn end_session(&mut self, session: u64) {
        if self.lock == Some(session) {
            self.release_lock();
        }
        self.sessions.remove(&session);
    }

    fn handle(&mut self, session: u64, rpc: &Rpc, now: NaiveDateTime) -> RpcReply {
        self.fire_timers(now);

        match rpc {
            Rpc::Command { command, format } => self.command(command, *format),
            Rpc::GetConfiguration { scope, format } => self.get_configuration(scope, *format),
            Rpc::GetSoftwareInformation => RpcReply::with_content(self.software_information()),
            Rpc::GetCommitInformation => RpcReply::with_content(self.commit_information()),
            Rpc::LockConfiguration => self.lock_configuration(session),
            Rpc::UnlockConfiguration => {
                if self.lock != Some(session) {
                    return RpcReply::error("operation-failed", "configuration database not locked");
                }
                self.release_lock();
                RpcReply::ok()
            }
            Rpc::LoadConfiguration {
                action,
                format,
                source,
            } => self.load(session, *action, *format, source),
            Rpc::LoadRollback(target) => self.load_rollback(session, *target),
            Rpc::CommitConfiguration(options) => self.commit(session, options, now),
            Rpc::CompareRollback { index } => self.compare_rollback(*index),
            Rpc::SaveRescue => {
                self.rescue = Some(self.active().clone());
                RpcReply::ok()
            }
            Rpc::DeleteRescue => {
                self.rescue = None;
                RpcReply::ok()
            }
            Rpc::CloseSession => RpcReply::ok(),
        }
    }

    fn compare_rollback(&self, index: u8) -> RpcReply {
        let Some(old) = self.history.get(usize::from(index)) else {
            return RpcReply::error("data-missing", format!("rollback {index} does not exist"));
        };
        let from = format!("rollback {index}");
        let diff = Configuration::diff(&old.config, self.active(), &from, "active");
        RpcReply::with_content(format!(
            "<configuration-information><configuration-output>{}</configuration-output>\
             </configuration-information>",
            xml::escape(&diff)
        ))
    }

    fn command(&self, command: &str, format: OutputFormat) -> RpcReply {
        let command = command.split_whitespace().collect::<Vec<_>>().join(" ");
        let text = match command.as_str() {
            "show version" => {
                if format == OutputFormat::Xml {
                    return RpcReply::with_content(self.software_information());
                }
                format!(
                    "Hostname: {}\nModel: {}\nJunos: {}\n",
                    self.hostname, self.model, self.version
                )
            }
            "show system commit" => {
                if format == OutputFormat::Xml {
                    return RpcReply::with_content(self.commit_information());
                }
                self.history
                    .iter()
                    .enumerate()
                    .map(|(i, c)| {
                        let mut line = format!(
                            "{i}   {} by {} via {}\n",
                            c.time.format(TIME_FORMAT),
                            c.user,
                            c.client
                        );
                        if let Some(comment) = &c.comment {
                            line.push_str(&format!("    {comment}\n"));
                        }
                        line
                    })
                    .collect()
            }
            "show configuration" => self.active().to_text(),
            other => match self.commands.get(other) {
                Some(output) => output.clone(),
                None => {
                    return RpcReply::error(
                        "operation-failed",
                        format!("syntax error, expecting <command>: {other}"),
                    );
                }
            },
        };
        RpcReply::with_content(format!("<output>{}</output>", xml::escape(&text)))
    }

    fn get_configuration(&self, scope: &ConfigScope, format: OutputFormat) -> RpcReply {
        let config = match scope {
            ConfigScope::Full => self.active().clone(),
            ConfigScope::Stanza(name) => {
                let stanza = self.active().stanza(name);
                if stanza.is_empty() {
                    return RpcReply::error("data-missing", format!("statement not found: {name}"));
                }
                stanza
            }
        };

        match format {
            OutputFormat::Xml => RpcReply::with_content(config.to_xml()),
            OutputFormat::Text => {
                let head = &self.history[0];
                let text = format!(
                    "## Last commit: {} by {}\n{}",
                    head.time.format(TIME_FORMAT),
                    head.user,
                    config.to_text()
                );
                RpcReply::with_content(format!(
                    "<configuration-text>{}</configuration-text>",
                    xml::escape(&text)
                ))
            }
        }
    }

    fn software_information(&self) -> String {
        format!(
            "<software-information><host-name>{}</host-name><product-model>{}</product-model>\
             <product-name>{}</product-name><junos-version>{}</junos-version></software-information>",
            xml::escape(&self.hostname),
            xml::escape(&self.model),
            xml::escape(&self.model),
            xml::escape(&self.version)
        )
    }

    fn commit_information(&self) -> String {
        let mut out = String::from("<commit-information>");
        for (i, c) in self.history.iter().enumerate() {
            out.push_str(&format!(
                "<commit-history><sequence-number>{i}</sequence-number><user>{}</user>\
                 <client>{}</client><date-time>{}</date-time>",
                xml::escape(&c.user),
                xml::escape(&c.client),
                c.time.format(TIME_FORMAT)
            ));
            if let Some(comment) = &c.comment {
                out.push_str(&format!("<log>{}</log>", xml::escape(comment)));
            }
            out.push_str("</commit-history>");
        }
        out.push_str("</commit-information>");
        out
    }

    fn lock_configuration(&mut self, session: u64) -> RpcReply {
        if let Some(denied) = self.check_lock(session) {
            return denied;
        }
        if self.lock == Some(session) {
            return RpcReply::error(
                "lock-denied",
                "configuration database already locked by this session",
            );
        }
        if self.candidate != *self.active() {
            return RpcReply::error("lock-denied", "configuration database modified");
        }
        self.lock = Some(session);
        RpcReply::ok()
    }

    fn load(
        &mut self,
        session: u64,
        action: LoadAction,
        format: ConfigFormat,
        source: &LoadSource,
    ) -> RpcReply {
        if let Some(denied) = self.check_lock(session) {
            return denied;
        }

        let data = match source {
            LoadSource::Inline(data) => data.clone(),
            LoadSource::Url(url) => match self.remote_files.get(url) {
                Some(data) => data.clone(),
                None => {
                    return RpcReply::error("operation-failed", "file-fetch failed: no such file");
                }
            },
        };

        let loaded = match format {
            ConfigFormat::Set => {
                let mut candidate = self.candidate.clone();
                candidate.apply_set(&data).map(|()| candidate)
            }
            ConfigFormat::Text => {
                Configuration::parse_text(&data).map(|parsed| self.combine(action, parsed))
            }
            ConfigFormat::Xml => {
                let data = data.trim();
                let parsed = if xml::has_element(data, "configuration") {
                    Configuration::parse_xml(data)
                } else {
                    Configuration::parse_xml(&format!("<configuration>{data}</configuration>"))
                };
                parsed.map(|parsed| self.combine(action, parsed))
            }
        };

        match loaded {
            Ok(candidate) => {
                self.candidate = candidate;
                RpcReply::ok()
            }
            Err(e) => load_error(e),
        }
    }

    fn combine(&self, action: LoadAction, parsed: Configuration) -> Configuration {
        match action {
            LoadAction::Override => parsed,
            LoadAction::Merge => {
                let mut candidate = self.candidate.clone();
                candidate.merge(&parsed);
                candidate
            }
        }
    }

    fn load_rollback(&mut self, session: u64, target: RollbackTarget) -> RpcReply {
        if let Some(denied) = self.check_lock(session) {
            return denied;
        }
        let config = match target {
            RollbackTarget::Index(n) => match self.history.get(usize::from(n)) {
                Some(commit) => commit.config.clone(),
                None => return RpcReply::error("data-missing", format!("rollback {n} does not exist")),
            },
            RollbackTarget::Rescue => match &self.rescue {
                Some(config) => config.clone(),
                None => return RpcReply::error("data-missing", "rescue configuration does not exist"),
            },
        };
        self.candidate = config;
        RpcReply::ok()
    }

    fn validate(&self) -> Vec<RpcError> {
        let mut errors = Vec::new();
        for statement in self.candidate.statements() {
            for rule in &self.rules {
                if rule.pattern.is_match(statement) {
                    errors.push(
                        RpcError::new(Severity::Error, "invalid-value", rule.message.clone())
                            .with_bad_element(statement),
                    );
                }
            }
        }
        errors
    }

    fn commit(&mut self, session: u64, options: &CommitOptions, now: NaiveDateTime) -> RpcReply {
        let errors = self.validate();
        if options.mode == CommitMode::Check {
            return RpcReply {
                errors,
                ..RpcReply::ok()
            };
        }
        if let Some(denied) = self.check_lock(session) {
            return denied;
        }
        if !errors.is_empty() {
            return RpcReply {
                errors,
                ..RpcReply::ok()
            };
        }

        let user = self.user(session);
        match options.mode {
            CommitMode::At(time) => {
                let at = time.resolve(now);
                if at <= now {
                    let message = format!("commit time {time} is in the past");
                    return RpcReply::error("invalid-value", message);
                }
                if self.scheduled.is_some() {
                    let message = "a scheduled commit is already pending";
                    return RpcReply::error("operation-failed", message);
                }
                self.scheduled = Some(ScheduledCommit {
                    at,
                    config: self.candidate.clone(),
                    user,
                    comment: options.comment.clone(),
                });
                return RpcReply::ok();
            }
            CommitMode::Confirm { minutes } => {
                let deadline = now + TimeDelta::minutes(i64::from(minutes));
                let revert_to = match self.confirm.take() {
                    Some(pending) => pending.revert_to,
                    None => self.active().clone(),
                };
                self.confirm = Some(PendingConfirm {
                    deadline,
                    revert_to,
                    user: user.clone(),
                });
            }
            CommitMode::Normal => {
                if self.confirm.take().is_some() {
                    debug!("{}: confirmed commit accepted", self.hostname);
                }
            }
            CommitMode::Check => {}
        }

        self.record_commit(Commit {
            config: self.candidate.clone(),
            user,
            client: "netconf".to_string(),
            time: now,
            comment: options.comment.clone(),
        });
        RpcReply::ok()
    }
}

fn load_error(e: LoadError) -> RpcReply {
    let mut error = RpcError::new(Severity::Error, "invalid-value", e.to_string());
    if let Some(statement) = e.statement {
        error = error.with_bad_element(statement);
    }
    RpcReply {
        errors: vec![error],
        ..RpcReply::ok()
    }
}

/// A simulated Junos device shared by any number of sessions.
///
/// Clones refer to the same device. Time is read from the device's
/// [`Clock`]; timers (confirmed-commit expiry, scheduled commits) fire on
/// the next RPC after they are due.
///
/// ```
/// use junos::sim::SimulatedDevice;
///
/// # async fn example() -> Result<(), junos::Error> {
/// let device = SimulatedDevice::builder("r1")
///     .config("set system host-name r1")
///     .build()?;
/// let session = device.open_session("admin").await?;
/// assert_eq!(session.hostname(), "r1");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
    clock: Arc<dyn Clock>,
}

impl SimulatedDevice {
    pub fn builder(hostname: impl Into<String>) -> SimulatedDeviceBuilder {
        SimulatedDeviceBuilder::new(hostname)
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session without authentication.
    pub fn connect(&self, user: impl Into<String>) -> SimTransport {
        let mut state = self.state();
        let id = state.next_session;
        state.next_session += 1;
        let user = user.into();
        debug!("{}: session {} opened for {}", state.hostname, id, user);
        state.sessions.insert(id, user);
        SimTransport {
            device: self.clone(),
            session: id,
            next_message_id: 1,
            buffer: FrameBuffer::default(),
            closed: false,
        }
    }

    /// Start a session, checking the password against configured users.
    ///
    /// A device built without users accepts any credentials.
    pub fn login(&self, user: &str, password: &str) -> Result<SimTransport> {
        {
            let state = self.state();
            if !state.users.is_empty() && state.users.get(user).is_none_or(|p| p != password) {
                return Err(TransportError::AuthenticationFailed {
                    user: user.to_string(),
                }
                .into());
            }
        }
        Ok(self.connect(user))
    }

    /// Open a [`Session`](crate::Session) on this device.
    pub async fn open_session(&self, user: &str) -> Result<crate::Session<SimTransport>> {
        let hostname = self.state().hostname.clone();
        crate::Session::with_transport(hostname, self.connect(user)).await
    }

    /// Drop every open session as if the network failed.
    pub fn sever_sessions(&self) {
        let mut state = self.state();
        let ids: Vec<u64> = state.sessions.keys().copied().collect();
        for id in ids {
            state.end_session(id);
        }
    }

    /// Current device time.
    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Active configuration, after firing due timers.
    pub fn active_config(&self) -> Configuration {
        let now = self.clock.now();
        let mut state = self.state();
        state.fire_timers(now);
        state.active().clone()
    }

    /// Shared candidate configuration.
    pub fn candidate_config(&self) -> Configuration {
        self.state().candidate.clone()
    }

    /// Number of rollback snapshots, including the active one.
    pub fn rollback_count(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state();
        state.fire_timers(now);
        state.history.len()
    }

    pub fn rescue_config(&self) -> Option<Configuration> {
        self.state().rescue.clone()
    }

    /// User of the session holding the configuration lock.
    pub fn lock_holder(&self) -> Option<String> {
        let state = self.state();
        state.lock.map(|id| state.user(id))
    }

    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    fn execute(&self, session: u64, rpc: &Rpc) -> Result<RpcReply> {
        let now = self.clock.now();
        let mut state = self.state();
        if !state.sessions.contains_key(&session) {
            return Err(TransportError::Disconnected.into());
        }
        let reply = state.handle(session, rpc, now);
        if matches!(rpc, Rpc::CloseSession) {
            state.end_session(session);
        }
        Ok(reply)
    }

    fn is_connected(&self, session: u64) -> bool {
        self.state().sessions.contains_key(&session)
    }

    fn disconnect(&self, session: u64) {
        self.state().end_session(session);
    }
}

/// Settings for a [`SimulatedDevice`].
pub struct SimulatedDeviceBuilder {
    hostname: String,
    model: String,
    version: String,
    config: String,
    clock: Arc<dyn Clock>,
    users: HashMap<String, String>,
    rules: Vec<(String, String)>,
    commands: HashMap<String, String>,
    remote_files: HashMap<String, String>,
}

impl SimulatedDeviceBuilder {
    fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            model: "vsrx".to_string(),
            version: "23.4R1.9".to_string(),
            config: String::new(),
            clock: Arc::new(SystemClock),
            users: HashMap::new(),
            rules: Vec::new(),
            commands: HashMap::new(),
            remote_files: HashMap::new(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Initial active configuration as `set` lines.
    pub fn config(mut self, set_lines: impl Into<String>) -> Self {
        self.config = set_lines.into();
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Require this user/password pair for [`SimulatedDevice::login`].
    pub fn user(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        self.users.insert(name.into(), password.into());
        self
    }

    /// Reject commits of any statement matching `pattern`.
    pub fn commit_rule(mut self, pattern: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((pattern.into(), message.into()));
        self
    }

    /// Canned text output for an operational command.
    pub fn command_output(mut self, command: impl Into<String>, output: impl Into<String>) -> Self {
        self.commands.insert(command.into(), output.into());
        self
    }

    /// File the device can fetch by URL during `load_config`.
    pub fn remote_file(mut self, url: impl Into<String>, contents: impl Into<String>) -> Self {
        self.remote_files.insert(url.into(), contents.into());
        self
    }

    pub fn build(self) -> Result<SimulatedDevice> {
        let mut config = Configuration::new();
        config
            .apply_set(&self.config)
            .map_err(|e| ConfigError::Parse {
                message: e.to_string(),
            })?;

        let rules = self
            .rules
            .into_iter()
            .map(|(pattern, message)| {
                Regex::new(&pattern)
                    .map(|pattern| CommitRule { pattern, message })
                    .map_err(|e| SessionError::InvalidArgument {
                        message: format!("invalid commit rule '{pattern}': {e}"),
                    })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let initial = Commit {
            config: config.clone(),
            user: "root".to_string(),
            client: "cli".to_string(),
            time: self.clock.now(),
            comment: None,
        };

        let state = DeviceState {
            hostname: self.hostname,
            model: self.model,
            version: self.version,
            users: self.users,
            commands: self.commands,
            remote_files: self.remote_files,
            rules,
            candidate: config,
            history: VecDeque::from([initial]),
            rescue: None,
            lock: None,
            sessions: HashMap::new(),
            next_session: 1,
            confirm: None,
            scheduled: None,
        };

        Ok(SimulatedDevice {
            state: Arc::new(Mutex::new(state)),
            clock: self.clock,
        })
    }
}

/// One session's connection to a [`SimulatedDevice`].
///
/// Replies travel through the same framing and XML decoding as a real
/// NETCONF connection.
#[derive(Debug)]
pub struct SimTransport {
    device: SimulatedDevice,
    session: u64,
    next_message_id: u64,
    buffer: FrameBuffer,
    closed: bool,
}

impl SimTransport {
    fn roundtrip(&mut self, rpc: &Rpc) -> Result<RpcReply> {
        let message_id = self.next_message_id;
        self.next_message_id += 1;
        trace!("sim rpc {}: {}", message_id, rpc.to_xml(message_id));

        let reply = self.device.execute(self.session, rpc)?;
        self.buffer.extend(frame(&reply.to_xml(message_id)).as_bytes());
        let message = self.buffer.next_message().ok_or_else(|| TransportError::Framing {
            message: "incomplete reply".to_string(),
        })?;
        RpcReply::parse(&String::from_utf8_lossy(&message))
    }
}

impl RpcTransport for SimTransport {
    async fn send_rpc(&mut self, rpc: &Rpc) -> Result<RpcReply> {
        if self.closed {
            return Err(TransportError::Disconnected.into());
        }
        let reply = self.roundtrip(rpc);
        if matches!(rpc, Rpc::CloseSession) {
            self.closed = true;
        }
        reply
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.device.disconnect(self.session);
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed && self.device.is_connected(self.session)
    }
}

impl Drop for SimTransport {
    fn drop(&mut self) {
        if !self.closed {
            self.device.disconnect(self.session);
        }
    }
}
