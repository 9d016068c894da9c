//! Junos XML RPC requests and replies.
//!
//! [`Rpc`] is the typed request a [`Session`](crate::Session) issues;
//! [`Rpc::to_xml`] renders it for NETCONF. [`RpcReply`] is the decoded
//! `<rpc-reply>`.

mod reply;
pub mod xml;

pub use reply::{RpcError, RpcReply, Severity};

use crate::types::{
    CommitMode, CommitOptions, ConfigFormat, ConfigScope, LoadAction, LoadSource, OutputFormat,
    RollbackTarget,
};

const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// A single Junos RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rpc {
    /// Operational-mode CLI command.
    Command { command: String, format: OutputFormat },
    /// Committed configuration, whole or one top-level stanza.
    GetConfiguration {
        scope: ConfigScope,
        format: OutputFormat,
    },
    /// Hostname, model and version per routing engine.
    GetSoftwareInformation,
    /// Commit history (`show system commit`).
    GetCommitInformation,
    LockConfiguration,
    UnlockConfiguration,
    /// Load configuration into the candidate.
    LoadConfiguration {
        action: LoadAction,
        format: ConfigFormat,
        source: LoadSource,
    },
    /// Load a rollback or rescue snapshot into the candidate.
    LoadRollback(RollbackTarget),
    CommitConfiguration(CommitOptions),
    /// Difference between the active configuration and rollback `index`.
    CompareRollback { index: u8 },
    SaveRescue,
    DeleteRescue,
    CloseSession,
}

impl Rpc {
    /// RPC element name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Rpc::Command { .. } => "command",
            Rpc::GetConfiguration { .. } | Rpc::CompareRollback { .. } => "get-configuration",
            Rpc::GetSoftwareInformation => "get-software-information",
            Rpc::GetCommitInformation => "get-commit-information",
            Rpc::LockConfiguration => "lock-configuration",
            Rpc::UnlockConfiguration => "unlock-configuration",
            Rpc::LoadConfiguration { .. } | Rpc::LoadRollback(_) => "load-configuration",
            Rpc::CommitConfiguration(_) => "commit-configuration",
            Rpc::SaveRescue => "request-save-rescue-configuration",
            Rpc::DeleteRescue => "request-delete-rescue-configuration",
            Rpc::CloseSession => "close-session",
        }
    }

    /// Render the RPC body, without the `<rpc>` envelope.
    pub fn body(&self) -> String {
        match self {
            Rpc::Command { command, format } => match format {
                OutputFormat::Text => {
                    format!("<command format=\"text\">{}</command>", xml::escape(command))
                }
                OutputFormat::Xml => format!("<command>{}</command>", xml::escape(command)),
            },
            Rpc::GetConfiguration { scope, format } => match scope {
                ConfigScope::Full => format!(
                    "<get-configuration format=\"{format}\" database=\"committed\"/>"
                ),
                ConfigScope::Stanza(stanza) => format!(
                    "<get-configuration format=\"{format}\" database=\"committed\">\
                     <configuration><{stanza}/></configuration></get-configuration>"
                ),
            },
            Rpc::GetSoftwareInformation => "<get-software-information/>".to_string(),
            Rpc::GetCommitInformation => "<get-commit-information/>".to_string(),
            Rpc::LockConfiguration => "<lock-configuration/>".to_string(),
            Rpc::UnlockConfiguration => "<unlock-configuration/>".to_string(),
            Rpc::LoadConfiguration {
                action,
                format,
                source,
            } => load_body(*action, *format, source),
            Rpc::LoadRollback(RollbackTarget::Index(n)) => {
                format!("<load-configuration rollback=\"{n}\"/>")
            }
            Rpc::LoadRollback(RollbackTarget::Rescue) => {
                "<load-configuration rescue=\"rescue\"/>".to_string()
            }
            Rpc::CommitConfiguration(options) => commit_body(options),
            Rpc::CompareRollback { index } => format!(
                "<get-configuration compare=\"rollback\" rollback=\"{index}\" format=\"text\"/>"
            ),
            Rpc::SaveRescue => "<request-save-rescue-configuration/>".to_string(),
            Rpc::DeleteRescue => "<request-delete-rescue-configuration/>".to_string(),
            Rpc::CloseSession => "<close-session/>".to_string(),
        }
    }

    /// Render the complete `<rpc>` document.
    pub fn to_xml(&self, message_id: u64) -> String {
        format!(
            "<rpc message-id=\"{message_id}\" xmlns=\"{NETCONF_NS}\">{}</rpc>",
            self.body()
        )
    }
}

fn load_body(action: LoadAction, format: ConfigFormat, source: &LoadSource) -> String {
    // Set-format input is always applied with action="set"
    let (action, wire_format) = match format {
        ConfigFormat::Set => ("set", "text"),
        ConfigFormat::Text => (action.as_str(), "text"),
        ConfigFormat::Xml => (action.as_str(), "xml"),
    };

    match source {
        LoadSource::Url(url) => format!(
            "<load-configuration action=\"{action}\" format=\"{wire_format}\" url=\"{}\"/>",
            xml::escape_attr(url)
        ),
        LoadSource::Inline(data) => {
            let payload = match format {
                ConfigFormat::Set => {
                    format!("<configuration-set>{}</configuration-set>", xml::escape(data))
                }
                ConfigFormat::Text => {
                    format!("<configuration-text>{}</configuration-text>", xml::escape(data))
                }
                ConfigFormat::Xml => {
                    let data = data.trim();
                    if xml::has_element(data, "configuration") {
                        data.to_string()
                    } else {
                        format!("<configuration>{data}</configuration>")
                    }
                }
            };
            format!(
                "<load-configuration action=\"{action}\" format=\"{wire_format}\">{payload}</load-configuration>"
            )
        }
    }
}

fn commit_body(options: &CommitOptions) -> String {
    let mut children = String::new();
    match options.mode {
        CommitMode::Normal => {}
        CommitMode::Check => children.push_str("<check/>"),
        CommitMode::At(time) => {
            children.push_str(&format!("<at-time>{time}</at-time>"));
        }
        CommitMode::Confirm { minutes } => {
            children.push_str(&format!(
                "<confirmed/><confirm-timeout>{minutes}</confirm-timeout>"
            ));
        }
    }
    if let Some(comment) = &options.comment {
        children.push_str(&format!("<log>{}</log>", xml::escape(comment)));
    }

    if children.is_empty() {
        "<commit-configuration/>".to_string()
    } else {
        format!("<commit-configuration>{children}</commit-configuration>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CommitTime;

    #[test]
    fn test_envelope_carries_message_id() {
        let xml = Rpc::LockConfiguration.to_xml(7);
        assert_eq!(
            xml,
            "<rpc message-id=\"7\" xmlns=\"urn:ietf:params:xml:ns:netconf:base:1.0\">\
             <lock-configuration/></rpc>"
        );
    }

    #[test]
    fn test_command_text_is_escaped() {
        let rpc = Rpc::Command {
            command: "show route | match <x>".to_string(),
            format: OutputFormat::Text,
        };
        assert_eq!(
            rpc.body(),
            "<command format=\"text\">show route | match &lt;x&gt;</command>"
        );
    }

    #[test]
    fn test_get_configuration_stanza() {
        let rpc = Rpc::GetConfiguration {
            scope: ConfigScope::Stanza("security".to_string()),
            format: OutputFormat::Xml,
        };
        assert_eq!(
            rpc.body(),
            "<get-configuration format=\"xml\" database=\"committed\">\
             <configuration><security/></configuration></get-configuration>"
        );
    }

    #[test]
    fn test_load_set_uses_set_action() {
        let rpc = Rpc::LoadConfiguration {
            action: LoadAction::Merge,
            format: ConfigFormat::Set,
            source: LoadSource::Inline("set system host-name r1".to_string()),
        };
        assert_eq!(
            rpc.body(),
            "<load-configuration action=\"set\" format=\"text\">\
             <configuration-set>set system host-name r1</configuration-set></load-configuration>"
        );
    }

    #[test]
    fn test_load_xml_wraps_configuration() {
        let rpc = Rpc::LoadConfiguration {
            action: LoadAction::Override,
            format: ConfigFormat::Xml,
            source: LoadSource::Inline("<system><host-name>r1</host-name></system>".to_string()),
        };
        assert_eq!(
            rpc.body(),
            "<load-configuration action=\"override\" format=\"xml\"><configuration>\
             <system><host-name>r1</host-name></system></configuration></load-configuration>"
        );
    }

    #[test]
    fn test_load_url() {
        let rpc = Rpc::LoadConfiguration {
            action: LoadAction::Merge,
            format: ConfigFormat::Text,
            source: LoadSource::Url("ftp://u:p@h/%2Fcfg/a.conf".to_string()),
        };
        assert_eq!(
            rpc.body(),
            "<load-configuration action=\"merge\" format=\"text\" url=\"ftp://u:p@h/%2Fcfg/a.conf\"/>"
        );
    }

    #[test]
    fn test_commit_variants() {
        assert_eq!(
            Rpc::CommitConfiguration(CommitOptions::default()).body(),
            "<commit-configuration/>"
        );
        assert_eq!(
            Rpc::CommitConfiguration(CommitOptions::new(CommitMode::Check)).body(),
            "<commit-configuration><check/></commit-configuration>"
        );

        let at: CommitTime = "16:30:00".parse().unwrap();
        assert_eq!(
            Rpc::CommitConfiguration(CommitOptions::new(CommitMode::At(at))).body(),
            "<commit-configuration><at-time>16:30:00</at-time></commit-configuration>"
        );

        let confirm = CommitOptions::new(CommitMode::Confirm { minutes: 15 }).with_comment("a&b");
        assert_eq!(
            Rpc::CommitConfiguration(confirm).body(),
            "<commit-configuration><confirmed/><confirm-timeout>15</confirm-timeout>\
             <log>a&amp;b</log></commit-configuration>"
        );
    }

    #[test]
    fn test_rollback_targets() {
        assert_eq!(
            Rpc::LoadRollback(RollbackTarget::Index(3)).body(),
            "<load-configuration rollback=\"3\"/>"
        );
        assert_eq!(
            Rpc::LoadRollback(RollbackTarget::Rescue).body(),
            "<load-configuration rescue=\"rescue\"/>"
        );
        assert_eq!(
            Rpc::CompareRollback { index: 2 }.body(),
            "<get-configuration compare=\"rollback\" rollback=\"2\" format=\"text\"/>"
        );
    }
}
