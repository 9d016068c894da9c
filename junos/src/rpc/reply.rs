//! Decoded `<rpc-reply>` documents.

use std::fmt;

use super::xml;
use crate::error::{Result, TransportError};

/// Root elements whose text content is the whole payload of a text-format
/// reply.
const TEXT_PAYLOADS: &[&str] = &[
    "output",
    "configuration-text",
    "configuration-output",
    "configuration-set",
];

/// Severity of an `<rpc-error>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One `<rpc-error>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcError {
    pub severity: Severity,
    /// NETCONF error-tag such as `lock-denied` or `data-missing`.
    pub tag: Option<String>,
    pub message: String,
    pub path: Option<String>,
    /// Offending element or statement, from `<error-info><bad-element>`.
    pub bad_element: Option<String>,
}

impl RpcError {
    pub fn new(severity: Severity, tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            tag: Some(tag.into()),
            message: message.into(),
            path: None,
            bad_element: None,
        }
    }

    pub fn with_bad_element(mut self, element: impl Into<String>) -> Self {
        self.bad_element = Some(element.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }

    fn parse(block: &str) -> Self {
        let severity = match xml::element_text(block, "error-severity").as_deref() {
            Some("warning") => Severity::Warning,
            _ => Severity::Error,
        };
        Self {
            severity,
            tag: xml::element_text(block, "error-tag"),
            message: xml::element_text(block, "error-message").unwrap_or_default(),
            path: xml::element_text(block, "error-path"),
            bad_element: xml::element_text(block, "bad-element"),
        }
    }

    fn to_xml(&self) -> String {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut out = format!("<rpc-error><error-type>application</error-type><error-severity>{severity}</error-severity>");
        if let Some(tag) = &self.tag {
            out.push_str(&format!("<error-tag>{}</error-tag>", xml::escape(tag)));
        }
        if let Some(path) = &self.path {
            out.push_str(&format!("<error-path>{}</error-path>", xml::escape(path)));
        }
        out.push_str(&format!(
            "<error-message>{}</error-message>",
            xml::escape(&self.message)
        ));
        if let Some(element) = &self.bad_element {
            out.push_str(&format!(
                "<error-info><bad-element>{}</bad-element></error-info>",
                xml::escape(element)
            ));
        }
        out.push_str("</rpc-error>");
        out
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(element) = &self.bad_element {
            write!(f, " ({element})")?;
        }
        Ok(())
    }
}

/// A decoded `<rpc-reply>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcReply {
    pub message_id: Option<String>,
    /// Unwrapped text for text payloads, otherwise the raw inner XML.
    pub content: String,
    /// Errors and warnings, in document order.
    pub errors: Vec<RpcError>,
}

impl RpcReply {
    /// A reply with no payload (`<ok/>`).
    pub fn ok() -> Self {
        Self::default()
    }

    /// A reply carrying a payload.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// A reply carrying a single error.
    pub fn error(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![RpcError::new(Severity::Error, tag, message)],
            ..Self::default()
        }
    }

    /// Parse a complete `<rpc-reply>` document.
    pub fn parse(doc: &str) -> Result<Self> {
        let Some(root) = xml::elements(doc, "rpc-reply").into_iter().next() else {
            return Err(TransportError::Framing {
                message: format!("expected <rpc-reply>, got: {}", truncate(doc, 80)),
            }
            .into());
        };

        let errors = xml::elements(&root.inner, "rpc-error")
            .iter()
            .map(|e| RpcError::parse(&e.inner))
            .collect();

        let body = xml::strip_elements(&root.inner, "rpc-error");
        // `show | compare` output comes wrapped in <configuration-information>
        let payload = xml::root_element(&body, "configuration-information")
            .map(|info| info.inner)
            .unwrap_or_else(|| body.clone());
        let content = TEXT_PAYLOADS
            .iter()
            .find_map(|name| xml::root_element(&payload, name).map(|e| xml::unescape(&e.inner)))
            .map(|text| text.trim_matches('\n').to_string())
            .unwrap_or_else(|| body.trim().to_string());

        Ok(Self {
            message_id: root.attr("message-id"),
            content,
            errors,
        })
    }

    /// Render as an `<rpc-reply>` document; used by the simulated device.
    pub fn to_xml(&self, message_id: u64) -> String {
        let mut body: String = self.errors.iter().map(RpcError::to_xml).collect();
        if self.content.is_empty() && self.failures().next().is_none() {
            body.push_str("<ok/>");
        } else if self.content.trim_start().starts_with('<') {
            body.push_str(&self.content);
        } else if !self.content.is_empty() {
            body.push_str(&format!("<output>{}</output>", xml::escape(&self.content)));
        }
        format!("<rpc-reply message-id=\"{message_id}\">{body}</rpc-reply>")
    }

    /// Errors with `error` severity.
    pub fn failures(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.severity == Severity::Error)
    }

    /// Errors with `warning` severity.
    pub fn warnings(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.severity == Severity::Warning)
    }

    /// True when no error-severity element is present.
    pub fn is_ok(&self) -> bool {
        self.failures().next().is_none()
    }

    /// All failure messages joined for display.
    pub fn failure_message(&self) -> String {
        self.failures()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_reply() {
        let reply = RpcReply::parse(r#"<rpc-reply message-id="3"><ok/></rpc-reply>"#).unwrap();
        assert!(reply.is_ok());
        assert_eq!(reply.message_id.as_deref(), Some("3"));
        assert_eq!(reply.content, "<ok/>");
    }

    #[test]
    fn test_text_output_unwrapped() {
        let doc = r#"<rpc-reply xmlns:junos="http://xml.juniper.net/junos/23.4R1/junos" message-id="4">
<output>
Hostname: lab-srx
Model: srx240h2 &amp; more
</output>
</rpc-reply>"#;
        let reply = RpcReply::parse(doc).unwrap();
        assert_eq!(reply.content, "Hostname: lab-srx\nModel: srx240h2 & more");
    }

    #[test]
    fn test_configuration_text_unwrapped() {
        let doc = "<rpc-reply><configuration-information><configuration-output>\n\
                   [edit system]\n+  host-name r2;\n</configuration-output></configuration-information></rpc-reply>";
        let reply = RpcReply::parse(doc).unwrap();
        assert_eq!(reply.content, "[edit system]\n+  host-name r2;");
    }

    #[test]
    fn test_nested_output_left_as_xml() {
        let doc = "<rpc-reply><route-information><route-table>\
                   <output>inet.0: 12 destinations</output>\
                   </route-table></route-information></rpc-reply>";
        let reply = RpcReply::parse(doc).unwrap();
        assert!(reply.content.starts_with("<route-information>"));
        assert!(reply.content.contains("<output>inet.0: 12 destinations</output>"));
    }

    #[test]
    fn test_errors_and_warnings() {
        let doc = r#"<rpc-reply message-id="9">
<rpc-error>
  <error-type>protocol</error-type>
  <error-tag>lock-denied</error-tag>
  <error-severity>error</error-severity>
  <error-message>configuration database locked by: admin</error-message>
</rpc-error>
<rpc-error>
  <error-severity>warning</error-severity>
  <error-message>statement has no effect</error-message>
  <error-info><bad-element>foo</bad-element></error-info>
</rpc-error>
</rpc-reply>"#;
        let reply = RpcReply::parse(doc).unwrap();
        assert!(!reply.is_ok());
        assert_eq!(reply.failures().count(), 1);
        assert!(reply.errors[0].has_tag("lock-denied"));
        assert_eq!(reply.warnings().next().unwrap().to_string(), "statement has no effect (foo)");
        assert_eq!(reply.failure_message(), "configuration database locked by: admin");
    }

    #[test]
    fn test_not_a_reply() {
        assert!(RpcReply::parse("<hello/>").is_err());
    }

    #[test]
    fn test_to_xml_parses_back() {
        let mut reply = RpcReply::with_content("a < b");
        reply.errors.push(RpcError::new(Severity::Warning, "warning", "careful"));
        let parsed = RpcReply::parse(&reply.to_xml(5)).unwrap();
        assert_eq!(parsed.content, "a < b");
        assert_eq!(parsed.warnings().count(), 1);
        assert!(parsed.is_ok());
    }
}
