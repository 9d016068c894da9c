//! Configuration database model for the simulated device.
//!
//! A configuration is an ordered set of `set` statements without the
//! leading `set` keyword (`system host-name r1`). Curly-brace text and XML
//! are converted to statements on load and rendered from them on read.

use std::fmt;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;

use crate::rpc::xml;

static ELEMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("element name pattern"));

/// Keywords that take exactly one value; setting one replaces the old value.
const SINGLE_VALUE: &[&str] = &[
    "authorization",
    "autonomous-system",
    "class",
    "contact",
    "description",
    "domain-name",
    "encrypted-password",
    "host-name",
    "location",
    "message",
    "metric",
    "mtu",
    "preference",
    "router-id",
    "speed",
    "time-zone",
    "uid",
    "vlan-id",
];

/// Comments, processing instructions, tags (`/`, name, `/`) and text.
static XML_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->|<\?.*?\?>|<(/?)(?:[\w.-]+:)?([\w.-]+)[^>]*?(/?)>|([^<]+)")
        .expect("xml token pattern")
});

/// Error raised while parsing configuration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// 1-based line of the offending input, 0 when unknown.
    pub line: usize,
    pub message: String,
    /// Offending statement or token.
    pub statement: Option<String>,
}

impl LoadError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
            statement: None,
        }
    }

    fn at(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: ", self.line)?;
        }
        f.write_str(&self.message)
    }
}

/// A configuration as ordered statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    statements: IndexSet<String>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().map(String::as_str)
    }

    pub fn contains(&self, statement: &str) -> bool {
        self.statements.contains(statement)
    }

    /// Add a statement. A new value for a single-value leaf takes the old
    /// value's place.
    fn insert(&mut self, tokens: &[String]) {
        let Some((_, parent)) = tokens.split_last() else {
            return;
        };
        let statement = tokens.join(" ");
        if let Some(keyword) = parent.last()
            && SINGLE_VALUE.contains(&keyword.as_str())
        {
            let prefix = format!("{} ", parent.join(" "));
            if let Some(at) = self.statements.iter().position(|s| s.starts_with(&prefix)) {
                self.statements.retain(|s| !s.starts_with(&prefix));
                self.statements.shift_insert(at, statement);
                return;
            }
        }
        self.statements.insert(statement);
    }

    /// Remove a statement and everything beneath it.
    fn delete(&mut self, tokens: &[String]) -> bool {
        let target = tokens.join(" ");
        let prefix = format!("{target} ");
        let before = self.statements.len();
        self.statements
            .retain(|s| *s != target && !s.starts_with(&prefix));
        self.statements.len() != before
    }

    /// Apply `set` / `delete` lines in order.
    pub fn apply_set(&mut self, text: &str) -> Result<(), LoadError> {
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens = tokenize(line).map_err(|m| LoadError::new(i + 1, m).at(line))?;
            match tokens.split_first() {
                Some((verb, rest)) if verb == "set" && !rest.is_empty() => self.insert(rest),
                Some((verb, rest)) if verb == "delete" && !rest.is_empty() => {
                    self.delete(rest);
                }
                Some((verb, _)) if verb == "set" || verb == "delete" => {
                    let message = format!("syntax error, expecting <statement> after '{verb}'");
                    return Err(LoadError::new(i + 1, message).at(line));
                }
                _ => {
                    let message = "syntax error, expecting 'set' or 'delete'";
                    return Err(LoadError::new(i + 1, message).at(line));
                }
            }
        }
        Ok(())
    }

    /// Parse curly-brace configuration text.
    pub fn parse_text(text: &str) -> Result<Self, LoadError> {
        let mut config = Self::new();
        let mut stack: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut list: Option<Vec<String>> = None;
        let mut line = 1;

        for (token, token_line) in text_tokens(text)? {
            line = token_line;
            if let Some(items) = list.as_mut() {
                match token.as_str() {
                    "]" => {
                        let items = list.take().unwrap_or_default();
                        // `members [ a b ];` is one statement per member
                        for item in items {
                            let mut tokens = path(&stack, &current);
                            tokens.push(item);
                            config.insert(&tokens);
                        }
                        current.push(String::new());
                    }
                    "[" | "{" | "}" | ";" => {
                        return Err(LoadError::new(line, format!("unexpected '{token}' in list")));
                    }
                    _ => items.push(token),
                }
                continue;
            }

            match token.as_str() {
                "{" => {
                    if current.is_empty() {
                        return Err(LoadError::new(line, "'{' without a statement"));
                    }
                    stack.push(std::mem::take(&mut current));
                }
                "}" => {
                    if !current.is_empty() {
                        return Err(LoadError::new(line, "missing ';' before '}'")
                            .at(current.join(" ")));
                    }
                    if stack.pop().is_none() {
                        return Err(LoadError::new(line, "unbalanced '}'"));
                    }
                }
                ";" => {
                    let list_done = current.last().is_some_and(String::is_empty);
                    if !list_done && !current.is_empty() {
                        config.insert(&path(&stack, &current));
                    }
                    current.clear();
                }
                "[" => list = Some(Vec::new()),
                "]" => return Err(LoadError::new(line, "unbalanced ']'")),
                _ => current.push(token),
            }
        }

        if list.is_some() {
            return Err(LoadError::new(line, "unterminated '['"));
        }
        if !current.is_empty() {
            return Err(LoadError::new(line, "missing ';'").at(current.join(" ")));
        }
        if !stack.is_empty() {
            return Err(LoadError::new(line, "missing '}'"));
        }
        Ok(config)
    }

    /// Parse Junos XML configuration elements.
    ///
    /// An element with a `<name>` child is a keyed list entry. Entries whose
    /// parent is the plural of the element (`<interfaces><interface>`)
    /// contribute only their key, as in `set interfaces ge-0/0/0`.
    pub fn parse_xml(text: &str) -> Result<Self, LoadError> {
        let root = XmlNode::parse(text)?;
        let mut config = Self::new();
        let top: Vec<&XmlNode> = if root.name == "configuration" {
            root.children.iter().collect()
        } else {
            vec![&root]
        };
        for node in top {
            node.emit(None, &mut Vec::new(), &mut config);
        }
        Ok(config)
    }

    /// Add every statement of `other`.
    pub fn merge(&mut self, other: &Configuration) {
        for statement in &other.statements {
            if let Ok(tokens) = tokenize(statement) {
                self.insert(&tokens);
            }
        }
    }

    /// Statements under one top-level stanza.
    pub fn stanza(&self, name: &str) -> Configuration {
        let prefix = format!("{name} ");
        Configuration {
            statements: self
                .statements
                .iter()
                .filter(|s| s.as_str() == name || s.starts_with(&prefix))
                .cloned()
                .collect(),
        }
    }

    /// `set` lines.
    pub fn to_set(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("set {s}\n"))
            .collect()
    }

    /// Curly-brace text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        render_text(&self.tree(), 0, &mut out);
        out
    }

    /// `<configuration>` document.
    pub fn to_xml(&self) -> String {
        let tree = self.tree();
        let mut out = String::from("<configuration>");
        for (token, child) in &tree.children {
            render_xml(token, child, &mut out);
        }
        out.push_str("</configuration>");
        out
    }

    /// Statement-level diff from `old` to `new`; empty when identical.
    pub fn diff(old: &Configuration, new: &Configuration, from: &str, to: &str) -> String {
        let removed: Vec<&String> = old
            .statements
            .iter()
            .filter(|s| !new.statements.contains(*s))
            .collect();
        let added: Vec<&String> = new
            .statements
            .iter()
            .filter(|s| !old.statements.contains(*s))
            .collect();

        if removed.is_empty() && added.is_empty() {
            return String::new();
        }

        let mut out = format!("--- {from}\n+++ {to}\n");
        for statement in removed {
            out.push_str(&format!("- set {statement}\n"));
        }
        for statement in added {
            out.push_str(&format!("+ set {statement}\n"));
        }
        out
    }

    fn tree(&self) -> Node {
        let mut root = Node::default();
        for statement in &self.statements {
            let mut node = &mut root;
            for token in tokenize(statement).unwrap_or_default() {
                node = node.children.entry(token).or_default();
            }
        }
        root
    }
}

fn path(stack: &[Vec<String>], current: &[String]) -> Vec<String> {
    stack
        .iter()
        .flatten()
        .chain(current.iter())
        .filter(|t| !t.is_empty())
        .cloned()
        .collect()
}

/// Split a statement into tokens, keeping double-quoted strings whole.
fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            token.push(chars.next().unwrap_or('"'));
            let mut closed = false;
            while let Some(c) = chars.next() {
                token.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        token.push(escaped);
                    }
                } else if c == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err("unterminated quoted string".to_string());
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// Tokens of curly-brace text with their line numbers; comments dropped.
fn text_tokens(text: &str) -> Result<Vec<(String, usize)>, LoadError> {
    let mut tokens = Vec::new();
    let mut in_comment = false;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let mut line = raw.to_string();

        if in_comment {
            match line.find("*/") {
                Some(end) => {
                    line = line[end + 2..].to_string();
                    in_comment = false;
                }
                None => continue,
            }
        }
        while let Some(start) = line.find("/*") {
            match line[start..].find("*/") {
                Some(len) => line.replace_range(start..start + len + 2, " "),
                None => {
                    line.truncate(start);
                    in_comment = true;
                }
            }
        }
        if line.trim_start().starts_with('#') {
            continue;
        }

        let mut spaced = String::with_capacity(line.len());
        let mut quoted = false;
        for c in line.chars() {
            if c == '"' {
                quoted = !quoted;
            }
            if !quoted && matches!(c, '{' | '}' | ';' | '[' | ']') {
                spaced.push(' ');
                spaced.push(c);
                spaced.push(' ');
            } else {
                spaced.push(c);
            }
        }

        let line_tokens =
            tokenize(&spaced).map_err(|m| LoadError::new(line_no, m).at(raw.trim()))?;
        tokens.extend(
            line_tokens
                .into_iter()
                // Junos annotations such as `inactive:` or `replace:`
                .filter(|t| !(t.ends_with(':') && !t.starts_with('"')))
                .map(|t| (t, line_no)),
        );
    }

    if in_comment {
        return Err(LoadError::new(0, "unterminated comment"));
    }
    Ok(tokens)
}

#[derive(Debug, Default)]
struct Node {
    children: IndexMap<String, Node>,
}

impl Node {
    /// `host-name r1` style: exactly one child, itself a leaf.
    fn leaf_value(&self) -> Option<&str> {
        match self.children.iter().next() {
            Some((value, child)) if self.children.len() == 1 && child.children.is_empty() => {
                Some(value.as_str())
            }
            _ => None,
        }
    }

    /// Every child is a list key (`0`, `ge-0/0/0`, `1.1.1.1`).
    fn keyed(&self) -> bool {
        !self.children.is_empty() && self.children.keys().all(|k| !is_element_name(k))
    }
}

/// `interfaces` -> `interface`; `address` has no singular.
fn singular(token: &str) -> Option<&str> {
    token
        .strip_suffix('s')
        .filter(|s| !s.is_empty() && !s.ends_with('s'))
}

fn is_element_name(token: &str) -> bool {
    ELEMENT_NAME.is_match(token)
}

fn render_text(node: &Node, depth: usize, out: &mut String) {
    let pad = "    ".repeat(depth);
    for (token, child) in &node.children {
        if child.children.is_empty() {
            out.push_str(&format!("{pad}{token};\n"));
        } else if let Some(value) = child.leaf_value() {
            out.push_str(&format!("{pad}{token} {value};\n"));
        } else if child.keyed() && singular(token).is_none() {
            // `unit 0 { ... }` rather than `unit { 0 { ... } }`
            for (key, entry) in &child.children {
                if entry.children.is_empty() {
                    out.push_str(&format!("{pad}{token} {key};\n"));
                } else {
                    out.push_str(&format!("{pad}{token} {key} {{\n"));
                    render_text(entry, depth + 1, out);
                    out.push_str(&format!("{pad}}}\n"));
                }
            }
        } else {
            out.push_str(&format!("{pad}{token} {{\n"));
            render_text(child, depth + 1, out);
            out.push_str(&format!("{pad}}}\n"));
        }
    }
}

fn render_xml(token: &str, node: &Node, out: &mut String) {
    if node.children.is_empty() {
        out.push_str(&format!("<{token}/>"));
        return;
    }
    if let Some(value) = node.leaf_value() {
        out.push_str(&format!("<{token}>{}</{token}>", xml::escape(unquote(value))));
        return;
    }

    let (keys, elements): (Vec<_>, Vec<_>) =
        node.children.iter().partition(|(k, _)| !is_element_name(k));

    if !elements.is_empty() {
        out.push_str(&format!("<{token}>"));
        for (child_token, child) in elements {
            render_xml(child_token, child, out);
        }
        out.push_str(&format!("</{token}>"));
    }

    if keys.is_empty() {
        return;
    }
    if let Some(singular) = singular(token) {
        out.push_str(&format!("<{token}>"));
        for (key, entry) in keys {
            render_entry(singular, key, entry, out);
        }
        out.push_str(&format!("</{token}>"));
    } else {
        for (key, entry) in keys {
            render_entry(token, key, entry, out);
        }
    }
}

fn render_entry(element: &str, key: &str, entry: &Node, out: &mut String) {
    out.push_str(&format!(
        "<{element}><name>{}</name>",
        xml::escape(unquote(key))
    ));
    for (child_token, child) in &entry.children {
        render_xml(child_token, child, out);
    }
    out.push_str(&format!("</{element}>"));
}

fn unquote(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token)
}

fn quote(text: &str) -> String {
    if text.chars().any(char::is_whitespace) {
        format!("\"{text}\"")
    } else {
        text.to_string()
    }
}

/// Element tree built from Junos configuration XML.
#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn parse(text: &str) -> Result<XmlNode, LoadError> {
        let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
        for caps in XML_TOKEN.captures_iter(text) {
            if let Some(content) = caps.get(4) {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(content.as_str());
                }
                continue;
            }
            let Some(name) = caps.get(2).map(|m| m.as_str()) else {
                continue;
            };
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());

            if closing {
                let node = stack
                    .pop()
                    .filter(|n| n.name == name)
                    .ok_or_else(|| LoadError::new(0, format!("unexpected </{name}>")))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Err(LoadError::new(0, format!("unexpected </{name}>"))),
                }
            } else {
                let node = XmlNode {
                    name: name.to_string(),
                    ..XmlNode::default()
                };
                if self_closing {
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                } else {
                    stack.push(node);
                }
            }
        }

        if stack.len() != 1 {
            let open = stack.last().map(|n| n.name.clone()).unwrap_or_default();
            return Err(LoadError::new(0, format!("unclosed <{open}>")));
        }
        let mut document = stack.pop().unwrap_or_default();
        if document.children.len() != 1 {
            return Err(LoadError::new(0, "expected a single root element"));
        }
        Ok(document.children.remove(0))
    }

    fn emit(&self, parent: Option<&str>, prefix: &mut Vec<String>, config: &mut Configuration) {
        let depth = prefix.len();
        let key = self
            .children
            .iter()
            .find(|c| c.name == "name" && c.children.is_empty())
            .map(|c| quote(&xml::unescape(c.text.trim())));

        let is_plural_entry = parent.and_then(singular) == Some(self.name.as_str());
        match &key {
            Some(key) if is_plural_entry => prefix.push(key.clone()),
            Some(key) => {
                prefix.push(self.name.clone());
                prefix.push(key.clone());
            }
            None => prefix.push(self.name.clone()),
        }

        let children: Vec<&XmlNode> = self
            .children
            .iter()
            .filter(|c| !(key.is_some() && c.name == "name" && c.children.is_empty()))
            .collect();

        if children.is_empty() {
            let text = xml::unescape(self.text.trim());
            if !text.is_empty() {
                prefix.push(quote(&text));
            }
            config.insert(prefix);
        } else {
            for child in children {
                child.emit(Some(&self.name), prefix, config);
            }
        }
        prefix.truncate(depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_set(text: &str) -> Configuration {
        let mut config = Configuration::new();
        config.apply_set(text).unwrap();
        config
    }

    #[test]
    fn test_set_and_delete() {
        let config = from_set(
            "set system host-name r1\n\
             set system name-server 1.1.1.1\n\
             set system name-server 8.8.8.8\n\
             # comment\n\
             delete system name-server 1.1.1.1\n",
        );
        assert_eq!(
            config.statements().collect::<Vec<_>>(),
            vec!["system host-name r1", "system name-server 8.8.8.8"]
        );
    }

    #[test]
    fn test_single_value_leaf_replaced() {
        let mut config = from_set(
            "set system host-name r1\n\
             set system name-server 1.1.1.1\n\
             set interfaces ge-0/0/0 description uplink",
        );
        config
            .apply_set(
                "set system host-name r2\n\
                 set system name-server 8.8.8.8\n\
                 set interfaces ge-0/0/0 description \"to core\"",
            )
            .unwrap();
        assert_eq!(
            config.statements().collect::<Vec<_>>(),
            vec![
                "system host-name r2",
                "system name-server 1.1.1.1",
                "interfaces ge-0/0/0 description \"to core\"",
                "system name-server 8.8.8.8",
            ]
        );
        assert_eq!(
            config.stanza("system").to_text(),
            "system {\n    host-name r2;\n    name-server 1.1.1.1;\n    name-server 8.8.8.8;\n}\n"
        );
    }

    #[test]
    fn test_merge_replaces_leaf_value() {
        let mut config = from_set("set system host-name r1\nset snmp location lab");
        let text = Configuration::parse_text("system {\n    host-name r2;\n}\n").unwrap();
        config.merge(&text);
        assert!(config.contains("system host-name r2"));
        assert!(!config.contains("system host-name r1"));

        let old = from_set("set system host-name r1\nset snmp location lab");
        let diff = Configuration::diff(&old, &config, "rollback 1", "active");
        assert_eq!(
            diff,
            "--- rollback 1\n+++ active\n- set system host-name r1\n+ set system host-name r2\n"
        );
    }

    #[test]
    fn test_delete_removes_subtree() {
        let mut config = from_set("set system host-name r1\nset system services ssh\nset snmp community public");
        config.apply_set("delete system").unwrap();
        assert_eq!(config.statements().collect::<Vec<_>>(), vec!["snmp community public"]);
    }

    #[test]
    fn test_set_syntax_error_reports_line() {
        let mut config = Configuration::new();
        let err = config
            .apply_set("set system host-name r1\nsystem name-server 1.1.1.1")
            .unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.statement.as_deref(), Some("system name-server 1.1.1.1"));
    }

    #[test]
    fn test_text_parse() {
        let text = r#"
/* managed by automation */
system {
    host-name r1;
    name-server {
        1.1.1.1;
    }
    login {
        message "authorized use only";
    }
}
interfaces {
    ge-0/0/0 {
        unit 0 {
            family inet {
                address 10.0.0.1/24;
            }
        }
    }
}
vlans {
    users {
        vlan-id 10;
    }
}
protocols {
    lldp {
        interface [ ge-0/0/0 ge-0/0/1 ];
    }
}
"#;
        let config = Configuration::parse_text(text).unwrap();
        assert_eq!(
            config.statements().collect::<Vec<_>>(),
            vec![
                "system host-name r1",
                "system name-server 1.1.1.1",
                "system login message \"authorized use only\"",
                "interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24",
                "vlans users vlan-id 10",
                "protocols lldp interface ge-0/0/0",
                "protocols lldp interface ge-0/0/1",
            ]
        );
    }

    #[test]
    fn test_text_errors() {
        assert!(Configuration::parse_text("system { host-name r1 }").is_err());
        assert!(Configuration::parse_text("system { host-name r1;").is_err());
        assert!(Configuration::parse_text("system { host-name r1; } }").is_err());
        assert!(Configuration::parse_text("system host-name r1").is_err());
    }

    #[test]
    fn test_text_render_parses_back() {
        let config = from_set(
            "set system host-name r1\n\
             set system name-server 1.1.1.1\n\
             set system name-server 8.8.8.8\n\
             set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24\n\
             set interfaces ge-0/0/0 unit 1 family inet address 10.0.1.1/24",
        );
        let text = config.to_text();
        assert!(text.contains("    host-name r1;\n"));
        assert!(text.contains("        unit 0 {\n"));
        assert_eq!(Configuration::parse_text(&text).unwrap(), config);
    }

    #[test]
    fn test_xml_parse() {
        let xml = r#"<configuration>
            <system>
                <host-name>r1</host-name>
                <name-server><name>1.1.1.1</name></name-server>
                <services><ssh/></services>
            </system>
            <interfaces>
                <interface>
                    <name>ge-0/0/0</name>
                    <unit><name>0</name><family><inet><address><name>10.0.0.1/24</name></address></inet></family></unit>
                </interface>
            </interfaces>
        </configuration>"#;
        let config = Configuration::parse_xml(xml).unwrap();
        assert_eq!(
            config.statements().collect::<Vec<_>>(),
            vec![
                "system host-name r1",
                "system name-server 1.1.1.1",
                "system services ssh",
                "interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24",
            ]
        );
    }

    #[test]
    fn test_xml_render_parses_back() {
        let config = from_set(
            "set system host-name r1\n\
             set system name-server 1.1.1.1\n\
             set system name-server 8.8.8.8\n\
             set system login message \"authorized use only\"\n\
             set interfaces ge-0/0/0 unit 0 family inet address 10.0.0.1/24",
        );
        let xml = config.to_xml();
        assert!(xml.contains("<name-server><name>1.1.1.1</name></name-server>"));
        assert!(xml.contains("<interfaces><interface><name>ge-0/0/0</name>"));
        assert_eq!(Configuration::parse_xml(&xml).unwrap(), config);
    }

    #[test]
    fn test_xml_errors() {
        assert!(Configuration::parse_xml("<system><host-name>r1</system>").is_err());
        assert!(Configuration::parse_xml("<system>").is_err());
    }

    #[test]
    fn test_diff() {
        let old = from_set("set system host-name r1\nset system services ssh");
        let new = from_set("set system host-name r2\nset system services ssh");
        assert_eq!(Configuration::diff(&old, &old, "rollback 1", "active"), "");
        assert_eq!(
            Configuration::diff(&old, &new, "rollback 1", "active"),
            "--- rollback 1\n+++ active\n- set system host-name r1\n+ set system host-name r2\n"
        );
    }

    #[test]
    fn test_stanza() {
        let config = from_set("set system host-name r1\nset security zones trust\nset systemd x");
        assert_eq!(config.stanza("system").to_set(), "set system host-name r1\n");
        assert!(config.stanza("snmp").is_empty());
    }
}
