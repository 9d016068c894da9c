//! Minimal XML helpers for Junos RPC documents.
//!
//! Junos replies are shallow and well-formed, so element lookup by name is
//! enough; there is no general-purpose parser here.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, PoisonError};

use regex::Regex;

type PatternCache = LazyLock<Mutex<HashMap<String, Regex>>>;

static ELEMENT_PATTERNS: PatternCache = LazyLock::new(Default::default);
static ROOT_PATTERNS: PatternCache = LazyLock::new(Default::default);
static ATTRIBUTE_PATTERNS: PatternCache = LazyLock::new(Default::default);

/// Escape text for use as element content.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;"),
    )
}

/// Escape text for use inside a double-quoted attribute.
pub fn escape_attr(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(escape(text).replace('"', "&quot;"))
}

/// Decode the predefined entities and numeric character references.
pub fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let Some(end) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// One element found by [`elements`]: raw attribute text and raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub attrs: String,
    pub inner: String,
}

impl Element {
    /// Value of an attribute, unescaped.
    pub fn attr(&self, name: &str) -> Option<String> {
        attribute(&self.attrs, name)
    }

    /// Text of the first child element with this name.
    pub fn child_text(&self, name: &str) -> Option<String> {
        element_text(&self.inner, name)
    }
}

/// Compile the pattern for `name` once and reuse it afterwards.
fn cached(cache: &PatternCache, name: &str, build: impl FnOnce(&str) -> String) -> Option<Regex> {
    let mut patterns = cache.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = patterns.get(name) {
        return Some(re.clone());
    }
    let re = Regex::new(&build(&regex::escape(name))).ok()?;
    patterns.insert(name.to_string(), re.clone());
    Some(re)
}

fn element_regex(name: &str) -> Option<Regex> {
    // Optional namespace prefix; self-closing or paired, non-greedy content
    cached(&ELEMENT_PATTERNS, name, |name| {
        format!(r"(?s)<(?:[\w.-]+:)?{name}(\s[^>]*?)?(?:/>|>(.*?)</(?:[\w.-]+:)?{name}\s*>)")
    })
}

/// All elements with this name, in document order.
///
/// Elements of the same name must not nest.
pub fn elements(doc: &str, name: &str) -> Vec<Element> {
    let Some(re) = element_regex(name) else {
        return Vec::new();
    };
    re.captures_iter(doc)
        .map(|caps| Element {
            attrs: caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
            inner: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
        .collect()
}

/// Trimmed, unescaped text of the first element with this name.
pub fn element_text(doc: &str, name: &str) -> Option<String> {
    elements(doc, name)
        .into_iter()
        .next()
        .map(|e| unescape(e.inner.trim()))
}

/// Trimmed, unescaped text of every element with this name.
pub fn elements_text(doc: &str, name: &str) -> Vec<String> {
    elements(doc, name)
        .into_iter()
        .map(|e| unescape(e.inner.trim()))
        .collect()
}

/// Whether an element with this name occurs in the document.
pub fn has_element(doc: &str, name: &str) -> bool {
    element_regex(name).is_some_and(|re| re.is_match(doc))
}

/// Remove every element with this name from the document.
pub fn strip_elements(doc: &str, name: &str) -> String {
    match element_regex(name) {
        Some(re) => re.replace_all(doc, "").into_owned(),
        None => doc.to_string(),
    }
}

/// The element spanning the whole (trimmed) document, if it has this name.
pub fn root_element(doc: &str, name: &str) -> Option<Element> {
    let re = cached(&ROOT_PATTERNS, name, |name| {
        format!(r"(?s)\A<(?:[\w.-]+:)?{name}(\s[^>]*?)?(?:/>|>(.*)</(?:[\w.-]+:)?{name}\s*>)\z")
    })?;
    let caps = re.captures(doc.trim())?;
    let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    // `<output>a</output><output>b</output>` has no single root
    if elements(inner, name).len() != inner.matches(&format!("</{name}")).count() {
        return None;
    }
    Some(Element {
        attrs: caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default(),
        inner: inner.to_string(),
    })
}

/// Value of `name="..."` (or single-quoted) in a raw attribute list.
pub fn attribute(attrs: &str, name: &str) -> Option<String> {
    let re = cached(&ATTRIBUTE_PATTERNS, name, |name| {
        format!(r#"(?:^|\s)(?:[\w.-]+:)?{name}\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
    })?;
    let caps = re.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| unescape(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip_entities() {
        assert_eq!(escape("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(unescape("a &lt; b &amp; c &#65;&#x42;"), "a < b & c AB");
        assert_eq!(unescape("dangling & text"), "dangling & text");
    }

    #[test]
    fn test_element_text_with_namespace_and_attrs() {
        let doc = r#"<rpc-reply xmlns:junos="http://xml.juniper.net/junos/*/junos">
            <junos:output format="text">line &gt; one</junos:output></rpc-reply>"#;
        assert_eq!(element_text(doc, "output").as_deref(), Some("line > one"));
    }

    #[test]
    fn test_elements_and_attributes() {
        let doc = r#"<devices><device key="12" uri="/d/12"><name>fw1</name></device>
            <device key='13'><name>fw2</name></device><device key="14"/></devices>"#;
        let found = elements(doc, "device");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].attr("key").as_deref(), Some("12"));
        assert_eq!(found[1].attr("key").as_deref(), Some("13"));
        assert_eq!(found[1].child_text("name").as_deref(), Some("fw2"));
        assert_eq!(found[2].inner, "");
    }

    #[test]
    fn test_element_patterns_compiled_once() {
        let doc = "<zone-name>trust</zone-name><zone-name>untrust</zone-name>";
        assert_eq!(elements_text(doc, "zone-name"), vec!["trust", "untrust"]);
        assert!(ELEMENT_PATTERNS.lock().unwrap().contains_key("zone-name"));
        assert!(has_element(doc, "zone-name"));
        assert_eq!(attribute(r#"key="7""#, "key").as_deref(), Some("7"));
        assert!(ATTRIBUTE_PATTERNS.lock().unwrap().contains_key("key"));
    }

    #[test]
    fn test_root_element() {
        let doc = "\n<output>\nline one\n</output>\n";
        assert_eq!(root_element(doc, "output").unwrap().inner, "\nline one\n");
        assert!(root_element("<info><output>x</output></info>", "output").is_none());
        assert!(root_element("<output>a</output><output>b</output>", "output").is_none());
        assert_eq!(
            root_element("<output><output>x</output></output>", "output").unwrap().inner,
            "<output>x</output>"
        );
    }

    #[test]
    fn test_strip_elements() {
        let doc = "<a><rpc-error><x/></rpc-error><ok/></a>";
        assert_eq!(strip_elements(doc, "rpc-error"), "<a><ok/></a>");
        assert!(has_element(doc, "ok"));
        assert!(!has_element(doc, "load-success"));
    }
}
