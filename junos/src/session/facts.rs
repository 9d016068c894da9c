//! Device facts gathered when a session opens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rpc::xml;

/// Software details of one routing engine (or cluster node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingEngine {
    pub name: String,
    pub model: String,
    pub version: String,
}

/// Hostname and per-RE platform information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facts {
    pub hostname: String,
    pub platforms: Vec<RoutingEngine>,
}

impl Facts {
    /// Parse a `<get-software-information>` reply.
    ///
    /// Handles single-RE replies and `<multi-routing-engine-results>` from
    /// dual-RE chassis and SRX clusters. Releases without `<junos-version>`
    /// report it as `[version]` in the base package comment.
    pub fn from_software_information(doc: &str) -> Self {
        let items = xml::elements(doc, "multi-routing-engine-item");

        let platforms: Vec<RoutingEngine> = if items.is_empty() {
            xml::elements(doc, "software-information")
                .iter()
                .map(|info| parse_engine("re0", &info.inner))
                .collect()
        } else {
            items
                .iter()
                .map(|item| {
                    let name = item.child_text("re-name").unwrap_or_else(|| "re0".to_string());
                    parse_engine(&name, &item.inner)
                })
                .collect()
        };

        Self {
            hostname: xml::element_text(doc, "host-name").unwrap_or_default(),
            platforms,
        }
    }
}

fn parse_engine(name: &str, doc: &str) -> RoutingEngine {
    let model = xml::element_text(doc, "product-model")
        .or_else(|| xml::element_text(doc, "product-name"))
        .unwrap_or_default();

    let version = xml::element_text(doc, "junos-version")
        .or_else(|| {
            xml::elements_text(doc, "comment")
                .iter()
                .find_map(|comment| bracketed(comment))
        })
        .unwrap_or_default();

    RoutingEngine {
        name: name.to_string(),
        model,
        version,
    }
}

fn bracketed(comment: &str) -> Option<String> {
    let start = comment.find('[')? + 1;
    let end = start + comment[start..].find(']')?;
    Some(comment[start..end].to_string())
}

impl fmt::Display for Facts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Hostname: {}", self.hostname)?;
        for re in &self.platforms {
            writeln!(f, "{}: Model: {}, Version: {}", re.name, re.model, re.version)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_routing_engine() {
        let doc = "<software-information><host-name>lab-srx</host-name>\
                   <product-model>srx240h2</product-model><product-name>srx240h2</product-name>\
                   <junos-version>12.1X47-D10.4</junos-version></software-information>";
        let facts = Facts::from_software_information(doc);
        assert_eq!(facts.hostname, "lab-srx");
        assert_eq!(
            facts.platforms,
            vec![RoutingEngine {
                name: "re0".to_string(),
                model: "srx240h2".to_string(),
                version: "12.1X47-D10.4".to_string(),
            }]
        );
    }

    #[test]
    fn test_cluster_nodes_and_package_comment() {
        let doc = "<multi-routing-engine-results>\
            <multi-routing-engine-item><re-name>node0</re-name><software-information>\
            <host-name>fw-a</host-name><product-model>srx650</product-model>\
            <package-information><name>junos</name><comment>JUNOS Software Release [12.1X46-D30.2]</comment></package-information>\
            </software-information></multi-routing-engine-item>\
            <multi-routing-engine-item><re-name>node1</re-name><software-information>\
            <host-name>fw-b</host-name><product-model>srx650</product-model>\
            <junos-version>12.1X46-D30.2</junos-version>\
            </software-information></multi-routing-engine-item>\
            </multi-routing-engine-results>";
        let facts = Facts::from_software_information(doc);
        assert_eq!(facts.hostname, "fw-a");
        assert_eq!(facts.platforms.len(), 2);
        assert_eq!(facts.platforms[0].name, "node0");
        assert_eq!(facts.platforms[0].version, "12.1X46-D30.2");
        assert_eq!(facts.platforms[1].name, "node1");
    }

    #[test]
    fn test_display() {
        let facts = Facts {
            hostname: "r1".to_string(),
            platforms: vec![RoutingEngine {
                name: "re0".to_string(),
                model: "mx204".to_string(),
                version: "23.4R1".to_string(),
            }],
        };
        assert_eq!(facts.to_string(), "Hostname: r1\nre0: Model: mx204, Version: 23.4R1\n");
    }
}
