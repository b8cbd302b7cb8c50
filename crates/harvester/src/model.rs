use serde::{Deserialize, Serialize};
use std::fmt;

// region:        --- Models

/// Provenance tag: how a source produced a name. Never drives control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Scrape,
    Api,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self {
            SourceKind::Scrape => "scrape",
            SourceKind::Api => "api",
        };
        fmt.pad(kind)
    }
}

/// A candidate hostname with provenance. Published once per discovery,
/// ownership moves to the bus on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    pub name: String,
    pub domain: String,
    pub tag: SourceKind,
    pub source: String,
}

impl DiscoveryRequest {
    /// Ingress request the host dispatches to every source for a target
    /// domain. Sources only read `domain` from it.
    pub fn seed(domain: &str) -> Self {
        Self {
            name: domain.to_string(),
            domain: domain.to_string(),
            tag: SourceKind::Scrape,
            source: "seed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKey {
    pub key: String,
}

// endregion:     --- Models
