use crate::model::ApiKey;
use crate::Result;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

// region:        --- Domain pattern

/// Compiled matcher for subdomains of one apex domain.
///
/// Doubles as a free-text scanner (`find_all`) and a membership test
/// (`is_match`). It is the sole relevance filter: sources never apply domain
/// logic of their own.
pub struct DomainPattern {
    re: Regex,
}

impl DomainPattern {
    pub fn new(domain: &str) -> Result<Self> {
        let apex = regex::escape(&domain.to_lowercase());
        let re = Regex::new(&format!(
            r"(?i)(([a-z0-9]|[_a-z0-9][_a-z0-9-]{{0,61}}[a-z0-9])\.)+{apex}"
        ))?;
        Ok(Self { re })
    }

    /// All non-overlapping matches in a page of scraped text.
    pub fn find_all(&self, text: &str) -> Vec<String> {
        self.re
            .find_iter(text)
            .map(|found| found.as_str().to_string())
            .collect()
    }

    /// Whether a constructed fully-qualified candidate belongs to the domain.
    pub fn is_match(&self, name: &str) -> bool {
        self.re.is_match(name)
    }
}

// endregion:     --- Domain pattern

// region:        --- Config

/// Configuration collaborator handed to sources at start and per request.
/// Patterns are compiled once per registered domain; instances only read.
pub struct Config {
    patterns: HashMap<String, Arc<DomainPattern>>,
    api_keys: HashMap<String, ApiKey>,
}

impl Config {
    pub fn new(domains: &[String]) -> Result<Self> {
        let mut patterns = HashMap::new();
        for domain in domains {
            let pattern = DomainPattern::new(domain)?;
            patterns.insert(domain.to_lowercase(), Arc::new(pattern));
        }

        Ok(Self {
            patterns,
            api_keys: HashMap::new(),
        })
    }

    /// Registers the API key for a named source.
    pub fn with_api_key(mut self, source: &str, key: &str) -> Self {
        self.api_keys.insert(
            source.to_string(),
            ApiKey {
                key: key.to_string(),
            },
        );
        self
    }

    /// None when the domain was never registered; sources treat this as
    /// "nothing to do".
    pub fn domain_pattern(&self, domain: &str) -> Option<Arc<DomainPattern>> {
        self.patterns.get(&domain.to_lowercase()).cloned()
    }

    pub fn api_key(&self, source: &str) -> Option<&ApiKey> {
        self.api_keys.get(source)
    }
}

// endregion:     --- Config
