pub mod dogpile;
pub mod shodan;

use self::dogpile::Dogpile;
use self::shodan::Shodan;
use crate::bus::EventBus;
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::fetch::Fetcher;
use crate::model::{DiscoveryRequest, SourceKind};
use crate::Result;
use async_trait::async_trait;
use lazy_regex::regex;
use std::sync::Arc;

pub trait Module {
    fn name(&self) -> String;
    fn description(&self) -> String;
}

/// Per-request collaborators handed to every source by the host. Bus and
/// fetcher are shared and reentrant; the config is read-only.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub bus: EventBus,
    pub fetcher: Arc<dyn Fetcher>,
}

/// The unit of work: one long-lived instance per external source.
///
/// Rate limiter and credential are instance-owned; the work loop of one
/// request runs to completion before the next (single-flight per instance),
/// while distinct instances run concurrently.
#[async_trait]
pub trait DataSource: Module + Send + Sync {
    /// Provenance of the names this source produces, fixed at construction.
    fn kind(&self) -> SourceKind;

    /// One-time setup: credential lookup and rate limit configuration. A
    /// missing optional credential is logged, not failed.
    fn start(&mut self, config: &Config) -> Result<()>;

    /// Runs the source's work loop for one discovery request. All observable
    /// effects go through the bus; every outcome, failure included, returns
    /// normally to the host.
    async fn handle_discovery(&self, ctx: &Context, request: &DiscoveryRequest);
}

pub fn data_sources(cancel: &CancelSignal) -> Vec<Box<dyn DataSource>> {
    vec![
        Box::new(Dogpile::new(cancel.clone())),
        Box::new(Shodan::new(cancel.clone())),
    ]
}

pub fn display_all() {
    println!("\nData sources");
    for source in data_sources(&CancelSignal::new()) {
        println!(
            "- {:10}{:25}{}",
            source.kind(),
            source.name(),
            source.description()
        );
    }
}

/// Normalizes a scraped match into a bare hostname: lowercase, strip leading
/// wildcard markers and url-encoding residue, trim stray dots and hyphens.
pub fn clean_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut name = lowered.as_str();
    loop {
        name = name.trim_matches('-');
        name = name.strip_prefix("*.").unwrap_or(name);
        match regex!(r"^(u[0-9a-f]{4}|20|22|25|2b|2f|3d|3a|40)+").find(name) {
            Some(residue) => name = &name[residue.end()..],
            None => break,
        }
    }
    name = name.trim_matches('-');
    name.strip_prefix('.').unwrap_or(name).to_string()
}
