use super::{clean_name, Context, DataSource, Module};
use crate::bus::{Payload, Priority, Topic};
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::model::{DiscoveryRequest, SourceKind};
use crate::ratelimit::RateLimiter;
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::instrument;

// region:        --- Source info

/// Scrape-shape source: walks the Dogpile result pages for a domain and
/// extracts every pattern match from the raw page text.
pub struct Dogpile {
    source_type: SourceKind,
    quantity: usize,
    limit: usize,
    limiter: RateLimiter,
    cancel: CancelSignal,
}

impl Dogpile {
    pub fn new(cancel: CancelSignal) -> Self {
        Self {
            source_type: SourceKind::Scrape,
            quantity: 15, // Dogpile returns roughly 15 results per page
            limit: 90,
            limiter: RateLimiter::new(),
            cancel,
        }
    }

    fn url_by_page_num(&self, domain: &str, page: usize) -> String {
        format!(
            "http://www.dogpile.com/search/web?q={}&qsi={}",
            domain,
            self.quantity * page
        )
    }
}

impl Module for Dogpile {
    fn name(&self) -> String {
        "Dogpile".to_string()
    }

    fn description(&self) -> String {
        "Scrape Dogpile search result pages for subdomains".to_string()
    }
}

// endregion:     --- Source info

#[async_trait]
impl DataSource for Dogpile {
    fn kind(&self) -> SourceKind {
        self.source_type
    }

    fn start(&mut self, _config: &Config) -> Result<()> {
        self.limiter.configure(Duration::from_secs(1));
        Ok(())
    }

    #[instrument(name = "discovery", level = "debug", fields(source = %self.name()), skip_all)]
    async fn handle_discovery(&self, ctx: &Context, request: &DiscoveryRequest) {
        let Some(pattern) = ctx.config.domain_pattern(&request.domain) else {
            return;
        };

        ctx.bus.publish(
            Topic::Log,
            Priority::High,
            Payload::Message(format!(
                "Querying {} for {} subdomains",
                self.name(),
                request.domain
            )),
        );

        // a trailing partial page is not pursued
        let pages = if self.quantity == 0 {
            0
        } else {
            self.limit / self.quantity
        };
        for page in 0..pages {
            if self.cancel.is_cancelled() {
                return;
            }
            self.limiter.wait_turn().await;
            ctx.bus.publish(
                Topic::SetActive,
                Priority::Critical,
                Payload::Message(self.name()),
            );

            let url = self.url_by_page_num(&request.domain, page);
            let page_text = match ctx.fetcher.fetch(&url, None, None, None).await {
                Ok(text) => text,
                Err(err) => {
                    // a failed fetch is assumed sustained: abandon the request
                    ctx.bus.publish(
                        Topic::Log,
                        Priority::High,
                        Payload::Message(format!("{}: {}: {}", self.name(), url, err)),
                    );
                    return;
                }
            };

            for raw in pattern.find_all(&page_text) {
                ctx.bus.publish(
                    Topic::NewName,
                    Priority::High,
                    Payload::Discovery(DiscoveryRequest {
                        name: clean_name(&raw),
                        domain: request.domain.clone(),
                        tag: self.source_type,
                        source: self.name(),
                    }),
                );
            }
        }
    }
}
