use super::{Context, DataSource, Module};
use crate::bus::{Payload, Priority, Topic};
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::model::{ApiKey, DiscoveryRequest, SourceKind};
use crate::ratelimit::RateLimiter;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{instrument, warn};

// region:        --- Source info

/// API-shape source: one keyed lookup against the Shodan DNS endpoint per
/// request. Requires an API key.
pub struct Shodan {
    source_type: SourceKind,
    api: Option<ApiKey>,
    limiter: RateLimiter,
    cancel: CancelSignal,
}

impl Shodan {
    pub fn new(cancel: CancelSignal) -> Self {
        Self {
            source_type: SourceKind::Api,
            api: None,
            limiter: RateLimiter::new(),
            cancel,
        }
    }

    fn rest_url(&self, domain: &str, key: &str) -> String {
        format!("https://api.shodan.io/dns/domain/{}?key={}", domain, key)
    }
}

impl Module for Shodan {
    fn name(&self) -> String {
        "Shodan".to_string()
    }

    fn description(&self) -> String {
        "Query the Shodan API for known subdomains".to_string()
    }
}

// endregion:     --- Source info

#[derive(Debug, Deserialize)]
struct ShodanResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

#[async_trait]
impl DataSource for Shodan {
    fn kind(&self) -> SourceKind {
        self.source_type
    }

    fn start(&mut self, config: &Config) -> Result<()> {
        self.api = config.api_key(&self.name()).cloned();
        if self.api.as_ref().map_or(true, |api| api.key.is_empty()) {
            warn!("{}: API key data was not provided", self.name());
        }
        self.limiter.configure(Duration::from_secs(1));
        Ok(())
    }

    #[instrument(name = "discovery", level = "debug", fields(source = %self.name()), skip_all)]
    async fn handle_discovery(&self, ctx: &Context, request: &DiscoveryRequest) {
        let Some(pattern) = ctx.config.domain_pattern(&request.domain) else {
            return;
        };
        // keyless instances refuse the work loop without a word on the bus
        let Some(api) = self.api.as_ref().filter(|api| !api.key.is_empty()) else {
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

        if self.cancel.is_cancelled() {
            return;
        }
        self.limiter.wait_turn().await;
        ctx.bus.publish(
            Topic::SetActive,
            Priority::Critical,
            Payload::Message(self.name()),
        );

        let url = self.rest_url(&request.domain, &api.key);
        let headers = HashMap::from([("Content-Type".to_string(), "application/json".to_string())]);
        let body = match ctx.fetcher.fetch(&url, None, Some(&headers), None).await {
            Ok(body) => body,
            Err(err) => {
                ctx.bus.publish(
                    Topic::Log,
                    Priority::High,
                    Payload::Message(format!("{}: {}: {}", self.name(), url, err)),
                );
                return;
            }
        };

        // absence of results is a valid outcome, malformed payloads included
        let Ok(response) = serde_json::from_str::<ShodanResponse>(&body) else {
            return;
        };
        if response.subdomains.is_empty() {
            return;
        }

        for label in response.subdomains {
            let name = format!("{}.{}", label, request.domain);
            if pattern.is_match(&name) {
                ctx.bus.publish(
                    Topic::NewName,
                    Priority::High,
                    Payload::Discovery(DiscoveryRequest {
                        name,
                        domain: request.domain.clone(),
                        tag: self.source_type,
                        source: self.name(),
                    }),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Shodan;
    use crate::bus::{BusEvent, EventBus, Payload, Topic};
    use crate::cancel::CancelSignal;
    use crate::config::Config;
    use crate::fetch::{BasicAuth, Fetcher};
    use crate::model::{DiscoveryRequest, SourceKind};
    use crate::sources::{Context, DataSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};

    struct FakeFetcher {
        calls: Mutex<Vec<String>>,
        json_header_seen: Mutex<bool>,
        body: String,
    }

    impl FakeFetcher {
        fn new(body: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                json_header_seen: Mutex::new(false),
                body: body.to_string(),
            }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(
            &self,
            url: &str,
            _body: Option<String>,
            headers: Option<&HashMap<String, String>>,
            _auth: Option<&BasicAuth>,
        ) -> crate::Result<String> {
            self.calls.lock().await.push(url.to_string());
            if let Some(headers) = headers {
                if headers.get("Content-Type").map(String::as_str) == Some("application/json") {
                    *self.json_header_seen.lock().await = true;
                }
            }
            Ok(self.body.clone())
        }
    }

    fn context(
        fetcher: Arc<dyn Fetcher>,
        config: Config,
    ) -> (Context, mpsc::UnboundedReceiver<BusEvent>) {
        let (bus, rx) = EventBus::new();
        let ctx = Context {
            config: Arc::new(config),
            bus,
            fetcher,
        };
        (ctx, rx)
    }

    fn keyed_config() -> Config {
        Config::new(&["example.com".to_string()])
            .unwrap()
            .with_api_key("Shodan", "token")
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<BusEvent>) -> Vec<BusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn discoveries(events: &[BusEvent]) -> Vec<DiscoveryRequest> {
        events
            .iter()
            .filter_map(|event| match &event.payload {
                Payload::Discovery(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn constructs_names_from_returned_labels() {
        let fetcher = Arc::new(FakeFetcher::new(r#"{"subdomains":["a","b"]}"#));
        let (ctx, rx) = context(fetcher.clone(), keyed_config());
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        let calls = fetcher.calls.lock().await;
        assert_eq!(1, calls.len());
        assert_eq!(
            "https://api.shodan.io/dns/domain/example.com?key=token",
            calls[0]
        );
        assert_eq!(true, *fetcher.json_header_seen.lock().await);

        let found = discoveries(&drain(rx).await);
        assert_eq!(2, found.len());
        assert_eq!("a.example.com", found[0].name);
        assert_eq!("b.example.com", found[1].name);
        for req in &found {
            assert_eq!(SourceKind::Api, req.tag);
            assert_eq!("Shodan", req.source);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drops_labels_outside_the_domain() {
        let fetcher = Arc::new(FakeFetcher::new(r#"{"subdomains":["ok",""]}"#));
        let (ctx, rx) = context(fetcher, keyed_config());
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        let found = discoveries(&drain(rx).await);
        assert_eq!(1, found.len());
        assert_eq!("ok.example.com", found[0].name);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_is_silent() {
        let fetcher = Arc::new(FakeFetcher::new("surprise, not json"));
        let (ctx, rx) = context(fetcher, keyed_config());
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        let events = drain(rx).await;
        assert_eq!(0, discoveries(&events).len());
        // no error line either: only querying + activity
        let logs = events
            .iter()
            .filter(|event| event.topic == Topic::Log)
            .count();
        assert_eq!(1, logs);
    }

    #[tokio::test(start_paused = true)]
    async fn payload_without_subdomains_is_silent() {
        let fetcher = Arc::new(FakeFetcher::new(r#"{"domain":"example.com"}"#));
        let (ctx, rx) = context(fetcher, keyed_config());
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        assert_eq!(0, discoveries(&drain(rx).await).len());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_key_skips_the_request() {
        let fetcher = Arc::new(FakeFetcher::new(r#"{"subdomains":["a"]}"#));
        let config = Config::new(&["example.com".to_string()]).unwrap();
        let (ctx, rx) = context(fetcher.clone(), config);
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        assert_eq!(0, fetcher.calls.lock().await.len());
        assert_eq!(0, drain(rx).await.len());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_key_skips_the_request() {
        let fetcher = Arc::new(FakeFetcher::new(r#"{"subdomains":["a"]}"#));
        let config = Config::new(&["example.com".to_string()])
            .unwrap()
            .with_api_key("Shodan", "");
        let (ctx, rx) = context(fetcher.clone(), config);
        let mut source = Shodan::new(CancelSignal::new());
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        assert_eq!(0, fetcher.calls.lock().await.len());
        assert_eq!(0, drain(rx).await.len());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_instance_issues_no_fetch() {
        let cancel = CancelSignal::new();
        cancel.cancel();
        let fetcher = Arc::new(FakeFetcher::new(r#"{"subdomains":["a"]}"#));
        let (ctx, rx) = context(fetcher.clone(), keyed_config());
        let mut source = Shodan::new(cancel);
        source.start(&ctx.config).unwrap();

        source
            .handle_discovery(&ctx, &DiscoveryRequest::seed("example.com"))
            .await;

        assert_eq!(0, fetcher.calls.lock().await.len());
        assert_eq!(0, discoveries(&drain(rx).await).len());
    }
}
