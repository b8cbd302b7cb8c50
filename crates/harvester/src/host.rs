use crate::bus::{BusEvent, EventBus, Payload, Topic};
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::model::DiscoveryRequest;
use crate::sources::{self, Context, DataSource};
use crate::Result;
use futures::{stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

const SOURCES_CONCURRENCY: usize = 20;

// region:        --- Collect main function

#[tokio::main]
#[instrument(name = "collect", level = "info", skip_all)]
pub async fn collect(
    target: &str,
    config: Config,
    timeout: Option<Duration>,
) -> Result<Vec<DiscoveryRequest>> {
    let cancel = CancelSignal::new();
    let mut registered = sources::data_sources(&cancel);
    for source in registered.iter_mut() {
        source.start(&config)?;
    }

    let (bus, bus_rx) = EventBus::new();
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new()?);
    let ctx = Context {
        config: Arc::new(config),
        bus,
        fetcher,
    };

    if let Some(timeout) = timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("Timeout reached, cancelling sources");
            cancel.cancel();
        });
    }

    let consumer = tokio::spawn(drain_bus(bus_rx));

    dispatch_all(&registered, &ctx, target).await;
    // the last bus sender closes here, ending the consumer
    drop(ctx);

    let discoveries = consumer.await?;
    info!("{} names discovered for {}", discoveries.len(), target);
    Ok(discoveries)
}

// endregion:     --- Collect main function

// region:        --- Dispatch & consume

/// Sends one seed request to every source concurrently. A slow or failing
/// source never disturbs the others; each reports only through the bus.
#[instrument(name = "dispatch", level = "info", skip_all)]
pub async fn dispatch_all(sources: &[Box<dyn DataSource>], ctx: &Context, target: &str) {
    let request = DiscoveryRequest::seed(target);
    stream::iter(sources.iter())
        .for_each_concurrent(SOURCES_CONCURRENCY, |source| {
            let request = &request;
            async move {
                source.handle_discovery(ctx, request).await;
                debug!("{:12} - {}", "DONE", source.name());
            }
        })
        .await;
}

async fn drain_bus(mut rx: mpsc::UnboundedReceiver<BusEvent>) -> Vec<DiscoveryRequest> {
    let mut discoveries = Vec::new();
    while let Some(BusEvent {
        topic,
        priority,
        payload,
    }) = rx.recv().await
    {
        match (topic, payload) {
            (Topic::NewName, Payload::Discovery(request)) => {
                debug!("{:12} - {:?}", "NEW NAME", request.name);
                discoveries.push(request);
            }
            (Topic::Log, Payload::Message(line)) => info!("{:12} - {}", "SOURCE LOG", line),
            (Topic::SetActive, Payload::Message(source)) => {
                debug!("{:12} - {} [{:?}]", "ACTIVE", source, priority)
            }
            _ => {}
        }
    }
    discoveries
}

// endregion:     --- Dispatch & consume
