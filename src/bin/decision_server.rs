//! Decision Server Binary
//!
//! Runs the decision service against Redis when reachable (in-memory store
//! otherwise) with the mock inference backend, drives a burst of synthetic
//! requests and prints the resulting status as JSON.
//!
//! Usage: `decision_server [config.toml] [request_count]`

use anyhow::Context;
use decision_core::cache::{CacheStore, InMemoryCacheStore};
use decision_core::compute::MockInferenceBackend;
use decision_core::events::BroadcastAlertSink;
use decision_core::logging::init_structured_logging;
use decision_core::{ConfigManager, DecisionService, DecisionServiceConfig, RequestContext};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_REQUESTS: usize = 500;
const SYMBOLS: [&str; 4] = ["BTC", "ETH", "SOL", "ADA"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let mut args = std::env::args().skip(1);
    let manager = match args.next() {
        Some(path) => ConfigManager::load_from_file(Path::new(&path))
            .with_context(|| format!("loading configuration from {path}"))?,
        None => ConfigManager::from_config(DecisionServiceConfig::default())
            .context("validating default configuration")?,
    };
    info!(environment = %manager.environment(), "Configuration ready");
    let config = manager.config().clone();
    let requests = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid request count {raw:?}"))?,
        None => DEFAULT_REQUESTS,
    };

    let store = connect_store(&config).await;
    let local = Arc::new(MockInferenceBackend::new("local-inference", Duration::from_millis(3)));
    let cloud = Arc::new(MockInferenceBackend::new("cloud-inference", Duration::from_millis(40)));
    let sink = Arc::new(BroadcastAlertSink::default());
    let mut alerts = sink.subscribe();
    info!(subscribers = sink.subscriber_count(), "Alert stream attached");

    let service = Arc::new(
        DecisionService::new(config, store, local, sink)
            .context("building decision service")?
            .with_remote_backend(cloud),
    );

    tokio::spawn(async move {
        while let Ok(event) = alerts.recv().await {
            info!(severity = %event.severity, rules = ?event.rule_names(), "📣 {}", event.message);
        }
    });

    let seeded = service.warmup().await;
    info!(seeded = seeded, "Warmup complete");
    service.start();

    tokio::select! {
        _ = drive_burst(&service, requests) => {
            info!(requests = requests, "Synthetic burst complete");
        }
        result = signal::ctrl_c() => {
            result.context("listening for shutdown signal")?;
            info!("Shutdown signal received");
        }
    }

    let status = service.status().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    service.shutdown().await;
    Ok(())
}

async fn connect_store(config: &DecisionServiceConfig) -> Arc<dyn CacheStore> {
    #[cfg(feature = "redis-store")]
    {
        match decision_core::cache::RedisCacheStore::connect(&config.redis_url).await {
            Ok(store) => {
                info!(url = %config.redis_url, "Connected to Redis");
                return Arc::new(store);
            }
            Err(e) => {
                warn!(url = %config.redis_url, error = %e, "Redis unavailable, using in-memory store");
            }
        }
    }
    #[cfg(not(feature = "redis-store"))]
    warn!(url = %config.redis_url, "Built without redis-store, using in-memory store");

    Arc::new(InMemoryCacheStore::new())
}

async fn drive_burst(service: &DecisionService, requests: usize) {
    for i in 0..requests {
        let symbol = SYMBOLS[i % SYMBOLS.len()];
        // a small price grid so repeated requests hit the cache
        let price = 100.0 + (i % 10) as f64;
        let context = match RequestContext::new(symbol) {
            Ok(context) => context
                .field("price", price)
                .field("volume", (i % 3) as i64 * 1_000)
                .field("momentum", ((i % 7) as f64 - 3.0) / 10.0),
            Err(e) => {
                warn!(error = %e, "Skipping malformed synthetic request");
                continue;
            }
        };

        let response = service.decide(&context).await;
        if i % 100 == 0 {
            info!(
                request = i,
                action = %response.decision.action,
                source = %response.decision.source_mode,
                cache_hit = response.cache_hit,
                latency_ms = response.total_latency_ms,
                "Decision served"
            );
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
