#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Decision Core Rust
//!
//! Low-latency decision-serving core: a TTL-bound cache in front of an
//! inference step, with sampled size enforcement, hit/miss/error accounting,
//! throttled alerting and a health-driven NORMAL / DEGRADED / OFFLINE failover
//! state machine.
//!
//! ## Overview
//!
//! A request is fingerprinted from a subset of its fields and looked up in an
//! external key-value store. On a miss the compute step runs under a hard
//! deadline and its result is written back with the configured TTL. Any
//! infrastructure failure along the way is counted and converted into either a
//! cache miss or a fallback decision; callers always get an answer.
//!
//! ## Module Organization
//!
//! - [`services`] - [`DecisionService`], the public entry point
//! - [`cache`] - fingerprinting, store adapters, eviction, the decision cache
//! - [`compute`] - the inference boundary and a mock backend
//! - [`resilience`] - mode controller and health monitor
//! - [`metrics`] - counter registry, OpenTelemetry mirror, alert monitor
//! - [`events`] - alert sinks
//! - [`config`] - typed configuration and layered loading
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup and helpers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use decision_core::cache::InMemoryCacheStore;
//! use decision_core::compute::MockInferenceBackend;
//! use decision_core::events::TracingAlertSink;
//! use decision_core::{DecisionService, DecisionServiceConfig, RequestContext};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = DecisionService::new(
//!     DecisionServiceConfig::default(),
//!     Arc::new(InMemoryCacheStore::new()),
//!     Arc::new(MockInferenceBackend::new("local", Duration::from_millis(5))),
//!     Arc::new(TracingAlertSink),
//! )?;
//! service.start();
//!
//! let context = RequestContext::new("BTC")?.field("price", 100.0);
//! let response = service.decide(&context).await;
//! println!("{} (cache hit: {})", response.decision.action, response.cache_hit);
//!
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod compute;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod resilience;
pub mod services;

pub use config::{ConfigManager, DecisionServiceConfig};
pub use constants::{AlertSeverity, OperatingMode, RiskLevel, SourceMode};
pub use error::{DecisionError, Result};
pub use metrics::{DecisionMetrics, MetricsSnapshot};
pub use models::{AlertEvent, AlertReport, Decision, FieldValue, RequestContext};
pub use services::{DecisionResponse, DecisionService, ServiceStatus};
