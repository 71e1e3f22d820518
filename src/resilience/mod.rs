//! # Resilience Module
//!
//! Health-driven failover for the compute path.
//!
//! ## Architecture
//!
//! - **Mode Controller**: NORMAL / DEGRADED / OFFLINE state machine with
//!   consecutive-failure counting and single-flight recovery
//! - **Health Monitor**: background probe loop that feeds the controller
//!
//! ## Usage
//!
//! ```rust,no_run
//! use decision_core::compute::MockInferenceBackend;
//! use decision_core::config::DecisionServiceConfig;
//! use decision_core::events::TracingAlertSink;
//! use decision_core::metrics::DecisionMetrics;
//! use decision_core::resilience::{HealthMonitor, ModeController};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DecisionServiceConfig::default();
//! let controller = Arc::new(ModeController::new(
//!     Arc::new(TracingAlertSink),
//!     Arc::new(DecisionMetrics::default()),
//!     &config,
//! ));
//! let backend = Arc::new(MockInferenceBackend::new("local", Duration::from_millis(5)));
//! let monitor = HealthMonitor::new(backend, controller.clone(), &config)?;
//!
//! let outcome = monitor.run_once().await;
//! println!("probe ok={} mode={}", outcome.sample.success, controller.mode());
//! # Ok(())
//! # }
//! ```

pub mod health_monitor;
pub mod mode_controller;

pub use health_monitor::{HealthCheckOutcome, HealthMonitor, HealthSample};
pub use mode_controller::{FailureCounters, ModeController, ModeTransition};
