//! # Compute Boundary
//!
//! The inference step that produces a decision on a cache miss lives outside
//! this crate. [`ComputeBackend`] is its boundary; [`compute_with_deadline`]
//! enforces the deadline even against a backend that ignores it, so a caller
//! is never blocked past its budget.

pub mod mock;

pub use mock::MockInferenceBackend;

use crate::error::{DecisionError, Result};
use crate::models::{Decision, RequestContext};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[async_trait]
pub trait ComputeBackend: Send + Sync + std::fmt::Debug {
    /// Backend name for logs and error context
    fn name(&self) -> &str;

    /// Produce a decision within `deadline`, reporting its own latency in
    /// `Decision::latency_ms`
    async fn compute(&self, context: &RequestContext, deadline: Duration) -> Result<Decision>;
}

/// Run `backend` under a hard `deadline`.
///
/// A decision that reports no latency gets the measured time filled in, on the
/// tokio clock like every other latency in the crate.
pub async fn compute_with_deadline(
    backend: &Arc<dyn ComputeBackend>,
    context: &RequestContext,
    deadline: Duration,
) -> Result<Decision> {
    let started = Instant::now();
    match tokio::time::timeout(deadline, backend.compute(context, deadline)).await {
        Ok(Ok(mut decision)) => {
            if decision.latency_ms <= 0.0 {
                decision.latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
            }
            Ok(decision)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(DecisionError::ComputeTimeout {
            backend: backend.name().to_string(),
            timeout_ms: deadline.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sleeps for a fixed time and leaves `latency_ms` unset
    #[derive(Debug)]
    struct SilentBackend(Duration);

    #[async_trait]
    impl ComputeBackend for SilentBackend {
        fn name(&self) -> &str {
            "silent"
        }

        async fn compute(&self, _context: &RequestContext, _deadline: Duration) -> Result<Decision> {
            tokio::time::sleep(self.0).await;
            Ok(Decision::new("HOLD", 0.5, "silent"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreported_latency_is_measured_on_tokio_clock() {
        let backend: Arc<dyn ComputeBackend> = Arc::new(SilentBackend(Duration::from_millis(7)));
        let context = RequestContext::new("AAPL").unwrap();

        let decision = compute_with_deadline(&backend, &context, Duration::from_millis(20))
            .await
            .unwrap();

        assert!((decision.latency_ms - 7.0).abs() < 0.5, "{}", decision.latency_ms);
    }
}
