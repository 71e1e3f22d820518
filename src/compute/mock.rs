//! Deterministic stand-in for the inference model.
//!
//! Latency and failure can be changed at runtime so health probes, timeouts
//! and recovery can be exercised without a real model behind the service.

use super::ComputeBackend;
use crate::constants::RiskLevel;
use crate::error::{DecisionError, Result};
use crate::models::{Decision, RequestContext};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug)]
pub struct MockInferenceBackend {
    name: String,
    latency_ms: AtomicU64,
    failing: AtomicBool,
    calls: AtomicU64,
}

impl MockInferenceBackend {
    pub fn new(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            latency_ms: AtomicU64::new(latency.as_millis() as u64),
            failing: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        }
    }

    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Release);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Acquire)
    }

    /// Signal from the `momentum` field if present, else from price parity
    fn synthesize(context: &RequestContext) -> Decision {
        let signal = context
            .get("momentum")
            .and_then(|v| v.as_f64())
            .or_else(|| {
                context
                    .get("price")
                    .and_then(|v| v.as_f64())
                    .map(|p| if (p as i64) % 2 == 0 { 0.6 } else { -0.6 })
            })
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0);

        let (action, risk_level) = match signal {
            s if s > 0.2 => ("BUY", RiskLevel::Medium),
            s if s < -0.2 => ("SELL", RiskLevel::Medium),
            _ => ("HOLD", RiskLevel::Low),
        };

        let mut decision = Decision::new(
            action,
            0.5 + signal.abs() / 2.0,
            format!("mock inference for {}", context.symbol()),
        );
        decision.signal_strength = signal;
        decision.risk_level = risk_level;
        decision.execution_priority = (signal.abs() * 10.0).round() as i32;
        decision
    }
}

#[async_trait]
impl ComputeBackend for MockInferenceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn compute(&self, context: &RequestContext, deadline: Duration) -> Result<Decision> {
        self.calls.fetch_add(1, Ordering::AcqRel);

        let latency = Duration::from_millis(self.latency_ms.load(Ordering::Acquire));
        if latency >= deadline {
            tokio::time::sleep(deadline).await;
            return Err(DecisionError::ComputeTimeout {
                backend: self.name.clone(),
                timeout_ms: deadline.as_millis() as u64,
            });
        }
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::Acquire) {
            return Err(DecisionError::compute_failed(
                self.name.clone(),
                "mock backend configured to fail",
            ));
        }

        Ok(Self::synthesize(context).with_latency_ms(latency.as_secs_f64() * 1_000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::compute_with_deadline;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fast_backend_returns_decision() {
        let backend: Arc<dyn ComputeBackend> =
            Arc::new(MockInferenceBackend::new("local", Duration::from_millis(5)));
        let context = RequestContext::new("AAPL").unwrap().field("momentum", 0.8);

        let decision = compute_with_deadline(&backend, &context, Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(decision.action, "BUY");
        assert_eq!(decision.latency_ms, 5.0);
        assert!(decision.confidence > 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_backend_times_out() {
        let backend: Arc<dyn ComputeBackend> =
            Arc::new(MockInferenceBackend::new("local", Duration::from_millis(50)));
        let context = RequestContext::new("AAPL").unwrap();

        let err = compute_with_deadline(&backend, &context, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, DecisionError::ComputeTimeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn test_failure_toggle() {
        let mock = Arc::new(MockInferenceBackend::new("local", Duration::ZERO));
        let backend: Arc<dyn ComputeBackend> = mock.clone();
        let context = RequestContext::new("AAPL").unwrap();

        mock.set_failing(true);
        assert!(compute_with_deadline(&backend, &context, Duration::from_millis(20))
            .await
            .is_err());

        mock.set_failing(false);
        assert!(compute_with_deadline(&backend, &context, Duration::from_millis(20))
            .await
            .is_ok());
        assert_eq!(mock.calls(), 2);
    }
}
