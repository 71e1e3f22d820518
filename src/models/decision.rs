//! Decision payload produced by the compute step or reconstructed from cache.

use crate::constants::{RiskLevel, SourceMode};
use crate::models::RequestContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Confidence carried by every fallback decision
pub const FALLBACK_CONFIDENCE: f64 = 0.0;

/// Action reported when no real decision could be produced
pub const HOLD_ACTION: &str = "HOLD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: String,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: String,
    pub signal_strength: f64,
    pub risk_level: RiskLevel,
    pub execution_priority: i32,
    pub latency_ms: f64,
    pub source_mode: SourceMode,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Decision {
    pub fn new(action: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            signal_strength: 0.0,
            risk_level: RiskLevel::default(),
            execution_priority: 0,
            latency_ms: 0.0,
            source_mode: SourceMode::Normal,
            metadata: HashMap::new(),
        }
    }

    /// Safe answer returned when the cache and every compute path failed.
    ///
    /// Always near-zero confidence and high risk so consumers can tell it apart
    /// from a genuine decision.
    pub fn fallback(reason: impl Into<String>, source_mode: SourceMode) -> Self {
        Self {
            action: HOLD_ACTION.to_string(),
            confidence: FALLBACK_CONFIDENCE,
            reasoning: reason.into(),
            signal_strength: 0.0,
            risk_level: RiskLevel::High,
            execution_priority: 0,
            latency_ms: 0.0,
            source_mode,
            metadata: HashMap::new(),
        }
    }

    /// Placeholder written for warmup seeds
    pub fn warmup_placeholder(context: &RequestContext) -> Self {
        let mut decision = Self::new(
            HOLD_ACTION,
            0.5,
            format!("warmup placeholder for {}", context.symbol()),
        );
        decision.source_mode = SourceMode::Warmup;
        decision
            .metadata
            .insert("symbol".to_string(), context.symbol().into());
        decision
    }

    pub fn with_source_mode(mut self, source_mode: SourceMode) -> Self {
        self.source_mode = source_mode;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source_mode, SourceMode::Fallback | SourceMode::Offline)
            && self.confidence <= FALLBACK_CONFIDENCE
    }
}
