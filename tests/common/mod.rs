#![allow(dead_code)]

pub mod stores;
pub mod strategies;

pub use stores::*;
pub use strategies::*;

use async_trait::async_trait;
use decision_core::compute::MockInferenceBackend;
use decision_core::events::AlertSink;
use decision_core::{AlertEvent, AlertSeverity, DecisionService, DecisionServiceConfig, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Alert sink that keeps everything it is handed
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().clone()
    }

    pub fn severities(&self) -> Vec<AlertSeverity> {
        self.events.lock().iter().map(|e| e.severity).collect()
    }
}

#[async_trait]
impl AlertSink for RecordingSink {
    async fn publish(&self, event: AlertEvent) -> Result<()> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// A service wired to test doubles, with handles to each of them
pub struct ServiceFixture {
    pub service: DecisionService,
    pub store: Arc<FlakyStore>,
    pub local: Arc<MockInferenceBackend>,
    pub sink: Arc<RecordingSink>,
}

impl ServiceFixture {
    pub fn new(config: DecisionServiceConfig) -> Self {
        let store = Arc::new(FlakyStore::default());
        let local = Arc::new(MockInferenceBackend::new("local", Duration::from_millis(5)));
        let sink = Arc::new(RecordingSink::default());
        let service = DecisionService::new(config, store.clone(), local.clone(), sink.clone())
            .expect("valid test configuration");
        Self {
            service,
            store,
            local,
            sink,
        }
    }
}
