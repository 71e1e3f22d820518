pub mod decision_service;

pub use decision_service::{DecisionResponse, DecisionService, ServiceStatus};
