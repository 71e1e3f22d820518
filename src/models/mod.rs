//! # Data Models
//!
//! Value types that flow through the decision-serving core. None of them hold
//! references to services, so they can be cloned, serialized and sent between
//! tasks freely.

pub mod alert;
pub mod decision;
pub mod request_context;

pub use alert::{AlertEvent, AlertReport, AlertSource, TriggeredRule};
pub use decision::Decision;
pub use request_context::{FieldValue, RequestContext};
