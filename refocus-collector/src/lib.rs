//! Refocus collector - heartbeat reconciliation for a monitoring collector
//!
//! On each heartbeat the collector:
//! - diffs its runtime metadata against the previous heartbeat
//! - scans the generators directory and classifies each generator as added,
//!   updated or deleted against the set the controller last confirmed
//! - sends one payload to the controller and applies its response

pub mod config;
pub mod discovery;
pub mod error;
pub mod generators;
pub mod heartbeat;
pub mod metadata;
pub mod reconciler;
pub mod response;
pub mod transport;

pub use config::{CollectorConfig, ControllerTarget, RefocusConfig};
pub use error::{CollectorError, ConfigError, DecodeError, TransportError, ValidationError};
pub use generators::{Generator, GeneratorStore};
pub use heartbeat::{CollectorSettings, HeartbeatPayload, HeartbeatResponse};
pub use metadata::{MetadataCollector, MetadataSnapshot};
pub use reconciler::{classify, Classification, CollectorState, CycleReport, Reconciler};
pub use response::{handle_response, ResponseOutcome};
pub use transport::{HttpTransport, Transport};
