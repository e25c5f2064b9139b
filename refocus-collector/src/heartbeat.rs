//! Heartbeat wire messages exchanged with the controller
//!
//! Payload (collector → controller), one per cycle:
//! `{logLines, timestamp, refocus, generatorsAdded, generatorsUpdated, generatorsDeleted}`
//! where `refocus` carries the metadata fields that changed since the
//! previous heartbeat.

use crate::generators::Generator;
use crate::metadata::MetadataSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub log_lines: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "refocus")]
    pub metadata: MetadataSnapshot,
    pub generators_added: Vec<Generator>,
    pub generators_updated: Vec<Generator>,
    pub generators_deleted: Vec<Generator>,
}

impl HeartbeatPayload {
    /// True when the payload carries neither generator changes nor metadata
    pub fn is_quiet(&self) -> bool {
        self.metadata.is_empty()
            && self.generators_added.is_empty()
            && self.generators_updated.is_empty()
            && self.generators_deleted.is_empty()
    }
}

/// Controller answer to a heartbeat
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_config: Option<CollectorSettings>,
    #[serde(default)]
    pub generators_added: Vec<Generator>,
    #[serde(default)]
    pub generators_updated: Vec<Generator>,
    #[serde(default)]
    pub generators_deleted: Vec<Generator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl HeartbeatResponse {
    /// A response confirming exactly the changes of `payload`
    pub fn echo(payload: &HeartbeatPayload) -> Self {
        Self {
            collector_config: None,
            generators_added: payload.generators_added.clone(),
            generators_updated: payload.generators_updated.clone(),
            generators_deleted: payload.generators_deleted.clone(),
            timestamp: Some(payload.timestamp),
        }
    }
}

/// Collector settings pushed by the controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorSettings {
    /// Milliseconds between heartbeats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval: Option<u64>,
}

impl CollectorSettings {
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
            .filter(|millis| *millis > 0)
            .map(Duration::from_millis)
    }
}
