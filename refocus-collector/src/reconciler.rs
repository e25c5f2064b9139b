//! Heartbeat reconciliation
//!
//! One cycle:
//! 1. capture the start time `t0`
//! 2. resolve the controller target (name, url, token)
//! 3. diff the metadata snapshot against the previous one, then merge it
//! 4. scan the generators directory and classify against the store
//! 5. advance the watermark to `t0`
//! 6. build the payload
//! 7. send it and hand the result to the response handler
//!
//! Cycles must not overlap. [`Reconciler`] enforces this by taking `&mut self`
//! for the whole cycle, transport round-trip included.

use crate::config::{CollectorConfig, ControllerTarget};
use crate::error::CollectorError;
use crate::generators::{scan_dir, Generator, GeneratorStore, ScanResult};
use crate::heartbeat::HeartbeatPayload;
use crate::metadata::{self, MetadataSnapshot};
use crate::response::{handle_response, ResponseOutcome};
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// State carried from one heartbeat cycle to the next
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectorState {
    /// Start time of the last completed cycle; `None` before the first one
    pub last_heartbeat_time: Option<DateTime<Utc>>,
    pub generators: GeneratorStore,
    pub metadata: MetadataSnapshot,
}

/// Generators of one cycle sorted into the payload lists.
///
/// `unchanged` holds the names present on disk and in the store whose file
/// is older than the watermark; they are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub added: Vec<Generator>,
    pub updated: Vec<Generator>,
    pub deleted: Vec<Generator>,
    pub unchanged: Vec<String>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Sort scanned generators against the store.
///
/// A stored generator counts as updated when its file was modified at or
/// after `watermark`. Without a watermark every stored generator on disk is
/// updated. Deleted entries carry the stored record.
pub fn classify(
    candidates: &ScanResult,
    store: &GeneratorStore,
    watermark: Option<DateTime<Utc>>,
) -> Classification {
    let mut classification = Classification::default();

    for entry in candidates.iter() {
        if !store.contains(entry.name()) {
            classification.added.push(entry.generator.clone());
        } else if watermark.map_or(true, |mark| entry.modified >= mark) {
            classification.updated.push(entry.generator.clone());
        } else {
            classification.unchanged.push(entry.name().to_string());
        }
    }

    classification.deleted = store
        .iter()
        .filter(|generator| !candidates.contains(&generator.name))
        .cloned()
        .collect();

    classification
}

/// A heartbeat ready to be sent
#[derive(Debug, Clone)]
pub struct PreparedHeartbeat {
    pub target: ControllerTarget,
    pub payload: HeartbeatPayload,
    pub classification: Classification,
}

/// Steps 2 to 6 of a cycle started at `started_at`.
///
/// Identity validation happens before any generator file is touched. The
/// metadata merge is kept even when the scan fails afterwards; the watermark
/// only moves once classification succeeded.
pub async fn prepare_heartbeat(
    config: &CollectorConfig,
    state: &mut CollectorState,
    current: &MetadataSnapshot,
    started_at: DateTime<Utc>,
) -> Result<PreparedHeartbeat, CollectorError> {
    let target = config.controller_target()?;

    let changed = metadata::diff(&state.metadata, current);
    metadata::merge(&mut state.metadata, current);

    let candidates = scan_dir(&config.generators_dir).await?;
    let classification = classify(&candidates, &state.generators, state.last_heartbeat_time);

    debug!(
        "Classified {} files against {} stored generators: {} added, {} updated, {} unchanged, {} deleted",
        candidates.len(),
        state.generators.len(),
        classification.added.len(),
        classification.updated.len(),
        classification.unchanged.len(),
        classification.deleted.len()
    );

    state.last_heartbeat_time = Some(started_at);

    let payload = HeartbeatPayload {
        log_lines: Vec::new(),
        timestamp: started_at,
        metadata: changed,
        generators_added: classification.added.clone(),
        generators_updated: classification.updated.clone(),
        generators_deleted: classification.deleted.clone(),
    };

    Ok(PreparedHeartbeat {
        target,
        payload,
        classification,
    })
}

/// Result of a cycle that reached the transport
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub payload: HeartbeatPayload,
    pub classification: Classification,
    pub outcome: ResponseOutcome,
}

/// Owns the collector state and runs heartbeat cycles one at a time
pub struct Reconciler<T> {
    config: CollectorConfig,
    transport: T,
    state: CollectorState,
}

impl<T: Transport> Reconciler<T> {
    pub fn new(config: CollectorConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            state: CollectorState::default(),
        }
    }

    pub fn with_state(mut self, state: CollectorState) -> Self {
        self.state = state;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn state(&self) -> &CollectorState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_state(self) -> CollectorState {
        self.state
    }

    /// Run one cycle starting now
    pub async fn run_cycle(
        &mut self,
        current: &MetadataSnapshot,
    ) -> Result<CycleReport, CollectorError> {
        self.run_cycle_at(current, Utc::now()).await
    }

    /// Run one cycle with an explicit start time.
    ///
    /// Validation and I/O errors are returned before anything is sent.
    /// Transport errors are not returned: they end up in the report's
    /// outcome after going through the response handler.
    pub async fn run_cycle_at(
        &mut self,
        current: &MetadataSnapshot,
        started_at: DateTime<Utc>,
    ) -> Result<CycleReport, CollectorError> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("heartbeat", cycle = %cycle_id);

        async move {
            let prepared =
                prepare_heartbeat(&self.config, &mut self.state, current, started_at).await?;
            debug!("Sending heartbeat to {}", prepared.target.heartbeat_url());

            let result = self
                .transport
                .send(&prepared.target, &prepared.payload)
                .await;
            let outcome = handle_response(&mut self.state, result);

            if outcome.is_applied() {
                info!(
                    "Heartbeat delivered ({} added, {} updated, {} deleted, {} metadata fields)",
                    prepared.payload.generators_added.len(),
                    prepared.payload.generators_updated.len(),
                    prepared.payload.generators_deleted.len(),
                    prepared.payload.metadata.len()
                );
            }

            Ok::<_, CollectorError>(CycleReport {
                cycle_id,
                payload: prepared.payload,
                classification: prepared.classification,
                outcome,
            })
        }
        .instrument(span)
        .await
    }
}
