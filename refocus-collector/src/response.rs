//! Applies the controller's answer to the collector state
//!
//! On success the generator store takes the controller-confirmed changes and
//! any pushed collector settings are reported back to the scheduler. On
//! failure the store is left untouched and the error is logged.

use crate::error::TransportError;
use crate::heartbeat::HeartbeatResponse;
use crate::reconciler::CollectorState;
use std::time::Duration;
use tracing::{error, info, warn};

/// What a heartbeat round-trip changed
#[derive(Debug)]
pub enum ResponseOutcome {
    Applied {
        added: usize,
        updated: usize,
        deleted: usize,
        /// Interval requested by the controller, if any
        heartbeat_interval: Option<Duration>,
    },
    Failed(TransportError),
}

impl ResponseOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ResponseOutcome::Applied { .. })
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        match self {
            ResponseOutcome::Applied {
                heartbeat_interval, ..
            } => *heartbeat_interval,
            ResponseOutcome::Failed(_) => None,
        }
    }
}

pub fn handle_response(
    state: &mut CollectorState,
    result: Result<HeartbeatResponse, TransportError>,
) -> ResponseOutcome {
    let response = match result {
        Ok(response) => response,
        Err(e) => {
            error!("Heartbeat failed: {}", e);
            return ResponseOutcome::Failed(e);
        }
    };

    let added = response.generators_added.len();
    let updated = response.generators_updated.len();

    for generator in response
        .generators_added
        .into_iter()
        .chain(response.generators_updated)
    {
        state.generators.insert(generator);
    }

    let mut deleted = 0;
    for generator in &response.generators_deleted {
        if state.generators.remove(&generator.name).is_some() {
            deleted += 1;
        } else {
            warn!("Controller deleted unknown generator '{}'", generator.name);
        }
    }

    let heartbeat_interval = response
        .collector_config
        .as_ref()
        .and_then(|settings| settings.heartbeat_interval());

    if added + updated + deleted > 0 {
        info!(
            "Generators confirmed: {} added, {} updated, {} deleted ({} total)",
            added,
            updated,
            deleted,
            state.generators.len()
        );
    }

    ResponseOutcome::Applied {
        added,
        updated,
        deleted,
        heartbeat_interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::Generator;
    use crate::heartbeat::CollectorSettings;
    use serde_json::json;

    fn state_with(names: &[&str]) -> CollectorState {
        CollectorState {
            generators: names.iter().map(|n| Generator::new(*n)).collect(),
            ..CollectorState::default()
        }
    }

    #[test]
    fn test_success_updates_store() {
        let mut state = state_with(&["keep", "edit", "drop"]);
        let response = HeartbeatResponse {
            generators_added: vec![Generator::new("new")],
            generators_updated: vec![Generator::new("edit").with_field("v", json!(2))],
            generators_deleted: vec![Generator::new("drop")],
            collector_config: Some(CollectorSettings {
                heartbeat_interval: Some(30_000),
            }),
            ..HeartbeatResponse::default()
        };

        let outcome = handle_response(&mut state, Ok(response));

        match outcome {
            ResponseOutcome::Applied {
                added,
                updated,
                deleted,
                heartbeat_interval,
            } => {
                assert_eq!((added, updated, deleted), (1, 1, 1));
                assert_eq!(heartbeat_interval, Some(Duration::from_secs(30)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(
            state.generators.names().collect::<Vec<_>>(),
            vec!["edit", "keep", "new"]
        );
        assert_eq!(state.generators.get("edit").unwrap().payload["v"], json!(2));
    }

    #[test]
    fn test_failure_leaves_store_alone() {
        let mut state = state_with(&["a"]);
        let before = state.generators.clone();

        let outcome = handle_response(
            &mut state,
            Err(TransportError::Unavailable("controller down".into())),
        );

        assert!(!outcome.is_applied());
        assert!(outcome.heartbeat_interval().is_none());
        assert_eq!(state.generators, before);
    }

    #[test]
    fn test_unknown_deletion_is_not_counted() {
        let mut state = state_with(&["a"]);
        let response = HeartbeatResponse {
            generators_deleted: vec![Generator::new("ghost")],
            ..HeartbeatResponse::default()
        };

        match handle_response(&mut state, Ok(response)) {
            ResponseOutcome::Applied { deleted, .. } => assert_eq!(deleted, 0),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(state.generators.len(), 1);
    }
}
