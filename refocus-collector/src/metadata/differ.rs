//! One-directional metadata delta
//!
//! Removed keys are never reported: a key missing from the current snapshot
//! keeps its previous value on the controller side.

use super::MetadataSnapshot;

/// Keys of `current` that are absent from `existing` or hold a different value
pub fn diff(existing: &MetadataSnapshot, current: &MetadataSnapshot) -> MetadataSnapshot {
    current
        .iter()
        .filter(|(key, value)| existing.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Fold `current` into `existing` so it becomes the next baseline
pub fn merge(existing: &mut MetadataSnapshot, current: &MetadataSnapshot) {
    existing.extend(current.iter().map(|(k, v)| (k.clone(), v.clone())));
}
