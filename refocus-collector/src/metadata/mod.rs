//! Runtime metadata of the collector process
//!
//! Provides the snapshot reported to the controller:
//! - Host identity (hostname, OS name/version, kernel, architecture)
//! - Primary network interface (IP, MAC)
//! - Collector version
//! - Process identity (pid, start time)
//!
//! Only the keys whose values changed since the previous heartbeat are sent,
//! see [`differ::diff`].

pub mod differ;

use crate::discovery::HostIdentity;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use sysinfo::System;
use tracing::debug;

pub use differ::{diff, merge};

/// Flat mapping of dotted metadata keys to JSON scalars
pub type MetadataSnapshot = BTreeMap<String, Value>;

/// Collects runtime metadata snapshots.
///
/// Host identity is discovered once. Only values that stay put while the
/// process runs are collected, so a steady collector sends an empty delta.
pub struct MetadataCollector {
    identity: HostIdentity,
    system: System,
}

impl MetadataCollector {
    pub fn new() -> Self {
        Self {
            identity: HostIdentity::discover(),
            system: System::new(),
        }
    }

    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// Take the current snapshot
    pub fn collect(&mut self) -> MetadataSnapshot {
        let mut snapshot = identity_snapshot(&self.identity);

        if let Some(value) = System::os_version() {
            snapshot.insert("os.version".into(), json!(value));
        }
        if let Some(value) = System::kernel_version() {
            snapshot.insert("os.kernel".into(), json!(value));
        }

        if let Ok(pid) = sysinfo::get_current_pid() {
            self.system.refresh_process(pid);
            snapshot.insert("process.pid".into(), json!(pid.as_u32()));
            if let Some(process) = self.system.process(pid) {
                snapshot.insert("process.startTime".into(), json!(process.start_time()));
            }
        }

        debug!("Collected {} metadata fields", snapshot.len());
        snapshot
    }
}

impl Default for MetadataCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Metadata that only depends on the host identity and build
pub fn identity_snapshot(identity: &HostIdentity) -> MetadataSnapshot {
    let mut snapshot = MetadataSnapshot::new();
    snapshot.insert("os.hostname".into(), json!(identity.hostname));
    snapshot.insert("os.type".into(), json!(identity.os));
    snapshot.insert("os.arch".into(), json!(identity.architecture));
    snapshot.insert(
        "collector.version".into(),
        json!(env!("CARGO_PKG_VERSION")),
    );

    if let Some(interface) = &identity.interface {
        snapshot.insert("network.interface".into(), json!(interface.name));
        snapshot.insert("network.ip".into(), json!(interface.ip));
        if let Some(mac) = &interface.mac {
            snapshot.insert("network.mac".into(), json!(mac));
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{InterfaceType, PrimaryInterface};

    #[test]
    fn test_identity_snapshot_keys() {
        let identity = HostIdentity {
            hostname: "edge-01".into(),
            os: "linux".into(),
            architecture: "x86_64".into(),
            interface: Some(PrimaryInterface {
                name: "eth0".into(),
                ip: "10.0.0.5".into(),
                mac: None,
                interface_type: InterfaceType::Ethernet,
            }),
        };

        let snapshot = identity_snapshot(&identity);

        assert_eq!(snapshot["os.hostname"], json!("edge-01"));
        assert_eq!(snapshot["network.ip"], json!("10.0.0.5"));
        assert_eq!(snapshot["collector.version"], json!(env!("CARGO_PKG_VERSION")));
        assert!(!snapshot.contains_key("network.mac"));
    }

    #[test]
    fn test_collect_includes_process_identity() {
        let mut collector = MetadataCollector::new();
        let snapshot = collector.collect();

        assert_eq!(snapshot["os.type"], json!(std::env::consts::OS));
        assert_eq!(snapshot["process.pid"], json!(std::process::id()));
    }

    #[test]
    fn test_steady_process_has_empty_delta() {
        let mut collector = MetadataCollector::new();
        let first = collector.collect();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = collector.collect();

        assert!(diff(&first, &second).is_empty(), "{:?}", diff(&first, &second));
    }
}
