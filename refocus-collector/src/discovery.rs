//! Host identification for collector metadata
//!
//! This module handles:
//! - System identification (hostname, OS, architecture)
//! - Primary network interface selection (Ethernet > WiFi > Other)
//! - IP and MAC address of the selected interface

use if_addrs::{get_if_addrs, IfAddr};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Interface type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Ethernet,
    Wireless,
    Loopback,
    Other,
}

/// The interface the collector reports as its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryInterface {
    pub name: String,
    pub ip: String,
    pub mac: Option<String>,
    #[serde(rename = "type")]
    pub interface_type: InterfaceType,
}

/// Static facts about the host running the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    pub hostname: String,
    pub os: String,
    pub architecture: String,
    pub interface: Option<PrimaryInterface>,
}

impl HostIdentity {
    pub fn discover() -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().to_string();

        let interface = match primary_interface() {
            Ok(interface) => interface,
            Err(e) => {
                warn!("Failed to enumerate network interfaces: {}", e);
                None
            }
        };

        Self {
            hostname,
            os: std::env::consts::OS.to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            interface,
        }
    }
}

fn primary_interface() -> std::io::Result<Option<PrimaryInterface>> {
    let candidates: Vec<(String, String)> = get_if_addrs()?
        .into_iter()
        .filter(|if_addr| !if_addr.is_loopback())
        .map(|if_addr| {
            let ip = match if_addr.addr {
                IfAddr::V4(v4) => v4.ip.to_string(),
                IfAddr::V6(v6) => v6.ip.to_string(),
            };
            (if_addr.name, ip)
        })
        .collect();

    let Some((name, ip)) = select_primary(&candidates) else {
        debug!("No non-loopback interface found");
        return Ok(None);
    };

    let mac = match mac_address::mac_address_by_name(name) {
        Ok(mac) => mac.map(|mac| mac.to_string().to_lowercase()),
        Err(e) => {
            debug!("Error getting MAC for {}: {}", name, e);
            None
        }
    };

    Ok(Some(PrimaryInterface {
        name: name.clone(),
        ip: ip.clone(),
        mac,
        interface_type: classify_interface(name),
    }))
}

/// Pick the first Ethernet interface, then the first wireless one, then
/// whatever comes first.
fn select_primary(candidates: &[(String, String)]) -> Option<&(String, String)> {
    let by_type = |wanted: InterfaceType| {
        candidates
            .iter()
            .find(|(name, _)| classify_interface(name) == wanted)
    };

    by_type(InterfaceType::Ethernet)
        .or_else(|| by_type(InterfaceType::Wireless))
        .or_else(|| candidates.first())
}

/// Classify interface type based on name patterns
fn classify_interface(name: &str) -> InterfaceType {
    let name = name.to_lowercase();

    if name == "lo" || name.starts_with("lo0") || name.starts_with("loopback") {
        InterfaceType::Loopback
    } else if ["wlan", "wlp", "wlo", "wifi"].iter().any(|p| name.starts_with(p)) {
        InterfaceType::Wireless
    } else if name.starts_with("eth") || name.starts_with("en") {
        InterfaceType::Ethernet
    } else {
        InterfaceType::Other
    }
}
