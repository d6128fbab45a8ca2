//! `show cdp neighbors detail` parsing.

use serde::{Deserialize, Serialize};

pub const SHOW_CDP_NEIGHBORS_DETAIL: &str = "show cdp neighbors detail";

/// One neighbor entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    /// The neighbor's own port (`Port ID (outgoing port)`).
    pub local_interface: Option<String>,
    /// The reporting device's port (`Interface`).
    pub remote_interface: Option<String>,
    pub platform: Option<String>,
    pub software_name: Option<String>,
    pub version: Option<String>,
    pub is_wireless_ap: bool,
    pub is_switch: bool,
    pub is_router: bool,
    pub is_phone: bool,
    pub parent_ip: Option<String>,
    pub parent_hostname: Option<String>,
    pub license_info: Option<String>,
}

impl NeighborRecord {
    /// The IP to crawl next, for switches only.
    pub fn frontier_ip(&self) -> Option<&str> {
        if self.is_switch {
            self.ip_address.as_deref()
        } else {
            None
        }
    }

    /// Attach the device that reported this neighbor.
    pub fn with_parent(mut self, ip: &str, hostname: &str) -> Self {
        self.parent_ip = Some(ip.to_string());
        self.parent_hostname = Some(hostname.to_string());
        self
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Software name and version from a line such as
/// `Cisco IOS Software, C3560 Software (C3560-IPBASEK9-M), Version 12.2(55)SE, RELEASE SOFTWARE (fc2)`.
fn parse_version_line(line: &str) -> (Option<String>, Option<String>) {
    let mut sections = line.split(',');
    let software = sections.next().and_then(non_empty);
    let version = line
        .split(',')
        .find(|s| s.contains("Version"))
        .and_then(|s| non_empty(&s.replace("Version", "")));
    (software, version)
}

/// `Version :` on a line of its own, introducing the software banner.
fn is_version_label(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.ends_with(':') && trimmed.trim_end_matches(':').trim_end().ends_with("Version")
}

/// Parse one `Device ID` fragment. Returns `None` when nothing matched.
fn parse_fragment(fragment: &str, want_export_info: bool) -> Option<NeighborRecord> {
    let mut record = NeighborRecord::default();
    let mut matched = false;
    let mut version_seen = false;

    for line in fragment.lines() {
        if record.ip_address.is_none() {
            if let Some((_, addr)) = line.split_once("IP address:") {
                record.ip_address = non_empty(addr);
                matched |= record.ip_address.is_some();
            }
        }

        let is_platform = line.contains("Platform");
        if is_platform && line.contains("Switch") {
            record.is_switch = true;
            record.is_router |= line.contains("Router");
            matched = true;
        }
        if (is_platform && line.contains("AIR"))
            || ((is_platform || line.contains("Capabilities")) && line.contains("Trans-Bridge"))
        {
            record.is_wireless_ap = true;
            matched = true;
        }

        if !want_export_info {
            continue;
        }

        if record.hostname.is_none() {
            if let Some((_, id)) = line.split_once("ID:") {
                if !line.contains("Port ID") {
                    record.hostname = non_empty(id);
                    matched |= record.hostname.is_some();
                }
            }
        }

        if !version_seen && line.contains("Version") && !is_version_label(line) {
            version_seen = true;
            let (software, version) = parse_version_line(line);
            record.software_name = software;
            record.version = version;
            matched = true;
        }

        if is_platform {
            if let Some((_, rest)) = line.split_once("Platform:") {
                let platform = rest.split(',').next().unwrap_or_default();
                record.platform = non_empty(platform);
                matched |= record.platform.is_some();
            }
        }

        if let Some((_, rest)) = line.split_once("Interface:") {
            let mut parts = rest.splitn(2, ',');
            record.remote_interface = parts.next().and_then(non_empty);
            record.local_interface = parts
                .next()
                .map(|p| p.replace("Port ID (outgoing port):", ""))
                .and_then(|p| non_empty(&p));
            matched = true;
        }
    }

    if record.is_wireless_ap {
        record.is_switch = false;
    }

    if want_export_info && record.software_name.is_none() && record.version.is_none() {
        record.is_switch = false;
        record.is_phone = record
            .platform
            .as_deref()
            .is_some_and(|p| p != "Linux");
    }

    if !matched {
        return None;
    }
    if record.ip_address.is_none() && !(want_export_info && record.hostname.is_some()) {
        return None;
    }
    Some(record)
}

/// Parse `show cdp neighbors detail` output.
///
/// Optional fields (hostname, software, platform and interfaces) are only
/// read when `want_export_info` is set; the IP and classification flags
/// are always read.
pub fn parse_neighbors(detail: &str, want_export_info: bool) -> Vec<NeighborRecord> {
    detail
        .split("Device")
        .filter_map(|fragment| parse_fragment(fragment, want_export_info))
        .collect()
}
