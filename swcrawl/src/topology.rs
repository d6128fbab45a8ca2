//! Parent/child graph and export rows built from [`NeighborRecord`]s.

use serde::Serialize;

use crate::discovery::NeighborRecord;

/// Device class used by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    WirelessAp,
    Switch,
    Phone,
    Other,
}

impl DeviceKind {
    pub fn of(record: &NeighborRecord) -> Self {
        if record.is_wireless_ap {
            Self::WirelessAp
        } else if record.is_switch {
            Self::Switch
        } else if record.is_phone {
            Self::Phone
        } else {
            Self::Other
        }
    }
}

/// `sw1.corp.example` -> `sw1`.
fn short_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

/// Who-reported-whom graph.
///
/// Nodes are indexes into the record list; an edge `(parent, child)` links
/// a record to the record whose hostname matches its parent hostname.
/// [`TopologyGraph::hostname_edges`] gives the same edges by hostname.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologyGraph {
    pub nodes: Vec<NeighborRecord>,
    pub edges: Vec<(usize, usize)>,
}

impl TopologyGraph {
    pub fn build(records: &[NeighborRecord]) -> Self {
        let mut edges = Vec::new();
        for (child, record) in records.iter().enumerate() {
            let Some(parent_host) = record.parent_hostname.as_deref() else {
                continue;
            };
            let parent_host = short_hostname(parent_host);
            for (parent, candidate) in records.iter().enumerate() {
                if parent == child {
                    continue;
                }
                if candidate
                    .hostname
                    .as_deref()
                    .is_some_and(|h| short_hostname(h).eq_ignore_ascii_case(parent_host))
                {
                    edges.push((parent, child));
                }
            }
        }

        Self {
            nodes: records.to_vec(),
            edges,
        }
    }

    /// Number of records naming node `index` as hostname or parent.
    pub fn node_weight(&self, index: usize) -> usize {
        let Some(name) = self.nodes.get(index).and_then(|n| n.hostname.as_deref()) else {
            return 0;
        };
        let name = short_hostname(name);
        self.nodes
            .iter()
            .filter(|r| {
                [r.hostname.as_deref(), r.parent_hostname.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|h| short_hostname(h).eq_ignore_ascii_case(name))
            })
            .count()
    }

    pub fn kind(&self, index: usize) -> Option<DeviceKind> {
        self.nodes.get(index).map(DeviceKind::of)
    }

    /// Edges as `(parent hostname, child hostname)`, skipping children
    /// without a hostname.
    pub fn hostname_edges(&self) -> Vec<(&str, &str)> {
        self.edges
            .iter()
            .filter_map(|&(parent, child)| {
                Some((
                    self.nodes.get(parent)?.hostname.as_deref()?,
                    self.nodes.get(child)?.hostname.as_deref()?,
                ))
            })
            .collect()
    }

    /// Children of node `index`.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges
            .iter()
            .filter(move |(parent, _)| *parent == index)
            .map(|(_, child)| *child)
    }
}

/// One row of the device export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    pub hostname: Option<String>,
    pub ip_addr: Option<String>,
    pub local_trunk_interface: Option<String>,
    pub software_name: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub is_wireless_ap: bool,
    pub is_switch: bool,
    pub is_router: bool,
    pub is_phone: bool,
    pub parent_addr: Option<String>,
    pub parent_host: Option<String>,
    pub parent_trunk_interface: Option<String>,
    pub license_info: Option<String>,
}

impl From<&NeighborRecord> for ExportRecord {
    fn from(record: &NeighborRecord) -> Self {
        Self {
            hostname: record.hostname.clone(),
            ip_addr: record.ip_address.clone(),
            local_trunk_interface: record.local_interface.clone(),
            software_name: record.software_name.clone(),
            version: record.version.clone(),
            platform: record.platform.clone(),
            is_wireless_ap: record.is_wireless_ap,
            is_switch: record.is_switch,
            is_router: record.is_router,
            is_phone: record.is_phone,
            parent_addr: record.parent_ip.clone(),
            parent_host: record.parent_hostname.clone(),
            parent_trunk_interface: record.remote_interface.clone(),
            license_info: record.license_info.clone(),
        }
    }
}

pub fn export_records(records: &[NeighborRecord]) -> Vec<ExportRecord> {
    records.iter().map(ExportRecord::from).collect()
}
