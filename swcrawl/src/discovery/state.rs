//! Per-crawl bookkeeping.

use indexmap::{IndexMap, IndexSet};

use super::neighbor::NeighborRecord;

/// Everything one crawl has seen so far.
///
/// Created by each `discover` call and mutated only between rounds.
#[derive(Debug, Default)]
pub struct DiscoveryState {
    visited_ips: IndexSet<String>,
    visited_hostnames: IndexSet<String>,
    records: Vec<NeighborRecord>,
    /// License text per device IP.
    licenses: IndexMap<String, String>,
}

impl DiscoveryState {
    /// State with `seeds` already visited. Returns the state and the
    /// deduplicated first frontier.
    pub fn seeded<I, S>(seeds: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = Self::default();
        let frontier = seeds
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|ip| !ip.is_empty())
            .filter(|ip| state.visited_ips.insert(ip.clone()))
            .collect();
        (state, frontier)
    }

    /// Merge one device's neighbors. Returns the switch IPs never seen
    /// before, in record order.
    pub fn merge_neighbors(
        &mut self,
        records: Vec<NeighborRecord>,
        keep_records: bool,
    ) -> Vec<String> {
        let mut fresh = Vec::new();
        for record in records {
            if let Some(ip) = record.frontier_ip() {
                if self.visited_ips.insert(ip.to_string()) {
                    fresh.push(ip.to_string());
                }
            }

            if keep_records {
                let Some(hostname) = record.hostname.as_deref() else {
                    continue;
                };
                if self.visited_hostnames.insert(hostname.to_string()) {
                    self.records.push(record);
                }
            }
        }
        fresh
    }

    pub fn add_license(&mut self, ip: impl Into<String>, text: impl Into<String>) {
        self.licenses.insert(ip.into(), text.into());
    }

    /// Copy license text onto the records of the devices it came from.
    pub fn merge_licenses(&mut self) {
        for record in &mut self.records {
            if let Some(text) = record
                .ip_address
                .as_deref()
                .and_then(|ip| self.licenses.get(ip))
            {
                record.license_info = Some(text.clone());
            }
        }
    }

    pub fn is_visited(&self, ip: &str) -> bool {
        self.visited_ips.contains(ip)
    }

    pub fn visited_ips(&self) -> impl Iterator<Item = &str> {
        self.visited_ips.iter().map(String::as_str)
    }

    pub fn records(&self) -> &[NeighborRecord] {
        &self.records
    }

    /// Consume the state into (visited IPs, records).
    pub fn into_parts(self) -> (Vec<String>, Vec<NeighborRecord>) {
        (self.visited_ips.into_iter().collect(), self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn switch(hostname: &str, ip: &str) -> NeighborRecord {
        NeighborRecord {
            hostname: Some(hostname.to_string()),
            ip_address: Some(ip.to_string()),
            is_switch: true,
            ..NeighborRecord::default()
        }
    }

    #[test]
    fn test_seeded_dedups() {
        let (state, frontier) = DiscoveryState::seeded(["10.0.0.1", " 10.0.0.1 ", "", "10.0.0.2"]);
        assert_eq!(frontier, vec!["10.0.0.1", "10.0.0.2"]);
        assert!(state.is_visited("10.0.0.2"));
    }

    #[test]
    fn test_merge_neighbors() {
        let (mut state, _) = DiscoveryState::seeded(["10.0.0.1"]);
        let phone = NeighborRecord {
            hostname: Some("SEP01".to_string()),
            ip_address: Some("10.0.5.1".to_string()),
            is_phone: true,
            ..NeighborRecord::default()
        };
        let fresh = state.merge_neighbors(
            vec![switch("sw2", "10.0.0.2"), switch("sw1", "10.0.0.1"), phone],
            true,
        );
        assert_eq!(fresh, vec!["10.0.0.2"]);
        assert_eq!(state.records().len(), 3);

        // Same hostname seen from another device
        let fresh = state.merge_neighbors(vec![switch("sw2", "10.0.0.2")], true);
        assert!(fresh.is_empty());
        assert_eq!(state.records().len(), 3);
    }

    #[test]
    fn test_records_need_hostname() {
        let (mut state, _) = DiscoveryState::seeded(Vec::<String>::new());
        let mut anonymous = switch("x", "10.0.0.3");
        anonymous.hostname = None;
        let fresh = state.merge_neighbors(vec![anonymous], true);
        assert_eq!(fresh, vec!["10.0.0.3"]);
        assert!(state.records().is_empty());
    }

    #[test]
    fn test_merge_licenses() {
        let (mut state, _) = DiscoveryState::seeded(["10.0.0.1"]);
        state.merge_neighbors(vec![switch("sw2", "10.0.0.2")], true);
        state.add_license("10.0.0.2", "ipbasek9");
        state.merge_licenses();

        let (ips, records) = state.into_parts();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(records[0].license_info.as_deref(), Some("ipbasek9"));
    }
}
