//! Round-based CDP crawl.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Semaphore;

use super::neighbor::{NeighborRecord, SHOW_CDP_NEIGHBORS_DETAIL, parse_neighbors};
use super::state::DiscoveryState;
use crate::error::{DriverError, Error, Result, TransportError};
use crate::session::{Credentials, DeviceSession, SessionConnector};
use crate::transport::DeviceType;

/// License commands tried in order until one prints more than
/// [`LICENSE_MIN_LINES`] lines.
const LICENSE_COMMANDS: [&str; 3] = [
    "show license",
    "show license all",
    "show license right-to-use",
];
const LICENSE_MIN_LINES: usize = 3;

/// Crawl settings.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Devices probed at once within a round.
    pub max_concurrency: usize,
    /// Read hostnames, software and interfaces, and keep neighbor records.
    pub want_export_info: bool,
    /// Gather `show license` output for each reachable device.
    pub collect_licenses: bool,
    pub device_type: DeviceType,
    /// Upper bound on one device's connect, login and commands.
    pub probe_timeout: Duration,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 100,
            want_export_info: true,
            collect_licenses: true,
            device_type: DeviceType::Autodetect,
            probe_timeout: Duration::from_secs(120),
        }
    }
}

impl DiscoveryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn want_export_info(mut self, enabled: bool) -> Self {
        self.want_export_info = enabled;
        self
    }

    pub fn collect_licenses(mut self, enabled: bool) -> Self {
        self.collect_licenses = enabled;
        self
    }

    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

/// Cooperative stop flag, checked between rounds.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Result of a crawl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    /// Every switch IP reached or queued, seeds first.
    pub ips: Vec<String>,
    /// Neighbor records, when export info was requested.
    pub records: Vec<NeighborRecord>,
    pub rounds: usize,
    /// IPs that could not be logged into or read.
    pub unreachable: Vec<String>,
    /// Whether the crawl ended on the stop flag.
    pub stopped: bool,
}

/// What one reachable device reported.
#[derive(Debug)]
struct Probe {
    credential_index: usize,
    records: Vec<NeighborRecord>,
    license: Option<String>,
}

/// Walks CDP neighbors outward from seed switches.
///
/// Each round probes the current frontier concurrently, bounded by
/// [`DiscoveryOptions::max_concurrency`]; the next frontier holds the
/// switch IPs seen for the first time.
///
/// # Example
///
/// ```rust,no_run
/// use swcrawl::discovery::{DiscoveryCrawler, DiscoveryOptions};
/// use swcrawl::session::{Credentials, DriverConnector};
///
/// # async fn example() {
/// let crawler = DiscoveryCrawler::new(DriverConnector::default(), DiscoveryOptions::new());
/// let mut creds = Credentials::new().with_pair("admin", "secret");
/// let report = crawler.discover(["10.0.0.1"], &mut creds).await;
/// println!("{} switches", report.ips.len());
/// # }
/// ```
pub struct DiscoveryCrawler<C: SessionConnector> {
    connector: Arc<C>,
    options: DiscoveryOptions,
    stop: StopHandle,
}

impl<C: SessionConnector> DiscoveryCrawler<C> {
    pub fn new(connector: C, options: DiscoveryOptions) -> Self {
        Self {
            connector: Arc::new(connector),
            options,
            stop: StopHandle::new(),
        }
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Handle that ends the crawl after the current round.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Crawl from `seeds`.
    ///
    /// A credential pair that logs in is moved to the front of
    /// `credentials`, so later devices (and later crawls) try it first.
    pub async fn discover<I, S>(&self, seeds: I, credentials: &mut Credentials) -> DiscoveryReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started = Instant::now();
        let (mut state, mut frontier) = DiscoveryState::seeded(seeds);
        let mut report = DiscoveryReport::default();

        if credentials.is_empty() {
            warn!("No credentials given, nothing will be probed");
            report.unreachable = frontier;
            report.ips = state.into_parts().0;
            return report;
        }

        while !frontier.is_empty() {
            if self.stop.is_stopped() {
                info!("Discovery stopped with {} device(s) queued", frontier.len());
                report.stopped = true;
                break;
            }
            report.rounds += 1;
            debug!("round {}: probing {} device(s)", report.rounds, frontier.len());

            let outcomes = self.run_round(&frontier, credentials).await;

            let mut next = Vec::new();
            let mut promoted = false;
            for (ip, outcome) in frontier.iter().zip(outcomes) {
                match outcome {
                    Ok(probe) => {
                        if !promoted && probe.credential_index > 0 {
                            credentials.promote(probe.credential_index);
                            promoted = true;
                        }
                        if let Some(text) = probe.license {
                            state.add_license(ip.clone(), text);
                        }
                        next.extend(state.merge_neighbors(probe.records, self.options.want_export_info));
                    }
                    Err(e) => {
                        if e.is_unreachable() {
                            debug!("{}: unreachable: {}", ip, e);
                        } else {
                            warn!("{}: probe failed: {}", ip, e);
                        }
                        report.unreachable.push(ip.clone());
                    }
                }
            }
            frontier = next;
        }

        state.merge_licenses();
        let (ips, records) = state.into_parts();
        info!(
            "Discovered {} switch(es) in {} round(s), {} unreachable, {:.1}s",
            ips.len(),
            report.rounds,
            report.unreachable.len(),
            started.elapsed().as_secs_f64()
        );

        report.ips = ips;
        report.records = records;
        report
    }

    /// Probe every frontier IP; results come back in frontier order.
    async fn run_round(
        &self,
        frontier: &[String],
        credentials: &Credentials,
    ) -> Vec<Result<Probe>> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let credentials = Arc::new(credentials.clone());

        let handles = frontier
            .iter()
            .map(|ip| {
                let semaphore = Arc::clone(&semaphore);
                let connector = Arc::clone(&self.connector);
                let credentials = Arc::clone(&credentials);
                let options = self.options.clone();
                let ip = ip.clone();

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return Err(Error::from(DriverError::CommandFailed {
                                message: format!("worker pool closed: {}", e),
                            }));
                        }
                    };
                    match tokio::time::timeout(
                        options.probe_timeout,
                        probe(connector.as_ref(), &ip, &credentials, &options),
                    )
                    .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(TransportError::Timeout(options.probe_timeout).into()),
                    }
                })
            })
            .collect::<Vec<_>>();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| {
                    Err(DriverError::CommandFailed {
                        message: format!("probe task failed: {}", e),
                    }
                    .into())
                })
            })
            .collect()
    }
}

/// Log into `ip` with each credential pair in turn and read its neighbors.
async fn probe<C: SessionConnector>(
    connector: &C,
    ip: &str,
    credentials: &Credentials,
    options: &DiscoveryOptions,
) -> Result<Probe> {
    let mut last_error: Option<Error> = None;

    for (index, pair) in credentials.pairs().iter().enumerate() {
        let secret = credentials.enable_secret_for(pair);
        let mut session = match connector.connect(options.device_type, ip, pair, secret).await {
            Ok(session) => session,
            Err(e) if e.is_auth_failure() => {
                debug!("{}: login as {} rejected", ip, pair.username);
                last_error = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = session.elevate().await {
            warn!(
                "Unable to access {} as {}: {}. There may be more devices behind this switch.",
                ip, pair.username, e
            );
            close_quietly(&mut session, ip).await;
            last_error = Some(e);
            continue;
        }

        let result = read_neighbors(&mut session, ip, options).await;
        close_quietly(&mut session, ip).await;
        return result.map(|(records, license)| Probe {
            credential_index: index,
            records,
            license,
        });
    }

    Err(last_error.unwrap_or_else(|| {
        DriverError::InvalidConfig {
            message: "no credentials to try".to_string(),
        }
        .into()
    }))
}

async fn read_neighbors<S: DeviceSession>(
    session: &mut S,
    ip: &str,
    options: &DiscoveryOptions,
) -> Result<(Vec<NeighborRecord>, Option<String>)> {
    let hostname = session.hostname();

    let license = if options.collect_licenses {
        Some(read_license(session, ip).await)
    } else {
        None
    };

    let detail = session.run(SHOW_CDP_NEIGHBORS_DETAIL).await?;
    let records = parse_neighbors(&detail, options.want_export_info)
        .into_iter()
        .map(|r| r.with_parent(ip, &hostname))
        .collect::<Vec<_>>();
    debug!("{} ({}): {} neighbor(s)", hostname, ip, records.len());

    Ok((records, license))
}

/// First license output longer than a bare error message.
async fn read_license<S: DeviceSession>(session: &mut S, ip: &str) -> String {
    let mut output = String::new();
    for command in LICENSE_COMMANDS {
        output = match session.run(command).await {
            Ok(text) => text,
            Err(e) => {
                debug!("{}: '{}' failed: {}", ip, command, e);
                String::new()
            }
        };
        if output.lines().count() > LICENSE_MIN_LINES {
            break;
        }
    }
    output
}

async fn close_quietly<S: DeviceSession>(session: &mut S, ip: &str) {
    if let Err(e) = session.close().await {
        debug!("{}: close failed: {}", ip, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use secrecy::SecretString;

    use crate::discovery::neighbor::tests::switch_entry;
    use crate::session::CredentialPair;
    use crate::session::mock::{MockConnector, MockDevice, MockSession};

    fn switch(hostname: &str, neighbors: &[(&str, &str)]) -> MockDevice {
        let detail: String = neighbors
            .iter()
            .map(|(name, ip)| switch_entry(name, ip))
            .collect();
        MockDevice::new(hostname, "admin", "pw").with_output(SHOW_CDP_NEIGHBORS_DETAIL, &detail)
    }

    fn cycle() -> MockConnector {
        MockConnector::new()
            .with_device("10.0.0.1", switch("A", &[("B", "10.0.0.2")]).with_output(
                "show license all",
                "License Usage\n==============\n\nipbasek9 (C3560):\n  Status: IN USE\n",
            ))
            .with_device("10.0.0.2", switch("B", &[("C", "10.0.0.3")]))
            .with_device("10.0.0.3", switch("C", &[("A", "10.0.0.1")]))
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let connector = cycle();
        let crawler = DiscoveryCrawler::new(connector.clone(), DiscoveryOptions::new());
        let mut creds = Credentials::new().with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(report.rounds, 3);
        assert!(report.unreachable.is_empty());
        assert!(!report.stopped);

        // Every device probed exactly once
        let mut probed: Vec<_> = connector.connects().into_iter().map(|(ip, _)| ip).collect();
        probed.sort();
        assert_eq!(probed, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);

        let hostnames: Vec<_> = report
            .records
            .iter()
            .map(|r| r.hostname.as_deref().unwrap())
            .collect();
        assert_eq!(hostnames, vec!["B.corp.example", "C.corp.example", "A.corp.example"]);
        assert_eq!(report.records[0].parent_hostname.as_deref(), Some("A"));
        assert_eq!(report.records[0].parent_ip.as_deref(), Some("10.0.0.1"));
    }

    /// Counts logins in progress at once.
    struct CountingConnector {
        inner: MockConnector,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl SessionConnector for CountingConnector {
        type Session = MockSession;

        async fn connect(
            &self,
            device_type: DeviceType,
            host: &str,
            credential: &CredentialPair,
            enable_secret: &SecretString,
        ) -> Result<MockSession> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let session = self
                .inner
                .connect(device_type, host, credential, enable_secret)
                .await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            session
        }
    }

    #[tokio::test]
    async fn test_round_respects_max_concurrency() {
        let ips: Vec<String> = (1..=10).map(|i| format!("10.0.1.{}", i)).collect();
        let names: Vec<String> = (1..=10).map(|i| format!("S{}", i)).collect();
        let neighbors: Vec<(&str, &str)> = names
            .iter()
            .zip(&ips)
            .map(|(name, ip)| (name.as_str(), ip.as_str()))
            .collect();

        let mut inner = MockConnector::new().with_device("10.0.0.1", switch("HUB", &neighbors));
        for (name, ip) in names.iter().zip(&ips) {
            inner = inner.with_device(ip, switch(name, &[]));
        }
        let peak = Arc::new(AtomicUsize::new(0));
        let connector = CountingConnector {
            inner,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        };

        let options = DiscoveryOptions::new()
            .collect_licenses(false)
            .max_concurrency(3);
        let crawler = DiscoveryCrawler::new(connector, options);
        let mut creds = Credentials::new().with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips.len(), 11);
        assert!(report.unreachable.is_empty());
        assert_eq!(report.rounds, 2);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_licenses_merged_after_crawl() {
        let crawler = DiscoveryCrawler::new(cycle(), DiscoveryOptions::new());
        let mut creds = Credentials::new().with_pair("admin", "pw");
        let report = crawler.discover(["10.0.0.1"], &mut creds).await;

        let a = report
            .records
            .iter()
            .find(|r| r.ip_address.as_deref() == Some("10.0.0.1"))
            .unwrap();
        assert!(a.license_info.as_deref().unwrap().contains("ipbasek9"));
    }

    #[tokio::test]
    async fn test_without_export_info() {
        let options = DiscoveryOptions::new()
            .want_export_info(false)
            .collect_licenses(false)
            .max_concurrency(2);
        let connector = cycle();
        let crawler = DiscoveryCrawler::new(connector.clone(), options);
        let mut creds = Credentials::new().with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips.len(), 3);
        assert!(report.records.is_empty());
        assert!(!connector.commands().iter().any(|(_, c)| c.starts_with("show license")));
    }

    #[tokio::test]
    async fn test_credential_promotion() {
        let connector = cycle();
        let crawler = DiscoveryCrawler::new(connector.clone(), DiscoveryOptions::new());
        let mut creds = Credentials::new()
            .with_pair("legacy", "old")
            .with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips.len(), 3);
        assert_eq!(creds.pairs()[0].username, "admin");

        let attempts = |ip: &str| {
            connector
                .connects()
                .into_iter()
                .filter(|(host, _)| host == ip)
                .map(|(_, user)| user)
                .collect::<Vec<_>>()
        };
        assert_eq!(attempts("10.0.0.1"), vec!["legacy", "admin"]);
        assert_eq!(attempts("10.0.0.2"), vec!["admin"]);
    }

    #[tokio::test]
    async fn test_unreachable_neighbor() {
        let connector = MockConnector::new()
            .with_device("10.0.0.1", switch("A", &[("Z", "10.0.0.9")]));
        let crawler = DiscoveryCrawler::new(connector, DiscoveryOptions::new());
        let mut creds = Credentials::new().with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips, vec!["10.0.0.1", "10.0.0.9"]);
        assert_eq!(report.unreachable, vec!["10.0.0.9"]);
        assert_eq!(report.rounds, 2);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let connector = cycle();
        let crawler = DiscoveryCrawler::new(connector.clone(), DiscoveryOptions::new());
        let mut creds = Credentials::new().with_pair("admin", "wrong");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert_eq!(report.ips, vec!["10.0.0.1"]);
        assert_eq!(report.unreachable, vec!["10.0.0.1"]);
        assert!(connector.commands().is_empty());
    }

    #[tokio::test]
    async fn test_stop_before_first_round() {
        let crawler = DiscoveryCrawler::new(cycle(), DiscoveryOptions::new());
        crawler.stop_handle().stop();
        let mut creds = Credentials::new().with_pair("admin", "pw");

        let report = crawler.discover(["10.0.0.1"], &mut creds).await;
        assert!(report.stopped);
        assert_eq!(report.rounds, 0);
        assert_eq!(report.ips, vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn test_probe_reads_license_fallbacks() {
        let connector = cycle();
        let mut session = connector.session("10.0.0.1");
        let license = read_license(&mut session, "10.0.0.1").await;
        assert!(license.contains("ipbasek9"));

        let commands: Vec<_> = connector.commands().into_iter().map(|(_, c)| c).collect();
        assert_eq!(commands, vec!["show license", "show license all"]);

        let probe = tokio_test::assert_ok!(
            probe(
                &connector,
                "10.0.0.2",
                &Credentials::new().with_pair("admin", "pw"),
                &DiscoveryOptions::new(),
            )
            .await
        );
        assert_eq!(probe.credential_index, 0);
        assert_eq!(probe.records.len(), 1);
        assert_eq!(probe.records[0].parent_hostname.as_deref(), Some("B"));
    }
}
