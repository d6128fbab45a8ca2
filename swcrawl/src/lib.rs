//! # swcrawl
//!
//! Async topology discovery and interface/VLAN configuration for Cisco IOS
//! access switches over SSH and Telnet.
//!
//! ## Features
//!
//! - CDP crawl from seed switches with bounded concurrency per round
//! - Neighbor classification (switch, router, phone, wireless AP) and export rows
//! - Running-config parsing into typed interface and VLAN state
//! - Dirty-tracking change sets turned into deterministic IOS commands
//! - SSH via russh and a minimal Telnet client, with privilege navigation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swcrawl::discovery::{DiscoveryCrawler, DiscoveryOptions};
//! use swcrawl::session::{Credentials, DriverConnector};
//! use swcrawl::topology::TopologyGraph;
//!
//! #[tokio::main]
//! async fn main() {
//!     let crawler = DiscoveryCrawler::new(DriverConnector::default(), DiscoveryOptions::new());
//!     let mut creds = Credentials::new()
//!         .with_pair("admin", "secret")
//!         .with_enable_secret("enable");
//!
//!     let report = crawler.discover(["10.0.0.1"], &mut creds).await;
//!     let graph = TopologyGraph::build(&report.records);
//!     println!("{} switches, {} links", report.ips.len(), graph.edges.len());
//! }
//! ```

pub mod channel;
pub mod config;
pub mod discovery;
pub mod driver;
pub mod error;
pub mod platform;
pub mod session;
pub mod topology;
pub mod transport;

// Re-export main types for convenience
pub use config::{DeviceConfig, InterfaceState, SwitchportMode, VlanState};
pub use discovery::{DiscoveryCrawler, DiscoveryOptions, DiscoveryReport, NeighborRecord};
pub use driver::{Driver, DriverBuilder, GenericDriver, Response};
pub use error::{Error, Result};
pub use platform::{PlatformDefinition, PrivilegeLevel};
pub use session::{
    CredentialPair, Credentials, DeviceIdentity, DeviceSession, DriverConnector, DriverOptions,
    SessionConnector,
};
pub use topology::{ExportRecord, TopologyGraph};
pub use transport::{AuthMethod, DeviceType, TransportConfig};
