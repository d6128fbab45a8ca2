//! Topology discovery over CDP.

mod crawler;
mod neighbor;
mod state;

pub use crawler::{DiscoveryCrawler, DiscoveryOptions, DiscoveryReport, StopHandle};
pub use neighbor::{NeighborRecord, SHOW_CDP_NEIGHBORS_DETAIL, parse_neighbors};
pub use state::DiscoveryState;
