//! Switch configuration: snapshot parsing, change planning and applying.
//!
//! A [`DeviceConfig`] is read with [`fetch_device_config`], edited through
//! the setters on [`InterfaceState`] and [`VlanState`] (which mark entries
//! dirty), then pushed with [`apply_changes`].
//!
//! # Example
//!
//! ```rust,no_run
//! use swcrawl::config::{apply_changes, fetch_device_config};
//! use swcrawl::session::{Credentials, DeviceIdentity, DriverConnector, SessionConnector};
//! use swcrawl::transport::DeviceType;
//!
//! # async fn example() -> Result<(), swcrawl::Error> {
//! let creds = Credentials::new().with_pair("admin", "secret");
//! let pair = &creds.pairs()[0];
//! let connector = DriverConnector::default();
//! let mut session = connector
//!     .connect(DeviceType::Ssh, "10.0.0.1", pair, creds.enable_secret_for(pair))
//!     .await?;
//! let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);
//!
//! let mut config = fetch_device_config(&mut session).await;
//! if let Some(port) = config.interface_mut("Gi1/0/1") {
//!     port.set_description("desk 12");
//! }
//! apply_changes(&mut session, &identity, &mut config).await?;
//! # Ok(())
//! # }
//! ```

mod apply;
mod diff;
mod model;
mod names;
mod parser;

pub use apply::{ApplyReport, CLEAR_COUNTERS, WRITE_MEMORY, apply_changes, clear_counters, save_config};
pub use diff::{
    CONFIGURE_TERMINAL, ConfigPlan, END, Skipped, build_commands, interface_commands, plan,
    port_channel_commands, upload_commands, vlan_commands,
};
pub use model::{
    CONFIG_UNAVAILABLE, DeviceConfig, InterfaceState, SwitchportMode, VlanInterface, VlanState,
};
pub use names::{same_interface, short_interface_name, vlan_interface_id};
pub use parser::{
    SHOW_INTERFACE_STATUS, SHOW_RUNNING_CONFIG, SHOW_VLAN_BRIEF, fetch_device_config, parse,
    try_parse,
};
