//! Pushing planned changes to a device.

use log::{error, info, warn};
use serde::Serialize;

use super::diff::{Skipped, plan};
use super::model::DeviceConfig;
use super::parser::fetch_device_config;
use crate::error::{ConfigError, Result};
use crate::session::{DeviceIdentity, DeviceSession};

pub const WRITE_MEMORY: &str = "write memory";
pub const CLEAR_COUNTERS: &str = "clear counters";

/// What an [`apply_changes`] call sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub commands: Vec<String>,
    pub skipped: Vec<Skipped>,
    pub defaulted: Vec<String>,
    /// Device echo of the applied commands.
    pub output: String,
    /// Whether the snapshot was re-read after applying.
    pub refreshed: bool,
}

impl ApplyReport {
    /// Nothing was dirty (or everything dirty was skipped).
    pub fn is_noop(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Apply every dirty entry of `config` and refresh it from the device.
///
/// Dirty flags are cleared only for entries that were applied. On failure
/// every flag stays set so the same changes can be retried.
pub async fn apply_changes<S: DeviceSession>(
    session: &mut S,
    identity: &DeviceIdentity,
    config: &mut DeviceConfig,
) -> Result<ApplyReport> {
    let plan = plan(&config.interfaces, &config.vlans);
    for skipped in &plan.skipped {
        warn!("{}: not applying {}", identity, skipped);
    }
    if !plan.defaulted.is_empty() {
        warn!(
            "{}: resetting {} to defaults",
            identity,
            plan.defaulted.join(", ")
        );
    }

    let mut report = ApplyReport {
        commands: plan.commands.clone(),
        skipped: plan.skipped.clone(),
        defaulted: plan.defaulted.clone(),
        ..ApplyReport::default()
    };
    if plan.is_empty() {
        return Ok(report);
    }

    let result = match session.elevate().await {
        Ok(()) => session.apply_config(&plan.commands).await,
        Err(e) => Err(e),
    };
    report.output = match result {
        Ok(output) => output,
        Err(e) => {
            error!(
                "{}: failed to apply configuration: {}\n{}",
                identity,
                e,
                plan.commands.join("\n")
            );
            return Err(ConfigError::ApplyFailed {
                host: identity.to_string(),
                commands: plan.commands,
                message: e.to_string(),
            }
            .into());
        }
    };

    for interface in config.interfaces.iter_mut() {
        if plan.applied_interfaces.contains(&interface.name) {
            interface.dirty = false;
        }
    }
    for vlan in config.vlans.iter_mut() {
        if plan.applied_vlans.contains(&vlan.id) {
            vlan.dirty = false;
        }
    }

    let fresh = fetch_device_config(session).await;
    if fresh.is_available() {
        // Skipped entries keep their pending edits
        let pending: Vec<_> = config
            .vlans
            .iter()
            .filter(|v| v.dirty)
            .cloned()
            .collect();
        *config = fresh;
        for vlan in pending {
            if let Some(slot) = config.vlan_mut(vlan.id) {
                *slot = vlan;
            }
        }
        report.refreshed = true;
    } else {
        warn!("{}: applied, but the configuration could not be re-read", identity);
    }

    info!(
        "{}: applied {} command(s)",
        identity,
        report.commands.len()
    );
    Ok(report)
}

/// Save the running config to startup.
pub async fn save_config<S: DeviceSession>(session: &mut S) -> Result<String> {
    session.elevate().await?;
    session.run(WRITE_MEMORY).await
}

/// Reset interface counters, answering the `[confirm]` prompt.
pub async fn clear_counters<S: DeviceSession>(session: &mut S) -> Result<String> {
    session.elevate().await?;
    let mut output = session.run_expect(CLEAR_COUNTERS, r"\[confirm\]").await?;
    output.push_str(&session.run("").await?);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::tests::{INTERFACE_STATUS, SHOW_RUN, VLAN_BRIEF};
    use crate::config::parser::{
        SHOW_INTERFACE_STATUS, SHOW_RUNNING_CONFIG, SHOW_VLAN_BRIEF, parse,
    };
    use crate::config::model::VlanState;
    use crate::error::Error;
    use crate::session::mock::{MockConnector, MockDevice};
    use crate::transport::DeviceType;

    fn device() -> MockDevice {
        MockDevice::new("idf-2-sw1", "admin", "pw")
            .with_output(SHOW_RUNNING_CONFIG, SHOW_RUN)
            .with_output(SHOW_INTERFACE_STATUS, INTERFACE_STATUS)
            .with_output(SHOW_VLAN_BRIEF, VLAN_BRIEF)
    }

    #[tokio::test]
    async fn test_apply_clears_dirty_and_refreshes() {
        let connector = MockConnector::new().with_device("10.0.0.1", device());
        let mut session = connector.session("10.0.0.1");
        let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);

        let mut config = parse(SHOW_RUN, INTERFACE_STATUS, VLAN_BRIEF);
        config.interface_mut("Gi1/0/1").unwrap().set_shutdown(true);

        let report = apply_changes(&mut session, &identity, &mut config)
            .await
            .unwrap();
        assert!(report.refreshed);
        assert_eq!(report.commands.first().unwrap(), "configure terminal");
        assert!(!config.is_dirty());

        let applied = connector.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, "10.0.0.1");
        assert!(applied[0].1.contains(&"shutdown".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_replaces_local_state() {
        let connector = MockConnector::new().with_device("10.0.0.1", device());
        let mut session = connector.session("10.0.0.1");
        let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);

        let mut config = parse(SHOW_RUN, INTERFACE_STATUS, VLAN_BRIEF);
        config.interface_mut("Gi1/0/1").unwrap().set_description("desk 12");

        let applied = SHOW_RUN.replace(" description test\n", " description desk 12\n shutdown\n");
        session.set_output(SHOW_RUNNING_CONFIG, &applied);

        let report = apply_changes(&mut session, &identity, &mut config)
            .await
            .unwrap();
        assert!(report.refreshed);
        let port = config.interface("Gi1/0/1").unwrap();
        assert_eq!(port.description, "desk 12");
        assert!(port.shutdown);
        assert!(!port.dirty);
    }

    #[tokio::test]
    async fn test_apply_nothing_dirty() {
        let connector = MockConnector::new().with_device("10.0.0.1", device());
        let mut session = connector.session("10.0.0.1");
        let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);
        let mut config = parse(SHOW_RUN, INTERFACE_STATUS, VLAN_BRIEF);

        let report = apply_changes(&mut session, &identity, &mut config)
            .await
            .unwrap();
        assert!(report.is_noop());
        assert!(connector.applied().is_empty());
        assert!(connector.commands().is_empty());
    }

    #[tokio::test]
    async fn test_apply_failure_keeps_dirty() {
        let connector = MockConnector::new()
            .with_device("10.0.0.1", device().rejecting("description"));
        let mut session = connector.session("10.0.0.1");
        let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);

        let mut config = parse(SHOW_RUN, INTERFACE_STATUS, VLAN_BRIEF);
        config.interface_mut("Gi1/0/1").unwrap().set_description("desk 12");

        let err = apply_changes(&mut session, &identity, &mut config)
            .await
            .unwrap_err();
        match err {
            Error::Config(ConfigError::ApplyFailed { host, commands, .. }) => {
                assert_eq!(host, "idf-2-sw1 (10.0.0.1)");
                assert!(commands.contains(&"description desk 12".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(config.interface("Gi1/0/1").unwrap().dirty);
    }

    #[tokio::test]
    async fn test_skipped_vlan_stays_pending() {
        let connector = MockConnector::new().with_device("10.0.0.1", device());
        let mut session = connector.session("10.0.0.1");
        let identity = DeviceIdentity::of("10.0.0.1", DeviceType::Ssh, &session);

        let mut config = parse(SHOW_RUN, INTERFACE_STATUS, VLAN_BRIEF);
        config.vlan_mut(20).unwrap().set_name("PHONES");
        config.vlan_mut(10).unwrap().set_name("USERS");

        let report = apply_changes(&mut session, &identity, &mut config)
            .await
            .unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert!(report.commands.contains(&"name USERS".to_string()));

        let voice: &VlanState = config.vlan(20).unwrap();
        assert!(voice.dirty);
        assert_eq!(voice.name, "PHONES");
        assert!(!config.vlan(10).unwrap().dirty);
    }

    #[tokio::test]
    async fn test_save_and_clear() {
        let connector = MockConnector::new().with_device(
            "10.0.0.1",
            device()
                .with_output(WRITE_MEMORY, "Building configuration...\n[OK]")
                .with_output(CLEAR_COUNTERS, "Clear \"show interface\" counters on all interfaces [confirm]")
                .with_output("", ""),
        );
        let mut session = connector.session("10.0.0.1");

        let saved = save_config(&mut session).await.unwrap();
        assert!(saved.ends_with("[OK]"));

        let cleared = clear_counters(&mut session).await.unwrap();
        assert!(cleared.contains("[confirm]"));

        let commands: Vec<_> = connector.commands().into_iter().map(|(_, c)| c).collect();
        assert_eq!(commands, vec![WRITE_MEMORY, CLEAR_COUNTERS, ""]);
    }
}
