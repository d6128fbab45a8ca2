//! Parsing of `show running-config`, `show interface status` and
//! `show vlan brief` into a [`DeviceConfig`].

use std::sync::LazyLock;

use log::{debug, error};
use regex::Regex;

use super::model::{DeviceConfig, InterfaceState, SwitchportMode, VlanInterface, VlanState};
use super::names::{same_interface, vlan_interface_id};
use crate::error::{ConfigError, Result};
use crate::session::DeviceSession;

pub const SHOW_RUNNING_CONFIG: &str = "show running-config";
pub const SHOW_INTERFACE_STATUS: &str = "show interface status";
pub const SHOW_VLAN_BRIEF: &str = "show vlan brief";

/// `Building configuration...`, a blank line and `Current configuration : N bytes`.
pub(super) const BANNER_LINES: usize = 3;

/// A line made of `!` only.
pub(super) static BLOCK_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*!+[ \t\r]*$").unwrap());

/// Lines of the running config between two `!` separator lines.
#[derive(Debug)]
struct ConfigBlock<'a> {
    lines: Vec<&'a str>,
}

impl<'a> ConfigBlock<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .collect(),
        }
    }

    /// Name from a leading `interface <name>` line.
    fn interface_name(&self) -> Option<&'a str> {
        let mut tokens = self.lines.first()?.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some("interface"), Some(name)) => Some(name),
            _ => None,
        }
    }

    /// Trimmed lines after the header.
    fn body(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.lines.iter().skip(1).map(|l| l.trim())
    }
}

fn config_blocks(raw_config: &str) -> Vec<ConfigBlock<'_>> {
    BLOCK_SEPARATOR
        .split(raw_config)
        .map(ConfigBlock::new)
        .filter(|b| !b.lines.is_empty())
        .collect()
}

/// Drop the banner from `show running-config` output.
fn strip_banner(show_run: &str) -> Result<String> {
    let lines: Vec<&str> = show_run.lines().collect();
    if lines.len() <= BANNER_LINES {
        return Err(ConfigError::Parse {
            what: "running-config",
            message: format!("only {} line(s) of output", lines.len()),
        }
        .into());
    }

    let mut raw = String::with_capacity(show_run.len());
    for line in &lines[BANNER_LINES..] {
        raw.push_str(line.trim_end_matches('\r'));
        raw.push('\n');
    }
    Ok(raw)
}

/// Interface names from the first column of `show interface status`.
fn status_names(interface_status: &str) -> Vec<String> {
    interface_status
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|name| *name != "Port" && !name.starts_with('-'))
        .filter(|name| name.chars().any(|c| c.is_ascii_digit()))
        .map(str::to_string)
        .collect()
}

/// `(id, name)` of every active VLAN in `show vlan brief`.
fn active_vlans(vlan_brief: &str) -> Vec<(u16, String)> {
    vlan_brief
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let id = cols.next()?.parse::<u16>().ok()?;
            let name = cols.next()?;
            let status = cols.next()?;
            status
                .contains("active")
                .then(|| (id, name.to_string()))
        })
        .collect()
}

/// Voice VLAN keywords IOS accepts in place of a number.
const VOICE_VLAN_KEYWORDS: [&str; 3] = ["dot1p", "untagged", "none"];

/// VLAN number at the end of a `switchport ... vlan <n>` line.
fn vlan_number(line: &str) -> Option<u16> {
    line.split_whitespace().last()?.parse().ok()
}

fn voice_vlan_keyword(line: &str) -> Option<String> {
    let last = line.split_whitespace().last()?;
    VOICE_VLAN_KEYWORDS
        .contains(&last)
        .then(|| last.to_string())
}

fn apply_interface_block(state: &mut InterfaceState, block: &ConfigBlock<'_>) {
    for line in block.body() {
        if let Some(text) = line.strip_prefix("description") {
            if state.description.is_empty() {
                state.description = text.trim().to_string();
            }
        } else if line == "shutdown" {
            state.shutdown = true;
        } else if line == "switchport mode access" {
            state.mode = SwitchportMode::Access;
        } else if line == "switchport mode trunk" {
            state.mode = SwitchportMode::Trunk;
        } else if line.starts_with("switchport access vlan") {
            state.access_vlan = vlan_number(line);
        } else if line.starts_with("switchport voice vlan") {
            state.voice_vlan = vlan_number(line);
            state.voice_vlan_keyword = voice_vlan_keyword(line);
        } else if line.starts_with("switchport trunk native vlan") {
            state.trunk_native_vlan = vlan_number(line);
        } else if line.starts_with("spanning-tree portfast") && !line.contains("disable") {
            state.portfast = true;
        } else if line == "spanning-tree bpduguard enable" {
            state.bpdu_guard = true;
        }
    }
}

fn parse_vlan_interface(block: &ConfigBlock<'_>) -> VlanInterface {
    let mut svi = VlanInterface::default();
    for line in block.body() {
        if let Some(text) = line.strip_prefix("description") {
            if svi.description.is_empty() {
                svi.description = text.trim().to_string();
            }
        } else if let Some(addr) = line.strip_prefix("ip address ") {
            if svi.ip_address.is_none() && !addr.ends_with("secondary") {
                svi.ip_address = Some(addr.trim().to_string());
            }
        } else if line == "shutdown" {
            svi.shutdown = true;
        }
    }
    svi
}

/// Parse the three show outputs, degrading to
/// [`DeviceConfig::unavailable`] on failure.
pub fn parse(show_run: &str, interface_status: &str, vlan_brief: &str) -> DeviceConfig {
    match try_parse(show_run, interface_status, vlan_brief) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to parse device configuration: {}", e);
            DeviceConfig::unavailable()
        }
    }
}

/// Parse the three show outputs.
///
/// Missing optional fields take defaults; only a running config cut off
/// inside its banner is an error.
pub fn try_parse(show_run: &str, interface_status: &str, vlan_brief: &str) -> Result<DeviceConfig> {
    let raw_config = strip_banner(show_run)?;
    let blocks = config_blocks(&raw_config);

    let interfaces = status_names(interface_status)
        .into_iter()
        .map(|name| {
            let mut state = InterfaceState::new(name);
            if let Some(block) = blocks.iter().find(|b| {
                b.interface_name()
                    .is_some_and(|n| same_interface(n, &state.name))
            }) {
                apply_interface_block(&mut state, block);
            }
            state
        })
        .collect::<Vec<_>>();

    let vlans = active_vlans(vlan_brief)
        .into_iter()
        .map(|(id, name)| {
            let interface = blocks
                .iter()
                .find(|b| b.interface_name().and_then(vlan_interface_id) == Some(id))
                .map(parse_vlan_interface);
            VlanState {
                id,
                name,
                interface,
                dirty: false,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "parsed {} interface(s) and {} vlan(s) from {} config block(s)",
        interfaces.len(),
        vlans.len(),
        blocks.len()
    );

    Ok(DeviceConfig {
        interfaces,
        vlans,
        raw_config,
    })
}

/// Read and parse a device's configuration.
///
/// Any session error degrades to [`DeviceConfig::unavailable`].
pub async fn fetch_device_config<S: DeviceSession>(session: &mut S) -> DeviceConfig {
    match read_show_outputs(session).await {
        Ok((show_run, status, vlan_brief)) => parse(&show_run, &status, &vlan_brief),
        Err(e) => {
            error!(
                "Unable to read configuration from {}: {}",
                session.hostname(),
                e
            );
            DeviceConfig::unavailable()
        }
    }
}

async fn read_show_outputs<S: DeviceSession>(session: &mut S) -> Result<(String, String, String)> {
    session.elevate().await?;
    let show_run = session.run(SHOW_RUNNING_CONFIG).await?;
    let status = session.run(SHOW_INTERFACE_STATUS).await?;
    let vlan_brief = session.run(SHOW_VLAN_BRIEF).await?;
    Ok((show_run, status, vlan_brief))
}
