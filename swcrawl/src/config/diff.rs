//! Translation of dirty [`InterfaceState`]/[`VlanState`] entries into IOS
//! configuration commands.

use std::fmt;

use log::warn;
use serde::Serialize;

use super::model::{InterfaceState, SwitchportMode, VlanState};
use super::parser::{BANNER_LINES, BLOCK_SEPARATOR};

pub const CONFIGURE_TERMINAL: &str = "configure terminal";
pub const END: &str = "end";

/// Description placeholder used when editing a range of ports: leaves the
/// description untouched.
const KEEP_DESCRIPTION: &str = "-";

/// An entity left out of a [`ConfigPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub entity: String,
    pub reason: String,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.reason)
    }
}

/// Commands for one apply, plus what was left out or reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigPlan {
    /// Full command list, wrapped in `configure terminal` / `end` when
    /// non-empty.
    pub commands: Vec<String>,
    pub skipped: Vec<Skipped>,
    /// Interfaces reset with `default interface`.
    pub defaulted: Vec<String>,
    pub applied_interfaces: Vec<String>,
    pub applied_vlans: Vec<u16>,
}

impl ConfigPlan {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn vlan_line(command: &str, vlan: Option<u16>) -> String {
    match vlan {
        Some(id) if id != 0 => format!("{} {}", command, id),
        _ => format!("no {}", command),
    }
}

fn flag_line(command: &str, enabled: bool) -> String {
    if enabled {
        command.to_string()
    } else {
        format!("no {}", command)
    }
}

/// Commands for one interface, without the `configure terminal` wrapper.
pub fn interface_commands(interface: &InterfaceState) -> Vec<String> {
    let mut commands = Vec::with_capacity(10);

    if interface.mode == SwitchportMode::Unset {
        commands.push(format!("default interface {}", interface.name));
    }
    commands.push(format!("interface {}", interface.name));

    match interface.mode {
        SwitchportMode::Access => {
            commands.push("switchport mode access".to_string());
            commands.push("no switchport trunk native vlan".to_string());
            commands.push(vlan_line("switchport access vlan", interface.access_vlan));
            commands.push(match (&interface.voice_vlan, &interface.voice_vlan_keyword) {
                (None, Some(keyword)) => format!("switchport voice vlan {}", keyword),
                (vlan, _) => vlan_line("switchport voice vlan", *vlan),
            });
            commands.push(flag_line("spanning-tree portfast", interface.portfast));
            commands.push(flag_line(
                "spanning-tree bpduguard enable",
                interface.bpdu_guard,
            ));
        }
        SwitchportMode::Trunk => {
            commands.push("switchport mode trunk".to_string());
            commands.push("no switchport access vlan".to_string());
            commands.push("no spanning-tree portfast".to_string());
            commands.push("no spanning-tree bpduguard enable".to_string());
            commands.push(vlan_line(
                "switchport trunk native vlan",
                interface.trunk_native_vlan,
            ));
        }
        SwitchportMode::Unset => {}
    }

    match interface.description.as_str() {
        "" => commands.push("no description".to_string()),
        KEEP_DESCRIPTION => {}
        text => commands.push(format!("description {}", text)),
    }

    commands.push(flag_line("shutdown", interface.shutdown));
    commands
}

/// Commands for one VLAN and its SVI, or `None` when the VLAN has no
/// `interface Vlan<id>` block to edit.
pub fn vlan_commands(vlan: &VlanState) -> Option<Vec<String>> {
    let svi = vlan.interface.as_ref()?;

    let mut commands = vec![format!("vlan {}", vlan.id)];
    if vlan.name.is_empty() {
        commands.push("no name".to_string());
    } else {
        commands.push(format!("name {}", vlan.name));
    }

    commands.push(format!("interface Vlan{}", vlan.id));
    if svi.description.is_empty() {
        commands.push("no description".to_string());
    } else {
        commands.push(format!("description {}", svi.description));
    }
    match &svi.ip_address {
        Some(address) => commands.push(format!("ip address {}", address)),
        None => commands.push("no ip address".to_string()),
    }
    commands.push(flag_line("shutdown", svi.shutdown));

    Some(commands)
}

fn wrap(body: Vec<String>) -> Vec<String> {
    if body.is_empty() {
        return body;
    }
    let mut commands = Vec::with_capacity(body.len() + 2);
    commands.push(CONFIGURE_TERMINAL.to_string());
    commands.extend(body);
    commands.push(END.to_string());
    commands
}

/// Plan the commands for every dirty entry, in input order.
pub fn plan(interfaces: &[InterfaceState], vlans: &[VlanState]) -> ConfigPlan {
    let mut plan = ConfigPlan::default();
    let mut body = Vec::new();

    for interface in interfaces.iter().filter(|i| i.dirty) {
        if interface.mode == SwitchportMode::Unset {
            plan.defaulted.push(interface.name.clone());
        }
        body.extend(interface_commands(interface));
        plan.applied_interfaces.push(interface.name.clone());
    }

    for vlan in vlans.iter().filter(|v| v.dirty) {
        match vlan_commands(vlan) {
            Some(commands) => {
                body.extend(commands);
                plan.applied_vlans.push(vlan.id);
            }
            None => {
                let skipped = Skipped {
                    entity: format!("Vlan{}", vlan.id),
                    reason: "no interface block in the running config".to_string(),
                };
                warn!("Skipping {}", skipped);
                plan.skipped.push(skipped);
            }
        }
    }

    plan.commands = wrap(body);
    plan
}

/// The command list for every dirty entry.
pub fn build_commands(interfaces: &[InterfaceState], vlans: &[VlanState]) -> Vec<String> {
    plan(interfaces, vlans).commands
}

/// Commands for the sections of a pasted configuration that the current
/// running config does not already contain.
///
/// A leading `Building configuration...` banner is dropped, as are
/// sections made only of `!` comments. Returns an empty list when nothing
/// is new.
pub fn upload_commands(candidate: &str, current_raw: &str) -> Vec<String> {
    let candidate = candidate.replace("\r\n", "\n");
    let current_raw = current_raw.replace("\r\n", "\n");

    let body = if candidate.trim_start().starts_with("Building configuration") {
        candidate
            .lines()
            .skip(BANNER_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        candidate
    };

    let lines: Vec<String> = BLOCK_SEPARATOR
        .split(&body)
        .map(|section| {
            section
                .lines()
                .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('!'))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|section| !section.is_empty() && !current_raw.contains(section.as_str()))
        .flat_map(|section| {
            section
                .lines()
                .map(|l| l.trim().to_string())
                .collect::<Vec<_>>()
        })
        .collect();

    if lines.is_empty() {
        return lines;
    }
    let mut commands = vec![CONFIGURE_TERMINAL.to_string()];
    commands.extend(lines);
    commands
}

/// Bundle interfaces into an LACP port-channel.
pub fn port_channel_commands<S: AsRef<str>>(interfaces: &[S], channel: u16) -> Vec<String> {
    let body = interfaces
        .iter()
        .flat_map(|name| {
            let name = name.as_ref();
            [
                format!("default interface {}", name),
                format!("interface {}", name),
                format!("channel-group {} mode active", channel),
            ]
        })
        .collect();
    wrap(body)
}
