//! Structured interface and VLAN snapshot.

use serde::{Deserialize, Serialize};

use super::names::same_interface;

/// Message stored as the raw config when a snapshot could not be read.
pub const CONFIG_UNAVAILABLE: &str =
    "Unable to pull config from device. Check console output for errors. Try refreshing device info.";

/// Switchport operating mode. Access and trunk are exclusive by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchportMode {
    Access,
    Trunk,
    /// No `switchport mode` line. Applying this mode defaults the port.
    #[default]
    Unset,
}

/// One physical or logical interface.
///
/// The setters mark the entry dirty; direct field writes do not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterfaceState {
    pub name: String,
    pub description: String,
    pub shutdown: bool,
    pub mode: SwitchportMode,
    pub access_vlan: Option<u16>,
    pub voice_vlan: Option<u16>,
    /// `dot1p`, `untagged` or `none` when the voice VLAN is set by keyword
    /// rather than number. Re-emitted as-is while `voice_vlan` is `None`.
    #[serde(default)]
    pub voice_vlan_keyword: Option<String>,
    pub trunk_native_vlan: Option<u16>,
    pub portfast: bool,
    pub bpdu_guard: bool,
    #[serde(default)]
    pub dirty: bool,
}

impl InterfaceState {
    /// An interface with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.dirty = true;
    }

    pub fn set_shutdown(&mut self, shutdown: bool) {
        self.shutdown = shutdown;
        self.dirty = true;
    }

    /// Change the mode. VLAN fields of the other mode keep their values but
    /// are not emitted.
    pub fn set_mode(&mut self, mode: SwitchportMode) {
        self.mode = mode;
        self.dirty = true;
    }

    pub fn set_access_vlan(&mut self, vlan: Option<u16>) {
        self.access_vlan = vlan;
        self.dirty = true;
    }

    pub fn set_voice_vlan(&mut self, vlan: Option<u16>) {
        self.voice_vlan = vlan;
        self.voice_vlan_keyword = None;
        self.dirty = true;
    }

    pub fn set_trunk_native_vlan(&mut self, vlan: Option<u16>) {
        self.trunk_native_vlan = vlan;
        self.dirty = true;
    }

    pub fn set_portfast(&mut self, portfast: bool) {
        self.portfast = portfast;
        self.dirty = true;
    }

    pub fn set_bpdu_guard(&mut self, bpdu_guard: bool) {
        self.bpdu_guard = bpdu_guard;
        self.dirty = true;
    }
}

/// Layer-3 settings of a VLAN's `interface Vlan<N>` block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VlanInterface {
    pub description: String,
    /// `<address> <mask>`, or `None` for `no ip address`.
    pub ip_address: Option<String>,
    pub shutdown: bool,
}

/// One active VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VlanState {
    pub id: u16,
    pub name: String,
    /// `None` when the running config has no `interface Vlan<id>` block.
    pub interface: Option<VlanInterface>,
    #[serde(default)]
    pub dirty: bool,
}

impl VlanState {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.dirty = true;
    }

    /// Replace the SVI settings, creating them if missing.
    pub fn set_interface(&mut self, interface: VlanInterface) {
        self.interface = Some(interface);
        self.dirty = true;
    }

    /// Edit existing SVI settings. Returns `false` (and leaves the VLAN
    /// clean) when the VLAN has no SVI.
    pub fn edit_interface(&mut self, edit: impl FnOnce(&mut VlanInterface)) -> bool {
        match self.interface.as_mut() {
            Some(interface) => {
                edit(interface);
                self.dirty = true;
                true
            }
            None => false,
        }
    }
}

/// A device configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub interfaces: Vec<InterfaceState>,
    pub vlans: Vec<VlanState>,
    pub raw_config: String,
}

impl DeviceConfig {
    /// The snapshot used when the device could not be read.
    pub fn unavailable() -> Self {
        Self {
            interfaces: vec![],
            vlans: vec![],
            raw_config: CONFIG_UNAVAILABLE.to_string(),
        }
    }

    /// Whether this snapshot holds real data.
    pub fn is_available(&self) -> bool {
        self.raw_config != CONFIG_UNAVAILABLE
    }

    /// Find an interface by long or short name.
    pub fn interface(&self, name: &str) -> Option<&InterfaceState> {
        self.interfaces.iter().find(|i| same_interface(&i.name, name))
    }

    pub fn interface_mut(&mut self, name: &str) -> Option<&mut InterfaceState> {
        self.interfaces
            .iter_mut()
            .find(|i| same_interface(&i.name, name))
    }

    pub fn vlan(&self, id: u16) -> Option<&VlanState> {
        self.vlans.iter().find(|v| v.id == id)
    }

    pub fn vlan_mut(&mut self, id: u16) -> Option<&mut VlanState> {
        self.vlans.iter_mut().find(|v| v.id == id)
    }

    /// Whether any entry waits to be applied.
    pub fn is_dirty(&self) -> bool {
        self.interfaces.iter().any(|i| i.dirty) || self.vlans.iter().any(|v| v.dirty)
    }
}
