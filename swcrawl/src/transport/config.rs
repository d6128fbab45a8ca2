//! Connection configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// How to reach a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Try SSH first, fall back to Telnet if SSH is unreachable.
    #[default]
    Autodetect,

    /// SSH only.
    Ssh,

    /// Telnet only.
    Telnet,
}

impl DeviceType {
    /// Well-known port for this device type.
    pub fn default_port(self) -> u16 {
        match self {
            DeviceType::Telnet => 23,
            DeviceType::Autodetect | DeviceType::Ssh => 22,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Autodetect => "autodetect",
            DeviceType::Ssh => "ssh",
            DeviceType::Telnet => "telnet",
        };
        f.write_str(name)
    }
}

/// What to do with the switch's SSH host key.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Only hosts already in known_hosts with the same key.
    Strict,

    /// Record keys for new hosts; refuse a key that changed.
    #[default]
    AcceptNew,

    /// No check. Switch fleets that regenerate keys on reload usually
    /// need this.
    Disabled,
}

/// Everything a transport needs to reach and log in to one switch.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// IP address or DNS name.
    pub host: String,
    pub port: u16,

    /// Transport to use. `Autodetect` is resolved by the connector before
    /// a transport is opened.
    pub device_type: DeviceType,

    pub username: String,
    pub auth: AuthMethod,
    /// Deadline for the TCP connect and again for the login.
    pub timeout: Duration,
    /// Size requested for the SSH pty.
    pub terminal_width: u32,
    pub terminal_height: u32,
    pub host_key_verification: HostKeyVerification,
    /// Defaults to `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
}

impl TransportConfig {
    /// `host:port`, for logs.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How the login is proven.
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// SSH `none`; over Telnet an empty password.
    None,

    /// Also answers keyboard-interactive prompts over SSH.
    Password(SecretString),

    /// SSH only.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(DeviceType::Ssh.default_port(), 22);
        assert_eq!(DeviceType::Autodetect.default_port(), 22);
        assert_eq!(DeviceType::Telnet.default_port(), 23);
    }

    #[test]
    fn test_device_type_serde() {
        let json = serde_json::to_string(&DeviceType::Telnet).unwrap();
        assert_eq!(json, "\"telnet\"");
        let back: DeviceType = serde_json::from_str("\"autodetect\"").unwrap();
        assert_eq!(back, DeviceType::Autodetect);
    }
}
