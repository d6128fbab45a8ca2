//! [`SessionConnector`] backed by [`GenericDriver`].

use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use secrecy::SecretString;

use super::{CredentialPair, SessionConnector};
use crate::driver::{Driver, DriverBuilder, GenericDriver};
use crate::error::Result;
use crate::platform::PlatformDefinition;
use crate::platform::vendors::cisco_ios;
use crate::transport::{DeviceType, HostKeyVerification};

/// Connection settings shared by every session a connector opens.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Port override. `None` uses 22 for SSH and 23 for Telnet.
    pub port: Option<u16>,

    /// Connect and authentication timeout.
    pub timeout: Duration,

    /// Per-command timeout.
    pub command_timeout: Duration,

    /// Host key policy. Defaults to `Disabled`: access switches regenerate
    /// keys on reload and a crawl meets hundreds of unknown hosts.
    pub host_key_verification: HostKeyVerification,

    /// Custom known_hosts path.
    pub known_hosts_path: Option<PathBuf>,

    /// CLI dialect.
    pub platform: PlatformDefinition,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            port: None,
            timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
            platform: cisco_ios::platform(),
        }
    }
}

/// Opens [`GenericDriver`] sessions.
///
/// `DeviceType::Autodetect` tries SSH and falls back to Telnet when SSH is
/// unreachable. A rejected login over SSH is final.
#[derive(Debug, Clone, Default)]
pub struct DriverConnector {
    options: DriverOptions,
}

impl DriverConnector {
    pub fn new(options: DriverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    async fn open(
        &self,
        device_type: DeviceType,
        host: &str,
        credential: &CredentialPair,
        enable_secret: &SecretString,
    ) -> Result<GenericDriver> {
        let mut builder = DriverBuilder::new(host)
            .device_type(device_type)
            .username(credential.username.clone())
            .password_secret(credential.password.clone())
            .enable_secret_value(enable_secret.clone())
            .platform(self.options.platform.clone())
            .timeout(self.options.timeout)
            .command_timeout(self.options.command_timeout)
            .host_key_verification(self.options.host_key_verification.clone());
        if let Some(port) = self.options.port {
            builder = builder.port(port);
        }
        if let Some(path) = &self.options.known_hosts_path {
            builder = builder.known_hosts_path(path.clone());
        }

        let mut driver = builder.build()?;
        driver.open().await?;
        Ok(driver)
    }
}

impl SessionConnector for DriverConnector {
    type Session = GenericDriver;

    async fn connect(
        &self,
        device_type: DeviceType,
        host: &str,
        credential: &CredentialPair,
        enable_secret: &SecretString,
    ) -> Result<GenericDriver> {
        match device_type {
            DeviceType::Autodetect => {
                match self
                    .open(DeviceType::Ssh, host, credential, enable_secret)
                    .await
                {
                    Err(e) if e.is_unreachable() && !e.is_auth_failure() => {
                        debug!("{}: ssh unreachable ({}), trying telnet", host, e);
                        self.open(DeviceType::Telnet, host, credential, enable_secret)
                            .await
                    }
                    other => other,
                }
            }
            other => self.open(other, host, credential, enable_secret).await,
        }
    }
}
