//! Assembles a [`GenericDriver`] from connection settings.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::generic::GenericDriver;
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::platform::vendors::cisco_ios;
use crate::transport::{AuthMethod, DeviceType, HostKeyVerification, TransportConfig};

/// Settings for one switch login. Defaults to SSH with the Cisco IOS
/// platform.
///
/// ```rust,no_run
/// use swcrawl::driver::{Driver, DriverBuilder};
/// use swcrawl::transport::DeviceType;
///
/// # async fn example() -> Result<(), swcrawl::Error> {
/// let mut driver = DriverBuilder::new("192.168.1.1")
///     .device_type(DeviceType::Ssh)
///     .username("admin")
///     .password("secret")
///     .enable_secret("enable-secret")
///     .build()?;
/// driver.open().await?;
/// # Ok(())
/// # }
/// ```
pub struct DriverBuilder {
    host: String,
    port: Option<u16>,
    device_type: DeviceType,
    username: Option<String>,
    auth: AuthMethod,
    enable_secret: Option<SecretString>,
    platform: Option<PlatformDefinition>,
    timeout: Duration,
    command_timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
}

impl DriverBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            device_type: DeviceType::Ssh,
            username: None,
            auth: AuthMethod::None,
            enable_secret: None,
            platform: None,
            timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Defaults to 22 or 23 depending on the transport.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// `Autodetect` means SSH here; the Telnet fallback lives in
    /// [`DriverConnector`](crate::session::DriverConnector).
    pub fn device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Password(SecretString::from(password.into()));
        self
    }

    pub fn password_secret(mut self, password: SecretString) -> Self {
        self.auth = AuthMethod::Password(password);
        self
    }

    /// SSH only.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Answer to the `enable` password prompt. Without one the login
    /// password is sent.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn enable_secret_value(mut self, secret: SecretString) -> Self {
        self.enable_secret = Some(secret);
        self
    }

    pub fn platform(mut self, platform: PlatformDefinition) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Connect plus login deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long to wait for the prompt after each command.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Validate the settings. Nothing is sent until [`Driver::open`].
    ///
    /// [`Driver::open`]: super::Driver::open
    pub fn build(self) -> Result<GenericDriver> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "a username is required".to_string(),
        })?;

        if self.device_type == DeviceType::Telnet
            && matches!(self.auth, AuthMethod::PrivateKey { .. })
        {
            return Err(DriverError::InvalidConfig {
                message: "telnet logins take a password, not a key".to_string(),
            }
            .into());
        }

        let enable_secret = self.enable_secret.or_else(|| match &self.auth {
            AuthMethod::Password(password) => Some(password.clone()),
            _ => None,
        });
        let platform = self.platform.unwrap_or_else(cisco_ios::platform);
        let transport_config = TransportConfig {
            port: self.port.unwrap_or(self.device_type.default_port()),
            host: self.host,
            device_type: self.device_type,
            username,
            auth: self.auth,
            timeout: self.timeout,
            terminal_width: platform.terminal_width,
            terminal_height: platform.terminal_height,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        GenericDriver::new(
            transport_config,
            platform,
            enable_secret,
            self.command_timeout,
        )
    }
}
