//! The [`Driver`] implementation over SSH or Telnet.

use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use memchr::memrchr;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::privilege::PrivilegeManager;
use super::{CONFIG_PRIVILEGE, Driver};
use super::response::Response;
use crate::channel::{
    PtyChannel, compile_prompt_pattern, hostname_from_prompt, hostname_prompt_pattern,
};
use crate::error::{ChannelError, DriverError, Error, Result};
use crate::platform::PlatformDefinition;
use crate::transport::{DeviceType, SshTransport, TelnetStream, Transport, TransportConfig};

/// Password prompts answered before escalation is given up.
const MAX_AUTH_ATTEMPTS: usize = 3;

/// One switch CLI session, driven by a [`PlatformDefinition`].
///
/// Reads stop at any mode's prompt until the first prompt is seen; after
/// that they stop only at prompts carrying the switch's own hostname, so a
/// `show run` line ending in `#` or `>` cannot end a read early.
pub struct GenericDriver {
    transport_config: TransportConfig,
    platform: PlatformDefinition,
    /// Answer to the `enable` password prompt.
    enable_secret: Option<SecretString>,
    /// `None` while closed, like `channel`.
    transport: Option<Transport>,
    channel: Option<PtyChannel>,
    privilege_manager: PrivilegeManager,
    /// Per-command read deadline.
    timeout: Duration,
    /// Any mode's prompt, for any hostname.
    prompt_pattern: Regex,
    host_pattern: Option<Regex>,
    prompt: String,
}

impl GenericDriver {
    pub fn new(
        transport_config: TransportConfig,
        platform: PlatformDefinition,
        enable_secret: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        platform.validate()?;

        let privilege_manager = PrivilegeManager::new(platform.privilege_levels.clone());
        let prompt_pattern = Self::build_combined_pattern(&platform)?;

        Ok(Self {
            transport_config,
            platform,
            enable_secret,
            transport: None,
            channel: None,
            privilege_manager,
            timeout,
            prompt_pattern,
            host_pattern: None,
            prompt: String::new(),
        })
    }

    /// Alternation of every mode's prompt pattern.
    fn build_combined_pattern(platform: &PlatformDefinition) -> Result<Regex> {
        let combined = platform
            .privilege_levels
            .values()
            .map(|level| format!("(?:{})", level.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Regex::new(&combined).map_err(ChannelError::InvalidPattern)?)
    }

    pub fn host(&self) -> &str {
        &self.transport_config.host
    }

    pub fn device_type(&self) -> DeviceType {
        self.transport_config.device_type
    }

    /// The last prompt seen, e.g. `sw1#`.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Hostname derived from the last prompt.
    pub fn hostname(&self) -> String {
        hostname_from_prompt(&self.prompt)
    }

    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// Send a command and read until `expect` (a regex) matches the end of
    /// the output instead of the prompt.
    ///
    /// Used for confirmations such as `clear counters` / `[confirm]`.
    pub async fn send_command_expect(&mut self, command: &str, expect: &str) -> Result<Response> {
        let pattern = compile_prompt_pattern(expect).map_err(ChannelError::InvalidPattern)?;
        self.exchange(command, Some(pattern)).await
    }

    fn active_pattern(&self) -> Regex {
        self.host_pattern
            .clone()
            .unwrap_or_else(|| self.prompt_pattern.clone())
    }

    /// Send one line and collect the output up to `expect` or the prompt.
    async fn exchange(&mut self, command: &str, expect: Option<Regex>) -> Result<Response> {
        // Renaming the device changes the prompt mid-session
        if command.trim_start().starts_with("hostname ") {
            self.host_pattern = None;
        }

        let tracks_prompt = expect.is_none();
        let pattern = expect.unwrap_or_else(|| self.active_pattern());
        let timeout = self.timeout;
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        trace!("{}: sending '{}'", self.transport_config.host, command);
        let start = Instant::now();
        channel.send(command).await?;
        let data = channel.read_until(&pattern, timeout).await?;
        let elapsed = start.elapsed();

        let raw_result = String::from_utf8_lossy(&data).into_owned();
        let prompt = last_line(&data);
        if tracks_prompt {
            self.track_prompt(&prompt)?;
        }

        let result = self.platform.normalize_output(&raw_result, command);
        let response = Response::new(command, result, raw_result, prompt, elapsed);

        match self.platform.detect_failure(&response.result) {
            Some(failure) => {
                debug!(
                    "{}: '{}' failed with '{}'",
                    self.transport_config.host, command, failure
                );
                let failure = failure.to_string();
                Ok(response.with_failure(failure))
            }
            None => Ok(response),
        }
    }

    /// Note the mode and hostname a prompt shows. Prompts of no known mode
    /// are ignored.
    fn track_prompt(&mut self, prompt: &str) -> Result<()> {
        if self.privilege_manager.observe_prompt(prompt).is_none() {
            return Ok(());
        }

        let hostname = hostname_from_prompt(prompt);
        if self.host_pattern.is_none() || hostname_from_prompt(&self.prompt) != hostname {
            self.host_pattern =
                Some(hostname_prompt_pattern(&hostname).map_err(ChannelError::InvalidPattern)?);
        }
        self.prompt = prompt.to_string();
        Ok(())
    }

    /// Run an escalation command that may ask for the enable secret.
    async fn escalate_with_auth(&mut self, command: &str, target: &str, auth: &Regex) -> Result<()> {
        let prompt_pattern = self.active_pattern();
        let either = Regex::new(&format!("(?:{})|(?:{})", auth.as_str(), prompt_pattern.as_str()))
            .map_err(ChannelError::InvalidPattern)?;
        let timeout = self.timeout;
        let secret = self.enable_secret.clone();
        let channel = self.channel.as_mut().ok_or(DriverError::NotConnected)?;

        channel.send(command).await?;
        let mut data = channel.read_until(&either, timeout).await?;

        let mut attempts = 0;
        while !prompt_pattern.is_match(&data) {
            if attempts == MAX_AUTH_ATTEMPTS {
                return Err(DriverError::PrivilegeAcquisitionFailed {
                    target: target.to_string(),
                }
                .into());
            }
            attempts += 1;
            trace!("{}: answering password prompt", self.transport_config.host);
            match &secret {
                Some(secret) => channel.send(secret.expose_secret()).await?,
                None => channel.send("").await?,
            }
            data = channel.read_until(&either, timeout).await?;
        }

        let prompt = last_line(&data);
        self.track_prompt(&prompt)
    }
}

impl std::fmt::Debug for GenericDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericDriver")
            .field("host", &self.transport_config.host)
            .field("device_type", &self.transport_config.device_type)
            .field("platform", &self.platform.name)
            .field("prompt", &self.prompt)
            .field("open", &self.channel.is_some())
            .finish()
    }
}

impl Driver for GenericDriver {
    async fn open(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(DriverError::AlreadyConnected.into());
        }

        let (transport, mut channel) = match self.transport_config.device_type {
            DeviceType::Telnet => {
                let (stream, leftover) = TelnetStream::connect(&self.transport_config).await?;
                let mut channel = PtyChannel::telnet(stream);
                channel.extend_buffer(&leftover);
                (Transport::Telnet, channel)
            }
            DeviceType::Ssh | DeviceType::Autodetect => {
                let ssh = SshTransport::connect(self.transport_config.clone()).await?;
                let channel = PtyChannel::ssh(ssh.open_channel().await?);
                (Transport::Ssh(ssh), channel)
            }
        };

        // Some images wait for a keystroke before printing the first prompt
        let login_timeout = self.transport_config.timeout;
        let data = match channel
            .read_until(&self.prompt_pattern, login_timeout)
            .await
        {
            Ok(data) => data,
            Err(Error::Channel(ChannelError::PatternTimeout(_))) => {
                channel.send("").await?;
                channel
                    .read_until(&self.prompt_pattern, login_timeout)
                    .await?
            }
            Err(e) => return Err(e),
        };

        self.transport = Some(transport);
        self.channel = Some(channel);

        let prompt = last_line(&data);
        self.track_prompt(&prompt)?;
        debug!(
            "{}: logged in over {}, prompt '{}'",
            self.transport_config.host, self.transport_config.device_type, prompt
        );

        for cmd in self.platform.on_open_commands.clone() {
            let response = self.send_command(&cmd).await?;
            if let Some(failure) = &response.failure_message {
                warn!("{}: '{}' failed: {}", self.transport_config.host, cmd, failure);
            }
        }

        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            for cmd in &self.platform.on_close_commands {
                let _ = channel.send(cmd).await;
            }
            channel.close().await?;
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        self.exchange(command, None).await
    }

    async fn send_config(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        self.acquire_privilege(CONFIG_PRIVILEGE).await?;

        let mut responses = Vec::with_capacity(commands.len());
        for cmd in commands {
            responses.push(self.exchange(cmd, None).await?);
        }

        let default = self.platform.default_privilege.clone();
        self.acquire_privilege(&default).await?;
        Ok(responses)
    }

    async fn acquire_privilege(&mut self, target: &str) -> Result<()> {
        if self.channel.is_none() {
            return Err(DriverError::NotConnected.into());
        }

        for step in self.privilege_manager.plan(target)? {
            debug!(
                "{}: '{}' towards '{}'",
                self.transport_config.host, step.command, step.target
            );
            match &step.auth_prompt {
                Some(auth) => {
                    self.escalate_with_auth(&step.command, &step.target, auth)
                        .await?
                }
                None => {
                    self.exchange(&step.command, None).await?;
                }
            }

            if self.privilege_manager.current_name() != Some(step.target.as_str()) {
                return Err(DriverError::PrivilegeAcquisitionFailed {
                    target: step.target,
                }
                .into());
            }
        }

        Ok(())
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    fn is_alive(&self) -> bool {
        let channel_open = self.channel.as_ref().is_some_and(PtyChannel::is_open);
        let transport_alive = self.transport.as_ref().is_some_and(Transport::is_alive);
        channel_open && transport_alive
    }

    fn current_privilege(&self) -> Option<&str> {
        self.privilege_manager.current_name()
    }
}

/// Last non-empty line of `data`, trimmed.
fn last_line(data: &[u8]) -> String {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let data = &data[..end];
    let start = memrchr(b'\n', data).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&data[start..]).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_ios;
    use crate::transport::{AuthMethod, HostKeyVerification};

    fn config() -> TransportConfig {
        TransportConfig {
            host: "10.0.0.1".into(),
            port: 22,
            device_type: DeviceType::Ssh,
            username: "admin".into(),
            auth: AuthMethod::None,
            timeout: Duration::from_secs(10),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
        }
    }

    #[test]
    fn test_last_line() {
        assert_eq!(last_line(b"output\r\nsw1#"), "sw1#");
        assert_eq!(last_line(b"output\r\nsw1# \r\n"), "sw1#");
        assert_eq!(last_line(b"sw1>"), "sw1>");
        assert_eq!(last_line(b""), "");
    }

    #[test]
    fn test_combined_pattern() {
        let driver =
            GenericDriver::new(config(), cisco_ios::platform(), None, Duration::from_secs(30))
                .unwrap();
        let pattern = &driver.prompt_pattern;
        assert!(pattern.is_match(b"banner\r\nsw1>"));
        assert!(pattern.is_match(b"sw1#"));
        assert!(pattern.is_match(b"sw1(config-if)#"));
        assert!(!pattern.is_match(b"Password: "));
    }

    #[test]
    fn test_track_prompt_pins_hostname() {
        let mut driver =
            GenericDriver::new(config(), cisco_ios::platform(), None, Duration::from_secs(30))
                .unwrap();
        driver.track_prompt("core-1>").unwrap();
        assert_eq!(driver.hostname(), "core-1");
        assert_eq!(driver.current_privilege(), Some("exec"));

        let pattern = driver.active_pattern();
        assert!(pattern.is_match(b"core-1(config)#"));
        assert!(!pattern.is_match(b"other>"));

        driver.track_prompt("core-1(config-if)#").unwrap();
        assert_eq!(driver.current_privilege(), Some("configuration"));
        assert_eq!(driver.hostname(), "core-1");
    }

    #[test]
    fn test_debug_omits_secrets() {
        let driver = GenericDriver::new(
            config(),
            cisco_ios::platform(),
            Some(SecretString::from("enable-pw".to_string())),
            Duration::from_secs(30),
        )
        .unwrap();
        let shown = format!("{:?}", driver);
        assert!(shown.contains("10.0.0.1"));
        assert!(!shown.contains("enable-pw"));
    }

    #[tokio::test]
    async fn test_commands_require_open() {
        let mut driver =
            GenericDriver::new(config(), cisco_ios::platform(), None, Duration::from_secs(30))
                .unwrap();
        assert!(!driver.is_open());
        assert!(!driver.is_alive());

        let err = driver.send_command("show version").await.unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::NotConnected)));
    }
}
