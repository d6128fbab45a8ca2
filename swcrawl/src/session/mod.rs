//! The device session boundary.
//!
//! Discovery and configuration code talks to switches only through
//! [`DeviceSession`] and [`SessionConnector`]. [`GenericDriver`] is the
//! production session; tests substitute an in-memory one.

mod connector;
#[cfg(test)]
pub(crate) mod mock;

pub use connector::{DriverConnector, DriverOptions};

use std::future::Future;

use log::{debug, warn};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::channel::hostname_from_prompt;
use crate::driver::{CONFIG_PRIVILEGE, Driver, GenericDriver};
use crate::error::Result;
use crate::transport::DeviceType;

/// An authenticated shell on one device.
pub trait DeviceSession: Send {
    /// Run a command and return its output without echo or prompt.
    fn run(&mut self, command: &str) -> impl Future<Output = Result<String>> + Send;

    /// Run a command and stop reading when `expect` (a regex) matches the
    /// end of the output.
    fn run_expect(
        &mut self,
        command: &str,
        expect: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Enter privileged EXEC mode.
    fn elevate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send configuration lines verbatim, stopping at the first line the
    /// device rejects. Returns the device transcript.
    fn apply_config(&mut self, lines: &[String]) -> impl Future<Output = Result<String>> + Send;

    /// The last prompt seen.
    fn prompt(&self) -> &str;

    /// Hostname taken from the prompt.
    fn hostname(&self) -> String {
        hostname_from_prompt(self.prompt())
    }

    /// Whether the session can still carry commands.
    fn is_alive(&self) -> bool;

    /// Close the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens [`DeviceSession`]s.
pub trait SessionConnector: Send + Sync + 'static {
    /// Session type produced.
    type Session: DeviceSession + 'static;

    /// Connect and log in to `host` with one credential pair.
    fn connect(
        &self,
        device_type: DeviceType,
        host: &str,
        credential: &CredentialPair,
        enable_secret: &SecretString,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// One username/password pair.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub username: String,
    pub password: SecretString,
}

impl CredentialPair {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Ordered credential pairs plus an optional enable secret.
///
/// Pairs are tried in order. Without an explicit enable secret the pair's
/// own password answers the `enable` prompt.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pairs: Vec<CredentialPair>,
    enable_secret: Option<SecretString>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair.
    pub fn with_pair(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.pairs.push(CredentialPair::new(username, password));
        self
    }

    /// Set the enable secret.
    pub fn with_enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    pub fn push(&mut self, pair: CredentialPair) {
        self.pairs.push(pair);
    }

    pub fn pairs(&self) -> &[CredentialPair] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Secret to answer the `enable` prompt with when logged in as `pair`.
    pub fn enable_secret_for<'a>(&'a self, pair: &'a CredentialPair) -> &'a SecretString {
        self.enable_secret.as_ref().unwrap_or(&pair.password)
    }

    /// Move the pair at `index` to the front of the try order.
    pub fn promote(&mut self, index: usize) {
        if index > 0 && index < self.pairs.len() {
            let pair = self.pairs.remove(index);
            self.pairs.insert(0, pair);
        }
    }
}

/// Who a session is talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub ip: String,
    pub hostname: String,
    pub device_type: DeviceType,
}

impl DeviceIdentity {
    /// Identity of an open session.
    pub fn of(ip: impl Into<String>, device_type: DeviceType, session: &impl DeviceSession) -> Self {
        Self {
            ip: ip.into(),
            hostname: session.hostname(),
            device_type,
        }
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hostname.is_empty() {
            write!(f, "{}", self.ip)
        } else {
            write!(f, "{} ({})", self.hostname, self.ip)
        }
    }
}

impl DeviceSession for GenericDriver {
    async fn run(&mut self, command: &str) -> Result<String> {
        Ok(Driver::send_command(self, command).await?.result)
    }

    async fn run_expect(&mut self, command: &str, expect: &str) -> Result<String> {
        Ok(self.send_command_expect(command, expect).await?.result)
    }

    async fn elevate(&mut self) -> Result<()> {
        let target = self.platform().default_privilege.clone();
        self.acquire_privilege(&target).await
    }

    async fn apply_config(&mut self, lines: &[String]) -> Result<String> {
        let mut transcript = String::new();

        for line in lines {
            let response = Driver::send_command(self, line).await?;
            transcript.push_str(&response.raw_result);

            if let Err(e) = response.into_result() {
                warn!("{}: {}", self.host(), e);
                if self.current_privilege() == Some(CONFIG_PRIVILEGE) {
                    if let Err(end) = Driver::send_command(self, "end").await {
                        debug!("{}: leaving config mode failed: {}", self.host(), end);
                    }
                }
                return Err(e);
            }
        }

        if self.current_privilege() == Some(CONFIG_PRIVILEGE) {
            let response = Driver::send_command(self, "end").await?;
            transcript.push_str(&response.raw_result);
        }

        Ok(transcript)
    }

    fn prompt(&self) -> &str {
        GenericDriver::prompt(self)
    }

    fn is_alive(&self) -> bool {
        Driver::is_alive(self)
    }

    async fn close(&mut self) -> Result<()> {
        Driver::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use secrecy::ExposeSecret;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    use crate::platform::vendors::cisco_ios;
    use crate::transport::{AuthMethod, HostKeyVerification, TransportConfig};

    #[test]
    fn test_enable_secret_falls_back_to_password() {
        let creds = Credentials::new().with_pair("admin", "pw1");
        let pair = &creds.pairs()[0];
        assert_eq!(creds.enable_secret_for(pair).expose_secret(), "pw1");

        let creds = creds.with_enable_secret("en");
        let pair = &creds.pairs()[0];
        assert_eq!(creds.enable_secret_for(pair).expose_secret(), "en");
    }

    #[test]
    fn test_promote() {
        let mut creds = Credentials::new()
            .with_pair("a", "1")
            .with_pair("b", "2")
            .with_pair("c", "3");
        creds.promote(2);
        let order: Vec<_> = creds.pairs().iter().map(|p| p.username.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);

        creds.promote(0);
        creds.promote(9);
        assert_eq!(creds.pairs()[0].username, "c");
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::new().with_pair("admin", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    /// A Telnet switch that echoes lines, rejects `bogus` and hangs up on
    /// `end`.
    async fn hang_up_on_end(listener: TcpListener) {
        let (socket, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"Username: ").await.unwrap();
        lines.next_line().await.unwrap();
        writer.write_all(b"Password: ").await.unwrap();
        lines.next_line().await.unwrap();
        writer.write_all(b"\r\nsw1#").await.unwrap();

        let mut prompt = "sw1#";
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim_end();
            let output = match line {
                "end" => return,
                "configure terminal" => {
                    prompt = "sw1(config)#";
                    ""
                }
                l if l.starts_with("bogus") => "% Invalid input detected at '^' marker.\r\n",
                _ => "",
            };
            let reply = format!("{}\r\n{}{}", line, output, prompt);
            writer.write_all(reply.as_bytes()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_rejected_line_survives_failed_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let device = tokio::spawn(hang_up_on_end(listener));

        let config = TransportConfig {
            host: "127.0.0.1".into(),
            port,
            device_type: DeviceType::Telnet,
            username: "admin".into(),
            auth: AuthMethod::Password(SecretString::from("pw".to_string())),
            timeout: Duration::from_secs(5),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
        };
        let mut driver =
            GenericDriver::new(config, cisco_ios::platform(), None, Duration::from_secs(5))
                .unwrap();
        driver.open().await.unwrap();
        assert_eq!(DeviceSession::prompt(&driver), "sw1#");

        let lines = vec!["configure terminal".to_string(), "bogus line".to_string()];
        let err = driver.apply_config(&lines).await.unwrap_err();
        assert!(err.to_string().contains("'bogus line' rejected"), "{err}");

        device.await.unwrap();
    }

    #[test]
    fn test_identity_display() {
        let id = DeviceIdentity {
            ip: "10.0.0.1".into(),
            hostname: "core-1".into(),
            device_type: DeviceType::Ssh,
        };
        assert_eq!(id.to_string(), "core-1 (10.0.0.1)");
    }
}
