//! In-memory sessions for tests.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};

use super::{CredentialPair, DeviceSession, SessionConnector};
use crate::error::{DriverError, Result, TransportError};
use crate::transport::DeviceType;

const INVALID_INPUT: &str = "% Invalid input detected at '^' marker.";

/// A scripted device.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub outputs: HashMap<String, String>,
    /// Config lines containing any of these fragments are rejected.
    pub rejects: Vec<String>,
}

impl MockDevice {
    pub fn new(hostname: &str, username: &str, password: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    pub fn rejecting(mut self, fragment: &str) -> Self {
        self.rejects.push(fragment.to_string());
        self
    }
}

/// Everything the mock saw.
#[derive(Debug, Default)]
pub struct MockLog {
    /// (host, username) per connection attempt.
    pub connects: Vec<(String, String)>,
    /// (host, command) per `run`.
    pub commands: Vec<(String, String)>,
    /// (host, lines) per `apply_config`.
    pub applied: Vec<(String, Vec<String>)>,
}

/// Connector over a fixed set of [`MockDevice`]s keyed by IP.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    devices: HashMap<String, MockDevice>,
    log: Arc<Mutex<MockLog>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, ip: &str, device: MockDevice) -> Self {
        self.devices.insert(ip.to_string(), device);
        self
    }

    pub fn connects(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().connects.clone()
    }

    pub fn commands(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().commands.clone()
    }

    pub fn applied(&self) -> Vec<(String, Vec<String>)> {
        self.log.lock().unwrap().applied.clone()
    }

    /// Open a session directly, bypassing credentials.
    pub fn session(&self, ip: &str) -> MockSession {
        let device = self.devices.get(ip).cloned().unwrap_or_default();
        MockSession::new(ip, device, self.log.clone())
    }
}

impl SessionConnector for MockConnector {
    type Session = MockSession;

    async fn connect(
        &self,
        _device_type: DeviceType,
        host: &str,
        credential: &CredentialPair,
        _enable_secret: &SecretString,
    ) -> Result<MockSession> {
        self.log
            .lock()
            .unwrap()
            .connects
            .push((host.to_string(), credential.username.clone()));

        let device = self.devices.get(host).ok_or_else(|| TransportError::ConnectionFailed {
            host: host.to_string(),
            port: 22,
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
        })?;

        if device.username != credential.username
            || device.password != credential.password.expose_secret()
        {
            return Err(TransportError::AuthenticationFailed {
                user: credential.username.clone(),
            }
            .into());
        }

        Ok(MockSession::new(host, device.clone(), self.log.clone()))
    }
}

/// Session on a [`MockDevice`].
#[derive(Debug)]
pub struct MockSession {
    ip: String,
    device: MockDevice,
    prompt: String,
    open: bool,
    log: Arc<Mutex<MockLog>>,
}

impl MockSession {
    fn new(ip: &str, device: MockDevice, log: Arc<Mutex<MockLog>>) -> Self {
        Self {
            ip: ip.to_string(),
            prompt: format!("{}>", device.hostname),
            device,
            open: true,
            log,
        }
    }

    /// Change what a command returns, e.g. after an apply.
    pub fn set_output(&mut self, command: &str, output: &str) {
        self.device
            .outputs
            .insert(command.to_string(), output.to_string());
    }
}

impl DeviceSession for MockSession {
    async fn run(&mut self, command: &str) -> Result<String> {
        if !self.open {
            return Err(DriverError::NotConnected.into());
        }
        self.log
            .lock()
            .unwrap()
            .commands
            .push((self.ip.clone(), command.to_string()));
        Ok(self
            .device
            .outputs
            .get(command)
            .cloned()
            .unwrap_or_else(|| INVALID_INPUT.to_string()))
    }

    async fn run_expect(&mut self, command: &str, _expect: &str) -> Result<String> {
        self.run(command).await
    }

    async fn elevate(&mut self) -> Result<()> {
        if !self.open {
            return Err(DriverError::NotConnected.into());
        }
        self.prompt = format!("{}#", self.device.hostname);
        Ok(())
    }

    async fn apply_config(&mut self, lines: &[String]) -> Result<String> {
        if !self.open {
            return Err(DriverError::NotConnected.into());
        }
        self.log
            .lock()
            .unwrap()
            .applied
            .push((self.ip.clone(), lines.to_vec()));

        for line in lines {
            if self.device.rejects.iter().any(|r| line.contains(r.as_str())) {
                return Err(DriverError::CommandFailed {
                    message: format!("'{}' rejected: % Invalid input", line),
                }
                .into());
            }
        }
        Ok(lines.join("\n"))
    }

    fn prompt(&self) -> &str {
        &self.prompt
    }

    fn is_alive(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}
