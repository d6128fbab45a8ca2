//! SSH transport over russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace, warn};
use russh::Channel;
use russh::client::{self, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use secrecy::{ExposeSecret, SecretString};

use super::config::{AuthMethod, HostKeyVerification, TransportConfig};
use crate::error::{Result, TransportError};

/// Keyboard-interactive rounds answered before giving up.
const MAX_INTERACTIVE_ROUNDS: usize = 3;

/// Authenticated SSH connection to one device.
pub struct SshTransport {
    session: Handle<HostKeyPolicy>,
    config: TransportConfig,
}

impl SshTransport {
    /// Connect, verify the host key and log in.
    pub async fn connect(config: TransportConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(Duration::from_secs(15)),
            ..Default::default()
        });

        let rejection = Arc::new(Mutex::new(None));
        let policy = HostKeyPolicy {
            host: config.host.clone(),
            port: config.port,
            mode: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            rejection: Arc::clone(&rejection),
        };

        debug!("ssh: connecting to {}", config.socket_addr());
        let connected = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), policy),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?;

        let mut session = match connected {
            Ok(session) => session,
            Err(e) => {
                let rejected = rejection.lock().ok().and_then(|mut slot| slot.take());
                return Err(match (rejected, e) {
                    (Some(host_key), _) => host_key,
                    (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                        host: config.host.clone(),
                        port: config.port,
                        source,
                    },
                    (None, e) => TransportError::Ssh(e),
                }
                .into());
            }
        };

        let accepted = tokio::time::timeout(config.timeout, login(&mut session, &config))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))??;
        if !accepted {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            }
            .into());
        }
        debug!("ssh: logged in to {} as {}", config.host, config.username);

        Ok(Self { session, config })
    }

    /// Open a shell channel with a PTY sized from the config.
    pub async fn open_channel(&self) -> Result<Channel<Msg>> {
        let channel = self
            .session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                "vt100",
                self.config.terminal_width,
                self.config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;
        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    pub fn is_alive(&self) -> bool {
        !self.session.is_closed()
    }

    pub async fn close(self) -> Result<()> {
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// Run the configured authentication. `Ok(false)` means rejected.
async fn login(session: &mut Handle<HostKeyPolicy>, config: &TransportConfig) -> Result<bool> {
    let user = config.username.as_str();
    match &config.auth {
        AuthMethod::None => Ok(session
            .authenticate_none(user)
            .await
            .map_err(TransportError::Ssh)?
            .success()),
        AuthMethod::Password(password) => {
            let accepted = session
                .authenticate_password(user, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success();
            if accepted {
                return Ok(true);
            }
            // AAA-backed vty lines often offer keyboard-interactive only
            trace!("ssh: password rejected for {}, trying keyboard-interactive", user);
            keyboard_interactive(session, user, password).await
        }
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                .map_err(|e| TransportError::Key(e.to_string()))?;
            let hash_alg = session
                .best_supported_rsa_hash()
                .await
                .map_err(TransportError::Ssh)?
                .flatten();
            Ok(session
                .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                .await
                .map_err(TransportError::Ssh)?
                .success())
        }
    }
}

/// Answer every keyboard-interactive prompt with the password.
async fn keyboard_interactive(
    session: &mut Handle<HostKeyPolicy>,
    user: &str,
    password: &SecretString,
) -> Result<bool> {
    let mut response = session
        .authenticate_keyboard_interactive_start(user, None::<String>)
        .await
        .map_err(TransportError::Ssh)?;

    for _ in 0..MAX_INTERACTIVE_ROUNDS {
        match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => {
                let answers = prompts
                    .iter()
                    .map(|_| password.expose_secret().to_string())
                    .collect();
                response = session
                    .authenticate_keyboard_interactive_respond(answers)
                    .await
                    .map_err(TransportError::Ssh)?;
            }
        }
    }
    Ok(matches!(response, KeyboardInteractiveAuthResponse::Success))
}

/// russh handler applying a [`HostKeyVerification`] mode.
struct HostKeyPolicy {
    host: String,
    port: u16,
    mode: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Why the key was refused, for `connect` to report.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl HostKeyPolicy {
    /// `Ok(true)` when known_hosts has this key, `Ok(false)` when it has no
    /// entry for the host.
    fn lookup(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let found = match &self.known_hosts_path {
            Some(path) => russh::keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => russh::keys::check_known_hosts(&self.host, self.port, key),
        };
        found.map_err(|e| match e {
            russh::keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            e => TransportError::KnownHosts(e.to_string()),
        })
    }

    fn learn(&self, key: &PublicKey) {
        let saved = match &self.known_hosts_path {
            Some(path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        if let Err(e) = saved {
            warn!("Failed to save host key for {}: {}", self.host, e);
        }
    }

    fn verify(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        match (&self.mode, self.lookup(key)?) {
            (HostKeyVerification::Disabled, _) | (_, true) => Ok(()),
            (HostKeyVerification::AcceptNew, false) => {
                debug!("ssh: learning host key for {}", self.host);
                self.learn(key);
                Ok(())
            }
            (HostKeyVerification::Strict, false) => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
        }
    }
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if matches!(self.mode, HostKeyVerification::Disabled) {
            return Ok(true);
        }
        match self.verify(server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}
