//! Minimal Telnet transport for devices without SSH enabled.
//!
//! Option negotiation is refused except for server ECHO and
//! SUPPRESS-GO-AHEAD, which is all an IOS vty line needs to behave like a
//! plain character stream.

use std::sync::LazyLock;

use bytes::{Buf, BytesMut};
use log::{debug, trace};
use regex::bytes::Regex;
use secrecy::ExposeSecret;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::{AuthMethod, TransportConfig};
use crate::error::{ChannelError, Result, TransportError};

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

static USERNAME_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(user\s?name|login)\s*:\s*$").unwrap());
static PASSWORD_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)password\s*:\s*$").unwrap());
static LOGIN_FAILED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(authentication failed|login invalid|access denied|bad passwords)").unwrap()
});
static DEVICE_PROMPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[A-Za-z0-9_.\-@()/:]{1,63}[>#]\s*$").unwrap());

/// Telnet connection to a device.
pub struct TelnetStream {
    stream: TcpStream,

    /// Raw bytes holding an incomplete IAC sequence from the last read.
    pending: BytesMut,
}

impl TelnetStream {
    /// Connect and log in.
    ///
    /// Returns the stream and any output received after the login dialog
    /// (normally the first device prompt), which the caller must feed to
    /// its prompt detector.
    pub async fn connect(config: &TransportConfig) -> Result<(Self, Vec<u8>)> {
        debug!("telnet: connecting to {}", config.socket_addr());

        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        let mut telnet = Self {
            stream,
            pending: BytesMut::with_capacity(1024),
        };

        let password = match &config.auth {
            AuthMethod::Password(p) => Some(p.expose_secret().to_string()),
            _ => None,
        };

        let leftover = tokio::time::timeout(
            config.timeout,
            telnet.login(&config.username, password.as_deref()),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))??;

        Ok((telnet, leftover))
    }

    async fn login(&mut self, username: &str, password: Option<&str>) -> Result<Vec<u8>> {
        let mut seen: Vec<u8> = Vec::new();
        let mut sent_password = false;

        loop {
            let chunk = self.read_chunk().await?.ok_or(TransportError::Disconnected)?;
            seen.extend_from_slice(&chunk);

            if sent_password && LOGIN_FAILED.is_match(&seen) {
                return Err(TransportError::AuthenticationFailed {
                    user: username.to_string(),
                }
                .into());
            }

            if USERNAME_PROMPT.is_match(&seen) {
                if sent_password {
                    // Asked for a username again: the password was rejected
                    return Err(TransportError::AuthenticationFailed {
                        user: username.to_string(),
                    }
                    .into());
                }
                trace!("telnet: username prompt");
                self.write_line(username).await?;
                seen.clear();
            } else if PASSWORD_PROMPT.is_match(&seen) {
                if sent_password {
                    return Err(TransportError::AuthenticationFailed {
                        user: username.to_string(),
                    }
                    .into());
                }
                trace!("telnet: password prompt");
                self.write_line(password.unwrap_or_default()).await?;
                sent_password = true;
                seen.clear();
            } else if DEVICE_PROMPT.is_match(&seen) {
                return Ok(seen);
            }
        }
    }

    /// Read the next chunk of application data.
    ///
    /// Telnet commands are answered and stripped. Returns `Ok(None)` when
    /// the peer closed the connection.
    pub async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut raw = [0u8; 4096];
        loop {
            let n = self
                .stream
                .read(&mut raw)
                .await
                .map_err(TransportError::Io)?;
            if n == 0 {
                return Ok(None);
            }
            self.pending.extend_from_slice(&raw[..n]);

            let (data, replies) = process_iac(&mut self.pending);
            if !replies.is_empty() {
                self.stream
                    .write_all(&replies)
                    .await
                    .map_err(TransportError::Io)?;
            }
            if !data.is_empty() {
                return Ok(Some(data));
            }
        }
    }

    /// Write raw data, escaping literal 0xFF bytes.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let mut out = Vec::with_capacity(data.len() + 2);
        for &b in data {
            if b == IAC {
                out.push(IAC);
            }
            out.push(b);
        }
        self.stream
            .write_all(&out)
            .await
            .map_err(|_| ChannelError::Closed)?;
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write(line.as_bytes()).await?;
        self.write(b"\r\n").await
    }

    /// Shut down the write half of the connection.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(TransportError::Io)?;
        Ok(())
    }
}

/// Strip Telnet commands from `buf`, returning application data and the
/// negotiation replies to send back. Incomplete trailing sequences stay in
/// `buf` for the next call.
fn process_iac(buf: &mut BytesMut) -> (Vec<u8>, Vec<u8>) {
    let mut data = Vec::with_capacity(buf.len());
    let mut replies = Vec::new();
    let mut i = 0;

    while i < buf.len() {
        let b = buf[i];
        if b != IAC {
            data.push(b);
            i += 1;
            continue;
        }

        let Some(&cmd) = buf.get(i + 1) else { break };
        match cmd {
            IAC => {
                data.push(IAC);
                i += 2;
            }
            WILL | WONT | DO | DONT => {
                let Some(&opt) = buf.get(i + 2) else { break };
                match cmd {
                    WILL if opt == OPT_ECHO || opt == OPT_SGA => {
                        replies.extend_from_slice(&[IAC, DO, opt])
                    }
                    WILL => replies.extend_from_slice(&[IAC, DONT, opt]),
                    DO if opt == OPT_SGA => replies.extend_from_slice(&[IAC, WILL, opt]),
                    DO => replies.extend_from_slice(&[IAC, WONT, opt]),
                    _ => {}
                }
                i += 3;
            }
            SB => {
                let end = buf[i + 2..]
                    .windows(2)
                    .position(|w| w == [IAC, SE])
                    .map(|p| i + 2 + p + 2);
                match end {
                    Some(end) => i = end,
                    None => break,
                }
            }
            _ => i += 2,
        }
    }

    buf.advance(i);
    (data, replies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_data_passes_through() {
        let mut buf = BytesMut::from(&b"switch>"[..]);
        let (data, replies) = process_iac(&mut buf);
        assert_eq!(data, b"switch>");
        assert!(replies.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_negotiation_replies() {
        let mut buf = BytesMut::from(&[IAC, WILL, OPT_ECHO, IAC, DO, 24, b'U', b':'][..]);
        let (data, replies) = process_iac(&mut buf);
        assert_eq!(data, b"U:");
        assert_eq!(replies, vec![IAC, DO, OPT_ECHO, IAC, WONT, 24]);
    }

    #[test]
    fn test_incomplete_sequence_is_kept() {
        let mut buf = BytesMut::from(&[b'a', IAC, DO][..]);
        let (data, _) = process_iac(&mut buf);
        assert_eq!(data, b"a");
        assert_eq!(&buf[..], &[IAC, DO]);

        buf.extend_from_slice(&[OPT_SGA, b'b']);
        let (data, replies) = process_iac(&mut buf);
        assert_eq!(data, b"b");
        assert_eq!(replies, vec![IAC, WILL, OPT_SGA]);
    }

    #[test]
    fn test_subnegotiation_skipped() {
        let mut buf = BytesMut::from(&[IAC, SB, 24, 1, IAC, SE, b'#'][..]);
        let (data, _) = process_iac(&mut buf);
        assert_eq!(data, b"#");
    }

    #[test]
    fn test_login_prompts() {
        assert!(USERNAME_PROMPT.is_match(b"\r\nUser Access Verification\r\n\r\nUsername: "));
        assert!(PASSWORD_PROMPT.is_match(b"Password: "));
        assert!(DEVICE_PROMPT.is_match(b"\r\nswitch01>"));
        assert!(DEVICE_PROMPT.is_match(b"\r\nswitch01#"));
        assert!(LOGIN_FAILED.is_match(b"% Authentication failed\r\n"));
    }
}
