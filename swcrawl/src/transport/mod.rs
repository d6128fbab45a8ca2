//! Transport layer: SSH via russh and a minimal Telnet client.
//!
//! This module provides the low-level connection management,
//! handling connection setup, authentication, and channel creation.

pub mod config;
mod ssh;
mod telnet;

pub use config::{AuthMethod, DeviceType, HostKeyVerification, TransportConfig};
pub use ssh::SshTransport;
pub use telnet::TelnetStream;

use crate::error::Result;

/// An established connection.
///
/// For Telnet the TCP stream doubles as the interactive channel and is
/// owned by the [`PtyChannel`](crate::channel::PtyChannel); nothing else
/// needs tearing down here.
pub enum Transport {
    /// SSH session handle.
    Ssh(SshTransport),

    /// Telnet connection.
    Telnet,
}

impl Transport {
    /// Whether the underlying session is still up.
    pub fn is_alive(&self) -> bool {
        match self {
            Transport::Ssh(ssh) => ssh.is_alive(),
            Transport::Telnet => true,
        }
    }

    /// Close the connection.
    pub async fn close(self) -> Result<()> {
        match self {
            Transport::Ssh(ssh) => ssh.close().await,
            Transport::Telnet => Ok(()),
        }
    }
}
