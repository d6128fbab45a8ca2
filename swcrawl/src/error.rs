//! Error types, one enum per layer, wrapped by [`Error`].

use std::io;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("driver: {0}")]
    Driver(#[from] DriverError),

    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error is an expected outcome of probing a live network.
    ///
    /// Rejected credentials, timeouts and unreachable hosts are steady-state
    /// results during a scan: the device is skipped and the run continues.
    pub fn is_unreachable(&self) -> bool {
        match self {
            Error::Transport(e) => matches!(
                e,
                TransportError::AuthenticationFailed { .. }
                    | TransportError::ConnectionFailed { .. }
                    | TransportError::Timeout(_)
                    | TransportError::Disconnected
                    | TransportError::Io(_)
            ),
            Error::Channel(ChannelError::PatternTimeout(_) | ChannelError::Closed) => true,
            _ => false,
        }
    }

    /// Whether the device rejected the offered credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(TransportError::AuthenticationFailed { .. })
        )
    }
}

/// Reaching and logging in to a device.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot reach {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("ssh: {0}")]
    Ssh(#[from] russh::Error),

    /// Every offered method was refused, or telnet came back to the
    /// login prompt.
    #[error("login refused for '{user}'")]
    AuthenticationFailed { user: String },

    #[error("cannot load private key: {0}")]
    Key(String),

    /// The server key differs from the one recorded in known_hosts.
    #[error("host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    #[error("no known_hosts entry for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    #[error("known_hosts: {0}")]
    KnownHosts(String),

    #[error("peer closed the connection")]
    Disconnected,

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Reading and writing the interactive shell.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No prompt showed up before the read deadline.
    #[error("no prompt within {0:?}")]
    PatternTimeout(Duration),

    #[error("shell closed")]
    Closed,

    #[error("ssh channel: {0}")]
    Ssh(russh::Error),

    #[error("bad prompt pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Command execution and mode changes.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    /// The device answered with an IOS error marker.
    #[error("{message}")]
    CommandFailed { message: String },

    #[error("could not reach privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    #[error("invalid driver settings: {message}")]
    InvalidConfig { message: String },

    #[error("prompt '{prompt}' matches no privilege level")]
    UnknownPrivilege { prompt: String },

    #[error("privilege '{to}' is unreachable from '{from}'")]
    NoPrivilegePath { from: String, to: String },
}

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("invalid platform definition: {message}")]
    InvalidDefinition { message: String },
}

/// Reading or changing a switch configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Command output could not be turned into a snapshot.
    #[error("cannot parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("{} command(s) not applied to {host}: {message}", .commands.len())]
    ApplyFailed {
        host: String,
        commands: Vec<String>,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
