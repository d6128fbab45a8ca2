//! The interactive shell of an SSH or Telnet session.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};
use crate::transport::TelnetStream;

/// Bytes of output searched for a prompt. Longer than any IOS prompt plus
/// a `--More--` marker.
pub const SEARCH_DEPTH: usize = 1000;

/// The byte stream underneath a channel.
enum ChannelIo {
    Ssh(Channel<Msg>),
    Telnet(TelnetStream),
}

/// A shell read until a prompt pattern shows up.
pub struct PtyChannel {
    io: ChannelIo,
    buffer: PatternBuffer,
    /// Cleared on EOF or `close`; writes then fail with `Closed`.
    is_open: bool,
}

impl PtyChannel {
    /// Wrap an SSH shell channel.
    pub fn ssh(channel: Channel<Msg>) -> Self {
        Self::new(ChannelIo::Ssh(channel))
    }

    /// Wrap a logged-in Telnet stream.
    pub fn telnet(stream: TelnetStream) -> Self {
        Self::new(ChannelIo::Telnet(stream))
    }

    fn new(io: ChannelIo) -> Self {
        Self {
            io,
            buffer: PatternBuffer::new(SEARCH_DEPTH),
            is_open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Feed already-received output into the buffer.
    pub fn extend_buffer(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Write `line` and the transport's line ending.
    pub async fn send(&mut self, line: &str) -> Result<()> {
        let newline: &[u8] = match self.io {
            ChannelIo::Ssh(_) => b"\n",
            ChannelIo::Telnet(_) => b"\r\n",
        };
        let mut data = Vec::with_capacity(line.len() + newline.len());
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(newline);
        self.write(&data).await
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_open {
            return Err(ChannelError::Closed.into());
        }
        match &mut self.io {
            ChannelIo::Ssh(channel) => channel.data(data).await.map_err(ChannelError::Ssh)?,
            ChannelIo::Telnet(stream) => stream.write(data).await?,
        }
        Ok(())
    }

    /// Read until `pattern` matches the tail of the buffer, then hand back
    /// and clear everything buffered so far.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }

            let chunk = tokio::time::timeout_at(deadline, self.read_chunk())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))??;

            match chunk {
                Some(data) => {
                    trace!("pty: read {} bytes", data.len());
                    self.buffer.extend(&data);
                }
                None => {
                    self.is_open = false;
                    return Err(ChannelError::Closed.into());
                }
            }
        }
    }

    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.io {
            ChannelIo::Ssh(channel) => loop {
                match channel.wait().await {
                    Some(ChannelMsg::Data { data }) => return Ok(Some(data.to_vec())),
                    Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(Some(data.to_vec())),
                    Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => return Ok(None),
                    Some(_) => continue,
                }
            },
            ChannelIo::Telnet(stream) => stream.read_chunk().await,
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        match &mut self.io {
            ChannelIo::Ssh(channel) => {
                // The device may already have dropped the channel after `exit`
                let _ = channel.eof().await;
                let _ = channel.close().await;
            }
            ChannelIo::Telnet(stream) => {
                let _ = stream.shutdown().await;
            }
        }
        Ok(())
    }
}
