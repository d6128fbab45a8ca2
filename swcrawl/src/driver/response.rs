//! Output of one CLI command.

use std::time::Duration;

use crate::error::{DriverError, Result};

/// What a switch printed for one command.
#[derive(Debug, Clone)]
pub struct Response {
    pub command: String,
    /// Output with the echoed command and the trailing prompt removed.
    pub result: String,
    /// Output exactly as read from the shell, after escape stripping.
    pub raw_result: String,
    /// Prompt that ended the read.
    pub prompt: String,
    pub elapsed: Duration,
    /// Set when the output contains an IOS error marker such as
    /// `% Invalid input`.
    pub failure_message: Option<String>,
}

impl Response {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    pub fn with_failure(self, failure_message: impl Into<String>) -> Self {
        Self {
            failure_message: Some(failure_message.into()),
            ..self
        }
    }

    /// `Err(CommandFailed)` when the device rejected the command.
    pub fn into_result(self) -> Result<Self> {
        let Some(failure) = &self.failure_message else {
            return Ok(self);
        };
        Err(DriverError::CommandFailed {
            message: format!("'{}' rejected: {}", self.command, failure),
        }
        .into())
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.result)
    }
}
