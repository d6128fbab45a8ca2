//! Per-dialect CLI rules: modes, error markers and session setup.

use indexmap::IndexMap;
use memchr::memchr;

use super::privilege_level::PrivilegeLevel;
use crate::error::{PlatformError, Result};

/// Everything the driver needs to know about one CLI dialect.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    pub name: String,
    /// Modes keyed by name, in declaration order.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,
    /// Mode that `show` commands run in.
    pub default_privilege: String,
    /// Output substrings that mark a rejected command.
    pub failed_when_contains: Vec<String>,
    /// Sent once after login, e.g. `terminal length 0`.
    pub on_open_commands: Vec<String>,
    /// Sent without waiting for a prompt before the channel closes.
    pub on_close_commands: Vec<String>,
    pub terminal_width: u32,
    pub terminal_height: u32,
}

impl PlatformDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            failed_when_contains: Vec::new(),
            on_open_commands: Vec::new(),
            on_close_commands: Vec::new(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    pub fn with_on_close_command(mut self, command: impl Into<String>) -> Self {
        self.on_close_commands.push(command.into());
        self
    }

    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// Reject definitions the driver could not navigate: no modes, an
    /// undefined default, or a parent link to a missing mode.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| -> Result<()> {
            Err(PlatformError::InvalidDefinition { message }.into())
        };

        if self.privilege_levels.is_empty() {
            return invalid(format!("platform '{}' defines no privilege levels", self.name));
        }
        if !self.privilege_levels.contains_key(&self.default_privilege) {
            return invalid(format!(
                "default privilege '{}' is not defined for platform '{}'",
                self.default_privilege, self.name
            ));
        }
        let orphan = self.privilege_levels.values().find(|level| {
            level
                .previous_priv
                .as_ref()
                .is_some_and(|parent| !self.privilege_levels.contains_key(parent))
        });
        match orphan {
            Some(level) => invalid(format!(
                "privilege '{}' names unknown parent '{}'",
                level.name,
                level.previous_priv.as_deref().unwrap_or_default()
            )),
            None => Ok(()),
        }
    }

    /// Strip the command echo and the trailing prompt from raw output.
    ///
    /// Line endings are normalized to `\n`.
    pub fn normalize_output(&self, raw: &str, command: &str) -> String {
        let text = raw.replace("\r\n", "\n").replace('\r', "");
        let mut body = text.as_str();

        // Drop the echoed command line
        if let Some(pos) = memchr(b'\n', body.as_bytes()) {
            if body[..pos].trim_end().ends_with(command.trim()) {
                body = &body[pos + 1..];
            }
        } else if body.trim_end().ends_with(command.trim()) {
            return String::new();
        }

        // Drop the trailing prompt line
        let body = body.trim_end_matches([' ', '\t']);
        match body.rfind('\n') {
            Some(pos) => body[..pos].to_string(),
            None => String::new(),
        }
    }

    /// Return the first failure pattern found in `output`.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> PlatformDefinition {
        PlatformDefinition::new("test")
            .with_privilege(PrivilegeLevel::new("exec", r">\s*$").unwrap())
            .with_default_privilege("exec")
            .with_failure_pattern("% Invalid input")
    }

    #[test]
    fn test_normalize_output() {
        let platform = platform();
        let raw = "show clock\r\n*10:00:00.000 UTC Mon Mar 1 2021\r\nsw1>";
        assert_eq!(
            platform.normalize_output(raw, "show clock"),
            "*10:00:00.000 UTC Mon Mar 1 2021"
        );
    }

    #[test]
    fn test_normalize_output_without_echo() {
        let platform = platform();
        let raw = "line one\nline two\nsw1>";
        assert_eq!(platform.normalize_output(raw, "show x"), "line one\nline two");
        assert_eq!(platform.normalize_output("sw1>", "show x"), "");
    }

    #[test]
    fn test_detect_failure() {
        let platform = platform();
        let out = "        ^\n% Invalid input detected at '^' marker.";
        assert_eq!(platform.detect_failure(out), Some("% Invalid input"));
        assert_eq!(platform.detect_failure("all good"), None);
    }

    #[test]
    fn test_validate() {
        assert!(platform().validate().is_ok());
        assert!(PlatformDefinition::new("empty").validate().is_err());

        let orphan = platform()
            .with_privilege(PrivilegeLevel::new("priv", r"#\s*$").unwrap().with_parent("nope"));
        assert!(orphan.validate().is_err());
    }
}
