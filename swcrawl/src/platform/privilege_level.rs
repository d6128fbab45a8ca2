//! One node of the IOS mode tree (`>`, `#`, `(config)#`).

use regex::bytes::Regex;

/// A CLI mode, recognised by its prompt.
///
/// Each level except the root names its parent and the commands that move
/// between them: `enable`/`disable` between user and privileged exec,
/// `configure terminal`/`end` into and out of configuration.
#[derive(Debug, Clone)]
pub struct PrivilegeLevel {
    pub name: String,
    pub pattern: Regex,
    pub previous_priv: Option<String>,
    /// Sent at the parent to reach this level.
    pub escalate_command: Option<String>,
    /// Sent here to return to the parent.
    pub deescalate_command: Option<String>,
    /// Password prompt `enable` may print; answered with the enable secret.
    pub escalate_prompt: Option<Regex>,
    /// Prompt substrings that rule this level out. `sw1#` and
    /// `sw1(config)#` both end in `#`.
    pub not_contains: Vec<String>,
}

impl PrivilegeLevel {
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            previous_priv: None,
            escalate_command: None,
            deescalate_command: None,
            escalate_prompt: None,
            not_contains: vec![],
        })
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.previous_priv = Some(parent.into());
        self
    }

    pub fn with_escalate(mut self, command: impl Into<String>) -> Self {
        self.escalate_command = Some(command.into());
        self
    }

    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = Some(command.into());
        self
    }

    /// Expect a password prompt matching `prompt_pattern` on escalation.
    pub fn with_auth(mut self, prompt_pattern: &str) -> Result<Self, regex::Error> {
        self.escalate_prompt = Some(Regex::new(prompt_pattern)?);
        Ok(self)
    }

    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    pub fn requires_auth(&self) -> bool {
        self.escalate_prompt.is_some()
    }

    /// Whether `prompt` belongs to this level.
    pub fn matches(&self, prompt: &str) -> bool {
        !self.not_contains.iter().any(|excluded| prompt.contains(excluded.as_str()))
            && self.pattern.is_match(prompt.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_contains_filters_match() {
        let level = PrivilegeLevel::new("privilege_exec", r"#\s*$")
            .unwrap()
            .with_not_contains("(config");

        assert!(level.matches("sw1#"));
        assert!(!level.matches("sw1(config-if)#"));
    }

    #[test]
    fn test_auth_flag() {
        let level = PrivilegeLevel::new("privilege_exec", r"#\s*$").unwrap();
        assert!(!level.requires_auth());

        let level = level.with_auth(r"(?i)password:\s*$").unwrap();
        assert!(level.requires_auth());
    }
}
