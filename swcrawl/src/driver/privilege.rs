//! Where the CLI is in the mode tree and how to get elsewhere.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Error, Result};
use crate::platform::PrivilegeLevel;

/// Current mode plus the mode tree it lives in.
///
/// IOS modes form a tree rooted at user exec, so a move between any two
/// modes climbs to their closest common ancestor and then descends.
#[derive(Debug)]
pub struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    /// `None` until the first prompt is recognised.
    current: Option<String>,
}

/// One command of a mode change.
#[derive(Debug, Clone)]
pub struct TransitionInfo {
    /// Mode the command lands in.
    pub target: String,
    pub command: String,
    /// Password prompt to answer with the enable secret.
    pub auth_prompt: Option<Regex>,
}

impl PrivilegeManager {
    pub fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// First level, in declaration order, whose prompt rules accept `prompt`.
    pub fn level_for_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Record the mode shown by `prompt`. An unrecognised prompt (a
    /// `Password:` line, say) keeps the previous mode and returns `None`.
    pub fn observe_prompt(&mut self, prompt: &str) -> Option<&str> {
        let name = self.level_for_prompt(prompt).ok()?.name.clone();
        self.current = Some(name);
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&PrivilegeLevel> {
        self.levels.get(self.current.as_deref()?)
    }

    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// `name` followed by each parent up to the root.
    fn lineage<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![name];
        let mut cursor = self.levels.get(name);
        while let Some(parent) = cursor.and_then(|level| level.previous_priv.as_deref()) {
            // Guard against a parent cycle in a hand-written definition
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            cursor = self.levels.get(parent);
        }
        chain
    }

    /// Modes visited going from `from` to `to`, both included.
    pub fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let no_path = || -> Error {
            DriverError::NoPrivilegePath {
                from: from.to_string(),
                to: to.to_string(),
            }
            .into()
        };
        if !self.levels.contains_key(from) || !self.levels.contains_key(to) {
            return Err(no_path());
        }

        let up = self.lineage(from);
        let down = self.lineage(to);
        let Some((up_to, down_to)) = up
            .iter()
            .enumerate()
            .find_map(|(i, name)| down.iter().position(|n| n == name).map(|j| (i, j)))
        else {
            return Err(no_path());
        };

        Ok(up[..=up_to]
            .iter()
            .chain(down[..down_to].iter().rev())
            .map(|name| name.to_string())
            .collect())
    }

    /// The command moving between two adjacent modes, if they are adjacent.
    pub fn step(&self, from: &str, to: &str) -> Option<TransitionInfo> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.previous_priv.as_deref() == Some(from) {
            Some(TransitionInfo {
                target: to.to_string(),
                command: to_level.escalate_command.clone()?,
                auth_prompt: to_level.escalate_prompt.clone(),
            })
        } else if from_level.previous_priv.as_deref() == Some(to) {
            Some(TransitionInfo {
                target: to.to_string(),
                command: from_level.deescalate_command.clone()?,
                auth_prompt: None,
            })
        } else {
            None
        }
    }

    /// Commands that take the CLI from its current mode to `target`.
    /// Empty when already there.
    pub fn plan(&self, target: &str) -> Result<Vec<TransitionInfo>> {
        let current = self.current.as_deref().unwrap_or_default();
        let path = self.find_path(current, target)?;

        path.windows(2)
            .map(|pair| {
                self.step(&pair[0], &pair[1]).ok_or_else(|| {
                    DriverError::NoPrivilegePath {
                        from: pair[0].clone(),
                        to: pair[1].clone(),
                    }
                    .into()
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::vendors::cisco_ios;

    fn manager() -> PrivilegeManager {
        PrivilegeManager::new(cisco_ios::platform().privilege_levels)
    }

    #[test]
    fn test_prompt_to_level() {
        let manager = manager();
        let name = |prompt| manager.level_for_prompt(prompt).map(|l| l.name.clone()).ok();

        assert_eq!(name("sw1>").as_deref(), Some("exec"));
        assert_eq!(name("sw1#").as_deref(), Some("privilege_exec"));
        assert_eq!(name("sw1(config-if)#").as_deref(), Some("configuration"));
        assert_eq!(name("Password:"), None);
    }

    #[test]
    fn test_paths_through_the_tree() {
        let manager = manager();

        assert_eq!(
            manager.find_path("exec", "configuration").unwrap(),
            vec!["exec", "privilege_exec", "configuration"]
        );
        assert_eq!(
            manager.find_path("configuration", "exec").unwrap(),
            vec!["configuration", "privilege_exec", "exec"]
        );
        assert_eq!(manager.find_path("exec", "exec").unwrap(), vec!["exec"]);
        assert!(manager.find_path("", "exec").is_err());
    }

    #[test]
    fn test_sibling_modes_meet_at_parent() {
        let platform = cisco_ios::platform().with_privilege(
            PrivilegeLevel::new("tcl", r"\(tcl\)#\s*$")
                .unwrap()
                .with_parent("privilege_exec")
                .with_escalate("tclsh")
                .with_deescalate("tclquit"),
        );
        let manager = PrivilegeManager::new(platform.privilege_levels);

        assert_eq!(
            manager.find_path("configuration", "tcl").unwrap(),
            vec!["configuration", "privilege_exec", "tcl"]
        );
    }

    #[test]
    fn test_single_steps() {
        let manager = manager();

        let enable = manager.step("exec", "privilege_exec").unwrap();
        assert_eq!(enable.command, "enable");
        assert!(enable.auth_prompt.is_some());

        let end = manager.step("configuration", "privilege_exec").unwrap();
        assert_eq!(end.command, "end");
        assert!(end.auth_prompt.is_none());

        assert!(manager.step("exec", "configuration").is_none());
    }

    #[test]
    fn test_plan_from_observed_prompt() {
        let mut manager = manager();
        assert!(manager.plan("privilege_exec").is_err());

        assert_eq!(manager.observe_prompt("sw1>"), Some("exec"));
        let steps = manager.plan("configuration").unwrap();
        let commands: Vec<_> = steps.iter().map(|s| s.command.as_str()).collect();
        assert_eq!(commands, vec!["enable", "configure terminal"]);

        manager.observe_prompt("sw1#");
        assert!(manager.plan("privilege_exec").unwrap().is_empty());

        assert_eq!(manager.observe_prompt("Password:"), None);
        assert_eq!(manager.current_name(), Some("privilege_exec"));
    }
}
