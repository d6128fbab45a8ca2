//! Cisco IOS and IOS-XE, as found on Catalyst access and distribution
//! switches.
//!
//! ```text
//! idf-2-sw1>                user exec      (exec)
//! idf-2-sw1#                privileged     (privilege_exec)
//! idf-2-sw1(config)#        configuration
//! idf-2-sw1(config-if)#     configuration, interface sub-mode
//! ```
//!
//! `enable` and `disable` move between the first two; `configure terminal`
//! and `end` between the last two. Sub-modes are treated as plain
//! configuration since `end` leaves all of them at once.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

pub const NAME: &str = "cisco_ios";

/// Prompt patterns are multi-line so they can match the last line of a
/// whole read. Hostname classes are ASCII: Unicode `\w` repeated 63 times
/// in three alternatives exceeds the regex size limit.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[A-Za-z0-9_.\-@()/:]{1,63}>\s?$").unwrap();

    let privilege_exec =
        PrivilegeLevel::new("privilege_exec", r"(?mi)^[A-Za-z0-9_.\-@()/:]{1,63}#\s?$")
            .unwrap()
            .with_parent("exec")
            .with_escalate("enable")
            .with_deescalate("disable")
            .with_auth(r"(?mi)^password:\s?$")
            .unwrap()
            .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[A-Za-z0-9_.\-@/:]{1,63}\(config[A-Za-z0-9_.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end");

    PlatformDefinition::new(NAME)
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unknown command")
        .with_failure_pattern("% Bad mask")
        .with_failure_pattern("% Error")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_on_close_command("exit")
        .with_terminal_size(511, 24)
}
