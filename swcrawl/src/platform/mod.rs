//! Platform definitions.
//!
//! A platform describes a CLI dialect: prompt patterns, privilege levels,
//! failure strings and session setup commands.

mod definition;
mod privilege_level;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
