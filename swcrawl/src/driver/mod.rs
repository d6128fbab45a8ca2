//! Interactive CLI driver for one switch.
//!
//! [`GenericDriver`] owns the transport and the shell channel, tracks which
//! privilege level the device is at, and turns raw shell output into
//! [`Response`]s. The crawler and the config workflow reach it through
//! [`crate::session::DeviceSession`]; [`Driver`] is the direct interface for
//! ad-hoc command runs.

mod builder;
mod generic;
mod privilege;
pub(crate) mod response;

pub use builder::DriverBuilder;
pub use generic::GenericDriver;
pub use privilege::{PrivilegeManager, TransitionInfo};
pub use response::Response;

use std::future::Future;

use crate::error::Result;

/// Level entered by `configure terminal`.
pub(crate) const CONFIG_PRIVILEGE: &str = "configuration";

/// A connected, prompt-aware CLI.
pub trait Driver: Send + Sync {
    /// Connect, log in and wait for the first prompt.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run one command at the current level.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Run `commands` in order, stopping at the first transport error.
    ///
    /// A command the device rejects still yields a [`Response`] with
    /// `failure_message` set.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for command in commands {
                responses.push(self.send_command(command).await?);
            }
            Ok(responses)
        }
    }

    /// Enter configuration mode, run `commands`, then drop back to the
    /// platform's default level.
    ///
    /// ```rust,no_run
    /// use swcrawl::driver::Driver;
    ///
    /// # async fn example(driver: &mut impl Driver) -> Result<(), swcrawl::Error> {
    /// driver
    ///     .send_config(&["interface Gi1/0/12", "switchport access vlan 20"])
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    fn send_config(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send;

    /// Move to the named level, escalating or de-escalating as needed.
    fn acquire_privilege(&mut self, privilege: &str) -> impl Future<Output = Result<()>> + Send;

    fn is_open(&self) -> bool;

    /// `false` once the device or the keepalive has dropped the session.
    fn is_alive(&self) -> bool;

    /// Name of the level the last prompt matched.
    fn current_privilege(&self) -> Option<&str>;
}
