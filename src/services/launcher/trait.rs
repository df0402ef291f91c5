use crate::error::Result;
use std::sync::Arc;
use zbus::Connection;

/// Trait for launchers that run a command through the session supervisor
#[async_trait::async_trait]
pub trait Launcher: Send + Sync {
    /// Run `command` with `args`; returns once the supervisor accepted the request
    async fn run_command(&self, command: &str, args: &[String]) -> Result<()>;
}

/// Factory function: a D-Bus StartManager launcher when a session connection
/// is available, the logging dry-run launcher otherwise
pub fn create_launcher(connection: Option<Connection>) -> Arc<dyn Launcher> {
    match connection {
        Some(connection) => Arc::new(super::start_manager::StartManagerLauncher::new(connection)),
        None => Arc::new(super::dry_run::DryRunLauncher::new()),
    }
}
