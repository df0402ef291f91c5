use crate::error::Result;
use tracing::info;

use super::r#trait::Launcher;

pub struct DryRunLauncher;

impl DryRunLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Launcher for DryRunLauncher {
    async fn run_command(&self, command: &str, args: &[String]) -> Result<()> {
        info!("[DRY RUN] Запуск команды: {} {}", command, args.join(" "));
        Ok(())
    }
}
