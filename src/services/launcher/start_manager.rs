use crate::error::Result;
use tracing::{debug, info};
use zbus::Connection;

use super::r#trait::Launcher;

#[zbus::proxy(
    default_service = "com.deepin.SessionManager",
    interface = "com.deepin.StartManager",
    default_path = "/com/deepin/StartManager"
)]
trait StartManager {
    /// Запустить команду от имени сессии
    fn run_command(&self, exe: &str, args: &[&str]) -> zbus::Result<()>;
}

pub struct StartManagerLauncher {
    connection: Connection,
}

impl StartManagerLauncher {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

#[async_trait::async_trait]
impl Launcher for StartManagerLauncher {
    async fn run_command(&self, command: &str, args: &[String]) -> Result<()> {
        info!("StartManager.RunCommand: {} {}", command, args.join(" "));

        let proxy = StartManagerProxy::new(&self.connection)
            .await
            .map_err(|e| crate::switcher_error!(launch, "StartManager недоступен: {}", e))?;

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        proxy
            .run_command(command, &args)
            .await
            .map_err(|e| crate::switcher_error!(launch, "RunCommand {} завершился ошибкой: {}", command, e))?;

        debug!("StartManager принял команду {}", command);
        Ok(())
    }
}
