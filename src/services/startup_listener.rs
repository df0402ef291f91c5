use crate::error::Result;
use crate::events::SwitcherEvent;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zbus::Connection;

#[zbus::proxy(
    default_service = "com.deepin.wm",
    interface = "com.deepin.wm",
    default_path = "/com/deepin/wm"
)]
trait DeepinWm {
    /// Оконный менеджер сообщает, что он запущен и готов
    #[zbus(signal)]
    fn startup_ready(&self, wm_name: &str) -> zbus::Result<()>;
}

/// Слушатель сигнала StartupReady от com.deepin.wm
pub struct StartupListener {
    connection: Connection,
    events: mpsc::Sender<SwitcherEvent>,
}

impl StartupListener {
    pub fn new(connection: Connection, events: mpsc::Sender<SwitcherEvent>) -> Self {
        Self { connection, events }
    }

    pub async fn run(self) -> Result<()> {
        let proxy = DeepinWmProxy::new(&self.connection).await?;
        let mut signals = proxy.receive_startup_ready().await?;
        info!("Подписка на com.deepin.wm StartupReady установлена");

        while let Some(signal) = signals.next().await {
            let wm_name = match signal.args() {
                Ok(args) => args.wm_name().to_string(),
                Err(e) => {
                    warn!("Не удалось разобрать сигнал StartupReady: {}", e);
                    continue;
                }
            };
            debug!("StartupReady: {}", wm_name);

            if self.events.send(SwitcherEvent::StartupReady(wm_name)).await.is_err() {
                info!("Очередь событий закрыта, слушатель StartupReady остановлен");
                break;
            }
        }

        Ok(())
    }
}
