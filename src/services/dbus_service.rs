//! com.deepin.WMSwitcher D-Bus interface
//!
//! Thin adapter: every method delegates to `Switcher`, the `WMChanged`
//! signal is fed from the Switcher's broadcast channel.

use crate::error::Result;
use crate::services::switcher::Switcher;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use zbus::object_server::SignalEmitter;
use zbus::{fdo, interface, Connection};

pub const SWITCHER_BUS_NAME: &str = "com.deepin.WMSwitcher";
pub const SWITCHER_PATH: &str = "/com/deepin/WMSwitcher";

pub struct SwitcherService {
    switcher: Arc<Switcher>,
}

impl SwitcherService {
    pub fn new(switcher: Arc<Switcher>) -> Self {
        Self { switcher }
    }
}

#[interface(name = "com.deepin.WMSwitcher")]
impl SwitcherService {
    /// Текущий оконный менеджер
    #[zbus(name = "CurrentWM")]
    async fn current_wm(&self) -> String {
        self.switcher.current_wm_label()
    }

    /// Перезапустить последний оконный менеджер
    #[zbus(name = "RestartWM")]
    async fn restart_wm(&self) -> fdo::Result<()> {
        Ok(self.switcher.restart_last_wm().await?)
    }

    /// Запуск 2D оконного менеджера без --replace (watchdog сессии)
    #[zbus(name = "Start2DWM")]
    async fn start_2d_wm(&self) -> fdo::Result<()> {
        Ok(self.switcher.start_light_wm_only().await?)
    }

    /// Переключить оконный менеджер
    #[zbus(name = "RequestSwitchWM")]
    async fn request_switch_wm(&self) -> fdo::Result<()> {
        Ok(self.switcher.request_switch().await?)
    }

    #[zbus(signal, name = "WMChanged")]
    async fn wm_changed(emitter: &SignalEmitter<'_>, wm_name: &str) -> zbus::Result<()>;
}

/// Зарегистрировать объект и занять имя на сессионной шине
pub async fn serve(switcher: Arc<Switcher>) -> Result<Connection> {
    let connection = zbus::connection::Builder::session()?
        .name(SWITCHER_BUS_NAME)?
        .serve_at(SWITCHER_PATH, SwitcherService::new(switcher))?
        .build()
        .await?;

    info!("D-Bus интерфейс {} зарегистрирован на {}", SWITCHER_BUS_NAME, SWITCHER_PATH);
    Ok(connection)
}

/// Пересылать смены оконного менеджера в сигнал WMChanged
pub async fn forward_wm_changed(
    connection: Connection,
    mut changes: broadcast::Receiver<String>,
) -> Result<()> {
    let emitter = SignalEmitter::new(&connection, SWITCHER_PATH)?;

    loop {
        match changes.recv().await {
            Ok(label) => {
                debug!("WMChanged: {}", label);
                if let Err(e) = SwitcherService::wm_changed(&emitter, &label).await {
                    warn!("Не удалось отправить сигнал WMChanged: {}", e);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Пропущено {} уведомлений WMChanged", skipped);
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
