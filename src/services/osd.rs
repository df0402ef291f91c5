use crate::error::Result;
use crate::events::{OsdEvent, WindowManagerIdentity};
use tracing::{info, warn};
use zbus::Connection;

#[zbus::proxy(
    default_service = "com.deepin.dde.osd",
    interface = "com.deepin.dde.osd",
    default_path = "/"
)]
trait Osd {
    #[zbus(name = "ShowOSD")]
    fn show_osd(&self, name: &str) -> zbus::Result<()>;
}

/// Показ уведомлений на экране, без ожидания результата
pub trait OsdSink: Send + Sync {
    fn show(&self, event: OsdEvent);
}

/// OSD через com.deepin.dde.osd
pub struct DBusOsd {
    connection: Connection,
}

impl DBusOsd {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }
}

impl OsdSink for DBusOsd {
    fn show(&self, event: OsdEvent) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Нет tokio runtime для показа OSD {}: {}", event.wire_name(), e);
                return;
            }
        };

        let connection = self.connection.clone();
        handle.spawn(async move {
            let result = async {
                let proxy = OsdProxy::new(&connection).await?;
                proxy.show_osd(event.wire_name()).await
            }
            .await;

            if let Err(e) = result {
                warn!("Не удалось показать OSD {}: {}", event.wire_name(), e);
            }
        });
    }
}

/// OSD только в лог (dry-run)
pub struct LogOsd;

impl OsdSink for LogOsd {
    fn show(&self, event: OsdEvent) {
        info!("[DRY RUN] OSD: {}", event.wire_name());
    }
}

/// Косметическая подстройка окружения после успешного переключения.
/// Ошибки не влияют на результат переключения.
pub trait PostSwitchHook: Send + Sync {
    fn after_switch(&self, effective_wm: WindowManagerIdentity) -> Result<()>;
}

/// Подстройка скинов метода ввода не входит в этот сервис
pub struct NoopPostSwitchHook;

impl PostSwitchHook for NoopPostSwitchHook {
    fn after_switch(&self, _effective_wm: WindowManagerIdentity) -> Result<()> {
        Ok(())
    }
}
