pub mod wm;

pub use wm::{OsdEvent, WindowManagerIdentity};

/// Сообщения очередей слушателей (X11 и StartupReady) для Switcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitcherEvent {
    /// Корневое окно объявило новый поддерживающий оконный менеджер
    WmObserved(WindowManagerIdentity),
    /// Свойство _NET_SUPPORTING_WM_CHECK удалено: процесс WM завершился
    WmLost,
    /// deepin-wm сообщил о готовности; имя исполняемого файла как есть
    StartupReady(String),
}

impl std::fmt::Display for SwitcherEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitcherEvent::WmObserved(wm) => write!(f, "WmObserved({})", wm),
            SwitcherEvent::WmLost => write!(f, "WmLost"),
            SwitcherEvent::StartupReady(name) => write!(f, "StartupReady({})", name),
        }
    }
}
