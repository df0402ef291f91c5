use serde::{Deserialize, Serialize};
use std::fmt;

const RICH_WM_EXECUTABLE: &str = "deepin-wm";
const LIGHT_WM_EXECUTABLE: &str = "deepin-metacity";

/// Какой оконный менеджер запущен или выбран
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowManagerIdentity {
    /// deepin-wm (3D, композитный)
    #[serde(rename = "deepin-wm")]
    Rich,
    /// deepin-metacity (2D)
    #[serde(rename = "deepin-metacity")]
    Light,
    #[serde(rename = "unknown")]
    Unknown,
}

impl WindowManagerIdentity {
    /// Сопоставление имени из _NET_WM_NAME с оконным менеджером
    pub fn from_wm_name(wm_name: &str) -> Self {
        if wm_name == "Metacity" {
            WindowManagerIdentity::Light
        } else if wm_name.contains("DeepinGala") {
            WindowManagerIdentity::Rich
        } else {
            WindowManagerIdentity::Unknown
        }
    }

    /// Сопоставление имени исполняемого файла (сигнал StartupReady)
    pub fn from_executable(name: &str) -> Self {
        match name {
            RICH_WM_EXECUTABLE => WindowManagerIdentity::Rich,
            LIGHT_WM_EXECUTABLE => WindowManagerIdentity::Light,
            _ => WindowManagerIdentity::Unknown,
        }
    }

    pub fn executable(&self) -> Option<&'static str> {
        match self {
            WindowManagerIdentity::Rich => Some(RICH_WM_EXECUTABLE),
            WindowManagerIdentity::Light => Some(LIGHT_WM_EXECUTABLE),
            WindowManagerIdentity::Unknown => None,
        }
    }

    /// Человекочитаемое имя; у Unknown его нет
    pub fn label(&self) -> Option<&'static str> {
        match self {
            WindowManagerIdentity::Rich => Some("deepin wm"),
            WindowManagerIdentity::Light => Some("deepin metacity"),
            WindowManagerIdentity::Unknown => None,
        }
    }

    /// Куда переключаться из текущего состояния.
    /// Без наблюдений (Unknown) целью считается Rich.
    pub fn toggle_target(&self) -> Self {
        match self {
            WindowManagerIdentity::Rich => WindowManagerIdentity::Light,
            WindowManagerIdentity::Light | WindowManagerIdentity::Unknown => {
                WindowManagerIdentity::Rich
            }
        }
    }
}

impl fmt::Display for WindowManagerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable().unwrap_or("unknown"))
    }
}

/// Уведомления на экране (OSD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsdEvent {
    Switch2D,
    Switch3D,
    SwitchError,
}

impl OsdEvent {
    /// Имя, которое понимает com.deepin.dde.osd
    pub fn wire_name(&self) -> &'static str {
        match self {
            OsdEvent::Switch2D => "SwitchWM2D",
            OsdEvent::Switch3D => "SwitchWM3D",
            OsdEvent::SwitchError => "SwitchWMError",
        }
    }

    /// OSD, объявляющее о запуске данного оконного менеджера
    pub fn for_startup(wm: WindowManagerIdentity) -> Option<Self> {
        match wm {
            WindowManagerIdentity::Rich => Some(OsdEvent::Switch3D),
            WindowManagerIdentity::Light => Some(OsdEvent::Switch2D),
            WindowManagerIdentity::Unknown => None,
        }
    }
}
