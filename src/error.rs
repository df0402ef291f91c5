use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwitcherError {
    #[error("Ошибка загрузки конфигурации: {0}")]
    ConfigLoad(String),

    #[error("Ошибка определения оборудования: {0}")]
    HardwareProbe(String),

    #[error("Переключение оконного менеджера запрещено политикой")]
    SwitchRefused,

    #[error("Не удалось запустить оконный менеджер: {0}")]
    Launch(String),

    #[error("Не удалось настроить отслеживание дисплея: {0}")]
    DisplayWatch(String),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ошибка D-Bus: {0}")]
    DBus(#[from] zbus::Error),

    #[error("Не удалось подключиться к X11: {0}")]
    X11Connect(#[from] x11rb::errors::ConnectError),

    #[error("Соединение с X11 потеряно: {0}")]
    X11Connection(#[from] x11rb::errors::ConnectionError),

    #[error("Ошибка ответа X11: {0}")]
    X11Reply(#[from] x11rb::errors::ReplyError),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl SwitcherError {
    pub fn config_load<T>(msg: impl Into<String>) -> Result<T> {
        Err(SwitcherError::ConfigLoad(msg.into()))
    }
}

impl From<SwitcherError> for zbus::fdo::Error {
    fn from(err: SwitcherError) -> Self {
        zbus::fdo::Error::Failed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SwitcherError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! switcher_error {
    (launch, $($arg:tt)*) => {
        $crate::error::SwitcherError::Launch(format!($($arg)*))
    };
    (hardware_probe, $($arg:tt)*) => {
        $crate::error::SwitcherError::HardwareProbe(format!($($arg)*))
    };
    (display_watch, $($arg:tt)*) => {
        $crate::error::SwitcherError::DisplayWatch(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::SwitcherError::Internal(format!($($arg)*))
    };
}
