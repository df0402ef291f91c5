use crate::error::{Result, SwitcherError};
use crate::events::WindowManagerIdentity;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Политика администратора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SystemConfig {
    pub allow_switch: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self { allow_switch: true }
    }
}

/// Выбор пользователя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserConfig {
    pub last_wm: WindowManagerIdentity,
    pub wait: bool,
}

impl UserConfig {
    /// Значение по умолчанию по результату проверки возможностей
    pub fn for_capability(rich_supported: bool) -> Self {
        let last_wm = if rich_supported {
            WindowManagerIdentity::Rich
        } else {
            WindowManagerIdentity::Light
        };
        Self { last_wm, wait: true }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self::for_capability(false)
    }
}

/// Хранилище системной и пользовательской конфигурации
pub trait ConfigStore: Send + Sync {
    fn load_system_config(&self) -> Result<SystemConfig>;
    fn load_user_config(&self) -> Result<UserConfig>;
    fn save_user_config(&self, config: &UserConfig) -> Result<()>;
}

/// JSON файлы на диске
pub struct FileConfigStore {
    system_path: PathBuf,
    user_path: PathBuf,
    /// Сохранения идут через общий временный файл и не должны пересекаться
    save_lock: Mutex<()>,
}

impl FileConfigStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(system_path: P, user_path: Q) -> Self {
        Self {
            system_path: system_path.into(),
            user_path: user_path.into(),
            save_lock: Mutex::new(()),
        }
    }
}

impl ConfigStore for FileConfigStore {
    fn load_system_config(&self) -> Result<SystemConfig> {
        load_json(&self.system_path)
    }

    fn load_user_config(&self) -> Result<UserConfig> {
        let config: UserConfig = load_json(&self.user_path)?;
        if config.last_wm == WindowManagerIdentity::Unknown {
            return SwitcherError::config_load(format!(
                "{}: last_wm не указывает на оконный менеджер",
                self.user_path.display()
            ));
        }
        Ok(config)
    }

    fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let _guard = self.save_lock.lock();
        save_json(&self.user_path, config)
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        SwitcherError::ConfigLoad(format!("Не удалось прочитать {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        SwitcherError::ConfigLoad(format!("Не удалось разобрать {}: {}", path.display(), e))
    })
}

/// Запись через временный файл и rename, документ не бывает записан наполовину
pub(crate) fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_vec_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path)?;

    debug!("Сохранён файл {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> FileConfigStore {
        FileConfigStore::new(dir.join("system.json"), dir.join("user/config.json"))
    }

    #[test]
    fn test_user_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let config = UserConfig {
            last_wm: WindowManagerIdentity::Rich,
            wait: false,
        };
        store.save_user_config(&config).unwrap();

        let raw = fs::read_to_string(dir.path().join("user/config.json")).unwrap();
        assert!(raw.contains("\"deepin-wm\""));
        assert!(!dir.path().join("user/config.json.tmp").exists());

        assert_eq!(store.load_user_config().unwrap(), config);
    }

    #[test]
    fn test_concurrent_saves_leave_complete_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        std::thread::scope(|scope| {
            for i in 0..8 {
                let store = &store;
                scope.spawn(move || {
                    let last_wm = if i % 2 == 0 {
                        WindowManagerIdentity::Rich
                    } else {
                        WindowManagerIdentity::Light
                    };
                    for _ in 0..25 {
                        store.save_user_config(&UserConfig { last_wm, wait: i % 3 == 0 }).unwrap();
                    }
                });
            }
        });

        let config = store.load_user_config().unwrap();
        assert_ne!(config.last_wm, WindowManagerIdentity::Unknown);
        assert!(!dir.path().join("user/config.json.tmp").exists());
    }

    #[test]
    fn test_missing_user_config_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = store_in(dir.path()).load_user_config();
        assert!(matches!(result, Err(SwitcherError::ConfigLoad(_))));
    }

    #[test]
    fn test_unknown_last_wm_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("user")).unwrap();
        fs::write(
            dir.path().join("user/config.json"),
            r#"{"last_wm": "unknown", "wait": true}"#,
        )
        .unwrap();

        let result = store_in(dir.path()).load_user_config();
        assert!(matches!(result, Err(SwitcherError::ConfigLoad(_))));
    }

    #[test]
    fn test_system_config_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("system.json"), r#"{"allow_switch": false}"#).unwrap();

        let config = store_in(dir.path()).load_system_config().unwrap();
        assert!(!config.allow_switch);
    }

    #[test]
    fn test_default_for_capability() {
        assert_eq!(
            UserConfig::for_capability(true),
            UserConfig { last_wm: WindowManagerIdentity::Rich, wait: true }
        );
        assert_eq!(
            UserConfig::for_capability(false),
            UserConfig { last_wm: WindowManagerIdentity::Light, wait: true }
        );
    }
}
