use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Каталог данных переключателя внутри пользовательского конфига
const USER_CONFIG_SUBDIR: &str = "deepin/deepin-wm-switcher";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    pub launcher: LauncherConfig,
    pub watcher: WatcherConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    /// Политика администратора (allow_switch)
    pub system_config: PathBuf,
    /// Последний выбранный пользователем оконный менеджер
    pub user_config: PathBuf,
    /// Снимок видеокарт для обнаружения смены оборудования
    pub card_cache: PathBuf,
    /// Файл окружения, создаваемый для ограниченной платформы
    pub platform_env: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LauncherConfig {
    /// Переопределение окружения, передаваемое `env` перед исполняемым файлом
    pub env_token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    pub enabled: bool,
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        let user_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(USER_CONFIG_SUBDIR);

        Self {
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            paths: PathsConfig {
                system_config: PathBuf::from("/etc/deepin-wm-switcher/config.json"),
                user_config: user_dir.join("config.json"),
                card_cache: user_dir.join("card_infos.json"),
                platform_env: user_dir.join("platform.env"),
            },
            launcher: LauncherConfig {
                env_token: "GDK_SCALE=1".to_string(),
            },
            watcher: WatcherConfig {
                enabled: true,
                queue_capacity: 10,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WM_SWITCHER_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        // Валидация путей
        let paths = [
            ("system_config", &self.paths.system_config),
            ("user_config", &self.paths.user_config),
            ("card_cache", &self.paths.card_cache),
            ("platform_env", &self.paths.platform_env),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                anyhow::bail!("Пустой путь в paths.{}", name);
            }
        }

        if self.launcher.env_token.trim().is_empty() {
            anyhow::bail!("launcher.env_token не может быть пустым");
        }

        if self.watcher.queue_capacity == 0 {
            anyhow::bail!("watcher.queue_capacity должно быть больше 0");
        }

        Ok(())
    }
}
