//! Capability prober: decides whether deepin-wm (the composited WM) is safe
//! to run on this machine.
//!
//! The decision is recomputed on every call. Remembering hardware between
//! sessions is the job of `card_cache`, not of this module.

use crate::error::{Result, SwitcherError};
use crate::utils::drm_finder::AMD_VENDOR_ID;
use crate::utils::DrmFinder;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// DRM драйверы эмулируемых видеоадаптеров виртуальных машин
const EMULATED_DRIVERS: &[&str] = &["cirrus", "bochs-drm", "bochs", "vboxvideo", "qxl"];

/// Архитектура с ограниченной графикой
const CONSTRAINED_ARCH: &str = "sw_64";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Constrained,
    Standard,
}

/// Видеоокружение сессии
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoEnv {
    /// Результат systemd-detect-virt, None на железе
    pub virtualization: Option<String>,
    /// Драйверы DRM карт
    pub drivers: Vec<String>,
    /// LIBGL_ALWAYS_SOFTWARE включён
    pub software_rendering: bool,
}

/// Факты о платформе, на которых строится решение
pub trait PlatformProbe: Send + Sync {
    fn platform(&self) -> Result<Platform>;
    fn discrete_gpu_present(&self) -> bool;
    fn driver_loaded_correctly(&self) -> bool;
    fn video_env(&self) -> Result<VideoEnv>;
    /// Однократная настройка окружения ограниченной платформы
    fn setup_constrained_platform(&self);
}

pub struct CapabilityProber {
    probe: Arc<dyn PlatformProbe>,
}

impl CapabilityProber {
    pub fn new(probe: Arc<dyn PlatformProbe>) -> Self {
        Self { probe }
    }

    /// Можно ли запускать deepin-wm
    pub fn support_run_good_wm(&self) -> bool {
        let mut support = true;

        if let Ok(Platform::Constrained) = self.probe.platform() {
            if !self.probe.discrete_gpu_present() {
                info!("Ограниченная платформа без дискретной видеокарты AMD");
                support = false;
                self.probe.setup_constrained_platform();
            }
        }

        if !self.probe.driver_loaded_correctly() {
            warn!("Видеодрайвер загружен некорректно, deepin-wm не поддерживается");
            return false;
        }

        match self.probe.video_env() {
            Ok(env) => {
                debug!("Видеоокружение: {:?}", env);
                support = apply_video_env_rule(&env, support);
            }
            Err(e) => debug!("Видеоокружение не определено: {}", e),
        }

        info!("Поддержка deepin-wm: {}", support);
        support
    }
}

/// Поправка решения по видеоокружению
pub fn apply_video_env_rule(env: &VideoEnv, support: bool) -> bool {
    if !support {
        return false;
    }

    if env.software_rendering {
        return false;
    }

    // ВМ без ускорения: все карты на эмулируемых драйверах
    let only_emulated = !env.drivers.is_empty()
        && env.drivers.iter().all(|d| EMULATED_DRIVERS.contains(&d.as_str()));
    if env.virtualization.is_some() && only_emulated {
        return false;
    }

    support
}

/// Реальные проверки через sysfs и системные утилиты
pub struct SysfsPlatformProbe {
    finder: DrmFinder,
    platform_env: PathBuf,
}

impl SysfsPlatformProbe {
    pub fn new(finder: DrmFinder, platform_env: PathBuf) -> Self {
        Self { finder, platform_env }
    }

    fn detect_virtualization() -> Option<String> {
        let output = Command::new("systemd-detect-virt").output().ok()?;
        let virt = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // При отсутствии виртуализации утилита печатает "none" и завершается с ошибкой
        if virt.is_empty() || virt == "none" {
            None
        } else {
            Some(virt)
        }
    }
}

impl PlatformProbe for SysfsPlatformProbe {
    fn platform(&self) -> Result<Platform> {
        let output = Command::new("uname").arg("-m").output()?;
        if !output.status.success() {
            return Err(crate::switcher_error!(hardware_probe, "uname -m завершился с ошибкой"));
        }

        let arch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Архитектура: {}", arch);
        Ok(if arch == CONSTRAINED_ARCH {
            Platform::Constrained
        } else {
            Platform::Standard
        })
    }

    fn discrete_gpu_present(&self) -> bool {
        match self.finder.find_display_pci_vendors() {
            Ok(vendors) => vendors.iter().any(|v| v == AMD_VENDOR_ID),
            Err(e) => {
                warn!("Не удалось перечислить PCI устройства: {}", e);
                false
            }
        }
    }

    fn driver_loaded_correctly(&self) -> bool {
        match self.finder.find_cards() {
            Ok(cards) => !cards.is_empty() && cards.iter().all(|c| c.driver.is_some()),
            Err(e) => {
                warn!("Не удалось перечислить DRM карты: {}", e);
                false
            }
        }
    }

    fn video_env(&self) -> Result<VideoEnv> {
        let drivers = self.finder.find_cards()?
            .into_iter()
            .filter_map(|c| c.driver)
            .collect();

        let software_rendering = std::env::var("LIBGL_ALWAYS_SOFTWARE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(VideoEnv {
            virtualization: Self::detect_virtualization(),
            drivers,
            software_rendering,
        })
    }

    fn setup_constrained_platform(&self) {
        if self.platform_env.exists() {
            debug!("Окружение платформы уже настроено: {}", self.platform_env.display());
            return;
        }

        let result: Result<()> = (|| {
            if let Some(parent) = self.platform_env.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.platform_env, "LIBGL_ALWAYS_SOFTWARE=1\n")
                .map_err(SwitcherError::Io)
        })();

        match result {
            Ok(()) => info!("Записано окружение платформы: {}", self.platform_env.display()),
            Err(e) => warn!("Не удалось настроить окружение платформы: {}", e),
        }
    }
}
