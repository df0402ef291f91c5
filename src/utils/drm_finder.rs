use crate::error::{Result, SwitcherError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// PCI vendor id AMD/ATI
pub const AMD_VENDOR_ID: &str = "0x1002";

/// Видеокарта из /sys/class/drm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrmCard {
    pub name: String,
    pub vendor: String,
    pub device: String,
    pub driver: Option<String>,
}

pub struct DrmFinder {
    sysfs_root: PathBuf,
}

impl Default for DrmFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl DrmFinder {
    pub fn new() -> Self {
        Self::with_root("/sys")
    }

    pub fn with_root<P: Into<PathBuf>>(sysfs_root: P) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
        }
    }

    /// Найти все DRM карты (card0, card1, ...), без коннекторов вида card0-HDMI-A-1
    pub fn find_cards(&self) -> Result<Vec<DrmCard>> {
        let drm_dir = self.sysfs_root.join("class/drm");

        let entries = fs::read_dir(&drm_dir).map_err(|e| {
            SwitcherError::HardwareProbe(format!("Нет доступа к {}: {}", drm_dir.display(), e))
        })?;

        let mut cards = Vec::new();

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let name = path.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("");

            if !Self::is_card_name(name) {
                continue;
            }

            let device_dir = path.join("device");
            let card = DrmCard {
                name: name.to_string(),
                vendor: read_trimmed(&device_dir.join("vendor")).unwrap_or_default(),
                device: read_trimmed(&device_dir.join("device")).unwrap_or_default(),
                driver: Self::driver_name(&device_dir),
            };
            debug!("Найдена DRM карта: {:?}", card);
            cards.push(card);
        }

        // Сортируем по имени, чтобы порядок не зависел от read_dir
        cards.sort_by(|a, b| a.name.cmp(&b.name));

        info!("Обнаружено DRM карт: {}", cards.len());
        Ok(cards)
    }

    /// Vendor id всех PCI устройств класса "display controller" (0x03xxxx)
    pub fn find_display_pci_vendors(&self) -> Result<Vec<String>> {
        let pci_dir = self.sysfs_root.join("bus/pci/devices");

        let entries = fs::read_dir(&pci_dir).map_err(|e| {
            SwitcherError::HardwareProbe(format!("Нет доступа к {}: {}", pci_dir.display(), e))
        })?;

        let mut vendors = Vec::new();

        for entry in entries {
            let path = entry?.path();

            let Some(class) = read_trimmed(&path.join("class")) else {
                continue;
            };
            if !class.starts_with("0x03") {
                continue;
            }

            if let Some(vendor) = read_trimmed(&path.join("vendor")) {
                debug!("Видеоустройство PCI {}: vendor {}", path.display(), vendor);
                vendors.push(vendor);
            }
        }

        Ok(vendors)
    }

    fn is_card_name(name: &str) -> bool {
        name.strip_prefix("card")
            .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false)
    }

    fn driver_name(device_dir: &Path) -> Option<String> {
        let target = fs::read_link(device_dir.join("driver")).ok()?;
        target.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string())
    }
}

/// Прочитать файл sysfs и обрезать перевод строки
pub fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    /// Собрать фейковое дерево sysfs с одной картой
    pub(crate) fn add_card(root: &Path, name: &str, vendor: &str, device: &str, driver: Option<&str>) {
        let device_dir = root.join("class/drm").join(name).join("device");
        fs::create_dir_all(&device_dir).unwrap();
        fs::write(device_dir.join("vendor"), format!("{}\n", vendor)).unwrap();
        fs::write(device_dir.join("device"), format!("{}\n", device)).unwrap();
        if let Some(driver) = driver {
            let driver_dir = root.join("bus/pci/drivers").join(driver);
            fs::create_dir_all(&driver_dir).unwrap();
            symlink(&driver_dir, device_dir.join("driver")).unwrap();
        }
    }

    pub(crate) fn add_pci_device(root: &Path, slot: &str, class: &str, vendor: &str) {
        let dir = root.join("bus/pci/devices").join(slot);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("class"), format!("{}\n", class)).unwrap();
        fs::write(dir.join("vendor"), format!("{}\n", vendor)).unwrap();
    }

    #[test]
    fn test_find_cards_skips_connectors() {
        let root = tempfile::tempdir().unwrap();
        add_card(root.path(), "card1", "0x10de", "0x1c82", Some("nouveau"));
        add_card(root.path(), "card0", "0x8086", "0x5917", Some("i915"));
        fs::create_dir_all(root.path().join("class/drm/card0-HDMI-A-1")).unwrap();
        fs::create_dir_all(root.path().join("class/drm/renderD128")).unwrap();

        let cards = DrmFinder::with_root(root.path()).find_cards().unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].name, "card0");
        assert_eq!(cards[0].vendor, "0x8086");
        assert_eq!(cards[0].driver.as_deref(), Some("i915"));
        assert_eq!(cards[1].driver.as_deref(), Some("nouveau"));
    }

    #[test]
    fn test_card_without_driver() {
        let root = tempfile::tempdir().unwrap();
        add_card(root.path(), "card0", "0x1002", "0x6779", None);

        let cards = DrmFinder::with_root(root.path()).find_cards().unwrap();
        assert_eq!(cards[0].driver, None);
    }

    #[test]
    fn test_missing_drm_dir_is_error() {
        let root = tempfile::tempdir().unwrap();
        let result = DrmFinder::with_root(root.path()).find_cards();
        assert!(matches!(result, Err(SwitcherError::HardwareProbe(_))));
    }

    #[test]
    fn test_display_pci_vendors() {
        let root = tempfile::tempdir().unwrap();
        add_pci_device(root.path(), "0000:01:00.0", "0x030000", AMD_VENDOR_ID);
        add_pci_device(root.path(), "0000:00:1f.3", "0x040300", "0x8086");

        let vendors = DrmFinder::with_root(root.path()).find_display_pci_vendors().unwrap();
        assert_eq!(vendors, vec![AMD_VENDOR_ID.to_string()]);
    }
}
