use crate::error::Result;
use crate::services::config_store::{load_json, save_json};
use crate::utils::{DrmCard, DrmFinder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Идентификация одной видеокарты
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CardInfo {
    pub name: String,
    pub vendor: String,
    pub device: String,
    pub driver: String,
}

impl From<DrmCard> for CardInfo {
    fn from(card: DrmCard) -> Self {
        Self {
            name: card.name,
            vendor: card.vendor,
            device: card.device,
            driver: card.driver.unwrap_or_default(),
        }
    }
}

/// Снимок видеокарт машины
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CardInfos {
    pub cards: Vec<CardInfo>,
}

impl CardInfos {
    pub fn new(mut cards: Vec<CardInfo>) -> Self {
        cards.sort_by(|a, b| a.name.cmp(&b.name));
        Self { cards }
    }
}

/// Каноническая строка: карты по имени, порядок перечисления не важен
impl fmt::Display for CardInfos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cards: Vec<&CardInfo> = self.cards.iter().collect();
        cards.sort_by(|a, b| a.name.cmp(&b.name));

        for (i, card) in cards.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}:{}:{}:{}", card.name, card.vendor, card.device, card.driver)?;
        }
        Ok(())
    }
}

/// Источник текущего снимка оборудования
pub trait CardSource: Send + Sync {
    fn card_infos(&self) -> Result<CardInfos>;
}

pub struct SysfsCardSource {
    finder: DrmFinder,
}

impl SysfsCardSource {
    pub fn new(finder: DrmFinder) -> Self {
        Self { finder }
    }
}

impl CardSource for SysfsCardSource {
    fn card_infos(&self) -> Result<CardInfos> {
        let cards = self.finder.find_cards()?;
        if cards.is_empty() {
            return Err(crate::switcher_error!(hardware_probe, "DRM карты не найдены"));
        }
        Ok(CardInfos::new(cards.into_iter().map(CardInfo::from).collect()))
    }
}

/// Сравнение текущих видеокарт с сохранённым снимком
pub struct CardInfoCache {
    source: Box<dyn CardSource>,
    cache_path: PathBuf,
}

impl CardInfoCache {
    pub fn new(source: Box<dyn CardSource>, cache_path: PathBuf) -> Self {
        Self { source, cache_path }
    }

    /// true, если оборудование изменилось или снимка ещё нет.
    /// При изменении новый снимок записывается на диск.
    pub fn is_changed(&self) -> bool {
        let actual = match self.source.card_infos() {
            Ok(infos) => infos,
            Err(e) => {
                warn!("Не удалось получить информацию о видеокартах: {}", e);
                return true;
            }
        };
        let actual_str = actual.to_string();
        debug!("Текущие видеокарты: {}", actual_str);

        let changed = match load_json::<CardInfos>(&self.cache_path) {
            Ok(cached) => {
                let cached_str = cached.to_string();
                debug!("Сохранённые видеокарты: {}", cached_str);
                actual_str != cached_str
            }
            Err(e) => {
                warn!("Не удалось загрузить снимок видеокарт: {}", e);
                true
            }
        };

        if changed {
            info!("Видеокарты изменились, обновляем снимок {}", self.cache_path.display());
            if let Err(e) = save_json(&self.cache_path, &actual) {
                warn!("Не удалось сохранить снимок видеокарт: {}", e);
            }
        }

        changed
    }
}
