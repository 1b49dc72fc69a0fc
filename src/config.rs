use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub logging: LoggingConfig,
    pub bridge: BridgeConfig,
    pub watcher: WatcherConfig,
    pub poller: PollerConfig,
    pub paster: PasterConfig,
    // Оптимизационные индексы - не сериализуются, строятся после загрузки
    #[serde(skip)]
    markers_lower: Vec<String>, // Предварительно нормализованные маркеры имени
    #[serde(skip)]
    extensions_lower: HashSet<String>, // O(1) lookup для расширений
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Флаги, которыми управляет внешний слой настроек
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    pub enabled: bool,
    pub auto_paste: bool,
    pub listen_clipboard: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatcherConfig {
    /// Наблюдаемая директория; None - наблюдение за файлами выключено
    pub directory: Option<String>,
    pub debounce_ms: u64,
    pub readiness_attempts: u32,
    pub readiness_interval_ms: u64,
    /// Подстроки имени файла (без расширения), по которым файл считается скриншотом
    pub name_markers: Vec<String>,
    /// Допустимые расширения файлов
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollerConfig {
    pub interval_ms: u64,
    /// Сколько тиков ждать, пока поколение буфера обмена "дозреет" до изображения
    pub retry_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasterConfig {
    /// Идентификатор целевого приложения (класс окна / имя команды)
    pub target_app: Option<String>,
    /// Фиксированные пути установки, если приложение не запущено
    pub fallback_paths: Vec<String>,
    pub gesture_timeout_ms: u64,
    pub gesture_poll_ms: u64,
    pub ui_close_timeout_ms: u64,
    pub focus_attempts: u32,
    pub focus_interval_ms: u64,
    pub settle_delay_ms: u64,
    pub focus_nudge: bool,
    pub verify_focus: bool,
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            bridge: BridgeConfig {
                enabled: true,
                auto_paste: true,
                listen_clipboard: true,
            },
            watcher: WatcherConfig {
                directory: None,
                debounce_ms: 250,
                readiness_attempts: 8,
                readiness_interval_ms: 80,
                name_markers: vec!["screenshot".to_string(), "screen shot".to_string()],
                extensions: vec![
                    "png".to_string(),
                    "jpg".to_string(),
                    "jpeg".to_string(),
                    "heic".to_string(),
                    "tiff".to_string(),
                    "pdf".to_string(),
                ],
            },
            poller: PollerConfig {
                interval_ms: 150,
                retry_limit: 14,
            },
            paster: PasterConfig {
                target_app: None,
                fallback_paths: Vec::new(),
                gesture_timeout_ms: 10_000,
                gesture_poll_ms: 80,
                ui_close_timeout_ms: 10_000,
                focus_attempts: 20,
                focus_interval_ms: 80,
                settle_delay_ms: 180,
                focus_nudge: true,
                verify_focus: true,
            },
            markers_lower: Vec::new(),
            extensions_lower: HashSet::new(),
        };
        config.build_lookup_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(figment::providers::Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SHOTBRIDGE_").split("__"));

        let mut config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;
        config.build_lookup_indexes();

        Ok(config)
    }

    /// Строит нормализованные индексы для быстрой проверки файлов
    pub fn build_lookup_indexes(&mut self) {
        self.markers_lower = self
            .watcher
            .name_markers
            .iter()
            .map(|m| m.to_lowercase())
            .collect();

        self.extensions_lower = self
            .watcher
            .extensions
            .iter()
            .map(|e| e.to_lowercase())
            .collect();
    }

    /// Проверить, похоже ли имя файла на скриншот (регистронезависимо).
    /// Маркер ищется в имени без расширения, расширение - по allow-list.
    pub fn is_screenshot_name(&self, file_name: &str) -> bool {
        let path = Path::new(file_name);

        let extension = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_lowercase(),
            None => return false,
        };
        if !self.extensions_lower.contains(&extension) {
            return false;
        }

        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem.to_lowercase(),
            None => return false,
        };

        self.markers_lower.iter().any(|marker| stem.contains(marker))
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация наблюдателя директории
        if self.watcher.debounce_ms == 0 {
            anyhow::bail!("debounce_ms должно быть больше 0");
        }
        if self.watcher.readiness_attempts == 0 {
            anyhow::bail!("readiness_attempts должно быть больше 0");
        }
        if self.watcher.name_markers.is_empty() {
            anyhow::bail!("name_markers не может быть пустым");
        }
        if self.watcher.extensions.is_empty() {
            anyhow::bail!("extensions не может быть пустым");
        }

        // Валидация опроса буфера обмена
        if self.poller.interval_ms < 50 {
            anyhow::bail!("interval_ms должно быть минимум 50");
        }
        if self.poller.retry_limit == 0 {
            anyhow::bail!("retry_limit должно быть больше 0");
        }

        // Валидация вставки
        if self.paster.focus_attempts == 0 {
            anyhow::bail!("focus_attempts должно быть больше 0");
        }
        if self.paster.gesture_poll_ms == 0 {
            anyhow::bail!("gesture_poll_ms должно быть больше 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.watcher.debounce_ms, 250);
        assert_eq!(config.watcher.readiness_attempts, 8);
        assert_eq!(config.poller.retry_limit, 14);
        assert!(config.bridge.auto_paste);
    }

    #[test]
    fn test_screenshot_name_matching() {
        let config = Config::default();

        assert!(config.is_screenshot_name("Screenshot 2024-01-01 at 1.00.00 PM.png"));
        assert!(config.is_screenshot_name("Screen Shot 2024-05-12.jpeg"));
        assert!(config.is_screenshot_name("my-screenshot-final.TIFF"));
        assert!(config.is_screenshot_name("screenshot.pdf"));

        // Не скриншот по имени
        assert!(!config.is_screenshot_name("IMG_1.png"));
        // Расширение не из allow-list
        assert!(!config.is_screenshot_name("screenshot.gif"));
        // Маркер только в расширении не считается
        assert!(!config.is_screenshot_name("photo.screenshot"));
        // Без расширения
        assert!(!config.is_screenshot_name("screenshot"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.watcher.debounce_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poller.interval_ms = 10;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.watcher.name_markers.clear();
        assert!(config.validate().is_err());
    }
}
