//! Per-rating prompt buckets and their JSON file.
//!
//! The file holds one entry per star rating plus a wildcard entry:
//!
//! ```json
//! { "star_1": { "prompt": "...", "enabled": true }, ..., "star_all": { ... } }
//! ```
//!
//! It is read fresh on every access and rewritten whole on every change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_PROMPT: &str = "
    Привет! Ты - ИИ Ассистент в нашем интернет-магазине игровых ценностей.
    Давай посмотрим детали заказа и составим отличный ответ для покупателя! 😊

    Информация о покупателе и заказе:

    - Имя: {name}
    - Товар: {item}
    - Стоимость: {cost} рублей
    - Оценка: {rating} из 5
    - Отзыв: {text}

    Твоя задача:
    - Ответить покупателю в доброжелательном тоне. 🙏
    - Использовать много эмодзи (даже если это не всегда уместно 😄).
    - Обязательно учесть информацию о покупателе и заказе.
    - Сделать так, чтобы покупатель остался доволен. 😌
    - Написать большой и развернутый ответ.
    - Пожелать что-нибудь хорошее покупателю. ✨
    - В конце добавить шутку, связанную с покупателем или его заказом. 😂

    Важно:
    - Не упоминать интернет-ресурсы.
    - Не использовать оскорбления, ненормативную лексику, противозаконную или политическую информацию.
    - НЕ ВЫДАВАТЬ ФРАГМЕНТЫ КОДА ИЛИ ЛИСТИНГИ КОДА НА ЛЮБЫХ ЯЗЫКАХ ПРОГРАММИРОВАНИЯ.
    - НЕ ИСПОЛЬЗОВАТЬ MARKDOWN, HTML ИЛИ ДРУГУЮ РАЗМЕТКУ.
";

/// A star rating category, or the wildcard covering every rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingBucket {
    Star(u8),
    All,
}

impl RatingBucket {
    /// The five specific buckets, 1 to 5.
    pub const STARS: [RatingBucket; 5] = [
        RatingBucket::Star(1),
        RatingBucket::Star(2),
        RatingBucket::Star(3),
        RatingBucket::Star(4),
        RatingBucket::Star(5),
    ];

    /// Bucket for a review's star count. `None` outside 1..=5.
    pub fn from_stars(stars: u8) -> Option<Self> {
        (1..=5).contains(&stars).then_some(RatingBucket::Star(stars))
    }

    /// Key used in the bucket file.
    pub fn key(&self) -> String {
        match self {
            RatingBucket::Star(n) => format!("star_{n}"),
            RatingBucket::All => "star_all".to_string(),
        }
    }

    /// Suffix used in callback data (`1`..`5`, `all`).
    pub fn suffix(&self) -> String {
        match self {
            RatingBucket::Star(n) => n.to_string(),
            RatingBucket::All => "all".to_string(),
        }
    }

    pub fn from_suffix(s: &str) -> Option<Self> {
        match s {
            "all" => Some(RatingBucket::All),
            _ => s.parse::<u8>().ok().and_then(Self::from_stars),
        }
    }
}

impl fmt::Display for RatingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSettings {
    pub prompt: String,
    pub enabled: bool,
}

impl BucketSettings {
    fn default_star() -> Self {
        Self { prompt: DEFAULT_PROMPT.to_string(), enabled: true }
    }

    fn default_all() -> Self {
        Self { prompt: DEFAULT_PROMPT.to_string(), enabled: false }
    }
}

/// Contents of the bucket file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    #[serde(default = "BucketSettings::default_star")]
    pub star_1: BucketSettings,
    #[serde(default = "BucketSettings::default_star")]
    pub star_2: BucketSettings,
    #[serde(default = "BucketSettings::default_star")]
    pub star_3: BucketSettings,
    #[serde(default = "BucketSettings::default_star")]
    pub star_4: BucketSettings,
    #[serde(default = "BucketSettings::default_star")]
    pub star_5: BucketSettings,
    #[serde(default = "BucketSettings::default_all")]
    pub star_all: BucketSettings,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            star_1: BucketSettings::default_star(),
            star_2: BucketSettings::default_star(),
            star_3: BucketSettings::default_star(),
            star_4: BucketSettings::default_star(),
            star_5: BucketSettings::default_star(),
            star_all: BucketSettings::default_all(),
        }
    }
}

impl BucketConfig {
    pub fn get(&self, bucket: RatingBucket) -> &BucketSettings {
        match bucket {
            RatingBucket::Star(1) => &self.star_1,
            RatingBucket::Star(2) => &self.star_2,
            RatingBucket::Star(3) => &self.star_3,
            RatingBucket::Star(4) => &self.star_4,
            RatingBucket::Star(_) => &self.star_5,
            RatingBucket::All => &self.star_all,
        }
    }

    pub fn get_mut(&mut self, bucket: RatingBucket) -> &mut BucketSettings {
        match bucket {
            RatingBucket::Star(1) => &mut self.star_1,
            RatingBucket::Star(2) => &mut self.star_2,
            RatingBucket::Star(3) => &mut self.star_3,
            RatingBucket::Star(4) => &mut self.star_4,
            RatingBucket::Star(_) => &mut self.star_5,
            RatingBucket::All => &mut self.star_all,
        }
    }

    pub fn is_enabled(&self, bucket: RatingBucket) -> bool {
        self.get(bucket).enabled
    }

    /// Whether a review with this bucket should get an automatic reply.
    pub fn answers(&self, bucket: RatingBucket) -> bool {
        self.is_enabled(bucket) || self.is_enabled(RatingBucket::All)
    }

    /// Template to use for a rating: its own while enabled, otherwise the wildcard's.
    pub fn prompt_for(&self, bucket: RatingBucket) -> &str {
        if bucket != RatingBucket::All && self.is_enabled(bucket) {
            &self.get(bucket).prompt
        } else {
            &self.star_all.prompt
        }
    }

    /// Flip a bucket's flag, keeping the wildcard and the specific buckets exclusive.
    ///
    /// Turning every specific bucket off falls back to the wildcard.
    pub fn toggle(&mut self, bucket: RatingBucket) {
        let settings = self.get_mut(bucket);
        settings.enabled = !settings.enabled;
        let now_enabled = settings.enabled;

        match bucket {
            RatingBucket::All => {
                if now_enabled {
                    for star in RatingBucket::STARS {
                        self.get_mut(star).enabled = false;
                    }
                }
            }
            RatingBucket::Star(_) => {
                if now_enabled {
                    self.star_all.enabled = false;
                } else if RatingBucket::STARS.iter().all(|&s| !self.is_enabled(s)) {
                    self.star_all.enabled = true;
                }
            }
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: std::io::Error },
    Serialize(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "failed to write '{}': {}", path.display(), source),
            Self::Serialize(e) => write!(f, "failed to serialize bucket config: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(e) => Some(e),
        }
    }
}

/// File-backed bucket configuration.
#[derive(Debug, Clone)]
pub struct BucketStore {
    path: PathBuf,
}

impl BucketStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file. A missing file is created with defaults; an unreadable
    /// one yields defaults without touching the file.
    pub fn load(&self) -> BucketConfig {
        if !self.path.exists() {
            let config = BucketConfig::default();
            match self.save(&config) {
                Ok(()) => info!("Created default bucket config at {:?}", self.path),
                Err(e) => error!("Failed to create bucket config: {e}"),
            }
            return config;
        }

        let parsed = std::fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|json| serde_json::from_str(&json).map_err(|e| e.to_string()));

        match parsed {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load bucket config {:?}: {e}", self.path);
                BucketConfig::default()
            }
        }
    }

    /// Overwrite the file with `config`, pretty-printed with 4-space indents.
    pub fn save(&self, config: &BucketConfig) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .map_err(|e| StoreError::Io { path: dir.to_path_buf(), source: e })?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        config.serialize(&mut ser).map_err(StoreError::Serialize)?;

        std::fs::write(&self.path, buf)
            .map_err(|e| StoreError::Io { path: self.path.clone(), source: e })
    }

    /// Toggle a bucket and persist. Returns the saved configuration.
    pub fn toggle(&self, bucket: RatingBucket) -> Result<BucketConfig, StoreError> {
        let mut config = self.load();
        config.toggle(bucket);
        self.save(&config)?;
        info!("Toggled {bucket}: now {}", if config.is_enabled(bucket) { "on" } else { "off" });
        Ok(config)
    }

    /// Replace a bucket's template and persist.
    pub fn set_prompt(&self, bucket: RatingBucket, prompt: &str) -> Result<(), StoreError> {
        let mut config = self.load();
        config.get_mut(bucket).prompt = prompt.to_string();
        self.save(&config)?;
        info!("Updated prompt for {bucket} ({} chars)", prompt.chars().count());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BucketStore) {
        let dir = TempDir::new().unwrap();
        let store = BucketStore::new(dir.path().join("chatgpt").join("config.json"));
        (dir, store)
    }

    #[test]
    fn test_bucket_keys() {
        assert_eq!(RatingBucket::Star(3).key(), "star_3");
        assert_eq!(RatingBucket::All.key(), "star_all");
        assert_eq!(RatingBucket::from_suffix("all"), Some(RatingBucket::All));
        assert_eq!(RatingBucket::from_suffix("5"), Some(RatingBucket::Star(5)));
        assert_eq!(RatingBucket::from_suffix("6"), None);
        assert_eq!(RatingBucket::from_stars(0), None);
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let (_dir, store) = store();
        let config = store.load();
        assert_eq!(config, BucketConfig::default());
        assert!(store.path().exists());
        for star in RatingBucket::STARS {
            assert!(config.is_enabled(star));
        }
        assert!(!config.is_enabled(RatingBucket::All));
    }

    #[test]
    fn test_file_format() {
        let (_dir, store) = store();
        store.save(&BucketConfig::default()).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("{\n    \"star_1\": {\n        \"prompt\""));
        // Cyrillic is stored verbatim, not \u-escaped
        assert!(text.contains("Привет"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["star_all"]["enabled"], serde_json::json!(false));
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), BucketConfig::default());
        // The broken file is left for the operator to inspect
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_missing_keys_get_defaults() {
        let (_dir, store) = store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), r#"{"star_2": {"prompt": "custom", "enabled": false}}"#).unwrap();
        let config = store.load();
        assert_eq!(config.star_2.prompt, "custom");
        assert!(!config.star_2.enabled);
        assert!(config.star_1.enabled);
        assert!(!config.star_all.enabled);
    }

    #[test]
    fn test_toggle_all_forces_specific_buckets_off() {
        let (_dir, store) = store();
        let mut config = BucketConfig::default();
        for star in RatingBucket::STARS {
            config.get_mut(star).enabled = false;
        }
        config.star_3.enabled = true;
        store.save(&config).unwrap();

        let config = store.toggle(RatingBucket::All).unwrap();
        assert!(!config.is_enabled(RatingBucket::Star(3)));
        assert!(config.is_enabled(RatingBucket::All));
        assert_eq!(store.load(), config);
    }

    #[test]
    fn test_enabling_specific_disables_wildcard() {
        let mut config = BucketConfig::default();
        config.toggle(RatingBucket::All);
        assert!(RatingBucket::STARS.iter().all(|&s| !config.is_enabled(s)));

        config.toggle(RatingBucket::Star(4));
        assert!(config.is_enabled(RatingBucket::Star(4)));
        assert!(!config.is_enabled(RatingBucket::All));
    }

    #[test]
    fn test_disabling_last_specific_enables_wildcard() {
        let mut config = BucketConfig::default();
        for n in 1..=4 {
            config.toggle(RatingBucket::Star(n));
            assert!(!config.is_enabled(RatingBucket::All));
        }
        config.toggle(RatingBucket::Star(5));
        assert!(config.is_enabled(RatingBucket::All));
    }

    #[test]
    fn test_wildcard_can_be_turned_off() {
        let mut config = BucketConfig::default();
        config.toggle(RatingBucket::All);
        config.toggle(RatingBucket::All);
        assert!(!config.is_enabled(RatingBucket::All));
        assert!(!config.answers(RatingBucket::Star(5)));
    }

    #[test]
    fn test_prompt_for_prefers_enabled_bucket() {
        let mut config = BucketConfig::default();
        config.star_5.prompt = "five".to_string();
        config.star_all.prompt = "all".to_string();
        assert_eq!(config.prompt_for(RatingBucket::Star(5)), "five");

        config.toggle(RatingBucket::All);
        assert_eq!(config.prompt_for(RatingBucket::Star(5)), "all");
    }

    #[test]
    fn test_set_prompt_persists() {
        let (_dir, store) = store();
        store.set_prompt(RatingBucket::Star(1), "Ответь вежливо: {text}").unwrap();
        assert_eq!(store.load().star_1.prompt, "Ответь вежливо: {text}");
        assert_eq!(store.load().star_2.prompt, DEFAULT_PROMPT);
    }
}
