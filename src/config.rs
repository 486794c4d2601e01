use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use teloxide::types::{ChatId, UserId};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    telegram_bot_token: String,
    /// Telegram users allowed to open the settings menu
    authorized_users: Vec<u64>,
    /// Base URL of an OpenAI-compatible chat-completions API (g4f, etc.)
    #[serde(default = "default_backend_url")]
    backend_url: String,
    #[serde(default)]
    backend_api_key: String,
    /// Models to pick from at random on every attempt
    #[serde(default = "default_models")]
    models: Vec<String>,
    /// Reviews below this many stars are ignored (0 = answer all)
    #[serde(default)]
    min_stars: u8,
    #[serde(default = "default_true")]
    answer_only_on_new_feedback: bool,
    /// Directory for the bucket file and logs. Defaults to storage/chatgpt.
    data_dir: Option<String>,
    log_chat_id: Option<i64>,
}

fn default_backend_url() -> String {
    "http://localhost:1337/v1".to_string()
}

fn default_models() -> Vec<String> {
    vec!["gpt-4o".to_string()]
}

fn default_true() -> bool {
    true
}

pub struct Config {
    /// Path to the config file this was loaded from
    pub config_path: PathBuf,
    pub telegram_bot_token: String,
    pub authorized_users: HashSet<UserId>,
    pub backend_url: String,
    pub backend_api_key: String,
    pub models: Vec<String>,
    pub min_stars: u8,
    pub answer_only_on_new_feedback: bool,
    /// Directory for state files (bucket config, logs).
    pub data_dir: PathBuf,
    pub log_chat_id: Option<ChatId>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.authorized_users.is_empty() {
            return Err(ConfigError::Validation(
                "authorized_users must contain at least one user ID".into(),
            ));
        }
        if file.telegram_bot_token.is_empty() {
            return Err(ConfigError::Validation("telegram_bot_token is required".into()));
        }
        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = file.telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "telegram_bot_token appears invalid (expected format: 123456789:ABCdefGHI...)".into()
            ));
        }
        if file.models.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::Validation("models must contain at least one model name".into()));
        }
        if file.min_stars > 5 {
            return Err(ConfigError::Validation(format!(
                "min_stars must be between 0 and 5, got {}",
                file.min_stars
            )));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("storage/chatgpt"));

        Ok(Self {
            config_path,
            telegram_bot_token: file.telegram_bot_token,
            authorized_users: file.authorized_users.into_iter().map(UserId).collect(),
            backend_url: file.backend_url.trim_end_matches('/').to_string(),
            backend_api_key: file.backend_api_key,
            models: file
                .models
                .into_iter()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            min_stars: file.min_stars,
            answer_only_on_new_feedback: file.answer_only_on_new_feedback,
            data_dir,
            log_chat_id: file.log_chat_id.map(ChatId),
        })
    }

    pub fn is_authorized(&self, user_id: UserId) -> bool {
        self.authorized_users.contains(&user_id)
    }

    /// Location of the per-rating prompt file.
    pub fn buckets_path(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_config_defaults() {
        let file = write_config(r#"{
            "authorized_users": [123456],
            "telegram_bot_token": "123456789:ABCdefGHIjklMNOpqrsTUVwxyz"
        }"#);
        let config = Config::load(file.path()).expect("should load valid config");
        assert!(config.is_authorized(UserId(123456)));
        assert!(!config.is_authorized(UserId(1)));
        assert_eq!(config.backend_url, "http://localhost:1337/v1");
        assert_eq!(config.models, vec!["gpt-4o".to_string()]);
        assert_eq!(config.min_stars, 0);
        assert!(config.answer_only_on_new_feedback);
        assert_eq!(config.buckets_path(), PathBuf::from("storage/chatgpt/config.json"));
        assert!(config.log_chat_id.is_none());
    }

    #[test]
    fn test_overrides() {
        let file = write_config(r#"{
            "authorized_users": [1, 2],
            "telegram_bot_token": "123456789:ABCdef",
            "backend_url": "http://127.0.0.1:8080/v1/",
            "models": ["gpt-4o", " ", "gpt-4o-mini"],
            "min_stars": 4,
            "answer_only_on_new_feedback": false,
            "data_dir": "/tmp/reviews",
            "log_chat_id": -100500
        }"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.backend_url, "http://127.0.0.1:8080/v1");
        assert_eq!(config.models, vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]);
        assert_eq!(config.min_stars, 4);
        assert!(!config.answer_only_on_new_feedback);
        assert_eq!(config.buckets_path(), PathBuf::from("/tmp/reviews/config.json"));
        assert_eq!(config.log_chat_id, Some(ChatId(-100500)));
    }

    #[test]
    fn test_empty_authorized_users() {
        let file = write_config(r#"{
            "authorized_users": [],
            "telegram_bot_token": "123456789:ABCdef"
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("authorized_users"));
    }

    #[test]
    fn test_empty_token() {
        let file = write_config(r#"{
            "authorized_users": [123],
            "telegram_bot_token": ""
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("telegram_bot_token"));
    }

    #[test]
    fn test_invalid_token_format() {
        for token in ["invalid_token_no_colon", "notanumber:ABCdef", "123456789:"] {
            let file = write_config(&format!(
                r#"{{ "authorized_users": [123], "telegram_bot_token": "{token}" }}"#
            ));
            let err = assert_err(Config::load(file.path()));
            assert!(matches!(err, ConfigError::Validation(_)), "token {token}");
        }
    }

    #[test]
    fn test_no_models() {
        let file = write_config(r#"{
            "authorized_users": [123],
            "telegram_bot_token": "123456789:ABCdef",
            "models": []
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("models"));
    }

    #[test]
    fn test_min_stars_out_of_range() {
        let file = write_config(r#"{
            "authorized_users": [123],
            "telegram_bot_token": "123456789:ABCdef",
            "min_stars": 6
        }"#);
        let err = assert_err(Config::load(file.path()));
        assert!(err.to_string().contains("min_stars"));
    }

    #[test]
    fn test_file_not_found() {
        let err = assert_err(Config::load("/nonexistent/path/config.json"));
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(Config::load(file.path()));
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }
}
