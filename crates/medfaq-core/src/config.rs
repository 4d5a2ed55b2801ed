//! Layered configuration and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (`__` separates sections, e.g. `APP_RETRIEVAL__TOP_K`).
//! Path settings expand `~` and `${VAR}` before use.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::data_processor::LoaderConfig;
use crate::error::{Error, Result};
use crate::types::DEFAULT_CATEGORY;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    pub csv_path: String,
    pub question_column: String,
    pub answer_column: String,
    pub category_column: String,
    pub default_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub dir: String,
    /// Discard the cache when its vector count differs from the dataset.
    pub validate_record_count: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    Minilm,
    Fake,
}

/// Where the sentence model runs. `auto` takes Metal when the build has it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DevicePreference {
    Auto,
    Cpu,
    Metal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    pub device: DevicePreference,
    pub model_dir: String,
    pub max_len: usize,
    pub batch_size: usize,
    pub fake_dim: usize,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub endpoint: String,
    /// Falls back to `GEMINI_API_KEY` when unset.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data: DataConfig {
                csv_path: "data/medical.csv".to_string(),
                question_column: "Question".to_string(),
                answer_column: "Answer".to_string(),
                category_column: "qtype".to_string(),
                default_category: DEFAULT_CATEGORY.to_string(),
            },
            cache: CacheConfig { dir: "embeddings".to_string(), validate_record_count: false },
            embedding: EmbeddingConfig {
                backend: EmbeddingBackend::Minilm,
                device: DevicePreference::Auto,
                model_dir: "models/all-MiniLM-L6-v2".to_string(),
                max_len: 256,
                batch_size: 64,
                fake_dim: 384,
                show_progress: true,
            },
            retrieval: RetrievalConfig { top_k: 3 },
            generation: GenerationConfig {
                model: "gemini-1.5-flash-latest".to_string(),
                endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
                api_key: None,
                timeout_secs: 60,
            },
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::load()?.settings()
    }

    pub fn validate(&self) -> Result<()> {
        if self.data.csv_path.trim().is_empty() {
            return Err(Error::InvalidConfig("data.csv_path must not be empty".to_string()));
        }
        if self.data.question_column.trim().is_empty() || self.data.answer_column.trim().is_empty() {
            return Err(Error::InvalidConfig("data.question_column and data.answer_column must not be empty".to_string()));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be at least 1".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".to_string()));
        }
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be at least 1".to_string()));
        }
        if self.embedding.backend == EmbeddingBackend::Fake && self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn csv_path(&self) -> PathBuf { expand_path(&self.data.csv_path) }

    pub fn cache_dir(&self) -> PathBuf { expand_path(&self.cache.dir) }

    pub fn model_dir(&self) -> PathBuf { expand_path(&self.embedding.model_dir) }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            question_column: self.data.question_column.clone(),
            answer_column: self.data.answer_column.clone(),
            category_column: self.data.category_column.clone(),
            default_category: self.data.default_category.clone(),
        }
    }

    /// The configured key, or `GEMINI_API_KEY` from the environment.
    pub fn api_key(&self) -> Option<String> {
        self.generation
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// Applies `~` and `${VAR}` expansion to a configured path. An unset variable
/// leaves the string as written, so the later open reports the literal path.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retrieval.top_k, 3);
        assert!(!settings.cache.validate_record_count);
    }

    #[test]
    fn toml_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "config.toml",
                r#"
                [data]
                csv_path = "faq/medquad.csv"

                [embedding]
                backend = "fake"
                "#,
            )?;
            jail.set_env("RUST_ENV", "test");
            jail.set_env("APP_RETRIEVAL__TOP_K", "5");
            jail.set_env("APP_EMBEDDING__DEVICE", "cpu");

            let settings = Settings::load().map_err(|e| e.to_string())?;
            assert_eq!(settings.data.csv_path, "faq/medquad.csv");
            assert_eq!(settings.embedding.backend, EmbeddingBackend::Fake);
            assert_eq!(settings.retrieval.top_k, 5);
            assert_eq!(settings.embedding.device, DevicePreference::Cpu);
            assert_eq!(settings.data.question_column, "Question");
            Ok(())
        });
    }

    #[test]
    fn env_specific_file_wins_over_base_file() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("config.toml", "[cache]\ndir = \"base\"\n")?;
            jail.create_file("config.prod.toml", "[cache]\ndir = \"prod-cache\"\n")?;
            jail.set_env("RUST_ENV", "prod");

            let settings = Settings::load().map_err(|e| e.to_string())?;
            assert_eq!(settings.cache.dir, "prod-cache");
            Ok(())
        });
    }

    #[test]
    fn zero_top_k_is_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("APP_RETRIEVAL__TOP_K", "0");
            match Settings::load() {
                Err(Error::InvalidConfig(msg)) => assert!(msg.contains("top_k")),
                other => panic!("expected InvalidConfig, got {:?}", other),
            }
            Ok(())
        });
    }

    #[test]
    fn path_settings_expand_environment_variables() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("MEDFAQ_DATA", "/srv/medfaq");
            let mut settings = Settings::default();
            settings.data.csv_path = "${MEDFAQ_DATA}/medical.csv".to_string();
            settings.cache.dir = "${MEDFAQ_DATA}/cache".to_string();
            settings.embedding.model_dir = "${MEDFAQ_UNSET}/minilm".to_string();
            assert_eq!(settings.csv_path(), PathBuf::from("/srv/medfaq/medical.csv"));
            assert_eq!(settings.cache_dir(), PathBuf::from("/srv/medfaq/cache"));
            assert_eq!(settings.model_dir(), PathBuf::from("${MEDFAQ_UNSET}/minilm"));
            Ok(())
        });
    }

    #[test]
    fn configured_api_key_takes_precedence_over_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("GEMINI_API_KEY", "from-env");
            let mut settings = Settings::default();
            assert_eq!(settings.api_key().as_deref(), Some("from-env"));
            settings.generation.api_key = Some("from-config".to_string());
            assert_eq!(settings.api_key().as_deref(), Some("from-config"));
            Ok(())
        });
    }
}
