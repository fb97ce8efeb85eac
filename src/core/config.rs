//! Configuration management

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};

/// Configuration file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "duoreadme.toml";

/// Prefix for environment overrides, e.g. `DUOREADME_SILICONFLOW__API_KEY`
pub const ENV_PREFIX: &str = "DUOREADME";

pub const DEFAULT_SSE_URL: &str = "https://wss.lke.cloud.tencent.com/v1/qbot/chat/sse";
pub const DEFAULT_SILICONFLOW_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";
pub const DEFAULT_SILICONFLOW_MODEL: &str = "deepseek-ai/DeepSeek-R1-0528-Qwen3-8B";
pub const DEFAULT_MAX_WORKERS: usize = 3;

/// Backend selected by the `provider` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Streaming SSE backend
    Tencent,
    /// Batch chat-completions backend
    SiliconFlow,
}

/// How the streaming backend is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SseStrategy {
    /// One request asking for a JSON object with every language
    Combined,
    /// One sanitized request per language through the dispatcher
    PerLanguage,
}

/// Bot application credentials for the streaming backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bot_app_key: String,
    pub visitor_biz_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bot_app_key: String::new(),
            visitor_biz_id: "duoreadme-user".to_string(),
        }
    }
}

/// Cloud account secrets; only checked for presence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TencentCloudConfig {
    pub secret_id: String,
    pub secret_key: String,
}

/// Streaming backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SseConfig {
    pub url: String,
    /// Milliseconds; sent to the backend and used as the inter-chunk delay
    pub streaming_throttle: u64,
    /// Seconds
    pub timeout: u64,
    pub strategy: SseStrategy,
    pub max_workers: usize,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SSE_URL.to_string(),
            streaming_throttle: 1,
            timeout: 60,
            strategy: SseStrategy::Combined,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl SseConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Batch backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiliconFlowConfig {
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    /// Seconds
    pub timeout: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub frequency_penalty: f64,
    pub max_workers: usize,
}

impl Default for SiliconFlowConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_SILICONFLOW_URL.to_string(),
            model: DEFAULT_SILICONFLOW_MODEL.to_string(),
            timeout: 120,
            max_tokens: 4096,
            temperature: 0.1,
            top_p: 0.7,
            top_k: 50,
            frequency_penalty: 1.0,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl SiliconFlowConfig {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub provider: String,
    pub source_language: String,
    pub app: AppConfig,
    pub tencent_cloud: TencentCloudConfig,
    pub sse: SseConfig,
    pub siliconflow: SiliconFlowConfig,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: "tencent".to_string(),
            source_language: "en".to_string(),
            app: AppConfig::default(),
            tencent_cloud: TencentCloudConfig::default(),
            sse: SseConfig::default(),
            siliconflow: SiliconFlowConfig::default(),
        }
    }
}

impl TranslatorConfig {
    /// Load defaults, then the config file, then `DUOREADME_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        builder = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder.add_source(File::from(path).required(true))
            }
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut config: Self = builder.build()?.try_deserialize()?;
        config.apply_legacy_env();
        config.validate()?;

        debug!(
            "Configuration loaded: provider={}, source_language={}",
            config.provider, config.source_language
        );
        Ok(config)
    }

    /// Fill empty credentials from the unprefixed variable names
    fn apply_legacy_env(&mut self) {
        if self.siliconflow.api_key.is_empty() {
            if let Ok(key) = std::env::var("SILICONFLOW_API_KEY") {
                self.siliconflow.api_key = key;
            }
        }
        if self.app.bot_app_key.is_empty() {
            if let Ok(key) = std::env::var("TENCENT_BOT_APP_KEY") {
                self.app.bot_app_key = key;
            }
        }
    }

    /// Backend kind; unknown names fall back to the streaming backend
    pub fn provider_kind(&self) -> ProviderKind {
        match self.provider.trim().to_ascii_lowercase().as_str() {
            "siliconflow" => ProviderKind::SiliconFlow,
            "tencent" => ProviderKind::Tencent,
            other => {
                warn!("Unknown provider '{}', falling back to tencent", other);
                ProviderKind::Tencent
            }
        }
    }

    /// Validate configuration; credentials are checked by each provider
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(TranslationError::config("source_language must not be empty"));
        }

        match self.provider_kind() {
            ProviderKind::Tencent => {
                if self.sse.url.is_empty() {
                    return Err(TranslationError::config("sse.url is required"));
                }
                if self.sse.timeout == 0 {
                    return Err(TranslationError::config("sse.timeout must be greater than 0"));
                }
                if self.sse.max_workers == 0 {
                    return Err(TranslationError::config(
                        "sse.max_workers must be greater than 0",
                    ));
                }
            }
            ProviderKind::SiliconFlow => {
                if self.siliconflow.api_url.is_empty() {
                    return Err(TranslationError::config("siliconflow.api_url is required"));
                }
                if self.siliconflow.model.is_empty() {
                    return Err(TranslationError::config("siliconflow.model is required"));
                }
                if self.siliconflow.timeout == 0 {
                    return Err(TranslationError::config(
                        "siliconflow.timeout must be greater than 0",
                    ));
                }
                if self.siliconflow.max_workers == 0 {
                    return Err(TranslationError::config(
                        "siliconflow.max_workers must be greater than 0",
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.provider_kind(), ProviderKind::Tencent);
        assert_eq!(config.sse.timeout, 60);
        assert_eq!(config.sse.strategy, SseStrategy::Combined);
        assert_eq!(config.siliconflow.max_workers, 3);
        assert_eq!(config.app.visitor_biz_id, "duoreadme-user");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_workers() {
        let mut config = TranslatorConfig {
            provider: "siliconflow".to_string(),
            ..Default::default()
        };
        config.siliconflow.max_workers = 0;

        assert!(matches!(
            config.validate(),
            Err(TranslationError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_unknown_provider_falls_back() {
        let config = TranslatorConfig {
            provider: "openai".to_string(),
            ..Default::default()
        };
        assert_eq!(config.provider_kind(), ProviderKind::Tencent);
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
provider = "siliconflow"

[siliconflow]
api_key = "sk-test"
timeout = 30

[sse]
strategy = "per_language"
"#
        )
        .unwrap();

        let config = TranslatorConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.provider_kind(), ProviderKind::SiliconFlow);
        assert_eq!(config.siliconflow.api_key, "sk-test");
        assert_eq!(config.siliconflow.timeout, 30);
        assert_eq!(config.siliconflow.model, DEFAULT_SILICONFLOW_MODEL);
        assert_eq!(config.sse.strategy, SseStrategy::PerLanguage);
        assert_eq!(config.sse.url, DEFAULT_SSE_URL);
    }

    #[test]
    fn test_environment_overrides_and_legacy_keys() {
        // Only keys no other loading test asserts on, since tests share the process env
        let vars = [
            ("DUOREADME_SILICONFLOW__MAX_TOKENS", "2048"),
            ("DUOREADME_APP__VISITOR_BIZ_ID", "ci-runner"),
            ("SILICONFLOW_API_KEY", "sk-legacy"),
            ("TENCENT_BOT_APP_KEY", "bot-legacy"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
provider = "siliconflow"

[siliconflow]
max_tokens = 1024
"#
        )
        .unwrap();

        let result = TranslatorConfig::load(Some(file.path()));
        for (key, _) in vars {
            std::env::remove_var(key);
        }

        let config = result.unwrap();
        assert_eq!(config.siliconflow.max_tokens, 2048);
        assert_eq!(config.app.visitor_biz_id, "ci-runner");
        assert_eq!(config.siliconflow.api_key, "sk-legacy");
        assert_eq!(config.app.bot_app_key, "bot-legacy");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = TranslatorConfig::load(Some(Path::new("/nonexistent/duoreadme.toml")));
        assert!(result.is_err());
    }
}
