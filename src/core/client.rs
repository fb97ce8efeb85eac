//! High-level entry point: configuration in, per-language outcome out

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{LanguageResult, Mode, TranslationOutcome, TranslationRequest};
use crate::core::providers::{build_provider, TranslationProvider};

/// Runs requests through the configured provider
pub struct ReadmeTranslator {
    config: Arc<TranslatorConfig>,
    provider: Box<dyn TranslationProvider>,
}

impl ReadmeTranslator {
    /// Create a translator for an already loaded configuration
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let provider = build_provider(Arc::clone(&config))?;
        Ok(Self { config, provider })
    }

    /// Load configuration from `path` (or `duoreadme.toml`) plus environment
    pub fn from_config_path(path: Option<&Path>) -> Result<Self> {
        Self::new(TranslatorConfig::load(path)?)
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Build a request using the configured source language
    pub fn request<I, S>(&self, content: impl Into<String>, languages: I, mode: Mode) -> TranslationRequest
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TranslationRequest::new(content, languages, mode)
            .with_source_language(self.config.source_language.as_str())
    }

    /// Translate and report every requested language as success or failure.
    ///
    /// Only configuration problems fail the call itself.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationOutcome> {
        let languages = request.unique_languages();
        info!(
            "Processing {} request for {} languages via {}",
            request.mode,
            languages.len(),
            self.provider.name()
        );

        self.provider.validate_credentials()?;

        match self.provider.translate_outcome(request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Provider request failed: {}", e);
                Ok(fail_all(&languages, &e))
            }
        }
    }
}

/// One failure per language, each a copy of the shared cause
fn fail_all(languages: &[String], cause: &TranslationError) -> TranslationOutcome {
    TranslationOutcome::new(
        languages
            .iter()
            .map(|lang| LanguageResult::failure(lang.as_str(), cause.replicate()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_configured_source_language() {
        let config = TranslatorConfig {
            source_language: "zh-Hans".to_string(),
            ..Default::default()
        };
        let translator = ReadmeTranslator::new(config).unwrap();
        let request = translator.request("内容", ["zh-Hans", "en"], Mode::Translate);

        assert_eq!(request.source_language, "zh-Hans");
        assert_eq!(translator.provider_name(), "tencent");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_the_call() {
        let translator = ReadmeTranslator::new(TranslatorConfig::default()).unwrap();
        let request = translator.request("x", ["fr"], Mode::Generate);

        assert!(matches!(
            translator.translate(&request).await,
            Err(TranslationError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_fail_all_keeps_order() {
        let languages = vec!["ja".to_string(), "fr".to_string()];
        let outcome = fail_all(&languages, &TranslationError::TimeoutError { seconds: 60 });

        assert_eq!(outcome.failure_count(), 2);
        assert_eq!(outcome.results[0].language_code, "ja");
        assert!(outcome
            .failures()
            .all(|r| matches!(r.error, Some(TranslationError::TimeoutError { seconds: 60 }))));
        assert_eq!(outcome.to_json().unwrap(), "{}");
    }
}
