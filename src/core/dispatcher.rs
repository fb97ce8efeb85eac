//! Concurrent per-language fan-out with partial-failure tolerance

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::language::display_name;
use crate::core::models::{LanguageResult, Mode, TranslationOutcome, TranslationRequest};

/// A backend able to produce one language at a time
#[async_trait]
pub trait LanguageTranslator: Send + Sync {
    /// Fails with `ConfigError` when the backend cannot be called at all
    fn validate_credentials(&self) -> Result<()>;

    /// Produce the document for a single language; errors stay per-language
    async fn translate_one(&self, content: &str, language: &str, mode: Mode) -> Result<String>;
}

/// Fans a request out to one task per language, bounded by a worker limit
#[derive(Clone)]
pub struct Dispatcher {
    translator: Arc<dyn LanguageTranslator>,
    max_workers: usize,
    call_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher; `max_workers` of zero is treated as one
    pub fn new(
        translator: Arc<dyn LanguageTranslator>,
        max_workers: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            translator,
            max_workers: max_workers.max(1),
            call_timeout,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Translate every requested language.
    ///
    /// Only a credential problem fails the call. Individual languages that
    /// fail are reported in the outcome and logged as warnings.
    pub async fn dispatch(&self, request: &TranslationRequest) -> Result<TranslationOutcome> {
        self.translator.validate_credentials()?;

        let languages = request.unique_languages();
        let mut resolved: HashMap<String, LanguageResult> = HashMap::with_capacity(languages.len());
        let mut pending = Vec::new();

        for lang in &languages {
            if *lang == request.source_language {
                info!("✓ {}: Using original content (no translation needed)", lang);
                resolved.insert(
                    lang.clone(),
                    LanguageResult::success(lang.as_str(), request.content.as_str()),
                );
            } else {
                pending.push(lang.clone());
            }
        }

        if !pending.is_empty() {
            info!(
                "Starting parallel translation for {} languages: {}",
                pending.len(),
                pending.join(", ")
            );

            for (lang, handle) in self.spawn_all(request, pending) {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => LanguageResult::failure(
                        lang.as_str(),
                        TranslationError::InternalError(format!("Unexpected error: {e}")),
                    ),
                };
                resolved.insert(lang, result);
            }
        }

        let results = languages
            .iter()
            .filter_map(|lang| resolved.remove(lang))
            .collect();
        let outcome = TranslationOutcome::new(results);

        info!(
            "Translation completed: {} successful, {} failed",
            outcome.success_count(),
            outcome.failure_count()
        );
        for failure in outcome.failures() {
            if let Some(err) = &failure.error {
                warn!("Translation failed for {}: {}", failure.language_code, err);
            }
        }

        Ok(outcome)
    }

    /// Dispatch and serialize the success mapping as pretty JSON
    pub async fn translate_all(&self, request: &TranslationRequest) -> Result<String> {
        let json = self.dispatch(request).await?.to_json()?;
        debug!("Final JSON result length: {}", json.len());
        Ok(json)
    }

    fn spawn_all(
        &self,
        request: &TranslationRequest,
        languages: Vec<String>,
    ) -> Vec<(String, JoinHandle<LanguageResult>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let content: Arc<str> = Arc::from(request.content.as_str());
        let mode = request.mode;

        languages
            .into_iter()
            .map(|lang| {
                let translator = Arc::clone(&self.translator);
                let semaphore = Arc::clone(&semaphore);
                let content = Arc::clone(&content);
                let call_timeout = self.call_timeout;
                let task_lang = lang.clone();

                let handle = tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return LanguageResult::failure(
                                task_lang,
                                TranslationError::InternalError(e.to_string()),
                            )
                        }
                    };
                    translate_unit(translator.as_ref(), &content, &task_lang, mode, call_timeout)
                        .await
                });

                (lang, handle)
            })
            .collect()
    }
}

/// One worker: a single bounded call whose error is kept as a value
async fn translate_unit(
    translator: &dyn LanguageTranslator,
    content: &str,
    language: &str,
    mode: Mode,
    call_timeout: Duration,
) -> LanguageResult {
    debug!("[{}] Translating to {}...", language, display_name(language));

    match tokio::time::timeout(call_timeout, translator.translate_one(content, language, mode)).await
    {
        Ok(Ok(text)) => {
            info!("✓ {} translation completed", language);
            LanguageResult::success(language, text)
        }
        Ok(Err(e)) => LanguageResult::failure(language, e),
        Err(_) => LanguageResult::failure(
            language,
            TranslationError::TimeoutError {
                seconds: call_timeout.as_secs(),
            },
        ),
    }
}
