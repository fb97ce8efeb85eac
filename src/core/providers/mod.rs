//! Backend providers and their selection

pub mod siliconflow;
pub mod tencent;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::config::{ProviderKind, SseStrategy, TranslatorConfig};
use crate::core::dispatcher::Dispatcher;
use crate::core::errors::Result;
use crate::core::models::{TranslationOutcome, TranslationRequest};
use crate::core::response::outcome_from_reply;

pub use siliconflow::SiliconFlowClient;
pub use tencent::TencentClient;

/// Slack added on top of the HTTP client timeout for the per-call guard
const CALL_TIMEOUT_SLACK: Duration = Duration::from_secs(1);

/// A backend that turns a request into a JSON object keyed by language code
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fails with `ConfigError` before any network traffic
    fn validate_credentials(&self) -> Result<()>;

    /// Raw JSON-object text for every requested language
    async fn translate(&self, request: &TranslationRequest) -> Result<String>;

    /// Per-language results; by default parsed back out of [`translate`](Self::translate)
    async fn translate_outcome(&self, request: &TranslationRequest) -> Result<TranslationOutcome> {
        let raw = self.translate(request).await?;
        debug!("Provider returned {} chars", raw.len());
        outcome_from_reply(&raw, &request.unique_languages())
    }
}

/// Streaming backend, either one combined request or one request per language
pub struct TencentProvider {
    client: Arc<TencentClient>,
    strategy: SseStrategy,
    dispatcher: Dispatcher,
}

impl TencentProvider {
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        let client = Arc::new(TencentClient::new(Arc::clone(&config))?);
        let dispatcher = Dispatcher::new(
            client.clone(),
            config.sse.max_workers,
            config.sse.timeout_duration() + CALL_TIMEOUT_SLACK,
        );

        Ok(Self {
            client,
            strategy: config.sse.strategy,
            dispatcher,
        })
    }
}

#[async_trait]
impl TranslationProvider for TencentProvider {
    fn name(&self) -> &'static str {
        "tencent"
    }

    fn validate_credentials(&self) -> Result<()> {
        self.client.check_credentials()
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        match self.strategy {
            SseStrategy::Combined => self.client.translate_combined(request).await,
            SseStrategy::PerLanguage => self.dispatcher.translate_all(request).await,
        }
    }

    async fn translate_outcome(&self, request: &TranslationRequest) -> Result<TranslationOutcome> {
        match self.strategy {
            SseStrategy::Combined => {
                let raw = self.client.translate_combined(request).await?;
                outcome_from_reply(&raw, &request.unique_languages())
            }
            SseStrategy::PerLanguage => self.dispatcher.dispatch(request).await,
        }
    }
}

/// Batch backend, always one request per language
pub struct SiliconFlowProvider {
    client: Arc<SiliconFlowClient>,
    dispatcher: Dispatcher,
}

impl SiliconFlowProvider {
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        let client = Arc::new(SiliconFlowClient::new(Arc::clone(&config))?);
        let dispatcher = Dispatcher::new(
            client.clone(),
            config.siliconflow.max_workers,
            config.siliconflow.timeout_duration() + CALL_TIMEOUT_SLACK,
        );

        Ok(Self { client, dispatcher })
    }

    pub fn list_available_models(&self) -> Vec<&'static str> {
        self.client.list_available_models()
    }
}

#[async_trait]
impl TranslationProvider for SiliconFlowProvider {
    fn name(&self) -> &'static str {
        "siliconflow"
    }

    fn validate_credentials(&self) -> Result<()> {
        self.client.check_credentials()
    }

    async fn translate(&self, request: &TranslationRequest) -> Result<String> {
        self.dispatcher.translate_all(request).await
    }

    async fn translate_outcome(&self, request: &TranslationRequest) -> Result<TranslationOutcome> {
        self.dispatcher.dispatch(request).await
    }
}

/// Build the provider named by `config.provider`
pub fn build_provider(config: Arc<TranslatorConfig>) -> Result<Box<dyn TranslationProvider>> {
    let provider: Box<dyn TranslationProvider> = match config.provider_kind() {
        ProviderKind::Tencent => Box::new(TencentProvider::new(config)?),
        ProviderKind::SiliconFlow => Box::new(SiliconFlowProvider::new(config)?),
    };
    info!("Using provider: {}", provider.name());
    Ok(provider)
}
