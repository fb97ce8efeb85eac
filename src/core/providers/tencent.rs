//! Streaming SSE backend

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::config::TranslatorConfig;
use crate::core::dispatcher::LanguageTranslator;
use crate::core::errors::{Result, TranslationError};
use crate::core::language::{display_name, joined_display_names};
use crate::core::models::{Mode, StreamEvent, TranslationRequest};
use crate::core::prompt::{build_combined_prompt, build_single_language_prompt};
use crate::core::sanitizer::sanitize;
use crate::core::sse::{SseDecoder, SseFrame};

/// Event type carrying reply chunks
const REPLY_EVENT: &str = "reply";

/// Request body of the chat SSE endpoint
#[derive(Debug, Serialize)]
struct SseRequest<'a> {
    content: &'a str,
    bot_app_key: &'a str,
    visitor_biz_id: &'a str,
    session_id: String,
    streaming_throttle: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_variables: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ReplyEvent {
    payload: ReplyPayload,
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    #[serde(default)]
    is_from_self: bool,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    content: String,
}

/// What a single event did to the reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStep {
    /// Echo, unknown type or malformed payload
    Ignored,
    /// A partial chunk was appended
    Appended,
    /// The terminal chunk replaced everything accumulated so far
    Final,
}

/// Accumulates reply chunks until the terminal one arrives
#[derive(Debug, Default)]
pub struct ReplyAggregator {
    text: String,
    finished: bool,
}

impl ReplyAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Apply one decoded event
    pub fn handle(&mut self, event: &StreamEvent) -> ReplyStep {
        if event.event_type != REPLY_EVENT {
            debug!("Unhandled event type: {}", event.event_type);
            return ReplyStep::Ignored;
        }

        let reply: ReplyEvent = match serde_json::from_value(event.payload.clone()) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to process SSE event: {}", e);
                return ReplyStep::Ignored;
            }
        };

        let payload = reply.payload;
        if payload.is_from_self {
            debug!("Sent content echoed back ({} chars)", payload.content.len());
            ReplyStep::Ignored
        } else if payload.is_final {
            info!("Received final reply");
            self.text = payload.content;
            self.finished = true;
            ReplyStep::Final
        } else {
            self.text.push_str(&payload.content);
            ReplyStep::Appended
        }
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// Read an SSE byte stream until the terminal reply or end of input.
///
/// Malformed events are logged and skipped; transport errors abort.
pub async fn consume_reply_stream<S, B>(stream: S, chunk_delay: Duration) -> Result<String>
where
    S: Stream<Item = Result<B>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();
    let mut aggregator = ReplyAggregator::new();

    debug!("Starting to process SSE response...");

    'read: while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for frame in decoder.push(chunk.as_ref()) {
            if apply_frame(&mut aggregator, frame, chunk_delay).await {
                break 'read;
            }
        }
    }

    if !aggregator.is_finished() {
        if let Some(frame) = decoder.finish() {
            apply_frame(&mut aggregator, frame, chunk_delay).await;
        }
        if !aggregator.is_finished() {
            warn!("Stream ended without a final reply, using accumulated chunks");
        }
    }

    let text = aggregator.into_text();
    info!("Final response text length: {}", text.len());
    Ok(text)
}

/// Returns true once the reply is complete
async fn apply_frame(
    aggregator: &mut ReplyAggregator,
    frame: SseFrame,
    chunk_delay: Duration,
) -> bool {
    debug!("Received event: {}", frame.event);
    let event = match frame.into_event() {
        Ok(event) => event,
        Err(e) => {
            error!("JSON parsing failed: {}", e);
            return false;
        }
    };

    match aggregator.handle(&event) {
        ReplyStep::Final => true,
        ReplyStep::Appended => {
            if !chunk_delay.is_zero() {
                sleep(chunk_delay).await;
            }
            false
        }
        ReplyStep::Ignored => false,
    }
}

/// Client for the streaming chat endpoint
#[derive(Debug, Clone)]
pub struct TencentClient {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl TencentClient {
    /// Create a new streaming client
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.sse.timeout_duration())
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .build()?;

        debug!("Tencent provider initialized");
        Ok(Self { client, config })
    }

    /// A bot key is required; cloud secrets are only advisory
    pub fn check_credentials(&self) -> Result<()> {
        if self.config.app.bot_app_key.is_empty() {
            error!("Missing bot_app_key");
            return Err(TranslationError::config("Missing bot_app_key"));
        }

        let cloud = &self.config.tencent_cloud;
        if cloud.secret_id.is_empty() || cloud.secret_key.is_empty() {
            warn!("Missing Tencent Cloud secret_id or secret_key");
        }
        Ok(())
    }

    /// One request asking for every language at once; returns the raw reply
    pub async fn translate_combined(&self, request: &TranslationRequest) -> Result<String> {
        self.check_credentials()?;

        let languages = request.unique_languages();
        let prompt = build_combined_prompt(&request.content, &languages, request.mode);
        let variables = request
            .extra
            .get("workflow_variables")
            .cloned()
            .unwrap_or_else(|| {
                json!({
                    "code_text": request.content,
                    "language": joined_display_names(&languages),
                })
            });

        self.send_sse_request(&prompt, Some(variables)).await
    }

    /// POST the prompt and consume the event stream
    pub async fn send_sse_request(
        &self,
        prompt: &str,
        custom_variables: Option<Value>,
    ) -> Result<String> {
        let sse = &self.config.sse;
        let body = SseRequest {
            content: prompt,
            bot_app_key: &self.config.app.bot_app_key,
            visitor_biz_id: &self.config.app.visitor_biz_id,
            session_id: Uuid::new_v4().to_string(),
            streaming_throttle: sse.streaming_throttle,
            custom_variables,
        };

        debug!("Sending request to: {}", sse.url);
        debug!(
            "Session {} with prompt of {} chars",
            body.session_id,
            prompt.chars().count()
        );

        let response = self
            .client
            .post(&sse.url)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::from_reqwest(e, sse.timeout))?;

        let status = response.status();
        debug!("Response status code: {}", status);

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Response content: {}", message);
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let timeout = sse.timeout;
        let stream = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| TranslationError::from_reqwest(e, timeout)));

        consume_reply_stream(stream, Duration::from_millis(sse.streaming_throttle)).await
    }
}

#[async_trait]
impl LanguageTranslator for TencentClient {
    fn validate_credentials(&self) -> Result<()> {
        self.check_credentials()
    }

    async fn translate_one(&self, content: &str, language: &str, mode: Mode) -> Result<String> {
        let language_name = display_name(language);
        info!("Translating to {} ({})...", language_name, language);

        let prompt = build_single_language_prompt(content, language, mode);
        let variables = json!({
            "code_text": content,
            "language": language_name,
        });

        let raw = self.send_sse_request(&prompt, Some(variables)).await?;
        let cleaned = sanitize(&raw);
        if cleaned.is_empty() {
            return Err(TranslationError::InvalidResponseError {
                message: "Empty reply after cleanup".to_string(),
            });
        }

        info!("[{}] Translation completed, length: {}", language, cleaned.len());
        Ok(cleaned)
    }
}
