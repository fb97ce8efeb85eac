//! Batch chat-completions backend, one request per language

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::core::config::TranslatorConfig;
use crate::core::dispatcher::LanguageTranslator;
use crate::core::errors::{Result, TranslationError};
use crate::core::language::display_name;
use crate::core::models::Mode;
use crate::core::prompt::{build_single_language_prompt, build_system_prompt};
use crate::core::sanitizer::sanitize;

/// Commonly used models on the batch backend
pub const AVAILABLE_MODELS: &[&str] = &[
    "deepseek-ai/DeepSeek-R1-0528-Qwen3-8B",
    "deepseek-ai/DeepSeek-V2.5",
    "Qwen/Qwen2.5-7B-Instruct",
    "Qwen/Qwen2.5-72B-Instruct",
    "meta-llama/Meta-Llama-3.1-8B-Instruct",
    "meta-llama/Meta-Llama-3.1-70B-Instruct",
];

/// Characters of the response echoed into debug logs
const PREVIEW_CHARS: usize = 500;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    max_tokens: u32,
    temperature: f64,
    top_p: f64,
    top_k: u32,
    frequency_penalty: f64,
    n: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Cow<'a, str>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Parsed body of a successful completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Extract the first completion from a 2xx response body
pub fn parse_completion(body: &str) -> Result<Completion> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| TranslationError::InvalidResponseError {
            message: e.to_string(),
        })?;

    if let Some(err) = response.error {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| err.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(TranslationError::RemoteError { message });
    }

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "No completion in response".to_string(),
        })?;

    Ok(Completion {
        content,
        usage: response.usage,
    })
}

/// Client for the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct SiliconFlowClient {
    client: reqwest::Client,
    config: Arc<TranslatorConfig>,
}

impl SiliconFlowClient {
    /// Create a new batch client
    pub fn new(config: Arc<TranslatorConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.siliconflow.timeout_duration())
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(config.siliconflow.max_workers)
            .build()?;

        debug!(
            "SiliconFlow provider initialized with model: {}",
            config.siliconflow.model
        );
        Ok(Self { client, config })
    }

    pub fn check_credentials(&self) -> Result<()> {
        if self.config.siliconflow.api_key.is_empty() {
            error!("SiliconFlow API key not configured. Set SILICONFLOW_API_KEY environment variable.");
            return Err(TranslationError::config("SiliconFlow API key not configured"));
        }
        Ok(())
    }

    pub fn list_available_models(&self) -> Vec<&'static str> {
        AVAILABLE_MODELS.to_vec()
    }

    /// Send one completion request and return the raw model text
    async fn complete(&self, language: &str, system: String, prompt: String) -> Result<Completion> {
        let sf = &self.config.siliconflow;
        let body = ChatCompletionRequest {
            model: &sf.model,
            messages: vec![
                Message {
                    role: "system",
                    content: Cow::Owned(system),
                },
                Message {
                    role: "user",
                    content: Cow::Owned(prompt),
                },
            ],
            stream: false,
            max_tokens: sf.max_tokens,
            temperature: sf.temperature,
            top_p: sf.top_p,
            top_k: sf.top_k,
            frequency_penalty: sf.frequency_penalty,
            n: 1,
            response_format: ResponseFormat { kind: "text" },
        };

        debug!("[{}] Sending request to: {}", language, sf.api_url);

        let response = self
            .client
            .post(&sf.api_url)
            .header("Authorization", format!("Bearer {}", sf.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| TranslationError::from_reqwest(e, sf.timeout))?;

        let status = response.status();
        debug!("[{}] Response status code: {}", language, status);

        let text = response
            .text()
            .await
            .map_err(|e| TranslationError::from_reqwest(e, sf.timeout))?;

        if !status.is_success() {
            error!("[{}] API error: {}", language, text);
            return Err(TranslationError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        parse_completion(&text)
    }
}

#[async_trait]
impl LanguageTranslator for SiliconFlowClient {
    fn validate_credentials(&self) -> Result<()> {
        self.check_credentials()
    }

    async fn translate_one(&self, content: &str, language: &str, mode: Mode) -> Result<String> {
        info!("Translating to {} ({})...", display_name(language), language);

        let prompt = build_single_language_prompt(content, language, mode);
        let completion = self
            .complete(language, build_system_prompt(language), prompt)
            .await?;

        if let Some(usage) = completion.usage {
            info!(
                "[{}] API usage - prompt_tokens: {}, completion_tokens: {}",
                language, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let cleaned = sanitize(&completion.content);
        if cleaned.is_empty() {
            return Err(TranslationError::InvalidResponseError {
                message: "Empty completion after cleanup".to_string(),
            });
        }

        info!("[{}] Translation completed, length: {}", language, cleaned.len());
        debug!(
            "[{}] Response preview: {}",
            language,
            cleaned.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Bonjour"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;

        let completion = parse_completion(body).unwrap();
        assert_eq!(completion.content, "Bonjour");
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_completion_error_field() {
        let body = r#"{"error": {"message": "model overloaded"}}"#;
        match parse_completion(body) {
            Err(TranslationError::RemoteError { message }) => assert_eq!(message, "model overloaded"),
            other => panic!("unexpected: {other:?}"),
        }

        let body = r#"{"error": "quota"}"#;
        assert!(matches!(
            parse_completion(body),
            Err(TranslationError::RemoteError { .. })
        ));
    }

    #[test]
    fn test_parse_completion_malformed() {
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(TranslationError::InvalidResponseError { .. })
        ));
        assert!(matches!(
            parse_completion(r#"{"choices": []}"#),
            Err(TranslationError::InvalidResponseError { .. })
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let client = SiliconFlowClient::new(Arc::new(TranslatorConfig::default())).unwrap();
        assert!(client.check_credentials().is_err());
        assert!(client.list_available_models().contains(&"Qwen/Qwen2.5-7B-Instruct"));
    }

    #[test]
    fn test_request_body_shape() {
        let config = TranslatorConfig::default();
        let sf = &config.siliconflow;
        let body = ChatCompletionRequest {
            model: &sf.model,
            messages: vec![Message {
                role: "user",
                content: Cow::Borrowed("hi"),
            }],
            stream: false,
            max_tokens: sf.max_tokens,
            temperature: sf.temperature,
            top_p: sf.top_p,
            top_k: sf.top_k,
            frequency_penalty: sf.frequency_penalty,
            n: 1,
            response_format: ResponseFormat { kind: "text" },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["stream"], false);
        assert_eq!(value["response_format"]["type"], "text");
        assert_eq!(value["top_k"], 50);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
