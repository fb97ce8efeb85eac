//! Parsing of the combined JSON-object reply

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{LanguageResult, TranslationOutcome};

/// Slice from the first `{` to the last `}`, if both exist in that order.
///
/// Covers replies wrapped in a ```` ```json ```` fence or preceded by chatter.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Parse a combined reply into `code -> text` for the requested languages.
///
/// Keys keep the requested order; non-string values and unrequested keys are dropped.
pub fn parse_language_map(raw: &str, languages: &[String]) -> Result<Map<String, Value>> {
    let object = extract_json_object(raw).ok_or_else(|| TranslationError::InvalidResponseError {
        message: "No JSON object found in response".to_string(),
    })?;

    let parsed: Map<String, Value> =
        serde_json::from_str(object).map_err(|e| TranslationError::InvalidResponseError {
            message: format!("Invalid JSON object: {e}"),
        })?;

    let mut map = Map::new();
    for lang in languages {
        match parsed.get(lang) {
            Some(Value::String(text)) => {
                map.insert(lang.clone(), Value::String(text.clone()));
            }
            Some(other) => warn!("[{}] Expected a string, got {}", lang, other),
            None => debug!("[{}] Missing from response", lang),
        }
    }
    Ok(map)
}

/// Turn a combined reply into one result per requested language.
///
/// Languages the reply does not cover are reported as `InvalidResponseError`.
pub fn outcome_from_reply(raw: &str, languages: &[String]) -> Result<TranslationOutcome> {
    let mut map = parse_language_map(raw, languages)?;

    let results = languages
        .iter()
        .map(|lang| match map.remove(lang) {
            Some(Value::String(text)) => LanguageResult::success(lang.as_str(), text),
            _ => LanguageResult::failure(
                lang.as_str(),
                TranslationError::InvalidResponseError {
                    message: format!("No content for {lang}"),
                },
            ),
        })
        .collect();

    Ok(TranslationOutcome::new(results))
}
