//! Core data models for translation

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::core::errors::{Result, TranslationError};

/// What the backend is asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Author new documentation from project metadata
    Generate,
    /// Render an existing document into another language
    Translate,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Generate => write!(f, "gen"),
            Mode::Translate => write!(f, "trans"),
        }
    }
}

impl FromStr for Mode {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gen" | "generate" => Ok(Mode::Generate),
            "trans" | "translate" => Ok(Mode::Translate),
            other => Err(TranslationError::config(format!("Unknown mode: {other}"))),
        }
    }
}

/// Translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub content: String,
    pub target_languages: Vec<String>,
    pub mode: Mode,
    pub source_language: String,
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl TranslationRequest {
    pub fn new<I, S>(content: impl Into<String>, target_languages: I, mode: Mode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: content.into(),
            target_languages: target_languages.into_iter().map(Into::into).collect(),
            mode,
            source_language: "en".to_string(),
            extra: Map::new(),
        }
    }

    pub fn with_source_language(mut self, source_language: impl Into<String>) -> Self {
        self.source_language = source_language.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Requested languages with duplicates and blanks removed, first occurrence wins
    pub fn unique_languages(&self) -> Vec<String> {
        let mut seen = Vec::with_capacity(self.target_languages.len());
        for lang in &self.target_languages {
            let lang = lang.trim();
            if !lang.is_empty() && !seen.iter().any(|s: &String| s == lang) {
                seen.push(lang.to_string());
            }
        }
        seen
    }
}

/// Outcome for one requested language
#[derive(Debug)]
pub struct LanguageResult {
    pub language_code: String,
    pub text: String,
    pub error: Option<TranslationError>,
}

impl LanguageResult {
    pub fn success(language_code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language_code: language_code.into(),
            text: text.into(),
            error: None,
        }
    }

    pub fn failure(language_code: impl Into<String>, error: TranslationError) -> Self {
        Self {
            language_code: language_code.into(),
            text: String::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One decoded event of a streaming response
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub event_type: String,
    pub payload: Value,
}

/// Aggregate of one dispatch, one entry per requested language in request order
#[derive(Debug, Default)]
pub struct TranslationOutcome {
    pub results: Vec<LanguageResult>,
}

impl TranslationOutcome {
    pub fn new(results: Vec<LanguageResult>) -> Self {
        Self { results }
    }

    /// Successful languages in request order
    pub fn successes(&self) -> impl Iterator<Item = &LanguageResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Failed languages in request order
    pub fn failures(&self) -> impl Iterator<Item = &LanguageResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Text for a language, if it succeeded
    pub fn get(&self, language_code: &str) -> Option<&str> {
        self.successes()
            .find(|r| r.language_code == language_code)
            .map(|r| r.text.as_str())
    }

    /// Success mapping keyed by language code, preserving request order
    pub fn to_map(&self) -> Map<String, Value> {
        self.successes()
            .map(|r| (r.language_code.clone(), Value::String(r.text.clone())))
            .collect()
    }

    /// Pretty JSON object of the success mapping; non-ASCII stays unescaped
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&Value::Object(self.to_map()))?)
    }
}
