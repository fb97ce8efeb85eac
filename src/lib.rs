//! DuoReadme - multilingual README generation and translation
//!
//! Sends project documentation to an LLM backend (a streaming SSE bot or a
//! batch chat-completions API), cleans the replies and collects them into a
//! JSON object keyed by language code.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use self::core::{
    client::ReadmeTranslator,
    config::TranslatorConfig,
    dispatcher::{Dispatcher, LanguageTranslator},
    errors::{Result, TranslationError},
    language::display_name,
    models::{LanguageResult, Mode, TranslationOutcome, TranslationRequest},
    providers::{build_provider, TranslationProvider},
    sanitizer::sanitize,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
