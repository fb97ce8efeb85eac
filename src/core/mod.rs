//! Core translation engine module

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod language;
pub mod models;
pub mod prompt;
pub mod providers;
pub mod response;
pub mod sanitizer;
pub mod sse;
