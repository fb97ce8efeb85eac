//! CLI command definitions and handlers

use clap::Subcommand;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

use crate::core::client::ReadmeTranslator;
use crate::core::config::TranslatorConfig;
use crate::core::language::LANGUAGES;
use crate::core::models::{Mode, TranslationOutcome};

/// Commands for DuoReadme
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate README documents from project information
    Gen {
        /// Project information file (required)
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated language codes, e.g. en,zh-Hans,ja
        #[arg(short, long, value_delimiter = ',', required = true)]
        languages: Vec<String>,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Language of the input (overrides configuration)
        #[arg(long)]
        source_language: Option<String>,
    },

    /// Translate an existing README into other languages
    Trans {
        /// README file to translate (required)
        #[arg(short, long)]
        input: PathBuf,

        /// Comma separated language codes, e.g. en,zh-Hans,ja
        #[arg(short, long, value_delimiter = ',', required = true)]
        languages: Vec<String>,

        /// Write the JSON result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Language of the input (overrides configuration)
        #[arg(long)]
        source_language: Option<String>,
    },

    /// List supported language codes
    Languages,
}

/// Handle `gen` and `trans`
pub async fn handle_readme(
    config: TranslatorConfig,
    mode: Mode,
    input: PathBuf,
    languages: Vec<String>,
    output: Option<PathBuf>,
    source_language: Option<String>,
) -> anyhow::Result<()> {
    let start_time = Instant::now();

    let mut config = config;
    if let Some(source_language) = source_language {
        config.source_language = source_language;
    }

    let content = tokio::fs::read_to_string(&input).await?;
    if content.trim().is_empty() {
        anyhow::bail!("Input file is empty: {}", input.display());
    }

    info!("Mode: {}", mode);
    info!("Input: {}", input.display());
    info!("Languages: {}", languages.join(", "));

    let translator = ReadmeTranslator::new(config)?;
    let request = translator.request(content, languages, mode);

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Waiting for {}...", translator.provider_name()));
    pb.enable_steady_tick(Duration::from_millis(120));

    let result = translator.translate(&request).await;
    pb.finish_and_clear();
    let outcome = result?;

    let json = outcome.to_json()?;
    match &output {
        Some(path) => write_output(path, &json).await?,
        None => println!("{}", json),
    }

    print_summary(&outcome, start_time.elapsed());

    if outcome.success_count() == 0 {
        anyhow::bail!("All {} languages failed", outcome.failure_count());
    }
    Ok(())
}

/// Handle `languages`
pub fn handle_languages() {
    for (code, name) in LANGUAGES {
        println!("{:<10} {}", code, name);
    }
}

async fn write_output(path: &Path, json: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;
    info!("Result written to {}", path.display());
    Ok(())
}

fn print_summary(outcome: &TranslationOutcome, elapsed: Duration) {
    eprintln!("\n✅ Completed in {:?}", elapsed);
    eprintln!("   Succeeded: {}", outcome.success_count());
    eprintln!("   Failed: {}", outcome.failure_count());
    for failure in outcome.failures() {
        if let Some(err) = &failure.error {
            eprintln!("   - {}: {}", failure.language_code, err);
        }
    }
}
