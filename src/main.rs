//! Main entry point for the DuoReadme CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duoreadme::cli::commands::{self, Commands};
use duoreadme::core::config::TranslatorConfig;
use duoreadme::Mode;

/// DuoReadme - multilingual README generation and translation
#[derive(Parser, Debug)]
#[command(name = "duoreadme", version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to ./duoreadme.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend to use: tencent or siliconflow
    #[arg(long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", env!("CARGO_CRATE_NAME"), log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = match args.command {
        Some(command) => command,
        None => {
            eprintln!("Please specify a command. Use --help for more information.");
            return Ok(());
        }
    };

    if let Commands::Languages = command {
        commands::handle_languages();
        return Ok(());
    }

    let mut config = TranslatorConfig::load(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        config.provider = provider;
    }

    match command {
        Commands::Gen {
            input,
            languages,
            output,
            source_language,
        } => {
            commands::handle_readme(config, Mode::Generate, input, languages, output, source_language)
                .await?;
        }
        Commands::Trans {
            input,
            languages,
            output,
            source_language,
        } => {
            commands::handle_readme(config, Mode::Translate, input, languages, output, source_language)
                .await?;
        }
        Commands::Languages => {}
    }

    Ok(())
}
