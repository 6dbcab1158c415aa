//! # Challenge Mailer CLI (`mailer`)
//!
//! ## Usage
//!
//! ```bash
//! mailer --config ./config/mailer.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mailer generate "<Challenge> \| <Company>"` | Draft a cold email |
//! | `mailer index` | Build the index if the workbook changed |
//! | `mailer search "<query>"` | Show raw similarity matches |
//!
//! Azure credentials come from `[azure]` in the config file or from
//! `AZURE_AI_ENDPOINT` / `AZURE_AI_KEY` (a `.env` file is honoured).
//! Logs go to stderr; stdout carries only command output.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use challenge_mailer::config;
use challenge_mailer::error::MailerError;
use challenge_mailer::index::VectorIndex;
use challenge_mailer::pipeline::{format_for_display, parse_input, Mailer, Outcome};

const DEFAULT_CONFIG: &str = "./config/mailer.toml";

/// Draft cold emails inviting companies to innovation challenges.
#[derive(Parser)]
#[command(
    name = "mailer",
    about = "Retrieval-augmented cold emails for innovation challenges",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/mailer.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log pipeline detail at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft an email for `"<Challenge Name> | <Company Name>"`.
    Generate {
        input: String,

        /// Workbook to read instead of `[source].path`.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print the titles and URLs the email was written from.
        #[arg(long)]
        sources: bool,
    },

    /// Make sure the index matches the workbook.
    Index {
        #[arg(long)]
        file: Option<PathBuf>,

        /// Rebuild even when the workbook is unchanged.
        #[arg(long)]
        force: bool,
    },

    /// Print the nearest chunks for a query.
    Search {
        query: String,

        /// Number of matches (defaults to `[retrieval].k`).
        #[arg(long)]
        k: Option<usize>,

        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("challenge_mailer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("challenge_mailer=info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_mailer(cfg: config::Config, file: Option<PathBuf>) -> anyhow::Result<Mailer> {
    let mailer = Mailer::from_config(cfg)?;
    Ok(match file {
        Some(path) => mailer.with_source_path(path),
        None => mailer,
    })
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}…", &flat[..end]),
        None => flat,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let explicit = cli.config.is_some();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut cfg = config::load_config_or_default(&config_path, explicit)?;
    cfg.apply_env();
    cfg.validate()?;

    match cli.command {
        Commands::Generate {
            input,
            file,
            sources,
        } => {
            // Reject malformed input before credentials or the index come into play.
            if parse_input(&input).is_none() {
                return Err(MailerError::Parse.into());
            }
            let mailer = build_mailer(cfg, file)?;
            match mailer.run(&input).await? {
                Outcome::Email(email) => {
                    println!("{}", format_for_display(&email.text));
                    if sources {
                        println!();
                        println!("Sources:");
                        for source in &email.sources {
                            println!("  - {} ({})", source.title, source.url);
                        }
                    }
                }
                other => println!("{}", other.message()),
            }
        }
        Commands::Index { file, force } => {
            let mailer = build_mailer(cfg, file)?;
            let resolved = mailer.resolve_index_with(force).await?;
            let action = if resolved.rebuilt { "Rebuilt" } else { "Loaded" };
            println!(
                "{} index at {} ({} entries)",
                action,
                mailer.index_store().layout().index_path().display(),
                resolved.index.len()
            );
        }
        Commands::Search { query, k, file } => {
            let k = k.unwrap_or(cfg.retrieval.k);
            let mailer = build_mailer(cfg, file)?;
            let resolved = mailer.resolve_index().await?;
            let matches = resolved.index.similarity_search(&query, k).await?;
            if matches.is_empty() {
                println!("No results.");
            }
            for (i, m) in matches.iter().enumerate() {
                println!("{}. {} (score {:.4})", i + 1, m.metadata.title, m.score);
                println!("   {}", m.metadata.url);
                println!("   {}", snippet(&m.text, 160));
            }
        }
    }

    Ok(())
}
