//! The email pipeline: resolve index → search → exact-title filter →
//! extraction → generation.
//!
//! ```text
//! Idle ──resolve_index──▶ IndexReady ──find_candidates──▶ CandidatesFound
//!                                         │ none                │
//!                                         ▼                     ▼ extract_relevant
//!                                    NoExactMatch         FactsExtracted ──generate──▶ EmailGenerated
//!                                                               │ blank
//!                                                               ▼
//!                                                         NoUsefulFacts
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::{AzureChat, ChatService};
use crate::chunk::{chunk_rows, Splitter};
use crate::config::Config;
use crate::embedding::{AzureEmbeddings, EmbeddingService};
use crate::error::MailerError;
use crate::extract::extract_relevant;
use crate::fingerprint;
use crate::generate::generate_email;
use crate::index::{EmbeddedIndex, IndexStore, StoreLayout, VectorIndex};
use crate::models::{ExtractedFacts, SearchMatch};
use crate::spreadsheet;

/// Split `"<Challenge Name> | <Company Name>"` into its two trimmed parts.
///
/// Returns `None` unless there is exactly one `|` and both sides are non-empty.
pub fn parse_input(raw: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = raw.split('|').collect();
    if parts.len() != 2 {
        return None;
    }
    let challenge = parts[0].trim();
    let company = parts[1].trim();
    if challenge.is_empty() || company.is_empty() {
        return None;
    }
    Some((challenge.to_string(), company.to_string()))
}

/// Case-insensitive, whitespace-trimmed title comparison.
pub fn titles_match(title: &str, challenge: &str) -> bool {
    title.trim().to_lowercase() == challenge.trim().to_lowercase()
}

/// Lay an email out for the terminal: subject line, blank line, body.
pub fn format_for_display(email: &str) -> String {
    match email.split_once('\n') {
        Some((first, rest)) => format!("{}\n\n{}", first, rest),
        None => format!("{}\n", email),
    }
}

/// A drafted email together with the facts it was written from.
#[derive(Debug, Clone)]
pub struct GeneratedEmail {
    pub text: String,
    pub sources: Vec<ExtractedFacts>,
}

/// How a pipeline run ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    Email(GeneratedEmail),
    /// No search result carried exactly the requested title.
    NoExactMatch { challenge: String },
    /// Candidates were found but none yielded usable facts.
    NoUsefulFacts,
}

impl Outcome {
    /// Text to show the user.
    pub fn message(&self) -> String {
        match self {
            Outcome::Email(email) => email.text.clone(),
            Outcome::NoExactMatch { challenge } => {
                format!("Geen exacte match gevonden voor '{}'.", challenge)
            }
            Outcome::NoUsefulFacts => {
                "Geen relevante informatie gevonden voor deze uitdaging.".to_string()
            }
        }
    }
}

/// Index ready for searching, and whether it had to be rebuilt.
#[derive(Debug)]
pub struct ResolvedIndex {
    pub index: EmbeddedIndex,
    pub rebuilt: bool,
}

/// Wires the configuration and model services into pipeline runs.
pub struct Mailer {
    config: Config,
    embedder: Arc<dyn EmbeddingService>,
    chat: Arc<dyn ChatService>,
}

impl Mailer {
    pub fn new(
        config: Config,
        embedder: Arc<dyn EmbeddingService>,
        chat: Arc<dyn ChatService>,
    ) -> Self {
        Self {
            config,
            embedder,
            chat,
        }
    }

    /// Mailer backed by the Azure OpenAI deployments named in `config.azure`.
    pub fn from_config(config: Config) -> Result<Self, MailerError> {
        let embedder = Arc::new(AzureEmbeddings::new(&config.azure)?);
        let chat = Arc::new(AzureChat::new(&config.azure)?);
        Ok(Self::new(config, embedder, chat))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read from a different workbook than the configured one.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source.path = path.into();
        self
    }

    pub fn index_store(&self) -> IndexStore {
        IndexStore::new(
            StoreLayout::from_config(&self.config.store),
            self.embedder.clone(),
        )
    }

    /// Load the persisted index, rebuilding it first when it is stale.
    pub async fn resolve_index(&self) -> Result<ResolvedIndex, MailerError> {
        self.resolve_index_with(false).await
    }

    /// Like [`resolve_index`](Self::resolve_index), optionally forcing a rebuild.
    pub async fn resolve_index_with(&self, force: bool) -> Result<ResolvedIndex, MailerError> {
        let store = self.index_store();
        let layout = store.layout();
        let source_path = &self.config.source.path;

        let current = fingerprint::compute_hash(source_path).map_err(|source| {
            crate::error::SpreadsheetError::Io {
                path: source_path.display().to_string(),
                source,
            }
        })?;
        let stored = fingerprint::read_stored_hash(&layout.hash_path())?;
        let stale = fingerprint::is_stale(&current, stored.as_deref(), layout.index_exists());

        if !force && !stale {
            tracing::info!("index up to date, loading");
            let index = store.load().await?;
            return Ok(ResolvedIndex {
                index,
                rebuilt: false,
            });
        }

        tracing::info!(
            source = %source_path.display(),
            forced = force,
            "index stale, rebuilding"
        );
        let table = spreadsheet::read_workbook(source_path)?;
        let rows = spreadsheet::row_records(&table, &self.config.source);
        let splitter = Splitter::from_config(&self.config.chunking);
        let index = store.build(chunk_rows(&rows, &splitter)).await?;
        fingerprint::write_stored_hash(&layout.hash_path(), &current)?;
        tracing::info!(rows = rows.len(), entries = index.len(), "index rebuilt");

        Ok(ResolvedIndex {
            index,
            rebuilt: true,
        })
    }

    /// Similarity-search for the challenge and keep exact title matches only.
    pub async fn find_candidates(
        &self,
        index: &dyn VectorIndex,
        challenge: &str,
    ) -> Result<Vec<SearchMatch>, MailerError> {
        let matches = index
            .similarity_search(challenge, self.config.retrieval.k)
            .await?;
        let found = matches.len();
        let candidates: Vec<SearchMatch> = matches
            .into_iter()
            .filter(|m| titles_match(&m.metadata.title, challenge))
            .collect();
        tracing::info!(found, exact = candidates.len(), %challenge, "similarity search");
        Ok(candidates)
    }

    /// Run search, extraction, and generation against an already resolved index.
    pub async fn generate_cold_email(
        &self,
        index: &dyn VectorIndex,
        challenge: &str,
        company: &str,
    ) -> Result<Outcome, MailerError> {
        let candidates = self.find_candidates(index, challenge).await?;
        if candidates.is_empty() {
            return Ok(Outcome::NoExactMatch {
                challenge: challenge.to_string(),
            });
        }

        let extraction = extract_relevant(self.chat.as_ref(), &candidates, challenge).await;
        if extraction.is_empty() {
            return Ok(Outcome::NoUsefulFacts);
        }
        tracing::info!(sources = extraction.used_sources.len(), "facts extracted");

        let text = generate_email(self.chat.as_ref(), &extraction.combined_text, company).await?;
        Ok(Outcome::Email(GeneratedEmail {
            text,
            sources: extraction.used_sources,
        }))
    }

    /// Parse the raw `"Challenge | Company"` input and run the whole pipeline.
    ///
    /// Malformed input fails with [`MailerError::Parse`] before the index is touched.
    pub async fn run(&self, raw_input: &str) -> Result<Outcome, MailerError> {
        let (challenge, company) = parse_input(raw_input).ok_or(MailerError::Parse)?;
        let resolved = self.resolve_index().await?;
        self.generate_cold_email(&resolved.index, &challenge, &company)
            .await
    }
}
