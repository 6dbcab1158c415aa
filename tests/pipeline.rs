//! End-to-end pipeline runs against an on-disk workbook and index, with
//! deterministic in-process stand-ins for the embedding and chat services.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use challenge_mailer::chat::ChatService;
use challenge_mailer::config::Config;
use challenge_mailer::embedding::EmbeddingService;
use challenge_mailer::error::{IndexLoadError, MailerError, ServiceError, SpreadsheetError};
use challenge_mailer::extract::EXTRACTION_SYSTEM_PROMPT;
use challenge_mailer::fingerprint::compute_hash;
use challenge_mailer::generate::EMAIL_SYSTEM_PROMPT;
use challenge_mailer::index::VectorIndex;
use challenge_mailer::pipeline::{Mailer, Outcome};

const DIMS: usize = 32;

/// Bag-of-words vectors: every lowercase word bumps one hashed dimension.
struct WordEmbedder {
    calls: AtomicUsize,
}

fn word_slot(word: &str) -> usize {
    let mut h: u32 = 2166136261;
    for b in word.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(16777619);
    }
    1 + (h as usize % (DIMS - 1))
}

#[async_trait]
impl EmbeddingService for WordEmbedder {
    fn model_name(&self) -> &str {
        "bag-of-words"
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; DIMS];
                v[0] = 0.1;
                for word in t
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|w| !w.is_empty())
                {
                    v[word_slot(&word.to_lowercase())] += 1.0;
                }
                v
            })
            .collect())
    }
}

/// Answers extraction prompts with `extraction_reply` and writes a
/// templated email for generation prompts.
struct StubChat {
    extraction_reply: &'static str,
    extraction_calls: AtomicUsize,
    generation_calls: AtomicUsize,
}

impl StubChat {
    fn new(extraction_reply: &'static str) -> Self {
        Self {
            extraction_reply,
            extraction_calls: AtomicUsize::new(0),
            generation_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatService for StubChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ServiceError> {
        if system == EXTRACTION_SYSTEM_PROMPT {
            self.extraction_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.extraction_reply.to_string())
        } else if system == EMAIL_SYSTEM_PROMPT {
            self.generation_calls.fetch_add(1, Ordering::SeqCst);
            let company = user.rsplit("Company name: ").next().unwrap_or_default();
            Ok(format!(
                "Subject: An invitation for {}\nDear {},\nJoin our challenge.\n",
                company, company
            ))
        } else {
            Err(ServiceError::InvalidResponse("unexpected system prompt".into()))
        }
    }
}

fn shared_strings(strings: &[&str]) -> String {
    let items: String = strings
        .iter()
        .map(|s| format!("<si><t>{}</t></si>", s))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</sst>"#,
        items
    )
}

/// Write a one-sheet workbook whose rows are `(title, url, description)`.
fn write_workbook(path: &Path, rows: &[(&str, &str, &str)]) {
    let mut strings = vec!["Challenge Name", "URL", "Description"];
    for (title, url, description) in rows {
        strings.extend([*title, *url, *description]);
    }

    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for r in 0..=rows.len() {
        let row = r + 1;
        sheet.push_str(&format!(
            r#"<row r="{row}"><c r="A{row}" t="s"><v>{}</v></c><c r="B{row}" t="s"><v>{}</v></c><c r="C{row}" t="s"><v>{}</v></c></row>"#,
            r * 3,
            r * 3 + 1,
            r * 3 + 2,
        ));
    }
    sheet.push_str("</sheetData></worksheet>");

    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("xl/sharedStrings.xml", options).unwrap();
    zip.write_all(shared_strings(&strings).as_bytes()).unwrap();
    zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
    zip.write_all(sheet.as_bytes()).unwrap();
    zip.finish().unwrap();
}

const ROWS: &[(&str, &str, &str)] = &[
    (
        "Smart Logistics",
        "https://example.org/smart-logistics",
        "Reduce empty truck kilometres between regional warehouses",
    ),
    (
        "Green Energy Storage",
        "https://example.org/green-energy",
        "Store solar surplus for evening peaks",
    ),
    (
        "Digital Healthcare",
        "https://example.org/healthcare",
        "Remote monitoring for elderly patients",
    ),
];

struct Fixture {
    _tmp: TempDir,
    workbook: PathBuf,
    store_dir: PathBuf,
    config: Config,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let workbook = tmp.path().join("challenges.xlsx");
    write_workbook(&workbook, ROWS);

    let mut config = Config::default();
    config.store.embeddings_dir = tmp.path().join("vstore");
    config.source.path = workbook.clone();
    let store_dir = config.store.dir();

    Fixture {
        _tmp: tmp,
        workbook,
        store_dir,
        config,
    }
}

fn make_mailer(config: &Config, chat: Arc<StubChat>) -> (Mailer, Arc<WordEmbedder>) {
    let embedder = Arc::new(WordEmbedder {
        calls: AtomicUsize::new(0),
    });
    (Mailer::new(config.clone(), embedder.clone(), chat), embedder)
}

#[tokio::test]
async fn test_generates_email_and_records_hash() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("Owner wants fewer empty trucks."));
    let (mailer, _) = make_mailer(&fx.config, chat.clone());

    let outcome = mailer.run("Smart Logistics | Acme BV").await.unwrap();
    let email = match outcome {
        Outcome::Email(email) => email,
        other => panic!("expected an email, got {:?}", other),
    };

    assert!(email.text.starts_with("Subject: An invitation for Acme BV"));
    assert!(!email.text.ends_with('\n'));
    assert!(!email.sources.is_empty());
    assert!(email.sources.iter().all(|s| s.title == "Smart Logistics"));
    assert_eq!(email.sources[0].url, "https://example.org/smart-logistics");
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 1);

    let stored = fs::read_to_string(fx.store_dir.join("hash.txt")).unwrap();
    assert_eq!(stored.trim(), compute_hash(&fx.workbook).unwrap());
    assert!(fx.store_dir.join("index.sqlite").is_file());
}

#[tokio::test]
async fn test_title_match_ignores_case_and_padding() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("Storage facts."));
    let (mailer, _) = make_mailer(&fx.config, chat);

    let outcome = mailer.run("  green ENERGY storage |Acme BV").await.unwrap();
    match outcome {
        Outcome::Email(email) => {
            assert_eq!(email.sources[0].title, "Green Energy Storage");
        }
        other => panic!("expected an email, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_challenge_has_no_exact_match() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("unused"));
    let (mailer, _) = make_mailer(&fx.config, chat.clone());

    let outcome = mailer.run("Unknown Challenge | Acme BV").await.unwrap();
    match &outcome {
        Outcome::NoExactMatch { challenge } => assert_eq!(challenge, "Unknown Challenge"),
        other => panic!("expected NoExactMatch, got {:?}", other),
    }
    assert_eq!(
        outcome.message(),
        "Geen exacte match gevonden voor 'Unknown Challenge'."
    );
    assert_eq!(chat.extraction_calls.load(Ordering::SeqCst), 0);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_extractions_skip_generation() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new(" [] "));
    let (mailer, _) = make_mailer(&fx.config, chat.clone());

    let outcome = mailer.run("Smart Logistics | Acme BV").await.unwrap();
    assert!(matches!(outcome, Outcome::NoUsefulFacts));
    assert!(chat.extraction_calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_input_never_touches_index() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("unused"));
    let (mailer, embedder) = make_mailer(&fx.config, chat);

    let err = mailer.run("JustOneField").await.unwrap_err();
    assert!(matches!(err, MailerError::Parse));
    assert_eq!(
        err.to_string(),
        "Incorrect format. Use: 'Challenge Name | Company Name'"
    );
    assert!(!fx.store_dir.exists());
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unchanged_workbook_loads_existing_index() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("facts"));
    let (mailer, _) = make_mailer(&fx.config, chat);

    let first = mailer.resolve_index().await.unwrap();
    assert!(first.rebuilt);
    assert_eq!(first.index.len(), ROWS.len());

    let second = mailer.resolve_index().await.unwrap();
    assert!(!second.rebuilt);
    assert_eq!(second.index.len(), first.index.len());
    assert_eq!(second.index.model(), "bag-of-words");

    let forced = mailer.resolve_index_with(true).await.unwrap();
    assert!(forced.rebuilt);
}

#[tokio::test]
async fn test_changed_workbook_triggers_rebuild() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("facts"));
    let (mailer, _) = make_mailer(&fx.config, chat);

    mailer.resolve_index().await.unwrap();
    let old_hash = fs::read_to_string(fx.store_dir.join("hash.txt")).unwrap();

    let mut rows = ROWS.to_vec();
    rows.push((
        "Circular Packaging",
        "https://example.org/packaging",
        "Reusable crates for food retail",
    ));
    write_workbook(&fx.workbook, &rows);

    let resolved = mailer.resolve_index().await.unwrap();
    assert!(resolved.rebuilt);
    assert_eq!(resolved.index.len(), rows.len());
    let new_hash = fs::read_to_string(fx.store_dir.join("hash.txt")).unwrap();
    assert_ne!(old_hash, new_hash);
}

#[tokio::test]
async fn test_corrupt_index_with_matching_hash() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("facts"));
    let (mailer, _) = make_mailer(&fx.config, chat);

    mailer.resolve_index().await.unwrap();
    fs::write(
        fx.store_dir.join("index.sqlite"),
        b"this is not a sqlite database, just some bytes padded out to look like one........",
    )
    .unwrap();

    let err = mailer.run("Smart Logistics | Acme BV").await.unwrap_err();
    assert!(
        matches!(err, MailerError::IndexLoad(IndexLoadError::Corrupt { .. })),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_missing_workbook_is_a_source_error() {
    let fx = fixture();
    let chat = Arc::new(StubChat::new("facts"));
    let (mailer, _) = make_mailer(&fx.config, chat);
    let mailer = mailer.with_source_path(fx.workbook.with_file_name("missing.xlsx"));

    let err = mailer.resolve_index().await.unwrap_err();
    assert!(matches!(err, MailerError::Source(SpreadsheetError::Io { .. })));
    assert!(!fx.store_dir.join("hash.txt").exists());
}
