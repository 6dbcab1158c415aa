//! Persisted vector index over spreadsheet chunks.
//!
//! The index lives in a single SQLite file, `<embeddings_dir>/<store_name>/index.sqlite`,
//! next to the `hash.txt` fingerprint of the workbook it was built from.
//! Vectors are stored as little-endian f32 BLOBs and searched brute-force
//! with cosine similarity once loaded into memory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::config::StoreConfig;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, EmbeddingService};
use crate::error::{IndexLoadError, MailerError, ServiceError};
use crate::models::{Chunk, RowMetadata, SearchMatch};

const INDEX_FILE: &str = "index.sqlite";
const HASH_FILE: &str = "hash.txt";

/// Similarity search over embedded chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Up to `k` matches, most similar to `query` first.
    async fn similarity_search(&self, query: &str, k: usize)
        -> Result<Vec<SearchMatch>, ServiceError>;

    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the index artifact and fingerprint live on disk.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    dir: PathBuf,
}

impl StoreLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn hash_path(&self) -> PathBuf {
        self.dir.join(HASH_FILE)
    }

    pub fn index_exists(&self) -> bool {
        self.index_path().is_file()
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    text: String,
    metadata: RowMetadata,
    vector: Vec<f32>,
}

/// An index held in memory, queried through an [`EmbeddingService`].
pub struct EmbeddedIndex {
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn EmbeddingService>,
    model: String,
    built_at: Option<String>,
}

impl std::fmt::Debug for EmbeddedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedIndex")
            .field("entries", &self.entries.len())
            .field("model", &self.model)
            .field("built_at", &self.built_at)
            .finish_non_exhaustive()
    }
}

impl EmbeddedIndex {
    /// Embedding model the vectors were produced with.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// RFC 3339 build time, when recorded.
    pub fn built_at(&self) -> Option<&str> {
        self.built_at.as_deref()
    }

    /// Rank entries against an already embedded query.
    pub fn search_vector(&self, query_vec: &[f32], k: usize) -> Vec<SearchMatch> {
        let mut matches: Vec<SearchMatch> = self
            .entries
            .iter()
            .map(|e| SearchMatch {
                text: e.text.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(k);
        matches
    }
}

#[async_trait]
impl VectorIndex for EmbeddedIndex {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchMatch>, ServiceError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(query).await?;
        Ok(self.search_vector(&query_vec, k))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Builds and loads the persisted index.
pub struct IndexStore {
    layout: StoreLayout,
    embedder: Arc<dyn EmbeddingService>,
}

impl IndexStore {
    pub fn new(layout: StoreLayout, embedder: Arc<dyn EmbeddingService>) -> Self {
        Self { layout, embedder }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Embed every chunk and persist the result, replacing any previous index.
    ///
    /// Nothing is written until all embeddings have been produced, so an
    /// embedding failure leaves the previous artifact untouched.
    pub async fn build(
        &self,
        chunks: impl IntoIterator<Item = Chunk>,
    ) -> Result<EmbeddedIndex, MailerError> {
        let chunks: Vec<Chunk> = chunks.into_iter().collect();
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_texts(&texts).await?
        };
        if vectors.len() != chunks.len() {
            return Err(ServiceError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            ))
            .into());
        }

        let built_at = chrono::Utc::now().to_rfc3339();
        std::fs::create_dir_all(self.layout.dir())?;
        let tmp_path = self.layout.dir().join(format!("{}.tmp", INDEX_FILE));
        remove_if_exists(&tmp_path)?;

        let pool = open_pool(&tmp_path, false).await?;
        let model = self.embedder.model_name();
        let written = write_entries(&pool, &chunks, &vectors, model, &built_at).await;
        pool.close().await;
        written?;

        std::fs::rename(&tmp_path, self.layout.index_path())?;
        tracing::info!(
            entries = chunks.len(),
            path = %self.layout.index_path().display(),
            "index built"
        );

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                text: chunk.text,
                metadata: chunk.metadata,
                vector,
            })
            .collect();

        Ok(EmbeddedIndex {
            entries,
            embedder: self.embedder.clone(),
            model: self.embedder.model_name().to_string(),
            built_at: Some(built_at),
        })
    }

    /// Read the persisted index back into memory.
    pub async fn load(&self) -> Result<EmbeddedIndex, IndexLoadError> {
        let path = self.layout.index_path();
        if !path.is_file() {
            return Err(IndexLoadError::Missing(path.display().to_string()));
        }
        let corrupt = |reason: String| IndexLoadError::Corrupt {
            path: path.display().to_string(),
            reason,
        };

        let pool = open_pool(&path, true)
            .await
            .map_err(|e| corrupt(e.to_string()))?;
        let loaded = read_entries(&pool).await;
        let meta = read_meta(&pool).await;
        pool.close().await;

        let entries = loaded.map_err(|e| corrupt(e.to_string()))?;
        let (model, built_at) = meta.map_err(|e| corrupt(e.to_string()))?;

        if let Some(first) = entries.first() {
            let dims = first.vector.len();
            if dims == 0 || entries.iter().any(|e| e.vector.len() != dims) {
                return Err(corrupt("inconsistent vector dimensions".to_string()));
            }
        }

        tracing::info!(entries = entries.len(), path = %path.display(), "index loaded");
        Ok(EmbeddedIndex {
            entries,
            embedder: self.embedder.clone(),
            model: model.unwrap_or_else(|| self.embedder.model_name().to_string()),
            built_at,
        })
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn open_pool(path: &Path, read_only: bool) -> Result<SqlitePool, sqlx::Error> {
    let mut options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(!read_only)
        .read_only(read_only);
    if !read_only {
        // A rollback journal keeps the finished artifact to a single file.
        options = options.journal_mode(SqliteJournalMode::Delete);
    }

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
}

async fn write_entries(
    pool: &SqlitePool,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    model: &str,
    built_at: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE entries (
            id INTEGER PRIMARY KEY,
            row_index INTEGER NOT NULL,
            window_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            title TEXT NOT NULL,
            url TEXT NOT NULL,
            source TEXT NOT NULL,
            vector BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE TABLE index_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(pool)
        .await?;

    let mut tx = pool.begin().await?;
    for (chunk, vector) in chunks.iter().zip(vectors) {
        sqlx::query(
            r#"
            INSERT INTO entries (row_index, window_index, text, title, url, source, vector)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(chunk.row_index as i64)
        .bind(chunk.window_index as i64)
        .bind(&chunk.text)
        .bind(&chunk.metadata.title)
        .bind(&chunk.metadata.url)
        .bind(&chunk.metadata.source)
        .bind(vec_to_blob(vector))
        .execute(&mut *tx)
        .await?;
    }

    let dims = vectors.first().map(|v| v.len()).unwrap_or(0);
    for (key, value) in [
        ("model", model.to_string()),
        ("dims", dims.to_string()),
        ("entries", chunks.len().to_string()),
        ("built_at", built_at.to_string()),
    ] {
        sqlx::query("INSERT INTO index_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

async fn read_entries(pool: &SqlitePool) -> Result<Vec<IndexEntry>, sqlx::Error> {
    let rows = sqlx::query("SELECT text, title, url, source, vector FROM entries ORDER BY id")
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| {
            let blob: Vec<u8> = row.try_get("vector")?;
            Ok(IndexEntry {
                text: row.try_get("text")?,
                metadata: RowMetadata {
                    title: row.try_get("title")?,
                    url: row.try_get("url")?,
                    source: row.try_get("source")?,
                },
                vector: blob_to_vec(&blob),
            })
        })
        .collect()
}

async fn read_meta(pool: &SqlitePool) -> Result<(Option<String>, Option<String>), sqlx::Error> {
    let rows = sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(pool)
        .await?;
    let mut model = None;
    let mut built_at = None;
    for row in rows {
        let key: String = row.try_get("key")?;
        let value: String = row.try_get("value")?;
        match key.as_str() {
            "model" => model = Some(value),
            "built_at" => built_at = Some(value),
            _ => {}
        }
    }
    Ok((model, built_at))
}
