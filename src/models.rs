//! Core data models used throughout the mailer.
//!
//! These types represent the rows, chunks, search matches, and extracted
//! facts that flow through the indexing and generation pipeline.

use serde::Serialize;

/// Metadata carried from a spreadsheet row onto every chunk cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowMetadata {
    pub title: String,
    pub url: String,
    pub source: String,
}

/// One spreadsheet row flattened into `"col: value | col: value"` text.
#[derive(Debug, Clone)]
pub struct RowRecord {
    pub text: String,
    pub metadata: RowMetadata,
}

/// A bounded window of a row's text, ready to be embedded.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Position of the source row among the records that were chunked.
    pub row_index: usize,
    /// Position of this window within its row, starting at 0.
    pub window_index: usize,
    pub text: String,
    pub metadata: RowMetadata,
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub text: String,
    pub metadata: RowMetadata,
    /// Cosine similarity between the query and the chunk vector.
    pub score: f32,
}

/// Facts the model pulled out of one candidate document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedFacts {
    pub title: String,
    pub url: String,
    pub extracted_facts: String,
}
