//! # Challenge Mailer
//!
//! Retrieval-augmented cold-email drafting for innovation challenges.
//!
//! Challenges live as rows in an `.xlsx` workbook. Each row is flattened to
//! text, chunked, embedded, and persisted as a local vector index that is
//! rebuilt whenever the workbook's fingerprint changes. A request names a
//! challenge and a company; chunks whose title matches the challenge exactly
//! are distilled to facts by a chat model, and a second call turns those
//! facts into a short AIDA-structured email.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌────────────────┐
//! │ Workbook   │──▶│ Rows +    │──▶│ SQLite index   │
//! │ (.xlsx)    │   │ Chunks    │   │ + hash.txt     │
//! └────────────┘   └───────────┘   └───────┬────────┘
//!                                          │ similarity search
//!                                          ▼
//!                  ┌────────────┐   ┌────────────────┐
//!                  │ Generation │◀──│ Extraction     │
//!                  │ (AIDA)     │   │ (per document) │
//!                  └────────────┘   └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export AZURE_AI_ENDPOINT=https://my-resource.openai.azure.com
//! export AZURE_AI_KEY=...
//! mailer index                                   # build or refresh the index
//! mailer generate "Smart Logistics | Acme BV"    # draft an email
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error types |
//! | [`fingerprint`] | Source file hashing and staleness check |
//! | [`spreadsheet`] | `.xlsx` reading and row flattening |
//! | [`chunk`] | Overlapping text windows |
//! | [`azure`] | Azure OpenAI HTTP client with retries |
//! | [`embedding`] | Embedding service abstraction |
//! | [`chat`] | Chat completion service abstraction |
//! | [`index`] | Persisted vector index |
//! | [`extract`] | Fact extraction stage |
//! | [`generate`] | Email generation stage |
//! | [`pipeline`] | End-to-end orchestration |

pub mod azure;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod generate;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod spreadsheet;
