//! Error types for the mailer pipeline.
//!
//! [`MailerError`] is what a pipeline run can fail with. Calls to hosted
//! models fail with [`ServiceError`]; the extraction stage recovers from
//! those per document, every other stage treats them as fatal.

use thiserror::Error;

/// Failure talking to the embedding or chat completion service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid service response: {0}")]
    InvalidResponse(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Rate limits, server errors, and transport failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Http { status, .. } => *status == 429 || *status >= 500,
            ServiceError::Transport(_) => true,
            _ => false,
        }
    }
}

/// The persisted index could not be read back.
#[derive(Debug, Error)]
pub enum IndexLoadError {
    #[error("index not found at {0}")]
    Missing(String),

    #[error("index at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
}

/// The source workbook could not be read.
#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid xlsx archive: {0}")]
    Archive(String),

    #[error("malformed worksheet XML: {0}")]
    Xml(String),

    #[error("workbook has no worksheets")]
    NoWorksheet,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Incorrect format. Use: 'Challenge Name | Company Name'")]
    Parse,

    #[error(transparent)]
    IndexLoad(#[from] IndexLoadError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Source(#[from] SpreadsheetError),

    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no challenge facts to write an email from")]
    EmptyFacts,
}
