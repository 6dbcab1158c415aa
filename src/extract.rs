//! Extraction stage: distill candidate chunks down to challenge facts.
//!
//! Each candidate is sent to the chat model on its own with the question
//! (the challenge name). Responses that are empty or one of the model's
//! "nothing found" sentinels are dropped; a failed call only skips that
//! candidate.

use crate::chat::ChatService;
use crate::models::{ExtractedFacts, SearchMatch};

pub const EXTRACTION_SYSTEM_PROMPT: &str = "\
You are a challenge information extractor. You receive a question that names an \
innovation challenge and an article taken from a challenge database. Extract only \
the facts from the article that are relevant to that challenge: the problem owner, \
the problem to solve, goals, requirements, budget, deadlines, and how to take part. \
Reply with the facts as short plain sentences and do not add anything that is not \
in the article. If the article contains nothing relevant to the question, reply \
with exactly []";

/// Trimmed responses that mean "nothing relevant".
const EMPTY_SENTINELS: [&str; 3] = ["", "[]", "\"\""];

/// Output of [`extract_relevant`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Candidates that yielded facts, in their original order.
    pub used_sources: Vec<ExtractedFacts>,
    /// `extracted_facts` of every used source joined with newlines.
    pub combined_text: String,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.combined_text.trim().is_empty()
    }
}

/// True when a model response carries actual facts.
pub fn has_relevant_facts(extracted: &str) -> bool {
    !EMPTY_SENTINELS.contains(&extracted.trim())
}

pub fn extraction_user_prompt(question: &str, article: &str) -> String {
    format!("Question: {}\n\nArticle:\n{}", question, article)
}

pub async fn extract_relevant(
    chat: &dyn ChatService,
    documents: &[SearchMatch],
    question: &str,
) -> Extraction {
    let mut used_sources = Vec::new();

    for doc in documents {
        let title = &doc.metadata.title;
        let prompt = extraction_user_prompt(question, &doc.text);
        let extracted = match chat.complete(EXTRACTION_SYSTEM_PROMPT, &prompt).await {
            Ok(response) => response.trim().to_string(),
            Err(e) => {
                tracing::warn!(%title, error = %e, "extraction failed, skipping document");
                continue;
            }
        };

        if !has_relevant_facts(&extracted) {
            tracing::debug!(%title, "no useful info");
            continue;
        }
        tracing::debug!(%title, facts = %extracted, "extracted facts");

        used_sources.push(ExtractedFacts {
            title: doc.metadata.title.clone(),
            url: doc.metadata.url.clone(),
            extracted_facts: extracted,
        });
    }

    let combined_text = used_sources
        .iter()
        .map(|s| s.extracted_facts.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    Extraction {
        used_sources,
        combined_text,
    }
}
