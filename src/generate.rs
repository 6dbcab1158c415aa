//! Generation stage: write the email from extracted challenge facts.

use crate::chat::ChatService;
use crate::error::{MailerError, ServiceError};

pub const EMAIL_SYSTEM_PROMPT: &str = "\
You are an experienced B2B copywriter who invites small and medium-sized \
companies to take part in innovation challenges. Write a short, persuasive, \
personal cold email addressed to the given company, based only on the \
challenge information provided. Structure it with the AIDA framework:
- Attention: open with a subject line and a first sentence that make the \
company curious about the challenge.
- Interest: explain the problem the challenge owner wants solved and why it \
matters.
- Desire: show why this company is a good fit and what it gains by taking part.
- Action: end with one clear call to action, such as visiting the challenge page \
or replying to schedule a call.
Put the subject line on the first line. Keep the tone friendly and professional, \
do not invent facts that are not in the challenge information, and write in the \
same language as the challenge information.";

pub fn email_user_prompt(combined_text: &str, company_name: &str) -> String {
    format!(
        "Challenge info:\n{}\n\nCompany name: {}",
        combined_text, company_name
    )
}

/// Ask the model for the email; returns its trimmed reply verbatim.
///
/// Blank `combined_text` is refused with [`MailerError::EmptyFacts`]
/// without calling the model. A blank reply is an invalid response.
pub async fn generate_email(
    chat: &dyn ChatService,
    combined_text: &str,
    company_name: &str,
) -> Result<String, MailerError> {
    if combined_text.trim().is_empty() {
        return Err(MailerError::EmptyFacts);
    }
    let prompt = email_user_prompt(combined_text, company_name);
    let email = chat.complete(EMAIL_SYSTEM_PROMPT, &prompt).await?;
    let email = email.trim();
    if email.is_empty() {
        return Err(
            ServiceError::InvalidResponse("model returned an empty email".to_string()).into(),
        );
    }
    Ok(email.to_string())
}
