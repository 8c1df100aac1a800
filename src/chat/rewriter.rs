//! Standalone-question rewriting.

use crate::error::Result;
use crate::integrations::{ChatMessage, OpenAIClient};
use crate::prompts::QUERY_REWRITE_SYSTEM;
use crate::session::ChatTurn;

const REWRITE_TEMPERATURE: f32 = 0.2;

/// Rewrite a conversational question into a standalone English question
/// using the session history as context. The model output is returned
/// verbatim; nothing validates that it differs from the input.
pub async fn rewrite(
    llm: &OpenAIClient,
    model: &str,
    question: &str,
    history: &[ChatTurn],
) -> Result<String> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(QUERY_REWRITE_SYSTEM));
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(ChatMessage::user(question));

    llm.chat_completion(messages, model, REWRITE_TEMPERATURE).await
}
