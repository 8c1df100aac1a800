//! Answer composition.

use crate::error::Result;
use crate::integrations::{ChatMessage, OpenAIClient};
use crate::prompts::{answer_system_prompt, NO_CONTEXT_FALLBACK};
use crate::session::ChatTurn;

const ANSWER_TEMPERATURE: f32 = 0.2;

/// Composes the final answer from the retrieved context and history.
pub struct AnswerComposer {
    llm: OpenAIClient,
    model: String,
}

impl AnswerComposer {
    pub fn new(llm: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Compose an answer for `question` grounded in `context`.
    ///
    /// An empty context short-circuits to the fixed fallback sentence
    /// without calling the model. This is deliberately separate from the
    /// refusal template inside the system prompt: the short-circuit saves
    /// the call entirely, the in-prompt template handles contexts that
    /// exist but do not answer the question.
    pub async fn compose(
        &self,
        question: &str,
        context: &str,
        history: &[ChatTurn],
    ) -> Result<String> {
        if context.trim().is_empty() {
            return Ok(NO_CONTEXT_FALLBACK.to_string());
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(answer_system_prompt(context)));
        messages.extend(history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(question));

        self.llm
            .chat_completion(messages, &self.model, ANSWER_TEMPERATURE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn composer(server: &MockServer) -> AnswerComposer {
        let llm = OpenAIClient::new("test_key")
            .unwrap()
            .with_base_url(server.base_url());
        AnswerComposer::new(llm, "gpt-4o-mini")
    }

    #[tokio::test]
    async fn empty_context_returns_fallback_without_llm_call() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "x" } }]
            }));
        });

        let answer = composer(&server)
            .compose("What about plant roots?", "", &[])
            .await
            .unwrap();

        assert_eq!(answer, NO_CONTEXT_FALLBACK);
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn whitespace_context_also_short_circuits() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "x" } }]
            }));
        });

        let answer = composer(&server)
            .compose("q", "  \n\t ", &[])
            .await
            .unwrap();

        assert_eq!(answer, NO_CONTEXT_FALLBACK);
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn message_list_is_system_history_then_question() {
        let server = MockServer::start_async().await;

        let mock = server.mock(|when, then| {
            when.method(POST).path("/chat/completions").is_true(|req| {
                let body: serde_json::Value =
                    serde_json::from_slice(req.body().as_ref()).unwrap();
                let messages = body["messages"].as_array().unwrap();
                // system + 2 history turns + new user turn
                messages.len() == 4
                    && messages[0]["role"] == "system"
                    && messages[0]["content"]
                        .as_str()
                        .unwrap()
                        .contains("Context: bone density decreased")
                    && messages[3]["content"] == "and the muscles?"
            });
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Answer" } }]
            }));
        });

        let history = vec![
            ChatTurn::user("What did Bion-M1 find?"),
            ChatTurn::assistant("Bone density decreased."),
        ];

        let answer = composer(&server)
            .compose("and the muscles?", "bone density decreased", &history)
            .await
            .unwrap();

        assert_eq!(answer, "Answer");
        mock.assert_calls(1);
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("boom");
        });

        let err = composer(&server)
            .compose("q", "some context", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OpenAI error 500"));
    }

    #[tokio::test]
    async fn raw_model_output_is_returned_unchanged() {
        let server = MockServer::start_async().await;

        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Key Findings:\n- bone loss\n"
                    }
                }]
            }));
        });

        let answer = composer(&server)
            .compose("q", "ctx", &[])
            .await
            .unwrap();

        assert_eq!(answer, "Key Findings:\n- bone loss\n");
    }
}
