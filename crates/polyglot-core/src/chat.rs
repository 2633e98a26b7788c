//! Conversational follow-ups about the editor buffer and generated code.
//!
//! Every turn sends the chat history together with the current editor code and
//! all generated solutions. Blocks in the reply are merged back into the
//! generated solutions, and the editor buffer is replaced when the reply holds
//! code for the editor's language.

use crate::code_blocks::{CodeBlockResponse, CodeSlot, extract_for_editor, route_to_editor};
use crate::error::{CoreError, Result};
use crate::prompts;
use polyglot_abstraction::{ChatMessage, Model};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// The code currently in the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorState {
    pub code: String,
    /// Editor language name, e.g. "python" or "typescript".
    pub language: String,
}

impl EditorState {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self { code: code.into(), language: language.into() }
    }
}

/// Result of one successful exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    /// The model's reply, verbatim.
    pub reply: String,
    /// Blocks found in the reply.
    pub blocks: CodeBlockResponse,
    /// New editor contents, when the reply held code for the editor.
    pub editor_update: Option<String>,
    /// Generated solutions that changed.
    pub updated_slots: Vec<CodeSlot>,
}

/// A chat conversation bound to an editor buffer.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<ChatMessage>,
    editor: EditorState,
    generated: CodeBlockResponse,
}

impl ChatSession {
    pub fn new(editor: EditorState) -> Self {
        Self { editor, ..Self::default() }
    }

    /// Starts from previously generated solutions.
    #[must_use]
    pub fn with_generated(mut self, generated: CodeBlockResponse) -> Self {
        self.generated = generated;
        self
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    /// Replaces the editor buffer (the user edited it).
    pub fn set_editor_code(&mut self, code: impl Into<String>) {
        self.editor.code = code.into();
    }

    pub fn generated(&self) -> &CodeBlockResponse {
        &self.generated
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Sends `query` with the current context and applies the reply.
    ///
    /// A blank query is rejected without touching the history. A failed
    /// request is recorded as an `Error: ...` reply and returned.
    pub async fn send(&mut self, model: &dyn Model, query: &str) -> Result<ChatTurn> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::EmptyInput("a message"));
        }

        let context =
            prompts::chat_context(&self.editor.code, &self.editor.language, &self.generated, query);
        let prompt = prompts::chat(&self.history, context);
        debug!(
            model_id = %model.model_id(),
            history_len = self.history.len(),
            "Sending chat message"
        );

        self.history.push(ChatMessage::user(query));
        let response =
            match model.generate_chat_completion(&prompt.messages, Some(prompt.parameters)).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "Chat request failed");
                    self.history.push(ChatMessage::assistant(format!("Error: {}", err)));
                    return Err(err.into());
                }
            };

        let reply = response.content;
        self.history.push(ChatMessage::assistant(reply.clone()));

        let blocks = extract_for_editor(&reply, &self.editor.language);
        let editor_update = route_to_editor(&blocks, &self.editor.language).map(str::to_string);
        if let Some(code) = &editor_update {
            self.editor.code.clone_from(code);
            info!(language = %self.editor.language, "Editor code updated");
        }
        let updated_slots = self.generated.merge_non_empty(&blocks);

        Ok(ChatTurn { reply, blocks, editor_update, updated_slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyglot_abstraction::ModelError;
    use polyglot_models::MockModel;

    fn session() -> ChatSession {
        ChatSession::new(EditorState::new("print('old')", "python")).with_generated(
            CodeBlockResponse {
                pseudo_code: "PRINT old".to_string(),
                java: "class Old {}".to_string(),
                ..CodeBlockResponse::default()
            },
        )
    }

    #[tokio::test]
    async fn test_successful_turn_updates_editor_and_solutions() {
        let model = MockModel::with_response(
            "mock".to_string(),
            "Fixed:\n```pseudo\nPRINT new\n```\n```python\nprint('new')\n```",
        );
        let mut session = session();

        let turn = session.send(&model, "  fix it  ").await.unwrap();

        assert_eq!(turn.editor_update.as_deref(), Some("print('new')"));
        assert_eq!(session.editor().code, "print('new')");
        assert_eq!(turn.updated_slots, vec![CodeSlot::PseudoCode, CodeSlot::Python]);
        assert_eq!(session.generated().pseudo_code, "PRINT new");
        assert_eq!(session.generated().java, "class Old {}");

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("fix it"));
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, turn.reply);
    }

    #[tokio::test]
    async fn test_request_carries_context_and_history() {
        let model = MockModel::with_response("mock".to_string(), "first answer");
        model.push_response("second answer");
        let mut session = session();

        session.send(&model, "first").await.unwrap();
        session.send(&model, "second").await.unwrap();

        let calls = model.recorded_calls();
        assert_eq!(calls.len(), 2);

        let second = &calls[1];
        let roles: Vec<&str> = second.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(second[1].content, "first");
        assert_eq!(second[2].content, "first answer");

        let context = &second[3].content;
        assert!(context.contains("Current Editor Code (python):\n```python\nprint('old')\n```"));
        assert!(context.contains("```pseudo\nPRINT old\n```"));
        assert!(context.contains("```java\nclass Old {}\n```"));
        assert!(context.contains("User Query: second"));
    }

    #[tokio::test]
    async fn test_reply_without_code_changes_nothing() {
        let model = MockModel::with_response("mock".to_string(), "Looks fine to me.");
        let mut session = session();

        let turn = session.send(&model, "is this ok?").await.unwrap();
        assert!(turn.editor_update.is_none());
        assert!(turn.updated_slots.is_empty());
        assert_eq!(session.editor().code, "print('old')");
    }

    #[tokio::test]
    async fn test_editor_slot_for_unmapped_language() {
        let model = MockModel::with_response(
            "mock".to_string(),
            "```typescript\nconst a: number = 1;\n```\n```javascript\nconst a = 1;\n```",
        );
        let mut session = ChatSession::new(EditorState::new("", "typescript"));

        let turn = session.send(&model, "port it").await.unwrap();
        assert_eq!(turn.editor_update.as_deref(), Some("const a: number = 1;"));
        assert_eq!(session.generated().javascript, "const a = 1;");
        assert!(session.generated().editor.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let model = MockModel::new("mock".to_string());
        model.push_error(ModelError::QuotaExceeded { provider: "openai".to_string(), message: None });
        let mut session = session();

        let err = session.send(&model, "hello").await.unwrap_err();
        assert!(matches!(err, CoreError::Model(ModelError::QuotaExceeded { .. })));

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("hello"));
        assert_eq!(history[1].content, "Error: Provider 'openai' quota exceeded");
        assert_eq!(session.editor().code, "print('old')");
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let model = MockModel::new("mock".to_string());
        let mut session = session();

        let err = session.send(&model, "   ").await.unwrap_err();
        assert!(matches!(err, CoreError::EmptyInput(_)));
        assert!(session.history().is_empty());
        assert!(model.recorded_calls().is_empty());
    }
}
