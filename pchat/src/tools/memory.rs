//! `updateMemory`: append a fact to the caller's profile.

use std::sync::Arc;

use ptooling::{
    ParameterSchema, ParameterSpec, Tool, ToolExecutionContext, ToolFuture, ToolKind, ToolOutcome,
    required_string,
};
use serde_json::{Map, Value, json};

use crate::{ChatStore, MEMORY_TEXT_MAX_CHARS, MemoryRecord};

pub const MEMORY_FAILURE_MESSAGE: &str = "Failed to memorize text.";

pub struct MemoryTool {
    store: Arc<dyn ChatStore>,
    schema: ParameterSchema,
}

impl MemoryTool {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            schema: ParameterSchema::new().with(
                ParameterSpec::string("text", "A short fact about the user to remember")
                    .max_chars(MEMORY_TEXT_MAX_CHARS),
            ),
        }
    }
}

impl Tool for MemoryTool {
    fn kind(&self) -> ToolKind {
        ToolKind::UpdateMemory
    }

    fn description(&self) -> &str {
        "Remember user preferences, habits, and project context for later conversations"
    }

    fn schema(&self) -> &ParameterSchema {
        &self.schema
    }

    fn execute<'a>(
        &'a self,
        args: Map<String, Value>,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, ToolOutcome> {
        Box::pin(async move {
            let Some(user_id) = context.user_id.clone() else {
                tracing::warn!(conversation_id = %context.conversation_id, "memory write without a user");
                return ToolOutcome::failure(MEMORY_FAILURE_MESSAGE);
            };
            let text = match required_string(&args, "text") {
                Ok(text) => text,
                Err(err) => return ToolOutcome::failure(err.message),
            };

            match self.store.append_memory(MemoryRecord::new(user_id, text)).await {
                Ok(()) => ToolOutcome::success(json!({
                    "message": "Text has been memorized successfully."
                })),
                Err(err) => {
                    tracing::error!(error = %err, "memory write failed");
                    ToolOutcome::failure(MEMORY_FAILURE_MESSAGE)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use pcommon::UserId;

    use super::*;
    use crate::InMemoryChatStore;

    #[tokio::test]
    async fn memory_is_bound_to_context_user() {
        let store = Arc::new(InMemoryChatStore::new());
        let tool = MemoryTool::new(store.clone());
        let context = ToolExecutionContext::new("c1").with_user_id("alice");

        let mut args = Map::new();
        args.insert("text".to_string(), json!("prefers metric units"));
        let outcome = tool.execute(args, &context).await;
        assert!(outcome.is_success());

        let records = store
            .list_memories(&UserId::new("alice"))
            .await
            .expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "prefers metric units");
    }

    #[tokio::test]
    async fn missing_user_is_failure() {
        let tool = MemoryTool::new(Arc::new(InMemoryChatStore::new()));
        let mut args = Map::new();
        args.insert("text".to_string(), json!("x"));

        let outcome = tool.execute(args, &ToolExecutionContext::new("c1")).await;
        assert_eq!(outcome, ToolOutcome::failure(MEMORY_FAILURE_MESSAGE));
    }
}
