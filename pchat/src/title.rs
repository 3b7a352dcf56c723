//! Conversation title derivation.

use std::sync::Arc;

use pcommon::BoxFuture;
use pprovider::{
    Message, ModelHandle, ModelRequest, ProviderOperationHooks, RetryPolicy, Role,
};

pub const MAX_TITLE_CHARS: usize = 80;

const TITLE_PROMPT: &str = "Write a short title for a conversation that starts with the user's message below. \
Use at most 80 characters. Reply with the title only: no quotes, no colons, no trailing punctuation.";

/// Derives a title for a new conversation. Never fails: implementations fall
/// back to the user's own text.
pub trait TitleGenerator: Send + Sync {
    fn generate<'a>(&'a self, model: &'a ModelHandle, user_text: &'a str) -> BoxFuture<'a, String>;
}

/// Uses the user's text, truncated.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackTitleGenerator;

impl TitleGenerator for FallbackTitleGenerator {
    fn generate<'a>(&'a self, _model: &'a ModelHandle, user_text: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move { truncate_title(user_text) })
    }
}

/// Asks the turn's own model for a title with a non-streaming call.
#[derive(Clone)]
pub struct ModelTitleGenerator {
    retry_policy: RetryPolicy,
    hooks: Option<Arc<dyn ProviderOperationHooks>>,
}

impl Default for ModelTitleGenerator {
    fn default() -> Self {
        Self::new(RetryPolicy::new(2))
    }
}

impl ModelTitleGenerator {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            hooks: None,
        }
    }

    /// Observes every attempt of the title completion, retries included.
    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

impl TitleGenerator for ModelTitleGenerator {
    fn generate<'a>(&'a self, model: &'a ModelHandle, user_text: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            let request = ModelRequest::new(
                model.spec().id.clone(),
                vec![
                    Message::new(Role::System, TITLE_PROMPT),
                    Message::new(Role::User, user_text),
                ],
            );

            match model
                .complete_with_retry(
                    request,
                    &self.retry_policy,
                    self.hooks.as_deref(),
                    tokio::time::sleep,
                )
                .await
            {
                Ok(response) => {
                    let title = clean_title(&response.text());
                    if title.is_empty() {
                        truncate_title(user_text)
                    } else {
                        title
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "title generation failed, using user text");
                    truncate_title(user_text)
                }
            }
        })
    }
}

/// First line of `text`, at most [`MAX_TITLE_CHARS`] characters.
pub fn truncate_title(text: &str) -> String {
    let line = text.trim().lines().next().unwrap_or_default().trim();
    let title: String = line.chars().take(MAX_TITLE_CHARS).collect();
    if title.is_empty() {
        "New chat".to_string()
    } else {
        title
    }
}

fn clean_title(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if trimmed.is_empty() {
        return String::new();
    }
    truncate_title(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_title_keeps_first_line_within_limit() {
        let long = format!("{}\nsecond line", "a".repeat(120));
        assert_eq!(truncate_title(&long).chars().count(), MAX_TITLE_CHARS);
        assert_eq!(truncate_title("  Weather in Lahore  "), "Weather in Lahore");
        assert_eq!(truncate_title("   "), "New chat");
    }

    #[test]
    fn clean_title_strips_quotes() {
        assert_eq!(clean_title("\"Lahore weather\"\n"), "Lahore weather");
        assert_eq!(clean_title("  \"\" "), "");
    }
}
