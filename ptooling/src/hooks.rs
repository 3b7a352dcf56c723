//! Lifecycle notifications for tool calls.
//!
//! ```rust
//! use ptooling::{NoopToolRuntimeHooks, ToolEvent, ToolRuntimeHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! assert_hooks_trait(&NoopToolRuntimeHooks);
//! assert_eq!(ToolEvent::Started.label(), "started");
//! ```

use std::time::Duration;

use pprovider::ToolCall;

use crate::{ToolError, ToolExecutionContext, ToolExecutionResult};

#[derive(Debug, Clone, Copy)]
pub enum ToolEvent<'a> {
    Started,
    Succeeded(&'a ToolExecutionResult),
    /// Lookup, validation, panic, timeout, and executor failures alike.
    Failed(&'a ToolError),
}

impl ToolEvent<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

pub trait ToolRuntimeHooks: Send + Sync {
    /// `elapsed` is measured from `Started`, which itself reports zero.
    fn on_tool_event(
        &self,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _event: ToolEvent<'_>,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolRuntimeHooks;

impl ToolRuntimeHooks for NoopToolRuntimeHooks {}
