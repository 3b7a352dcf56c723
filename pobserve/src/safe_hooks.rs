//! Wrappers that keep a panicking hook from unwinding into the caller.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{ConversationId, MessageId};
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use ptooling::{ToolEvent, ToolExecutionContext, ToolRuntimeHooks};

fn guarded(hook: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::warn!(hook, "observability hook panicked");
    }
}

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        guarded("provider.attempt_start", || {
            self.inner.on_attempt_start(provider, operation, attempt)
        });
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        guarded("provider.retry_scheduled", || {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        });
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        guarded("provider.success", || {
            self.inner.on_success(provider, operation, attempts)
        });
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        guarded("provider.failure", || {
            self.inner.on_failure(provider, operation, attempts, error)
        });
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_tool_event(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        event: ToolEvent<'_>,
        elapsed: Duration,
    ) {
        guarded("tool.event", || {
            self.inner.on_tool_event(tool_call, context, event, elapsed)
        });
    }
}

pub struct SafeTurnHooks<H> {
    inner: H,
}

impl<H> SafeTurnHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> TurnHooks for SafeTurnHooks<H>
where
    H: TurnHooks,
{
    fn on_phase(&self, conversation_id: &ConversationId, phase: TurnPhase) {
        guarded("turn.phase", || self.inner.on_phase(conversation_id, phase));
    }

    fn on_turn_finished(&self, conversation_id: &ConversationId, steps: usize) {
        guarded("turn.finished", || {
            self.inner.on_turn_finished(conversation_id, steps)
        });
    }

    fn on_turn_failed(&self, conversation_id: &ConversationId, error: &ChatError) {
        guarded("turn.failed", || {
            self.inner.on_turn_failed(conversation_id, error)
        });
    }

    fn on_rollback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        succeeded: bool,
    ) {
        guarded("turn.rollback", || {
            self.inner.on_rollback(conversation_id, message_id, succeeded)
        });
    }
}
