//! Tracing and metrics behind a single hook value.

use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{ConversationId, MessageId};
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use ptooling::{ToolEvent, ToolExecutionContext, ToolRuntimeHooks};

use crate::{MetricsObservabilityHooks, TracingObservabilityHooks};

/// Logs and records every event. Tracing runs first.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObservabilityHooks {
    tracing: TracingObservabilityHooks,
    metrics: MetricsObservabilityHooks,
}

impl ObservabilityHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProviderOperationHooks for ObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        self.tracing.on_attempt_start(provider, operation, attempt);
        self.metrics.on_attempt_start(provider, operation, attempt);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        self.tracing
            .on_retry_scheduled(provider, operation, attempt, delay, error);
        self.metrics
            .on_retry_scheduled(provider, operation, attempt, delay, error);
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        self.tracing.on_success(provider, operation, attempts);
        self.metrics.on_success(provider, operation, attempts);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        self.tracing.on_failure(provider, operation, attempts, error);
        self.metrics.on_failure(provider, operation, attempts, error);
    }
}

impl ToolRuntimeHooks for ObservabilityHooks {
    fn on_tool_event(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        event: ToolEvent<'_>,
        elapsed: Duration,
    ) {
        self.tracing.on_tool_event(tool_call, context, event, elapsed);
        self.metrics.on_tool_event(tool_call, context, event, elapsed);
    }
}

impl TurnHooks for ObservabilityHooks {
    fn on_phase(&self, conversation_id: &ConversationId, phase: TurnPhase) {
        self.tracing.on_phase(conversation_id, phase);
        self.metrics.on_phase(conversation_id, phase);
    }

    fn on_turn_finished(&self, conversation_id: &ConversationId, steps: usize) {
        self.tracing.on_turn_finished(conversation_id, steps);
        self.metrics.on_turn_finished(conversation_id, steps);
    }

    fn on_turn_failed(&self, conversation_id: &ConversationId, error: &ChatError) {
        self.tracing.on_turn_failed(conversation_id, error);
        self.metrics.on_turn_failed(conversation_id, error);
    }

    fn on_rollback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        succeeded: bool,
    ) {
        self.tracing
            .on_rollback(conversation_id, message_id, succeeded);
        self.metrics
            .on_rollback(conversation_id, message_id, succeeded);
    }
}
