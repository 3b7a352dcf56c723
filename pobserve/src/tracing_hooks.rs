//! Structured `tracing` events for every hook.

use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{ConversationId, MessageId};
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use ptooling::{ToolEvent, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        tracing::debug!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        tracing::debug!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.is_retryable(),
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_tool_event(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        event: ToolEvent<'_>,
        elapsed: Duration,
    ) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match event {
            ToolEvent::Started => tracing::info!(
                phase = "tool",
                event = event.label(),
                tool_name = %tool_call.name,
                tool_call_id = %tool_call.id,
                conversation_id = %context.conversation_id,
                trace_id = ?context.trace_id.as_ref().map(|id| id.as_str())
            ),
            ToolEvent::Succeeded(_) => tracing::info!(
                phase = "tool",
                event = event.label(),
                tool_name = %tool_call.name,
                tool_call_id = %tool_call.id,
                conversation_id = %context.conversation_id,
                elapsed_ms
            ),
            ToolEvent::Failed(error) => tracing::warn!(
                phase = "tool",
                event = event.label(),
                tool_name = %tool_call.name,
                tool_call_id = %tool_call.id,
                conversation_id = %context.conversation_id,
                elapsed_ms,
                error_kind = ?error.kind,
                error = %error.message
            ),
        }
    }
}

impl TurnHooks for TracingObservabilityHooks {
    fn on_phase(&self, conversation_id: &ConversationId, phase: TurnPhase) {
        tracing::debug!(
            phase = %phase,
            event = "phase_enter",
            conversation_id = %conversation_id
        );
    }

    fn on_turn_finished(&self, conversation_id: &ConversationId, steps: usize) {
        tracing::info!(
            phase = "done",
            event = "turn_finished",
            conversation_id = %conversation_id,
            steps
        );
    }

    fn on_turn_failed(&self, conversation_id: &ConversationId, error: &ChatError) {
        tracing::error!(
            phase = ?error.phase,
            event = "turn_failed",
            conversation_id = %conversation_id,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_rollback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        succeeded: bool,
    ) {
        if succeeded {
            tracing::info!(
                event = "rollback",
                conversation_id = %conversation_id,
                message_id = %message_id
            );
        } else {
            tracing::error!(
                event = "rollback_failed",
                conversation_id = %conversation_id,
                message_id = %message_id
            );
        }
    }
}
