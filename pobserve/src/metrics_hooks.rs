//! `metrics` counters and histograms, all prefixed `palaver_`.
//!
//! ```rust
//! use pobserve::MetricsObservabilityHooks;
//! use pprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! accepts_provider_hooks(&MetricsObservabilityHooks);
//! ```

use std::time::Duration;

use pchat::{ChatError, TurnHooks, TurnPhase};
use pcommon::{ConversationId, MessageId};
use pprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use ptooling::{ToolEvent, ToolExecutionContext, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "palaver_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "palaver_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "palaver_provider_retry_delay_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "palaver_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "palaver_provider_attempts_per_success",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(f64::from(attempts));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempts: u32,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "palaver_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_tool_event(
        &self,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        event: ToolEvent<'_>,
        elapsed: Duration,
    ) {
        let tool_name = tool_call.name.clone();
        match event {
            ToolEvent::Started => {
                metrics::counter!("palaver_tool_started_total", "tool_name" => tool_name)
                    .increment(1);
                return;
            }
            ToolEvent::Failed(error) => {
                metrics::counter!(
                    "palaver_tool_failed_total",
                    "tool_name" => tool_name.clone(),
                    "error_kind" => format!("{:?}", error.kind)
                )
                .increment(1);
            }
            ToolEvent::Succeeded(_) => {}
        }
        metrics::histogram!(
            "palaver_tool_duration_seconds",
            "tool_name" => tool_name,
            "status" => event.label()
        )
        .record(elapsed.as_secs_f64());
    }
}

impl TurnHooks for MetricsObservabilityHooks {
    fn on_phase(&self, _conversation_id: &ConversationId, phase: TurnPhase) {
        metrics::counter!("palaver_turn_phase_total", "phase" => phase.as_str()).increment(1);
    }

    fn on_turn_finished(&self, _conversation_id: &ConversationId, steps: usize) {
        metrics::counter!("palaver_turn_finished_total").increment(1);
        metrics::histogram!("palaver_turn_model_steps").record(steps as f64);
    }

    fn on_turn_failed(&self, _conversation_id: &ConversationId, error: &ChatError) {
        metrics::counter!(
            "palaver_turn_failed_total",
            "error_kind" => format!("{:?}", error.kind),
            "phase" => error.phase.map(TurnPhase::as_str).unwrap_or("unknown")
        )
        .increment(1);
    }

    fn on_rollback(
        &self,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
        succeeded: bool,
    ) {
        let status = if succeeded { "success" } else { "failure" };
        metrics::counter!("palaver_turn_rollback_total", "status" => status).increment(1);
    }
}
