//! Tool runtime trait and the default timeout-bounded executor.
//!
//! The runtime never fails: unknown tools, invalid arguments, timeouts, and
//! executor failures all come back as [`ToolOutcome::Failure`] so a broken
//! tool cannot abort a turn.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_timer::Delay;
use futures_util::FutureExt;
use futures_util::future::{Either, select};
use pprovider::ToolCall;

use crate::{
    NoopToolRuntimeHooks, ToolError, ToolEvent, ToolExecutionContext, ToolExecutionResult,
    ToolFuture, ToolOutcome, ToolRegistry, ToolRuntimeHooks,
};

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

pub trait ToolRuntime: Send + Sync {
    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, ToolExecutionResult>;

    fn registry(&self) -> &ToolRegistry;
}

#[derive(Clone)]
pub struct DefaultToolRuntime {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl Default for DefaultToolRuntime {
    fn default() -> Self {
        Self::new(Arc::new(ToolRegistry::new()))
    }
}

impl DefaultToolRuntime {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TOOL_TIMEOUT,
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_bounded(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<ToolOutcome, ToolError> {
        let invocation = Box::pin(
            AssertUnwindSafe(self.registry.invoke(
                &tool_call.name,
                &tool_call.arguments,
                context,
            ))
            .catch_unwind(),
        );
        let deadline = Delay::new(self.timeout);

        match select(invocation, deadline).await {
            Either::Left((Ok(result), _)) => result,
            Either::Left((Err(_panic), _)) => Err(ToolError::panicked(&tool_call.name)),
            Either::Right(((), _)) => Err(ToolError::timeout(format!(
                "tool '{}' timed out after {}ms",
                tool_call.name,
                self.timeout.as_millis()
            ))),
        }
    }
}

impl ToolRuntime for DefaultToolRuntime {
    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, ToolExecutionResult> {
        Box::pin(async move {
            self.hooks
                .on_tool_event(&tool_call, &context, ToolEvent::Started, Duration::ZERO);
            let started = Instant::now();

            let outcome = match self.run_bounded(&tool_call, &context).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    let error = error.for_call(&tool_call);
                    if error.is_caller_fault() {
                        tracing::debug!(error = %error, "model issued an unusable tool call");
                    } else {
                        tracing::warn!(error = %error, "tool call failed before producing output");
                    }
                    self.hooks.on_tool_event(
                        &tool_call,
                        &context,
                        ToolEvent::Failed(&error),
                        started.elapsed(),
                    );
                    return ToolExecutionResult::new(
                        tool_call.id,
                        tool_call.name,
                        ToolOutcome::Failure(error.message),
                    );
                }
            };

            let elapsed = started.elapsed();
            let result = ToolExecutionResult::new(
                tool_call.id.clone(),
                tool_call.name.clone(),
                outcome,
            );
            match &result.outcome {
                ToolOutcome::Success(_) => {
                    self.hooks.on_tool_event(
                        &tool_call,
                        &context,
                        ToolEvent::Succeeded(&result),
                        elapsed,
                    );
                }
                ToolOutcome::Failure(message) => {
                    let error = ToolError::execution(message.clone()).for_call(&tool_call);
                    self.hooks
                        .on_tool_event(&tool_call, &context, ToolEvent::Failed(&error), elapsed);
                }
            }

            result
        })
    }

    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}
