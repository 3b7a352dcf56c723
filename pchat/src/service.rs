//! Turn orchestration plus the conversation management operations.
//!
//! A turn is validated and its user message persisted before the caller gets
//! a [`TurnStream`]; everything after that runs in a spawned task that
//! reports through the stream.

use std::sync::Arc;

use futures_util::StreamExt;
use pcommon::{ConversationId, MessageId, TraceId};
use pprovider::{Message, ModelGateway, ModelHandle, ModelRequest, Role, StreamEvent, ToolCall};
use ptooling::{DefaultToolRuntime, ToolExecutionContext, ToolRuntime};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::{
    ChatError, ChatErrorSource, ChatMessage, ChatPolicy, ChatStore, ContentPart, Conversation,
    ConversationPage, FramedEvent, IncomingMessage, MemoryRecord, MessageContent, MessageRole,
    ModelTitleGenerator, NoopTurnHooks, Pagination, TitleGenerator, ToolInvocation,
    ToolResultFrame, TurnHooks, TurnPhase, TurnRequest, TurnStream, UserIdentity, Visibility,
};

pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;
pub const MAX_HISTORY_PAGE_SIZE: u32 = 100;

type FrameSender = mpsc::Sender<Result<FramedEvent, ChatError>>;

#[derive(Clone)]
pub struct ChatService {
    gateway: Arc<ModelGateway>,
    store: Arc<dyn ChatStore>,
    tool_runtime: Arc<dyn ToolRuntime>,
    title_generator: Arc<dyn TitleGenerator>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
}

pub struct ChatServiceBuilder {
    gateway: Arc<ModelGateway>,
    store: Arc<dyn ChatStore>,
    tool_runtime: Option<Arc<dyn ToolRuntime>>,
    title_generator: Option<Arc<dyn TitleGenerator>>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
}

impl ChatServiceBuilder {
    pub fn tool_runtime(mut self, tool_runtime: Arc<dyn ToolRuntime>) -> Self {
        self.tool_runtime = Some(tool_runtime);
        self
    }

    pub fn title_generator(mut self, title_generator: Arc<dyn TitleGenerator>) -> Self {
        self.title_generator = Some(title_generator);
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> Result<ChatService, ChatError> {
        self.policy.validate()?;

        Ok(ChatService {
            gateway: self.gateway,
            store: self.store,
            tool_runtime: self
                .tool_runtime
                .unwrap_or_else(|| Arc::new(DefaultToolRuntime::default())),
            title_generator: self
                .title_generator
                .unwrap_or_else(|| Arc::new(ModelTitleGenerator::default())),
            policy: self.policy,
            hooks: self.hooks,
        })
    }
}

impl ChatService {
    pub fn builder(gateway: Arc<ModelGateway>, store: Arc<dyn ChatStore>) -> ChatServiceBuilder {
        ChatServiceBuilder {
            gateway,
            store,
            tool_runtime: None,
            title_generator: None,
            policy: ChatPolicy::default(),
            hooks: Arc::new(NoopTurnHooks),
        }
    }

    pub fn policy(&self) -> &ChatPolicy {
        &self.policy
    }

    pub fn store(&self) -> &Arc<dyn ChatStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Validates the turn, persists the user message, and starts the turn
    /// task. Errors returned here leave no new rows behind: a conversation
    /// created for this turn is removed again if the user message write fails.
    pub async fn stream_turn(
        &self,
        identity: Option<UserIdentity>,
        request: TurnRequest,
    ) -> Result<TurnStream, ChatError> {
        let conversation_id = request.id.clone();
        self.hooks.on_phase(&conversation_id, TurnPhase::Validating);

        let identity = identity
            .ok_or_else(|| ChatError::authentication("Unauthorized").in_phase(TurnPhase::Validating))?;

        let model = self.gateway.resolve(&request.model_id).map_err(|err| {
            ChatError::not_found("Model not found")
                .in_phase(TurnPhase::Validating)
                .with_source(ChatErrorSource::Provider(err.kind))
        })?;

        let user_content = request
            .most_recent_user_message()
            .map(|message| message.content.clone())
            .filter(|content| !content.text().trim().is_empty())
            .ok_or_else(|| {
                ChatError::invalid_request("No user message found").in_phase(TurnPhase::Validating)
            })?;

        let existing = self.store.get_conversation(&conversation_id).await?;
        if let Some(conversation) = &existing
            && !conversation.is_owned_by(&identity.id)
        {
            return Err(ChatError::authorization("Unauthorized").in_phase(TurnPhase::Validating));
        }
        let memories = self.store.list_memories(&identity.id).await?;

        if existing.is_none() {
            let title = self
                .title_generator
                .generate(&model, &user_content.text())
                .await;
            self.store
                .create_conversation(Conversation::new(
                    conversation_id.clone(),
                    identity.id.clone(),
                    title,
                ))
                .await
                .map_err(|err| err.in_phase(TurnPhase::UserPersisted))?;
        }

        let user_message = ChatMessage::new(conversation_id.clone(), MessageRole::User, user_content);
        let user_message_id = user_message.id.clone();
        if let Err(err) = self.store.append_messages(vec![user_message]).await {
            if existing.is_none() {
                self.discard_new_conversation(&conversation_id).await;
            }
            return Err(err.in_phase(TurnPhase::UserPersisted));
        }
        self.hooks.on_phase(&conversation_id, TurnPhase::UserPersisted);

        let trace_id = TraceId::generate();
        let span = tracing::info_span!(
            "turn",
            conversation_id = %conversation_id,
            user_id = %identity.id,
            model = %model.spec().api_identifier,
            trace_id = %trace_id,
        );
        let (sender, receiver) = mpsc::channel(self.policy.channel_capacity);
        let task = TurnTask {
            service: self.clone(),
            model,
            conversation_id,
            user_message_id,
            context: build_context(&self.policy.system_prompt, &memories, &request.messages),
            tool_context: ToolExecutionContext::new(request.id.clone())
                .with_user_id(identity.id.clone())
                .with_trace_id(trace_id),
            sender,
        };
        tokio::spawn(task.run().instrument(span));

        Ok(TurnStream::new(receiver))
    }

    pub async fn delete_conversation(
        &self,
        identity: Option<&UserIdentity>,
        id: &ConversationId,
    ) -> Result<(), ChatError> {
        self.owned_conversation(identity, id).await?;
        self.store.delete_conversation(id).await?;
        tracing::info!(conversation_id = %id, "conversation deleted");
        Ok(())
    }

    /// One page of the caller's conversations, newest first.
    pub async fn list_history(
        &self,
        identity: Option<&UserIdentity>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ConversationPage, ChatError> {
        let identity = identity.ok_or_else(|| ChatError::authentication("Unauthorized"))?;
        let page = page.unwrap_or(1).max(1);
        let page_size = limit
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
            .clamp(1, MAX_HISTORY_PAGE_SIZE);

        let (chats, total) = self
            .store
            .list_conversations(&identity.id, page, page_size)
            .await?;

        Ok(ConversationPage {
            chats,
            pagination: Pagination::new(page, page_size, total),
        })
    }

    pub async fn update_visibility(
        &self,
        identity: Option<&UserIdentity>,
        id: &ConversationId,
        visibility: Visibility,
    ) -> Result<(), ChatError> {
        self.owned_conversation(identity, id).await?;
        self.store.update_visibility(id, visibility).await
    }

    pub async fn load_conversation(
        &self,
        identity: Option<&UserIdentity>,
        id: &ConversationId,
    ) -> Result<(Conversation, Vec<ChatMessage>), ChatError> {
        let conversation = self.owned_conversation(identity, id).await?;
        let messages = self.store.load_messages(id).await?;
        Ok((conversation, messages))
    }

    /// Removes a conversation this turn created before its first message
    /// could be stored.
    async fn discard_new_conversation(&self, conversation_id: &ConversationId) {
        match self.store.delete_conversation(conversation_id).await {
            Ok(()) => tracing::warn!(
                conversation_id = %conversation_id,
                "discarded empty conversation after user message write failed"
            ),
            Err(error) => tracing::error!(
                conversation_id = %conversation_id,
                error = %error,
                "failed to discard empty conversation"
            ),
        }
    }

        async fn owned_conversation(
        &self,
        identity: Option<&UserIdentity>,
        id: &ConversationId,
    ) -> Result<Conversation, ChatError> {
        let identity = identity.ok_or_else(|| ChatError::authentication("Unauthorized"))?;
        let conversation = self
            .store
            .get_conversation(id)
            .await?
            .ok_or_else(|| ChatError::not_found("Chat not found"))?;

        if !conversation.is_owned_by(&identity.id) {
            return Err(ChatError::authorization("Unauthorized"));
        }
        Ok(conversation)
    }
}

/// Model context for a turn: system prompt with the user profile, then the
/// client's messages. Only resolved tool invocations are replayed.
fn build_context(
    system_prompt: &str,
    memories: &[MemoryRecord],
    messages: &[IncomingMessage],
) -> Vec<Message> {
    let profile: Vec<&str> = memories.iter().map(|record| record.text.as_str()).collect();
    let profile = serde_json::to_string(&profile).unwrap_or_else(|_| "[]".to_string());

    let mut context = vec![Message::new(
        Role::System,
        format!("{system_prompt}\n\nUser Profile: {profile}"),
    )];

    for message in messages {
        let text = message.content.text();
        match message.role {
            MessageRole::User => context.push(Message::new(Role::User, text)),
            MessageRole::Assistant => {
                let resolved: Vec<&ToolInvocation> = message
                    .tool_invocations
                    .iter()
                    .chain(message.content.tool_invocations())
                    .filter(|invocation| !invocation.is_pending())
                    .collect();

                if resolved.is_empty() {
                    if !text.is_empty() {
                        context.push(Message::new(Role::Assistant, text));
                    }
                    continue;
                }

                let calls = resolved
                    .iter()
                    .map(|invocation| ToolCall {
                        id: invocation.tool_call_id.clone(),
                        name: invocation.tool_name.clone(),
                        arguments: invocation.arguments.to_string(),
                    })
                    .collect();
                context.push(Message::assistant_with_tool_calls(text, calls));
                for invocation in resolved {
                    let output = invocation.result().cloned().unwrap_or(Value::Null);
                    context.push(Message::tool_result(pprovider::ToolResult {
                        tool_call_id: invocation.tool_call_id.clone(),
                        output: output.to_string(),
                    }));
                }
            }
            MessageRole::Tool => {}
        }
    }

    context
}

/// What one model invocation produced.
#[derive(Debug, Default)]
struct StepOutput {
    text: String,
    tool_calls: Vec<ToolCall>,
}

struct TurnTask {
    service: ChatService,
    model: ModelHandle,
    conversation_id: ConversationId,
    user_message_id: MessageId,
    context: Vec<Message>,
    tool_context: ToolExecutionContext,
    sender: FrameSender,
}

impl TurnTask {
    async fn run(mut self) {
        self.emit(Ok(FramedEvent::UserMessageId(
            self.user_message_id.to_string(),
        )))
        .await;
        self.phase(TurnPhase::Streaming);

        let (drafts, steps, failure) = self.generate().await;

        if let Some(error) = failure {
            self.fail(error).await;
            return;
        }

        self.phase(TurnPhase::Finalizing);
        let messages = sanitize(&self.conversation_id, drafts);
        if !messages.is_empty()
            && let Err(err) = self.service.store.append_messages(messages).await
        {
            let error = ChatError::store(err.message).in_phase(TurnPhase::Finalizing);
            self.fail(error).await;
            return;
        }

        self.emit(Ok(FramedEvent::finish())).await;
        self.phase(TurnPhase::Done);
        self.service
            .hooks
            .on_turn_finished(&self.conversation_id, steps);
        tracing::info!(event = "turn_finished", steps, "turn completed");
    }

    /// Runs model steps until the model stops calling tools, the step limit
    /// is hit, or the client goes away. Returns one draft part list per step.
    async fn generate(&mut self) -> (Vec<Vec<ContentPart>>, usize, Option<ChatError>) {
        let policy = self.service.policy.clone();
        let tools = self
            .service
            .tool_runtime
            .registry()
            .list_active(&policy.enabled_tools);

        let mut drafts = Vec::new();
        let mut steps = 0;

        while steps < policy.max_steps {
            if self.sender.is_closed() {
                tracing::info!(event = "client_disconnected", steps, "stopping before next model step");
                break;
            }
            steps += 1;

            let request = ModelRequest::new(self.model.spec().id.clone(), self.context.clone())
                .with_temperature(policy.temperature)
                .with_tools(tools.clone())
                .with_metadata("conversation_id", self.conversation_id.as_str());

            let step = match self.stream_step(request).await {
                Ok(step) => step,
                Err(error) => return (drafts, steps, Some(error)),
            };

            let mut parts = Vec::new();
            if !step.text.is_empty() {
                parts.push(ContentPart::text(step.text.clone()));
            }
            if step.tool_calls.is_empty() {
                drafts.push(parts);
                break;
            }

            self.phase(TurnPhase::ToolDispatch);
            for call in &step.tool_calls {
                parts.push(ContentPart::ToolInvocation(ToolInvocation::pending(
                    call.name.clone(),
                    call.id.clone(),
                    parse_arguments(&call.arguments),
                )));
            }
            self.context.push(Message::assistant_with_tool_calls(
                step.text,
                step.tool_calls.clone(),
            ));

            for call in step.tool_calls {
                if self.sender.is_closed() {
                    break;
                }
                self.dispatch(call, &mut parts).await;
            }
            drafts.push(parts);

            if steps < policy.max_steps {
                self.phase(TurnPhase::Streaming);
            }
        }

        (drafts, steps, None)
    }

    async fn stream_step(&self, request: ModelRequest) -> Result<StepOutput, ChatError> {
        let mut stream = self
            .model
            .stream(request)
            .await
            .map_err(upstream_error)?;
        let mut step = StepOutput::default();

        while let Some(event) = stream.next().await {
            match event.map_err(upstream_error)? {
                StreamEvent::TextDelta(delta) => {
                    step.text.push_str(&delta);
                    self.emit(Ok(FramedEvent::TextDelta(delta))).await;
                }
                StreamEvent::ToolCallDelta(call) => push_call(&mut step.tool_calls, call),
                StreamEvent::MessageComplete(message) => {
                    if message.role == Role::Assistant
                        && step.text.is_empty()
                        && !message.content.is_empty()
                    {
                        step.text = message.content.clone();
                        self.emit(Ok(FramedEvent::TextDelta(message.content))).await;
                    }
                }
                StreamEvent::ResponseComplete(response) => {
                    let text = response.text();
                    if step.text.is_empty() && !text.is_empty() {
                        step.text = text.clone();
                        self.emit(Ok(FramedEvent::TextDelta(text))).await;
                    }
                    for call in response.tool_calls() {
                        push_call(&mut step.tool_calls, call);
                    }
                }
            }
        }

        Ok(step)
    }

    async fn dispatch(&mut self, call: ToolCall, parts: &mut [ContentPart]) {
        let args = parse_arguments(&call.arguments);
        let result = self
            .service
            .tool_runtime
            .execute(call, self.tool_context.clone())
            .await;
        let payload = result.outcome.payload();

        for part in parts.iter_mut() {
            if let ContentPart::ToolInvocation(invocation) = part
                && invocation.tool_call_id == result.tool_call_id
                && invocation.resolve(payload.clone()).is_err()
            {
                tracing::warn!(tool_call_id = %result.tool_call_id, "duplicate tool call id in one step");
            }
        }

        self.emit(Ok(FramedEvent::ToolResult(ToolResultFrame {
            tool_name: result.tool_name.clone(),
            tool_call_id: result.tool_call_id.clone(),
            args,
            result: payload,
        })))
        .await;
        self.context
            .push(Message::tool_result(result.into_tool_result()));
    }

    /// Compensates the user message write, reports `error`, and closes the
    /// stream with `finish`.
    async fn fail(&self, error: ChatError) {
        let deleted = self
            .service
            .store
            .delete_message(&self.user_message_id)
            .await;
        let succeeded = deleted.is_ok();
        if let Err(err) = deleted {
            tracing::error!(
                event = "rollback_failed",
                message_id = %self.user_message_id,
                error = %err,
                "could not delete user message"
            );
        } else {
            tracing::info!(event = "rollback", message_id = %self.user_message_id, "user message deleted");
        }
        self.service
            .hooks
            .on_rollback(&self.conversation_id, &self.user_message_id, succeeded);

        tracing::error!(event = "turn_failed", error = %error, "turn failed");
        self.service
            .hooks
            .on_turn_failed(&self.conversation_id, &error);
        self.emit(Err(error)).await;
        self.emit(Ok(FramedEvent::finish())).await;
        self.phase(TurnPhase::Failed);
    }

    fn phase(&self, phase: TurnPhase) {
        tracing::debug!(%phase, "turn phase");
        self.service.hooks.on_phase(&self.conversation_id, phase);
    }

    /// A closed channel means the client went away; that is not an error.
    async fn emit(&self, item: Result<FramedEvent, ChatError>) {
        if self.sender.send(item).await.is_err() {
            tracing::trace!("turn stream receiver dropped");
        }
    }
}

fn upstream_error(err: pprovider::ProviderError) -> ChatError {
    ChatError::provider(err.message)
        .in_phase(TurnPhase::Streaming)
        .with_source(ChatErrorSource::Provider(err.kind))
}

fn push_call(calls: &mut Vec<ToolCall>, call: ToolCall) {
    if !calls.iter().any(|existing| existing.id == call.id) {
        calls.push(call);
    }
}

fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Drops pending invocations and empty assistant messages; every survivor
/// gets a fresh id.
fn sanitize(conversation_id: &ConversationId, drafts: Vec<Vec<ContentPart>>) -> Vec<ChatMessage> {
    drafts
        .into_iter()
        .filter_map(|parts| {
            let parts: Vec<ContentPart> = parts
                .into_iter()
                .filter(|part| match part {
                    ContentPart::Text { text } => !text.is_empty(),
                    ContentPart::ToolInvocation(invocation) => !invocation.is_pending(),
                })
                .collect();
            if parts.is_empty() {
                return None;
            }

            let content = match parts.as_slice() {
                [ContentPart::Text { text }] => MessageContent::Text(text.clone()),
                _ => MessageContent::Parts(parts),
            };
            Some(ChatMessage::new(
                conversation_id.clone(),
                MessageRole::Assistant,
                content,
            ))
        })
        .collect()
}
