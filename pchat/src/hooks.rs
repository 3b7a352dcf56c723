//! Turn lifecycle observation points.

use pcommon::{ConversationId, MessageId};

use crate::{ChatError, TurnPhase};

pub trait TurnHooks: Send + Sync {
    fn on_phase(&self, _conversation_id: &ConversationId, _phase: TurnPhase) {}

    fn on_turn_finished(&self, _conversation_id: &ConversationId, _steps: usize) {}

    fn on_turn_failed(&self, _conversation_id: &ConversationId, _error: &ChatError) {}

    /// Called after a compensating delete of the user message.
    fn on_rollback(
        &self,
        _conversation_id: &ConversationId,
        _message_id: &MessageId,
        _succeeded: bool,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
