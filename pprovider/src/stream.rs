//! What a provider yields while a model step is streaming.
//!
//! ```rust
//! use pprovider::{BoxedEventStream, ScriptedEventStream, StreamEvent};
//!
//! let stream = ScriptedEventStream::new(vec![Ok(StreamEvent::TextDelta("hello".into()))]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{Message, ModelResponse, ProviderError, ToolCall};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    TextDelta(String),
    /// A fully assembled tool call. Adapters accumulate argument fragments
    /// before emitting this.
    ToolCallDelta(ToolCall),
    MessageComplete(Message),
    ResponseComplete(ModelResponse),
}

/// Events arrive in vendor order, and `ResponseComplete` (when sent) closes
/// the step. Nothing follows the first `None`.
pub trait ModelEventStream: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

impl<T> ModelEventStream for T where T: Stream<Item = Result<StreamEvent, ProviderError>> + Send {}

pub type BoxedEventStream<'a> = Pin<Box<dyn ModelEventStream + 'a>>;

/// Replays a fixed list of events, for fakes and non-streaming fallbacks.
#[derive(Debug)]
pub struct ScriptedEventStream {
    script: std::vec::IntoIter<Result<StreamEvent, ProviderError>>,
}

impl ScriptedEventStream {
    pub fn new(script: Vec<Result<StreamEvent, ProviderError>>) -> Self {
        Self {
            script: script.into_iter(),
        }
    }
}

impl Stream for ScriptedEventStream {
    type Item = Result<StreamEvent, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.script.next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.script.size_hint()
    }
}
