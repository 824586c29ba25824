//! Mock provider implementation for testing.

use super::{ChatModel, ModelOutput, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

enum Reply {
    Output(ModelOutput),
    Failure(String),
}

/// Chat model that returns a canned reply and records what it was asked.
pub struct MockChatModel {
    reply: Reply,
    calls: AtomicUsize,
    last_call: Mutex<Option<(String, String)>>,
}

impl MockChatModel {
    /// Always answer with `output`.
    pub fn returning(output: ModelOutput) -> Self {
        Self::with_reply(Reply::Output(output))
    }

    /// Always answer with a message whose content is `answer`.
    pub fn answering(answer: impl Into<String>) -> Self {
        Self::returning(ModelOutput::Message {
            content: answer.into(),
        })
    }

    /// Always fail with an API error carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Failure(message.into()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_call: Mutex::new(None),
        }
    }

    /// Number of times [`ChatModel::invoke`] ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `(model, prompt)` pair of the most recent call.
    pub fn last_call(&self) -> Option<(String, String)> {
        self.last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(&self, model: &str, prompt: &str) -> Result<ModelOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some((model.to_string(), prompt.to_string()));

        match &self.reply {
            Reply::Output(output) => Ok(output.clone()),
            Reply::Failure(message) => Err(ProviderError::ApiError(message.clone())),
        }
    }
}
