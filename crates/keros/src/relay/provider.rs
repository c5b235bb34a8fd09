//! Model provider seam

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::error::RelayError;
use super::message::ChatMessage;
use crate::config::ChatConfig;

/// Incremental text produced by a provider, in arrival order
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, RelayError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

impl From<&ChatConfig> for GenerationParams {
    fn from(config: &ChatConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        }
    }
}

/// A language model that streams a reply to a conversation
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Start generating. `messages` begins with the system message.
    ///
    /// Errors returned here happen before any text was produced; errors
    /// yielded by the stream happen mid-reply.
    async fn stream(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<TextStream, RelayError>;
}
