//! Streaming execution backend, consumed as an opaque collaborator.
//!
//! The backend runs assistants session by session. Incremental content is
//! published on its own broadcast channel for live rendering; `submit`
//! resolves once the run has finished with the complete reply.

mod placeholder;

pub use placeholder::UnconfiguredBackend;

use super::ConversationMessage;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StreamError {
    /// The run was stopped before it finished.
    #[error("Run cancelled")]
    Cancelled,

    #[error("Streaming backend unavailable: {0}")]
    Unavailable(String),

    #[error("Streaming backend error: {0}")]
    Backend(String),
}

/// One run on the streaming backend.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub conversation_id: Uuid,
    pub assistant_id: String,
    /// Messages already in the conversation, oldest first.
    pub history: Vec<ConversationMessage>,
    /// The new human message. `None` re-runs the last turn.
    pub message: Option<ConversationMessage>,
    /// Checkpoint to resume from when regenerating.
    pub checkpoint: Option<String>,
}

/// Incremental content for an assistant message that is still streaming.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDelta {
    pub conversation_id: Uuid,
    pub content: String,
}

#[async_trait]
pub trait StreamingBackend: Send + Sync {
    /// Start a run and wait for its final reply text.
    async fn submit(&self, request: StreamRequest) -> Result<String, StreamError>;

    /// Live deltas for all runs.
    fn subscribe(&self) -> broadcast::Receiver<MessageDelta>;

    /// Cancel the active run of a conversation, if any.
    async fn stop(&self, conversation_id: Uuid) -> Result<(), StreamError>;
}
