//! Placeholder Backend
//!
//! Stands in when no streaming backend is configured, so remote agents stay
//! usable on their own.

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::{MessageDelta, StreamError, StreamRequest, StreamingBackend};

/// Refuses every run with [`StreamError::Unavailable`].
#[derive(Debug, Clone)]
pub struct UnconfiguredBackend {
    deltas: broadcast::Sender<MessageDelta>,
}

impl Default for UnconfiguredBackend {
    fn default() -> Self {
        let (deltas, _) = broadcast::channel(1);
        Self { deltas }
    }
}

#[async_trait]
impl StreamingBackend for UnconfiguredBackend {
    async fn submit(&self, request: StreamRequest) -> Result<String, StreamError> {
        tracing::debug!(assistant = %request.assistant_id, "Chat: no streaming backend configured");
        Err(StreamError::Unavailable(
            "No streaming backend configured. Only remote agents can be used.".to_string(),
        ))
    }

    fn subscribe(&self) -> broadcast::Receiver<MessageDelta> {
        self.deltas.subscribe()
    }

    async fn stop(&self, _conversation_id: Uuid) -> Result<(), StreamError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_is_refused() {
        let backend = UnconfiguredBackend::default();
        let result = backend
            .submit(StreamRequest {
                conversation_id: Uuid::new_v4(),
                assistant_id: "agent".to_string(),
                history: Vec::new(),
                message: None,
                checkpoint: None,
            })
            .await;
        assert!(matches!(result, Err(StreamError::Unavailable(_))));
        assert!(backend.stop(Uuid::new_v4()).await.is_ok());
    }
}
