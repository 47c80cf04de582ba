//! Test doubles for the conversation layer.

use super::orchestrator::Collaborators;
use super::streaming::{MessageDelta, StreamError, StreamRequest, StreamingBackend};
use super::{AgentRef, Notifier};
use crate::a2a::RpcClient;
use crate::a2a::agent_card::parse_agent_card;
use crate::a2a::test_helpers::sample_card_json;
use crate::registry::{AgentRegistry, InMemoryAgentStore, NewAgentRecord};
use crate::vault::{CredentialVault, InMemoryVault};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use uuid::Uuid;

/// Calls seen by a [`ScriptedBackend`], in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    Submit,
    Stop,
}

/// Streaming backend that answers from a script.
///
/// A gated backend holds every run until [`ScriptedBackend::release`] or a
/// `stop` for its conversation. With [`ScriptedBackend::slow_stop`], each
/// `stop` waits for [`ScriptedBackend::finish_stop`] before taking effect.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, StreamError>>>,
    requests: Mutex<Vec<StreamRequest>>,
    stops: Mutex<Vec<Uuid>>,
    calls: Mutex<Vec<BackendCall>>,
    gated: bool,
    slow_stop: bool,
    started: Notify,
    released: Notify,
    cancelled: Notify,
    stopping: Notify,
    stop_finished: Notify,
    deltas: broadcast::Sender<MessageDelta>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        let (deltas, _) = broadcast::channel(16);
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            gated: false,
            slow_stop: false,
            started: Notify::new(),
            released: Notify::new(),
            cancelled: Notify::new(),
            stopping: Notify::new(),
            stop_finished: Notify::new(),
            deltas,
        }
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::new()
        }
    }

    pub fn slow_stop(self) -> Self {
        Self {
            slow_stop: true,
            ..self
        }
    }

    pub fn push_reply(&self, reply: Result<String, StreamError>) {
        self.replies.lock().expect("replies").push_back(reply);
    }

    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn stops(&self) -> Vec<Uuid> {
        self.stops.lock().expect("stops").clone()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    /// Wait until a slow `stop` has been received.
    pub async fn wait_stopping(&self) {
        self.stopping.notified().await;
    }

    pub fn finish_stop(&self) {
        self.stop_finished.notify_one();
    }
}

#[async_trait]
impl StreamingBackend for ScriptedBackend {
    async fn submit(&self, request: StreamRequest) -> Result<String, StreamError> {
        let conversation_id = request.conversation_id;
        self.calls.lock().expect("calls").push(BackendCall::Submit);
        self.requests.lock().expect("requests").push(request);
        self.started.notify_one();

        if self.gated {
            tokio::select! {
                _ = self.released.notified() => {}
                _ = self.cancelled.notified() => return Err(StreamError::Cancelled),
            }
        }

        let reply = self
            .replies
            .lock()
            .expect("replies")
            .pop_front()
            .unwrap_or_else(|| Err(StreamError::Backend("script exhausted".to_string())));
        if let Ok(content) = &reply {
            for word in content.split_inclusive(' ') {
                let _ = self.deltas.send(MessageDelta {
                    conversation_id,
                    content: word.to_string(),
                });
            }
        }
        reply
    }

    fn subscribe(&self) -> broadcast::Receiver<MessageDelta> {
        self.deltas.subscribe()
    }

    async fn stop(&self, conversation_id: Uuid) -> Result<(), StreamError> {
        if self.slow_stop {
            self.stopping.notify_one();
            self.stop_finished.notified().await;
        }
        self.calls.lock().expect("calls").push(BackendCall::Stop);
        self.stops.lock().expect("stops").push(conversation_id);
        self.cancelled.notify_one();
        Ok(())
    }
}

/// Collaborators wired to in-memory stores, with a five second RPC timeout.
pub fn collaborators(
    streaming: Arc<ScriptedBackend>,
    notifier: impl Notifier + 'static,
) -> Collaborators {
    Collaborators {
        registry: Arc::new(InMemoryAgentStore::new()),
        vault: Arc::new(InMemoryVault::new()),
        rpc: RpcClient::new(reqwest::Client::new(), Duration::from_secs(5)),
        streaming,
        notifier: Arc::new(notifier),
        accepted_output_modes: vec!["text/plain".to_string(), "application/json".to_string()],
    }
}

/// Store a remote agent whose card points at `{base_url}/a2a`, skipping
/// discovery.
pub async fn register_remote(
    store: &InMemoryAgentStore,
    vault: &dyn CredentialVault,
    base_url: &str,
    token: Option<&str>,
) -> AgentRef {
    let card = parse_agent_card(&sample_card_json(&format!("{base_url}/a2a")).to_string())
        .expect("card");
    let record = store
        .create(NewAgentRecord {
            display_name: "Remote".to_string(),
            connection_url: base_url.to_string(),
            credential_ref: token.map(|token| vault.seal(token).expect("seal")),
            agent_card: card,
        })
        .await
        .expect("create");
    AgentRef::Remote(record.id)
}
