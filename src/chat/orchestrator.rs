//! Conversation Orchestrator
//!
//! Drives one conversation against either backend. Per conversation:
//!
//! - at most one submission is in flight; a second one is refused, not queued,
//! - the human message is appended before any network call,
//! - exactly one AI or error message follows it, unless the submission was
//!   stopped, in which case its late result is dropped.
//!
//! Each submission holds a ticket while it is pending. `stop` releases the
//! ticket, so whatever the abandoned call eventually returns no longer
//! matches and is discarded.

use super::notify::{NotificationKind, Notifier};
use super::streaming::{MessageDelta, StreamError, StreamRequest, StreamingBackend};
use super::timeline::Timeline;
use super::{AgentRef, Attachment, ConversationMessage, OrchestratorError, Role, UserInput};
use crate::a2a::types::{FileContent, MessageSendParams, Part};
use crate::a2a::{RpcClient, to_display_text};
use crate::registry::AgentRegistry;
use crate::vault::CredentialVault;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use uuid::Uuid;
use zeroize::Zeroizing;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Notification shown when the streaming backend fails a run.
pub const STREAM_FAILURE_NOTICE: &str = "An error occurred. Please try again.";

/// Notification shown when regenerate is requested for a remote agent.
pub const REGENERATE_UNSUPPORTED_NOTICE: &str = "Regenerate is not supported for remote agents.";

/// Services shared by every conversation.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn AgentRegistry>,
    pub vault: Arc<dyn CredentialVault>,
    pub rpc: RpcClient,
    pub streaming: Arc<dyn StreamingBackend>,
    pub notifier: Arc<dyn Notifier>,
    /// Sent as `acceptedOutputModes` on every remote call.
    pub accepted_output_modes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    Idle,
    AwaitingResponse,
}

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub human: ConversationMessage,
    /// The AI or error message, or `None` if the submission was stopped.
    pub reply: Option<ConversationMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Stream,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Awaiting { ticket: u64, backend: Backend },
}

#[derive(Debug)]
struct State {
    timeline: Timeline,
    phase: Phase,
    next_ticket: u64,
}

impl State {
    fn begin(&mut self, backend: Backend) -> Result<u64> {
        if self.phase != Phase::Idle {
            return Err(OrchestratorError::Busy);
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.phase = Phase::Awaiting { ticket, backend };
        Ok(ticket)
    }

    fn holds(&self, ticket: u64) -> bool {
        matches!(self.phase, Phase::Awaiting { ticket: current, .. } if current == ticket)
    }
}

/// Where a submission goes, resolved before anything is appended.
enum Target {
    Stream(String),
    Remote {
        service_url: String,
        credential: Option<Zeroizing<String>>,
    },
}

impl Target {
    fn backend(&self) -> Backend {
        match self {
            Target::Stream(_) => Backend::Stream,
            Target::Remote { .. } => Backend::Remote,
        }
    }
}

/// How a finished run lands in the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Append,
    /// Regeneration: the new reply takes the place of the trailing one.
    ReplaceReply,
}

impl Placement {
    fn record(self, timeline: &mut Timeline, message: ConversationMessage) -> ConversationMessage {
        match self {
            Placement::Append => timeline.append(message),
            Placement::ReplaceReply => timeline.replace_last_reply(message),
        }
    }
}

enum Outcome {
    Reply(String),
    Failed { content: String, notice: String },
    Cancelled,
}

pub struct ConversationOrchestrator {
    id: Uuid,
    deps: Collaborators,
    state: Mutex<State>,
}

impl ConversationOrchestrator {
    pub fn new(deps: Collaborators) -> Self {
        Self::with_id(Uuid::new_v4(), deps)
    }

    pub fn with_id(id: Uuid, deps: Collaborators) -> Self {
        Self {
            id,
            deps,
            state: Mutex::new(State {
                timeline: Timeline::new(),
                phase: Phase::Idle,
                next_ticket: 0,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the timeline.
    pub async fn messages(&self) -> Vec<ConversationMessage> {
        self.state.lock().await.timeline.messages().to_vec()
    }

    pub async fn status(&self) -> ConversationStatus {
        match self.state.lock().await.phase {
            Phase::Idle => ConversationStatus::Idle,
            Phase::Awaiting { .. } => ConversationStatus::AwaitingResponse,
        }
    }

    /// Live streaming deltas. Carries every conversation's deltas; filter on
    /// `conversation_id`.
    pub fn deltas(&self) -> broadcast::Receiver<MessageDelta> {
        self.deps.streaming.subscribe()
    }

    /// Send user input to `agent` and wait for the reply.
    ///
    /// Returns `EmptyInput`, `Busy`, or a lookup error without touching the
    /// timeline. Once the human message is appended, call failures become an
    /// error message in the timeline plus a notification, never an `Err`.
    pub async fn submit(&self, input: UserInput, agent: &AgentRef) -> Result<Turn> {
        if input.is_empty() {
            return Err(OrchestratorError::EmptyInput);
        }

        let mut state = self.state.lock().await;
        if state.phase != Phase::Idle {
            return Err(OrchestratorError::Busy);
        }
        let target = self.resolve(agent).await?;
        let ticket = state.begin(target.backend())?;
        let history = state.timeline.messages().to_vec();
        let human = state
            .timeline
            .append(ConversationMessage::human(input, agent.clone()));
        drop(state);

        tracing::info!(conversation = %self.id, agent = %agent, ticket, "Chat: submission started");
        let outcome = match target {
            Target::Stream(assistant_id) => {
                self.run_stream(StreamRequest {
                    conversation_id: self.id,
                    assistant_id,
                    history,
                    message: Some(human.clone()),
                    checkpoint: None,
                })
                .await
            }
            Target::Remote {
                service_url,
                credential,
            } => {
                let credential = credential.as_deref().map(String::as_str);
                self.run_remote(&service_url, &human, credential).await
            }
        };

        let reply = self.finish(ticket, agent, Placement::Append, outcome).await;
        Ok(Turn { human, reply })
    }

    /// Re-run the last AI turn on the streaming backend, optionally from a
    /// checkpoint. Remote agents have no checkpoint to resume from.
    ///
    /// The backend sees the history without the reply being regenerated, and
    /// the outcome replaces that reply. A stopped regeneration keeps it.
    pub async fn regenerate(
        &self,
        agent: &AgentRef,
        checkpoint: Option<String>,
    ) -> Result<Option<ConversationMessage>> {
        let AgentRef::Stream(assistant_id) = agent else {
            self.deps
                .notifier
                .notify(NotificationKind::Info, REGENERATE_UNSUPPORTED_NOTICE);
            return Err(OrchestratorError::Unsupported {
                agent: agent.clone(),
            });
        };

        let mut state = self.state.lock().await;
        let ticket = state.begin(Backend::Stream)?;
        let history = state.timeline.before_last_reply().to_vec();
        drop(state);

        tracing::info!(conversation = %self.id, agent = %agent, ticket, "Chat: regenerating last turn");
        let outcome = self
            .run_stream(StreamRequest {
                conversation_id: self.id,
                assistant_id: assistant_id.clone(),
                history,
                message: None,
                checkpoint,
            })
            .await;
        Ok(self
            .finish(ticket, agent, Placement::ReplaceReply, outcome)
            .await)
    }

    /// Abandon the pending submission, if any.
    ///
    /// Streaming runs are cancelled on the backend. A remote call cannot be
    /// recalled; its result is dropped when it arrives.
    ///
    /// The conversation stays locked until the backend has acknowledged the
    /// stop, so the cancellation cannot reach a submission made after it.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let Phase::Awaiting { backend, ticket } = state.phase else {
            return Ok(());
        };
        tracing::info!(conversation = %self.id, ticket, "Chat: submission stopped");
        state.phase = Phase::Idle;

        if backend == Backend::Stream {
            self.deps.streaming.stop(self.id).await?;
        }
        Ok(())
    }

    async fn resolve(&self, agent: &AgentRef) -> Result<Target> {
        match agent {
            AgentRef::Stream(assistant_id) => Ok(Target::Stream(assistant_id.clone())),
            AgentRef::Remote(id) => {
                let record = self
                    .deps
                    .registry
                    .get(*id)
                    .await?
                    .ok_or_else(|| OrchestratorError::UnknownAgent(agent.clone()))?;
                let credential = record
                    .credential_ref
                    .as_ref()
                    .map(|reference| self.deps.vault.reveal(reference))
                    .transpose()?;
                Ok(Target::Remote {
                    service_url: record.agent_card.service_url,
                    credential,
                })
            }
        }
    }

    async fn run_remote(
        &self,
        service_url: &str,
        human: &ConversationMessage,
        credential: Option<&str>,
    ) -> Outcome {
        let params = MessageSendParams::new(
            remote_parts(&human.content, &human.attachments),
            self.deps.accepted_output_modes.clone(),
        );
        match self.deps.rpc.send_message(service_url, &params, credential).await {
            Ok(reply) => Outcome::Reply(to_display_text(&reply)),
            Err(e) => {
                tracing::warn!(conversation = %self.id, kind = e.code(), "Chat: remote agent call failed: {e}");
                Outcome::Failed {
                    content: format!("Error interacting with remote agent: {e}"),
                    notice: format!("Failed to get response from remote agent: {e}"),
                }
            }
        }
    }

    async fn run_stream(&self, request: StreamRequest) -> Outcome {
        match self.deps.streaming.submit(request).await {
            Ok(content) => Outcome::Reply(content),
            Err(StreamError::Cancelled) => Outcome::Cancelled,
            Err(e) => {
                tracing::warn!(conversation = %self.id, "Chat: streaming run failed: {e}");
                Outcome::Failed {
                    content: e.to_string(),
                    notice: STREAM_FAILURE_NOTICE.to_string(),
                }
            }
        }
    }

    /// Record the outcome of the submission holding `ticket`, unless it was
    /// stopped in the meantime.
    async fn finish(
        &self,
        ticket: u64,
        agent: &AgentRef,
        placement: Placement,
        outcome: Outcome,
    ) -> Option<ConversationMessage> {
        let mut state = self.state.lock().await;
        if !state.holds(ticket) {
            tracing::info!(conversation = %self.id, ticket, "Chat: dropping result of stopped submission");
            return None;
        }
        state.phase = Phase::Idle;

        match outcome {
            Outcome::Reply(content) => Some(placement.record(
                &mut state.timeline,
                ConversationMessage::new(Role::Ai, content, agent.clone()),
            )),
            Outcome::Cancelled => None,
            Outcome::Failed { content, notice } => {
                let message = placement.record(
                    &mut state.timeline,
                    ConversationMessage::new(Role::Error, content, agent.clone()),
                );
                drop(state);
                self.deps.notifier.notify(NotificationKind::Error, &notice);
                Some(message)
            }
        }
    }
}

/// Parts of a remote `message/send`: the text, then one file part per
/// attachment. Text is left out only for attachment-only input.
fn remote_parts(text: &str, attachments: &[Attachment]) -> Vec<Part> {
    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.is_empty() || attachments.is_empty() {
        parts.push(Part::text(text));
    }
    parts.extend(attachments.iter().map(|attachment| Part::File {
        file: FileContent {
            name: Some(attachment.name.clone()),
            mime_type: Some(attachment.mime_type.clone()),
            bytes: Some(BASE64.encode(&attachment.bytes)),
            uri: None,
        },
    }));
    parts
}
