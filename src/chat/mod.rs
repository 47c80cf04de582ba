//! Conversations
//!
//! One ordered message timeline per conversation, fed either by a streaming
//! execution backend or by a remote A2A agent. [`orchestrator`] decides which
//! path a submission takes; the other modules are its collaborators.

pub mod notify;
pub mod orchestrator;
pub mod streaming;
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use notify::{NotificationKind, Notifier, TracingNotifier};
pub use orchestrator::{Collaborators, ConversationOrchestrator, ConversationStatus, Turn};
pub use streaming::{StreamError, StreamingBackend};
pub use timeline::Timeline;

use crate::registry::RegistryError;
use crate::vault::VaultError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ─── Agent identity ──────────────────────────────────────────

/// Which backend an agent lives on, fixed by the namespace of its id.
///
/// Textual form is `stream:<assistant-id>` or `remote:<registry-uuid>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AgentRef {
    /// Assistant hosted by the streaming backend.
    Stream(String),
    /// Remote agent registered in the agent registry.
    Remote(Uuid),
}

impl AgentRef {
    pub fn is_remote(&self) -> bool {
        matches!(self, AgentRef::Remote(_))
    }
}

impl fmt::Display for AgentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRef::Stream(id) => write!(f, "stream:{id}"),
            AgentRef::Remote(id) => write!(f, "remote:{id}"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("Invalid agent reference '{0}': expected stream:<id> or remote:<uuid>")]
pub struct InvalidAgentRef(String);

impl FromStr for AgentRef {
    type Err = InvalidAgentRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidAgentRef(s.to_string());
        let (namespace, id) = s.split_once(':').ok_or_else(invalid)?;
        match namespace {
            "stream" if !id.trim().is_empty() => Ok(AgentRef::Stream(id.to_string())),
            "remote" => Uuid::parse_str(id)
                .map(AgentRef::Remote)
                .map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for AgentRef {
    type Error = InvalidAgentRef;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AgentRef> for String {
    fn from(value: AgentRef) -> Self {
        value.to_string()
    }
}

// ─── Messages ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    Error,
}

/// A file sent along with user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// What the human typed, plus any attachments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserInput {
    pub text: String,
    pub attachments: Vec<Attachment>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub originating_agent: AgentRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>, agent: AgentRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            originating_agent: agent,
            attachments: Vec::new(),
        }
    }

    pub(crate) fn human(input: UserInput, agent: AgentRef) -> Self {
        Self {
            attachments: input.attachments,
            ..Self::new(Role::Human, input.text.trim(), agent)
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Nothing to send: input is empty and has no attachments")]
    EmptyInput,

    #[error("A response is already pending for this conversation")]
    Busy,

    #[error("Unknown agent: {0}")]
    UnknownAgent(AgentRef),

    #[error("Operation not supported for agent {agent}")]
    Unsupported { agent: AgentRef },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_agent_ref_round_trip() {
        let id = Uuid::new_v4();
        for agent in [AgentRef::Stream("agent".to_string()), AgentRef::Remote(id)] {
            let text = agent.to_string();
            assert_eq!(text.parse::<AgentRef>(), Ok(agent));
        }
        assert_eq!(AgentRef::Remote(id).to_string(), format!("remote:{id}"));
    }

    #[rstest]
    #[case::no_namespace("agent")]
    #[case::blank_stream("stream:")]
    #[case::remote_not_uuid("remote:http://agent.example")]
    #[case::unknown_namespace("local:abc")]
    fn test_agent_ref_rejects(#[case] raw: &str) {
        assert!(raw.parse::<AgentRef>().is_err());
    }

    #[test]
    fn test_message_serializes_agent_as_string() {
        let message = ConversationMessage::new(Role::Ai, "hi", AgentRef::Stream("a".to_string()));
        let json = serde_json::to_value(&message).expect("json");
        assert_eq!(json["role"], "ai");
        assert_eq!(json["originatingAgent"], "stream:a");
    }

    #[test]
    fn test_user_input_emptiness() {
        assert!(UserInput::text("   ").is_empty());
        assert!(!UserInput::text("hello").is_empty());
        let attachment_only = UserInput {
            text: String::new(),
            attachments: vec![Attachment {
                name: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                bytes: b"x".to_vec(),
            }],
        };
        assert!(!attachment_only.is_empty());
    }
}
