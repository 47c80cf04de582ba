//! Agent Registry
//!
//! Stores remote-agent registrations: connection info, the cached Agent
//! Card, and an opaque credential reference. Pure data access; discovery is
//! driven by [`registration::Registrar`].

mod memory;
pub mod registration;
mod sqlite;

pub use memory::InMemoryAgentStore;
pub use registration::{AgentRegistration, AgentUpdate, CredentialChange, Registrar, RegistrationError};
pub use sqlite::SqliteAgentStore;

use crate::a2a::types::AgentCard;
use crate::vault::CredentialRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// A connection URL change must come with the card fetched from it.
    #[error("Agent {0}: connection URL changed without a refreshed Agent Card")]
    StaleCard(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// A registered remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub id: Uuid,
    pub display_name: String,
    pub connection_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
    pub agent_card: AgentCard,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to create a record; id and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgentRecord {
    pub display_name: String,
    pub connection_url: String,
    pub credential_ref: Option<CredentialRef>,
    pub agent_card: AgentCard,
}

/// Partial update. `None` leaves a field untouched; `credential_ref:
/// Some(None)` clears the credential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentRecordPatch {
    pub display_name: Option<String>,
    pub connection_url: Option<String>,
    pub credential_ref: Option<Option<CredentialRef>>,
    pub agent_card: Option<AgentCard>,
}

impl AgentRecord {
    fn create(data: NewAgentRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: data.display_name,
            connection_url: data.connection_url,
            credential_ref: data.credential_ref,
            agent_card: data.agent_card,
            created_at: now,
            updated_at: now,
        }
    }

    /// Produce the patched record without touching `self`, so a rejected
    /// patch leaves the stored record as it was.
    fn patched(&self, patch: AgentRecordPatch, now: DateTime<Utc>) -> Result<Self> {
        if patch.connection_url.is_some() && patch.agent_card.is_none() {
            return Err(RegistryError::StaleCard(self.id));
        }
        let mut next = self.clone();
        if let Some(name) = patch.display_name {
            next.display_name = name;
        }
        if let Some(url) = patch.connection_url {
            next.connection_url = url;
        }
        if let Some(credential_ref) = patch.credential_ref {
            next.credential_ref = credential_ref;
        }
        if let Some(card) = patch.agent_card {
            next.agent_card = card;
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Storage contract for agent registrations.
///
/// Every operation is atomic per record: readers never see a half-written
/// record and a failed write leaves the previous version intact.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// All records, oldest first.
    async fn list(&self) -> Result<Vec<AgentRecord>>;

    async fn get(&self, id: Uuid) -> Result<Option<AgentRecord>>;

    async fn create(&self, data: NewAgentRecord) -> Result<AgentRecord>;

    /// Returns `None` when no record has this id.
    async fn update(&self, id: Uuid, patch: AgentRecordPatch) -> Result<Option<AgentRecord>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}
