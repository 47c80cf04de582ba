//! Registration flow for remote agents.
//!
//! The only path that writes cards into the registry. The card is fetched
//! from the agent itself whenever a connection URL is supplied, so a caller
//! can never plant a card of its choosing. A discovery failure aborts the
//! whole operation and leaves the registry untouched.

use super::{AgentRecord, AgentRecordPatch, AgentRegistry, NewAgentRecord, RegistryError};
use crate::a2a::agent_card::{AgentCardFetcher, parse_base_url};
use crate::a2a::error::A2aError;
use crate::vault::{CredentialRef, CredentialVault, VaultError};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Invalid registration: {0}")]
    InvalidPayload(String),

    #[error("Failed to fetch or validate Agent Card from the provided URL. Details: {0}")]
    Discovery(#[source] A2aError),

    #[error("Agent not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Request to register a new remote agent.
pub struct AgentRegistration {
    pub name: String,
    pub connection_url: String,
    /// Raw bearer token; sealed in the vault before anything is stored.
    pub credential: Option<Zeroizing<String>>,
}

/// Partial change to an existing registration. There is deliberately no
/// card field: cards only ever come from discovery.
#[derive(Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub connection_url: Option<String>,
    pub credential: Option<CredentialChange>,
}

pub enum CredentialChange {
    Set(Zeroizing<String>),
    Clear,
}

/// Drives discovery and credential sealing around registry writes.
#[derive(Clone)]
pub struct Registrar {
    registry: Arc<dyn AgentRegistry>,
    fetcher: AgentCardFetcher,
    vault: Arc<dyn CredentialVault>,
}

impl Registrar {
    pub fn new(
        registry: Arc<dyn AgentRegistry>,
        fetcher: AgentCardFetcher,
        vault: Arc<dyn CredentialVault>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            vault,
        }
    }

    pub async fn register(&self, request: AgentRegistration) -> Result<AgentRecord, RegistrationError> {
        let name = required_name(&request.name)?;
        let connection_url = checked_url(&request.connection_url)?;

        tracing::info!(name = %name, url = %connection_url, "Registry: registering remote agent");
        let card = self
            .fetcher
            .fetch(&connection_url)
            .await
            .map_err(RegistrationError::Discovery)?;

        let credential_ref = self.seal(request.credential.as_deref().map(String::as_str))?;
        let created = self
            .registry
            .create(NewAgentRecord {
                display_name: name,
                connection_url,
                credential_ref: credential_ref.clone(),
                agent_card: card,
            })
            .await;

        match created {
            Ok(record) => Ok(record),
            Err(e) => {
                if let Some(reference) = credential_ref {
                    self.vault.discard(&reference);
                }
                Err(e.into())
            }
        }
    }

    pub async fn update(&self, id: Uuid, update: AgentUpdate) -> Result<AgentRecord, RegistrationError> {
        let current = self
            .registry
            .get(id)
            .await?
            .ok_or(RegistrationError::NotFound(id))?;

        let display_name = update.name.as_deref().map(required_name).transpose()?;
        let connection_url = update.connection_url.as_deref().map(checked_url).transpose()?;

        let agent_card = match &connection_url {
            Some(url) => {
                tracing::info!(id = %id, url = %url, "Registry: connection URL supplied, refreshing agent card");
                Some(self.fetcher.fetch(url).await.map_err(RegistrationError::Discovery)?)
            }
            None => None,
        };

        let (credential_ref, sealed) = match update.credential {
            Some(CredentialChange::Set(raw)) => {
                let sealed = self.seal(Some(raw.as_str()))?;
                (Some(sealed.clone()), sealed)
            }
            Some(CredentialChange::Clear) => (Some(None), None),
            None => (None, None),
        };
        let replaces_credential = credential_ref.is_some();

        let patch = AgentRecordPatch {
            display_name,
            connection_url,
            credential_ref,
            agent_card,
        };
        let updated = match self.registry.update(id, patch).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.discard(sealed.as_ref());
                return Err(RegistrationError::NotFound(id));
            }
            Err(e) => {
                self.discard(sealed.as_ref());
                return Err(e.into());
            }
        };

        if replaces_credential {
            self.discard(current.credential_ref.as_ref());
        }
        Ok(updated)
    }

    /// Remove an agent and forget its credential. Returns `false` when the
    /// id is unknown.
    pub async fn unregister(&self, id: Uuid) -> Result<bool, RegistrationError> {
        let Some(record) = self.registry.get(id).await? else {
            return Ok(false);
        };
        let deleted = self.registry.delete(id).await?;
        if deleted {
            self.discard(record.credential_ref.as_ref());
        }
        Ok(deleted)
    }

    fn seal(&self, raw: Option<&str>) -> Result<Option<CredentialRef>, RegistrationError> {
        match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Ok(Some(self.vault.seal(raw)?)),
            None => Ok(None),
        }
    }

    fn discard(&self, reference: Option<&CredentialRef>) {
        if let Some(reference) = reference {
            self.vault.discard(reference);
        }
    }
}

fn required_name(name: &str) -> Result<String, RegistrationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistrationError::InvalidPayload(
            "missing required field: name".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn checked_url(url: &str) -> Result<String, RegistrationError> {
    if url.trim().is_empty() {
        return Err(RegistrationError::InvalidPayload(
            "missing required field: connectionUrl".to_string(),
        ));
    }
    parse_base_url(url).map_err(|e| RegistrationError::InvalidPayload(e.to_string()))?;
    Ok(url.trim().to_string())
}
