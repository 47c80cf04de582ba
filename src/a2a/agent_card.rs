//! Agent Card discovery via `.well-known/agent.json`.
//!
//! Fetches a remote agent's capability document and validates it before
//! anyone gets to trust it. Fetching has no side effects; the caller decides
//! whether to persist the card.

use crate::a2a::error::{A2aError, Result};
use crate::a2a::types::*;
use reqwest::header::ACCEPT;
use std::time::Duration;

/// Discovery path appended to an agent's connection URL.
pub const WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// Build the discovery URL for a connection URL, stripping trailing slashes.
pub fn discovery_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), WELL_KNOWN_PATH)
}

/// Parse a connection URL, accepting only absolute `http`/`https` URLs.
pub fn parse_base_url(base_url: &str) -> Result<reqwest::Url> {
    let invalid_url = |reason: String| A2aError::InvalidUrl {
        url: base_url.to_string(),
        reason,
    };
    let url = reqwest::Url::parse(base_url.trim()).map_err(|e| invalid_url(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid_url(format!("unsupported scheme '{other}'"))),
    }
}

/// Fetches and validates Agent Cards.
#[derive(Debug, Clone)]
pub struct AgentCardFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

impl AgentCardFetcher {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Fetch the card published under `base_url`.
    ///
    /// Safe to call repeatedly: used both at registration and whenever an
    /// agent's connection URL changes.
    pub async fn fetch(&self, base_url: &str) -> Result<AgentCard> {
        parse_base_url(base_url)?;
        let url = discovery_url(base_url.trim());
        tracing::debug!(url = %url, "A2A: fetching agent card");

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| A2aError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url = %url, status = status.as_u16(), "A2A: agent card discovery failed");
            return Err(A2aError::Discovery {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| A2aError::Transport {
                url: url.clone(),
                source,
            })?;

        let card = parse_agent_card(&body)?;
        tracing::info!(url = %url, agent = %card.name, "A2A: agent card validated");
        Ok(card)
    }
}

/// Parse and validate a discovery document.
///
/// Mandatory fields must be present and non-blank, the service URL must be
/// absolute, and the `kind` marker must be `agent-card`.
pub fn parse_agent_card(body: &str) -> Result<AgentCard> {
    let card: AgentCard = serde_json::from_str(body).map_err(|e| A2aError::InvalidCard {
        reason: e.to_string(),
    })?;
    validate_agent_card(&card)?;
    Ok(card)
}

fn validate_agent_card(card: &AgentCard) -> Result<()> {
    if card.kind != AGENT_CARD_KIND {
        return Err(invalid(format!("unexpected kind '{}'", card.kind)));
    }
    if card.name.trim().is_empty() {
        return Err(invalid("missing name"));
    }
    if card.service_url.trim().is_empty() {
        return Err(invalid("missing url"));
    }
    reqwest::Url::parse(&card.service_url)
        .map_err(|e| invalid(format!("url '{}' is not absolute: {e}", card.service_url)))?;
    if let Some(skill) = card.skills.iter().find(|s| s.id.trim().is_empty()) {
        return Err(invalid(format!("skill '{}' has no id", skill.name)));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> A2aError {
    A2aError::InvalidCard {
        reason: reason.into(),
    }
}
