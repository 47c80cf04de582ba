//! A2A (Agent-to-Agent) protocol client.
//!
//! Talks to remote agents over the A2A wire protocol:
//! - Agent Card discovery (`.well-known/agent.json`)
//! - JSON-RPC 2.0 `message/send`
//! - Flattening of task/message replies into display text

pub mod agent_card;
pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

#[cfg(test)]
pub mod test_helpers;

pub use agent_card::AgentCardFetcher;
pub use client::RpcClient;
pub use error::A2aError;
pub use normalize::{NO_TEXT_SENTINEL, to_display_text};
