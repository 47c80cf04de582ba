//! agentlink
//!
//! One conversation timeline over two kinds of agents: assistants on a
//! streaming execution backend, and remote agents spoken to over A2A
//! (Agent Card discovery plus JSON-RPC `message/send`).
//!
//! - [`a2a`]: discovery, RPC client, reply normalization
//! - [`registry`]: stored remote-agent registrations
//! - [`vault`]: credential references
//! - [`chat`]: per-conversation orchestration
//! - [`config`], [`logging`]: ambient setup for the binary

pub mod a2a;
pub mod chat;
pub mod config;
pub mod logging;
pub mod registry;
pub mod vault;


pub const VERSION: &str = env!("CARGO_PKG_VERSION");
