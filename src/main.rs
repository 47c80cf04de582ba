//! agentlink command line.
//!
//! - `agentlink card <url>`: print a remote agent's Agent Card
//! - `agentlink send <url> <text>`: discover an agent and send it one message
//! - `agentlink chat <agent> <text>`: message a registered agent
//! - `agentlink agents ...`: manage registrations
//! - `agentlink config`: print the effective configuration

use agentlink::a2a::AgentCardFetcher;
use agentlink::chat::streaming::UnconfiguredBackend;
use agentlink::chat::{
    AgentRef, Attachment, Collaborators, ConversationOrchestrator, Role, TracingNotifier, UserInput,
};
use agentlink::config::AppConfig;
use agentlink::registry::{
    AgentRegistration, AgentRegistry, AgentUpdate, InMemoryAgentStore, Registrar, SqliteAgentStore,
};
use agentlink::vault::InMemoryVault;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(name = "agentlink", version, about = "Talk to streaming and remote A2A agents")]
struct Cli {
    /// Configuration file layered over ~/.agentlink/config.toml
    #[arg(long, global = true, env = "AGENTLINK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch and print a remote agent's Agent Card
    Card { url: String },

    /// Discover a remote agent and send it a single message
    Send {
        url: String,
        text: String,
        /// Bearer token for the remote agent
        #[arg(long, env = "AGENTLINK_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Files to send along with the text
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Send a message to an agent (`remote:<uuid>` or `stream:<id>`)
    Chat { agent: AgentRef, text: String },

    /// Manage remote agent registrations
    #[command(subcommand)]
    Agents(AgentsCommand),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum AgentsCommand {
    /// Register a remote agent by its connection URL
    Add { name: String, url: String },
    List,
    /// Rename an agent or move it to a new URL (re-runs discovery)
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
    Remove { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    let _log_guard = agentlink::logging::init(&config.logging).context("failed to set up logging")?;

    tracing::debug!(version = agentlink::VERSION, "agentlink starting");
    let app = App::new(config).await?;

    match cli.command {
        Command::Card { url } => {
            let card = app.fetcher().fetch(&url).await?;
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        Command::Send {
            url,
            text,
            token,
            attachments,
        } => {
            // One-off agent: register into a throwaway store so the token
            // never reaches the configured registry.
            let scratch = app.with_registry(Arc::new(InMemoryAgentStore::new()));
            let record = scratch
                .registrar()
                .register(AgentRegistration {
                    name: url.clone(),
                    connection_url: url,
                    credential: token.map(Zeroizing::new),
                })
                .await?;
            let input = UserInput {
                text,
                attachments: read_attachments(&attachments).await?,
            };
            scratch.chat(&AgentRef::Remote(record.id), input).await?;
        }
        Command::Chat { agent, text } => {
            app.chat(&agent, UserInput::text(text)).await?;
        }
        Command::Agents(command) => app.agents(command).await?,
        Command::Config => print!("{}", app.config.to_toml()?),
    }
    Ok(())
}

struct App {
    config: AppConfig,
    http: reqwest::Client,
    registry: Arc<dyn AgentRegistry>,
    vault: Arc<InMemoryVault>,
}

impl App {
    async fn new(config: AppConfig) -> Result<Self> {
        let http = config.a2a.http_client()?;
        let registry: Arc<dyn AgentRegistry> = match &config.registry.database_url {
            Some(url) => Arc::new(
                SqliteAgentStore::connect(url)
                    .await
                    .with_context(|| format!("failed to open registry at {url}"))?,
            ),
            None => Arc::new(InMemoryAgentStore::new()),
        };
        Ok(Self {
            config,
            http,
            registry,
            vault: Arc::new(InMemoryVault::new()),
        })
    }

    fn with_registry(&self, registry: Arc<dyn AgentRegistry>) -> Self {
        Self {
            config: self.config.clone(),
            http: self.http.clone(),
            registry,
            vault: self.vault.clone(),
        }
    }

    fn fetcher(&self) -> AgentCardFetcher {
        AgentCardFetcher::new(self.http.clone(), self.config.a2a.discovery_timeout())
    }

    fn registrar(&self) -> Registrar {
        Registrar::new(self.registry.clone(), self.fetcher(), self.vault.clone())
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            registry: self.registry.clone(),
            vault: self.vault.clone(),
            rpc: agentlink::a2a::RpcClient::new(self.http.clone(), self.config.a2a.rpc_timeout()),
            streaming: Arc::new(UnconfiguredBackend::default()),
            notifier: Arc::new(TracingNotifier),
            accepted_output_modes: self.config.a2a.accepted_output_modes.clone(),
        }
    }

    async fn chat(&self, agent: &AgentRef, input: UserInput) -> Result<()> {
        let orchestrator = ConversationOrchestrator::new(self.collaborators());
        let turn = orchestrator.submit(input, agent).await?;
        match turn.reply {
            Some(reply) if reply.role == Role::Error => bail!(reply.content),
            Some(reply) => println!("{}", reply.content),
            None => bail!("no reply"),
        }
        Ok(())
    }

    async fn agents(&self, command: AgentsCommand) -> Result<()> {
        let registrar = self.registrar();
        match command {
            AgentsCommand::Add { name, url } => {
                let record = registrar
                    .register(AgentRegistration {
                        name,
                        connection_url: url,
                        credential: None,
                    })
                    .await?;
                println!("{}", AgentRef::Remote(record.id));
            }
            AgentsCommand::List => {
                for record in self.registry.list().await? {
                    println!(
                        "{}\t{}\t{}",
                        AgentRef::Remote(record.id),
                        record.display_name,
                        record.connection_url
                    );
                }
            }
            AgentsCommand::Update { id, name, url } => {
                let record = registrar
                    .update(
                        id,
                        AgentUpdate {
                            name,
                            connection_url: url,
                            credential: None,
                        },
                    )
                    .await?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            AgentsCommand::Remove { id } => {
                if !registrar.unregister(id).await? {
                    bail!("agent {id} not found");
                }
            }
        }
        Ok(())
    }
}

async fn read_attachments(paths: &[PathBuf]) -> Result<Vec<Attachment>> {
    let mut attachments = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        attachments.push(Attachment {
            name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime_type: mime_type(path).to_string(),
            bytes,
        });
    }
    Ok(attachments)
}

fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt" | "md") => "text/plain",
        Some("json") => "application/json",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
