use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nova_core::config::{dirs_home, AppConfig, RetryConfig};
use nova_core::types::{ChatEvent, SessionId};
use nova_graph::{conversation_graph, SessionHistory, StreamMerger, TurnRequest};
use nova_storage::{Database, SqliteDocIndex, SqliteFanLetterStore, SqliteScheduleStore};
use nova_tools::ToolRegistry;

#[derive(Parser)]
#[command(name = "nova", version, about = "Virtual idol chat agent")]
struct Cli {
    /// Config file location
    #[arg(short, long, default_value = "nova.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve,
    /// Run a single chat turn and exit
    Chat {
        /// The message to send (reads stdin if omitted)
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,

        /// Session id (random when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Print the resolved configuration
    Config,
    /// Emit shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging first; everything else reports through it
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nova=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Completions need no config
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "nova", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    if let Commands::Config = cli.command {
        let mut printable = config.clone();
        if printable.model.api_key.is_some() {
            printable.model.api_key = Some("[redacted]".into());
        }
        for model in &mut printable.fallback_models {
            if model.api_key.is_some() {
                model.api_key = Some("[redacted]".into());
            }
        }
        println!("{}", toml::to_string_pretty(&printable)?);
        return Ok(());
    }

    // Set up storage and tools
    let db = Database::open(&config.db_path())?;
    let schedules = Arc::new(SqliteScheduleStore::new(db.clone()));
    let letters = Arc::new(SqliteFanLetterStore::new(db.clone()));
    let index = Arc::new(SqliteDocIndex::new(db.clone()));
    let registry = Arc::new(ToolRegistry::with_builtins(schedules, letters));

    // Wrap the client for retry and fallbacks when configured
    let primary = nova_llm::create_client(&config.model);
    let llm: Arc<dyn nova_core::traits::LlmClient> =
        if !config.fallback_models.is_empty() || config.model.retry.is_some() {
            let retry_config = config
                .model
                .retry
                .clone()
                .unwrap_or_else(RetryConfig::default);
            let fallbacks: Vec<_> = config
                .fallback_models
                .iter()
                .map(|mc| (mc.clone(), nova_llm::create_client(mc)))
                .collect();
            Arc::new(nova_llm::RetryingClient::new(
                primary,
                fallbacks,
                retry_config,
            ))
        } else {
            Arc::from(primary)
        };

    let executor = conversation_graph(
        llm,
        config.model.clone(),
        registry,
        index,
        config.persona.clone(),
        config.retrieval.top_k,
    );
    let merger = Arc::new(StreamMerger::new(
        Arc::new(executor),
        Arc::new(SessionHistory::new()),
        config.session.history_limit,
    ));

    match cli.command {
        Commands::Serve => {
            let gateway_config = config.gateway.clone().unwrap_or_default();
            info!(bind = %gateway_config.bind, "Starting gateway");
            let server = nova_gateway::GatewayServer::new(
                gateway_config,
                merger,
                db,
                config.environment.clone(),
            );
            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Ctrl-C flips the cancellation token
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutdown signal received");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Chat { message, session } => {
            let text = if message.is_empty() {
                // Fall back to stdin
                let stdin = io::stdin();
                stdin
                    .lock()
                    .lines()
                    .map_while(|l| l.ok())
                    .collect::<Vec<_>>()
                    .join("\n")
            } else {
                message.join(" ")
            };
            if text.trim().is_empty() {
                anyhow::bail!("no message given");
            }

            let session_id = session
                .map(|s| SessionId::from_str(&s))
                .unwrap_or_else(SessionId::new);
            chat_once(&merger, session_id, text).await;
        }
        Commands::Config | Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Stream one turn to the terminal: status lines to stderr, reply tokens
/// to stdout.
async fn chat_once(merger: &StreamMerger, session_id: SessionId, message: String) {
    let request = TurnRequest {
        session_id,
        user_id: None,
        message,
    };
    let mut stream = merger.stream_turn(request);

    while let Some(event) = stream.next().await {
        match event {
            ChatEvent::Status { label } => eprintln!("[{}]", label),
            ChatEvent::Token { text } => {
                print!("{}", text);
                io::stdout().flush().ok();
            }
            ChatEvent::Final { tool_used, .. } => {
                println!();
                if let Some(tool) = tool_used {
                    eprintln!("[tool: {}]", tool);
                }
            }
            ChatEvent::Error { message } => eprintln!("[error: {}]", message),
            ChatEvent::Done => break,
        }
    }
}

fn load_config(path: &PathBuf) -> anyhow::Result<AppConfig> {
    if path.exists() {
        return Ok(AppConfig::load(path)?);
    }

    // Check for config in the home directory
    if let Some(home_path) = dirs_home().map(|h| h.join(".nova").join("config.toml")) {
        if home_path.exists() {
            info!(path = %home_path.display(), "Loading config from home directory");
            return Ok(AppConfig::load(&home_path)?);
        }
    }

    eprintln!("Warning: No config file found. Set UPSTAGE_API_KEY or create nova.toml");
    eprintln!("See nova.toml.example for reference.");
    Ok(AppConfig::from_env())
}
