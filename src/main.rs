//! learnbridge - MCP tool server and learning capture CLI
//!
//! `learnbridge serve` starts the MCP server (HTTP bridge and SSE by default,
//! or stdio). The remaining subcommands run the learning pipeline locally.

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use learnbridge_core::{
    metacognition::{analyze_session, create_learning_entries, store_in_knowledge_base},
    register_modules, transport, BridgeConfig, ConfigOverrides, Dispatcher, EntryVersion,
    KnowledgeStore, LearningEntry, ServerContext, ServiceClient, SessionData,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "learnbridge")]
#[command(about = "MCP tool server for debugging-session learning capture", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./learnbridge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// HTTP JSON-RPC bridge plus SSE
    Sse,
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        #[arg(short, long, value_enum, default_value = "sse")]
        transport: Transport,

        /// Interface to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the tools the server would register
    Tools,

    /// Turn a JSON session file into learning entries
    Format {
        /// File holding session data, or a bare list of experiences
        file: PathBuf,

        /// Project context (overrides the file's value)
        #[arg(short, long)]
        project: Option<String>,

        /// Write a markdown learning file to the knowledge directory
        #[arg(long)]
        save: bool,
    },

    /// Extract learnings from a transcript or the project directory
    Analyze {
        /// Transcript file to mine for debugging experiences
        #[arg(long)]
        content: Option<PathBuf>,

        /// Project directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Write a markdown learning file to the knowledge directory
        #[arg(long)]
        save: bool,

        /// Store the entries in the external knowledge base
        #[arg(long)]
        publish: bool,
    },

    /// Inspect saved learning files
    Learnings {
        #[command(subcommand)]
        action: LearningsAction,
    },
}

#[derive(Subcommand)]
enum LearningsAction {
    /// List learning files in the knowledge directory
    List,

    /// Show the header and entries of a learning file
    Show {
        /// File path, absolute or relative to the knowledge directory
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let level = level.as_str().to_lowercase();

    // Crate at the requested level, HTTP plumbing pinned to warn
    let filter = EnvFilter::new(format!(
        "learnbridge={level},learnbridge_core={level},tower_http={level},\
         hyper=warn,h2=warn,reqwest=warn,tokio_stream=error"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // stdout belongs to the stdio transport
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    debug!("learnbridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve {
            transport,
            host,
            port,
        } => {
            let config = BridgeConfig::load(
                config_path,
                ConfigOverrides {
                    host,
                    port,
                    ..Default::default()
                },
            )?;
            serve(config, transport).await
        }
        Commands::Tools => {
            let config = BridgeConfig::load(config_path, ConfigOverrides::default())?;
            let registry = register_modules(&config.modules)?;
            for tool in registry.definitions() {
                println!("{:<26} {}", tool.name, tool.description);
            }
            Ok(())
        }
        Commands::Format {
            file,
            project,
            save,
        } => {
            let config = BridgeConfig::load(config_path, ConfigOverrides::default())?;
            let mut session = read_session_file(&file).await?;
            if let Some(project) = project {
                session.project_context = project;
            }
            let entries = create_learning_entries(&session, EntryVersion::V2);
            report(&config, &session, &entries, save, false).await
        }
        Commands::Analyze {
            content,
            dir,
            save,
            publish,
        } => {
            let config = BridgeConfig::load(config_path, ConfigOverrides::default())?;
            let transcript = match content {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?,
                ),
                None => None,
            };
            let session = analyze_session(transcript.as_deref(), &dir);
            info!(
                "Found {} debugging experiences in {}",
                session.debugging_experiences.len(),
                session.project_context
            );
            let entries = create_learning_entries(&session, EntryVersion::V2);
            report(&config, &session, &entries, save, publish).await
        }
        Commands::Learnings { action } => {
            let config = BridgeConfig::load(config_path, ConfigOverrides::default())?;
            let store = KnowledgeStore::new(&config.storage.knowledge_dir);
            match action {
                LearningsAction::List => {
                    let files = store.list().await?;
                    if files.is_empty() {
                        println!("No learning files in {}", store.dir().display());
                    }
                    for file in files {
                        println!("{}", file.display());
                    }
                }
                LearningsAction::Show { file } => {
                    let log = store.load(&file).await?;
                    println!("Session: {}", log.session_id);
                    println!("Project: {}", log.project);
                    println!("Started: {}", log.start_time);
                    println!();
                    for entry in log.entries {
                        println!("  {}  {}  {}", entry.id, entry.timestamp, entry.trigger);
                    }
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: BridgeConfig, mode: Transport) -> anyhow::Result<()> {
    let registry = register_modules(&config.modules)?;
    info!("Registered {} tools", registry.len());

    // Port is only needed by the network transports
    let addr = match mode {
        Transport::Sse => Some(config.bind_addr()?),
        Transport::Stdio => None,
    };

    let ctx = ServerContext::from_config(config);
    let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(ctx));

    match addr {
        Some(addr) => transport::serve(dispatcher, &addr, transport::ctrl_c()).await,
        None => {
            transport::stdio::run(dispatcher).await?;
            Ok(())
        }
    }
}

/// Session data as a full object, or just a list of experiences
async fn read_session_file(path: &Path) -> anyhow::Result<SessionData> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if value.is_array() {
        let experiences = serde_json::from_value(value)?;
        let session_id = format!("session-{}", chrono::Local::now().format("%Y%m%d-%H%M%S"));
        return Ok(SessionData::new(session_id, "unknown", experiences));
    }
    Ok(serde_json::from_value(value)?)
}

async fn report(
    config: &BridgeConfig,
    session: &SessionData,
    entries: &[LearningEntry],
    save: bool,
    publish: bool,
) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);

    if save {
        let store = KnowledgeStore::new(&config.storage.knowledge_dir);
        let path = store
            .save(entries, &session.session_id, &session.project_context)
            .await?;
        eprintln!("Saved {}", path.display());
    }

    if publish {
        let client = ServiceClient::shared(&config.services);
        let outcomes = store_in_knowledge_base(entries, &session.session_id, &*client).await;
        let stored = outcomes.iter().filter(|o| o.status == "success").count();
        eprintln!("Stored {}/{} entries in the knowledge base", stored, outcomes.len());
    }

    Ok(())
}
