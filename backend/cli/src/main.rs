mod agents_cmd;
mod api;
mod config;
mod jobs;
mod memory_cmd;
mod run_cmd;
mod terminal_output;
mod view;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use roundtable_agent::DEFAULT_MAX_TOKENS;
use roundtable_config::ConfigLoader;
use roundtable_llm::LlamaServerProvider;
use roundtable_memory::{ArtifactStore, ConversationMemory};

use api::AppState;
use config::Config;
use jobs::JobRegistry;
use memory_cmd::MemoryCommands;
use view::DEFAULT_BLOCKS;

#[derive(Parser)]
#[command(name = "roundtable")]
#[command(about = "Roundtable: round-robin multi-agent conversations over llama-server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a conversation in the foreground
    Run {
        /// Comma-separated agent ids, in speaking order
        #[arg(short, long)]
        agents: String,
        /// Total number of turns to run
        #[arg(short, long)]
        turns: u32,
        /// Token budget for each model call
        #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, value_parser = clap::value_parser!(u32).range(1..))]
        max_tokens: u32,
        /// Answer every call with canned text instead of contacting llama-server
        #[arg(long)]
        dry_run: bool,
    },
    /// Start the HTTP control plane
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List agents and their configured names
    Agents,
    /// Inspect or edit the shared transcript
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
    /// Show an agent's recent phase logs and the payload log tail
    Logs {
        agent: String,
        /// Blocks to show from each phase log
        #[arg(short = 'n', long, default_value_t = DEFAULT_BLOCKS)]
        blocks: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();

    logging::init_logger(&config.log_dir, &config.log_level);

    let result = match cli.command {
        Commands::Run {
            agents,
            turns,
            max_tokens,
            dry_run,
        } => run_cmd::run(&config, &agents, turns, max_tokens, dry_run).await,
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await
        }
        Commands::Agents => agents_cmd::list(&config.layout()).await,
        Commands::Memory { command } => {
            let memory = ConversationMemory::new(config.layout().conversation_path());
            memory_cmd::run(command, &memory).await
        }
        Commands::Logs { agent, blocks } => agents_cmd::logs(&config.layout(), &agent, blocks).await,
    };

    if let Err(e) = &result {
        terminal_output::note_error(&format!("{e:#}"));
    }
    result
}

async fn run_server(config: Config) -> Result<()> {
    let layout = config.layout();
    info!(
        port = config.port,
        bind = %config.bind_address,
        home = %layout.root().display(),
        llama_url = %config.llama_url,
        "Starting Roundtable control plane"
    );

    tokio::fs::create_dir_all(layout.agents_dir()).await?;

    let memory = ConversationMemory::new(layout.conversation_path());
    let artifacts = ArtifactStore::new(layout.clone());
    let provider = Arc::new(LlamaServerProvider::new(&config.llama_url));
    let backend_config = config.clone();
    let jobs = JobRegistry::new(layout.clone(), memory.clone(), artifacts.clone(), move |log| {
        backend_config.backend(provider.clone(), log)
    })
    .with_turn_delay(config.turn_delay());

    let app_state = Arc::new(AppState {
        config: ConfigLoader::new(layout.clone()),
        layout,
        memory,
        artifacts,
        jobs,
    });

    let app = api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());
    let addr = format!("{}:{}", config.bind_address, config.port);

    info!(addr = %addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
