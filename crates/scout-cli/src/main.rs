//! scout - conversational research assistant CLI

mod checkpoint;
mod config;
mod tools;
mod utils;

use clap::Parser;
use futures::StreamExt;
use scout_agent::{
    CheckpointStore, GraphContext, MemoryCheckpointStore, ResearchSession, TurnEvent,
};
use scout_ai::{ModelGateway, Provider, ProviderBackend};
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::checkpoint::FileCheckpointStore;
use crate::config::Config;

/// scout - plans, researches and answers with citations
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Research topic for the first turn
    #[arg(short, long)]
    topic: Option<String>,

    /// Thread to continue (a new one is created when omitted)
    #[arg(long)]
    thread_id: Option<String>,

    /// Primary model (default: gpt-4o-mini)
    #[arg(short, long)]
    model: Option<String>,

    /// Primary provider (openai, google, groq, openrouter, ollama)
    #[arg(short, long)]
    provider: Option<String>,

    /// Fallback model (default: gemini-2.5-flash)
    #[arg(long)]
    fallback_model: Option<String>,

    /// Fallback provider, or "none"
    #[arg(long)]
    fallback_provider: Option<String>,

    /// Disable the fallback model
    #[arg(long)]
    no_fallback: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List saved threads
    #[arg(long)]
    threads: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Keep thread state in memory only
    #[arg(long)]
    ephemeral: bool,
}

impl Args {
    /// Apply flags over the config file (flags take precedence)
    fn apply(&self, cfg: &mut Config) {
        if let Some(model) = &self.model {
            cfg.primary_model = Some(model.clone());
        }
        if let Some(provider) = &self.provider {
            cfg.primary_provider = Some(provider.clone());
        }
        if let Some(model) = &self.fallback_model {
            cfg.fallback_model = Some(model.clone());
        }
        if let Some(provider) = &self.fallback_provider {
            cfg.fallback_provider = Some(provider.clone());
        }
        if self.no_fallback {
            cfg.fallback_provider = Some("none".to_string());
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("scout=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Build a backend, `None` when the provider needs a key we don't have
fn backend(cfg: &Config, provider: &str, model_id: &str) -> scout_ai::Result<Option<ProviderBackend>> {
    let provider = Provider::parse(provider);
    let model = scout_ai::models::resolve(provider, model_id);
    let key = cfg.get_api_key(provider);
    if key.is_none() && provider.api_key_env_var().is_some() {
        return Ok(None);
    }
    ProviderBackend::new(model, key.as_deref()).map(Some)
}

fn build_gateway(cfg: &Config) -> anyhow::Result<ModelGateway> {
    let (provider, model_id) = cfg.primary();
    let primary = backend(cfg, &provider, &model_id)?.ok_or_else(|| {
        let var = Provider::parse(&provider)
            .api_key_env_var()
            .unwrap_or("OPENAI_API_KEY");
        scout_agent::Error::Config(format!(
            "no API key for primary provider {}. Set {} or add it to {}",
            provider,
            var,
            Config::config_path().display()
        ))
    })?;
    let mut gateway = ModelGateway::new(Arc::new(primary));

    if let Some((provider, model_id)) = cfg.fallback() {
        match backend(cfg, &provider, &model_id) {
            Ok(Some(fallback)) => {
                gateway = gateway.with_fallback(Arc::new(fallback));
            }
            Ok(None) => {
                tracing::warn!(provider = %provider, "No API key for fallback provider, running without fallback");
            }
            Err(e) => {
                tracing::warn!(provider = %provider, model = %model_id, "Fallback model disabled: {}", e);
            }
        }
    }
    Ok(gateway)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // .env is optional
    let _ = dotenvy::dotenv();
    init_logging(args.verbose);

    // Initialize config and exit
    if args.init_config {
        let path = Config::init()?;
        println!("Config file created at: {}", path.display());
        println!("\nExample config:\n{}", config::example_config());
        return Ok(());
    }

    let mut cfg = Config::load()?;
    args.apply(&mut cfg);
    cfg.research.validate()?;

    let store: Arc<dyn CheckpointStore> = if args.ephemeral {
        Arc::new(MemoryCheckpointStore::new())
    } else {
        Arc::new(FileCheckpointStore::new(cfg.checkpoint_dir()))
    };

    // List threads and exit
    if args.threads {
        return list_threads(store.as_ref(), &cfg).await;
    }

    let gateway = build_gateway(&cfg)?;
    tracing::info!(
        primary = gateway.primary_id(),
        fallback = gateway.fallback_id().unwrap_or("none"),
        "Model gateway ready"
    );

    let registry = tools::registry(&cfg, gateway.clone())?;
    let ctx = GraphContext::new(gateway, registry).with_config(cfg.research.clone());
    let session = Arc::new(ResearchSession::new(ctx, store));

    let thread_id = args
        .thread_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    println!("Using Thread ID: {}", thread_id);

    run_interactive(&session, &thread_id, args.topic.clone()).await
}

async fn run_interactive(
    session: &Arc<ResearchSession>,
    thread_id: &str,
    first_topic: Option<String>,
) -> anyhow::Result<()> {
    let mut topic = match first_topic {
        Some(topic) => Some(topic),
        None => {
            println!("\n--- Research Assistant ---");
            let input = prompt("Enter research topic (or press Enter to resume existing thread): ")?;
            match input {
                Some(t) if !t.is_empty() => Some(t),
                Some(_) => {
                    show_resumed(session, thread_id).await?;
                    None
                }
                None => {
                    println!("Goodbye!");
                    return Ok(());
                }
            }
        }
    };

    println!("Agent ready. Type 'quit' to exit.");

    loop {
        let current = match topic.take() {
            Some(t) => t,
            None => match prompt("\nUser (type 'quit' to exit): ")? {
                Some(t) => t,
                None => {
                    println!("Goodbye!");
                    break;
                }
            },
        };

        if matches!(current.to_lowercase().as_str(), "quit" | "exit") {
            println!("Goodbye!");
            break;
        }
        if current.is_empty() {
            continue;
        }

        println!("Agent working...");
        run_turn(session, thread_id, &current).await;
    }
    Ok(())
}

/// Stream one turn, printing each node's last transcript entry
async fn run_turn(session: &Arc<ResearchSession>, thread_id: &str, topic: &str) {
    let mut events = session.stream(thread_id, topic);
    while let Some(event) = events.next().await {
        match event {
            TurnEvent::Node(event) => {
                if let Some(message) = event.last_message() {
                    println!("[{}]: {}", event.node.name().to_uppercase(), message);
                }
            }
            TurnEvent::Completed(state) => {
                tracing::debug!(
                    thread_id,
                    messages = state.messages.len(),
                    "Turn complete"
                );
            }
            TurnEvent::Failed(message) => {
                eprintln!("Error: {}", message);
            }
        }
    }
}

async fn show_resumed(session: &ResearchSession, thread_id: &str) -> anyhow::Result<()> {
    match session.state(thread_id).await? {
        Some(state) => {
            println!(
                "Resuming thread {} ({} messages, last topic: '{}')",
                thread_id,
                state.messages.len(),
                state.topic
            );
            if let Some(last) = state.messages.last() {
                println!("Last answer: {}", utils::truncate_chars(last, 300));
            }
        }
        None => println!("No saved state for thread {}.", thread_id),
    }
    Ok(())
}

/// Read one trimmed line, `None` on EOF
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim().to_string()))
}

async fn list_threads(store: &dyn CheckpointStore, cfg: &Config) -> anyhow::Result<()> {
    let threads = store.list().await?;
    if threads.is_empty() {
        println!("No saved threads found.");
        println!("Threads are stored in: {}", cfg.checkpoint_dir().display());
        return Ok(());
    }

    println!("Saved threads:\n");
    println!("{:<38} {:<17} {:<6} Topic", "ID", "Updated", "Msgs");
    println!("{}", "-".repeat(90));
    for t in threads {
        println!(
            "{:<38} {:<17} {:<6} {}",
            t.thread_id,
            t.updated_at.format("%Y-%m-%d %H:%M"),
            t.message_count,
            utils::truncate_chars(utils::first_line(&t.topic), 40)
        );
    }
    println!("\nResume with: scout --thread-id <id>");
    Ok(())
}
