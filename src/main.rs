//! adjutant - a personal assistant message router.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use adjutant::bus::{InboundMessage, MessageBus};
use adjutant::config::schema::Config;
use adjutant::config::{config_path, load_config, save_config};
use adjutant::handlers::HandlerDeps;
use adjutant::providers::{CompletionClient, OpenAICompatClient};
use adjutant::reminders::{run_delivery_loop, ReminderService};
use adjutant::routing::fallback::{LlmRouteClassifier, RouteClassifier};
use adjutant::routing::Pipeline;
use adjutant::session::SessionStore;
use adjutant::telemetry::{format_stats_report, route_stats, TelemetrySink};
use adjutant::utils::{data_dir, expand_tilde, workspace_path};

#[derive(Parser)]
#[command(name = "adjutant", about = "adjutant - personal assistant message router", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and workspace.
    Onboard,
    /// Route a single message and print the reply.
    Message {
        /// The message text.
        text: String,
        /// Chat id to route within.
        #[arg(short, long, default_value = "cli")]
        chat: String,
    },
    /// Start the gateway loop reading messages from stdin.
    Gateway {
        /// Verbose logging.
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show per-route routing statistics and threshold suggestions.
    Stats,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn telemetry_path(config: &Config) -> PathBuf {
    if config.telemetry.path.is_empty() {
        data_dir().join("routing.jsonl")
    } else {
        expand_tilde(&config.telemetry.path)
    }
}

fn build_pipeline(config: &Config) -> (Pipeline, HandlerDeps) {
    let client: Option<Arc<dyn CompletionClient>> = if config.provider.api_key.is_empty() {
        None
    } else {
        Some(Arc::new(OpenAICompatClient::new(&config.provider)))
    };
    let classifier: Option<Arc<dyn RouteClassifier>> = client.as_ref().map(|c| {
        Arc::new(LlmRouteClassifier::new(
            c.clone(),
            config.routing.llm_timeout_ms,
        )) as Arc<dyn RouteClassifier>
    });
    let deps = HandlerDeps {
        sessions: Arc::new(SessionStore::new()),
        reminders: Arc::new(ReminderService::new(data_dir().join("reminders.json"))),
        workspace: workspace_path(&config.workspace),
        client,
    };
    let telemetry = if config.telemetry.enabled {
        TelemetrySink::spawn(telemetry_path(config))
    } else {
        TelemetrySink::disabled()
    };
    (
        Pipeline::new(config.clone(), deps.clone(), classifier, telemetry),
        deps,
    )
}

fn sender_allowed(config: &Config, sender: &str) -> bool {
    config.gateway.allow_from.is_empty()
        || config.gateway.allow_from.iter().any(|s| s == sender)
}

async fn run_gateway(config: Config) -> anyhow::Result<()> {
    let (pipeline, deps) = build_pipeline(&config);
    let pipeline = Arc::new(pipeline);
    let bus = MessageBus::new();

    tokio::spawn(run_delivery_loop(
        deps.reminders.clone(),
        bus.clone(),
        config.reminders.tick_secs,
    ));

    // Printer for outbound traffic from background loops.
    let printer_bus = bus.clone();
    tokio::spawn(async move {
        while let Some(out) = printer_bus.consume_outbound().await {
            println!("{}", out.content);
        }
    });

    info!("gateway ready; reading messages from stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let user = whoami();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if !sender_allowed(&config, &user) {
            println!("Sorry, you are not on the allow list.");
            continue;
        }
        let msg = InboundMessage::new("cli", user.clone(), "cli", line);
        let reply = pipeline.process(&msg).await;
        println!("{}", reply.text);
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Onboard => {
            init_tracing(false);
            let config = load_config();
            save_config(&config)?;
            let ws = workspace_path(&config.workspace);
            println!("Config written to {}", config_path().display());
            println!("Workspace at {}", ws.display());
            println!("Add a provider API key to the config to enable the LLM fallback.");
        }
        Commands::Message { text, chat } => {
            init_tracing(false);
            let config = load_config();
            let (pipeline, _deps) = build_pipeline(&config);
            let msg = InboundMessage::new("cli", whoami(), chat, text);
            let reply = pipeline.process(&msg).await;
            println!("{}", reply.text);
        }
        Commands::Gateway { verbose } => {
            init_tracing(verbose);
            let config = load_config();
            run_gateway(config).await?;
        }
        Commands::Stats => {
            init_tracing(false);
            let config = load_config();
            let stats = route_stats(&telemetry_path(&config), &config.routing)?;
            print!("{}", format_stats_report(&stats));
        }
    }
    Ok(())
}
