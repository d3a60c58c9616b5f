use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chainpilot::automation::AutomationEngine;
use chainpilot::channels;
use chainpilot::clients::{ChainClient, JsonRpcChainClient, MarketClient, RestMarketClient};
use chainpilot::config::Config;
use chainpilot::router::Router;
use chainpilot::tasks::TaskRegistry;

#[derive(Parser)]
#[command(name = "chainpilot", version, about = "Conversational crypto command router")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Route a single message and print the response.
    Chat {
        /// The message to route, e.g. "check price of bitcoin".
        message: String,
    },
    /// Start the interactive REPL.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let chain: Arc<dyn ChainClient> = Arc::new(JsonRpcChainClient::new(&config));
    let market: Arc<dyn MarketClient> = Arc::new(RestMarketClient::new(&config));
    let registry = Arc::new(TaskRegistry::with_builtin_tasks(
        Arc::clone(&chain),
        Arc::clone(&market),
    ));
    let engine = AutomationEngine::new(Arc::clone(&registry), market, chain);
    let router = Arc::new(Router::new(registry, Arc::clone(&engine)));

    match cli.command {
        Command::Chat { message } => {
            let response = router.process_message(&message).await;
            channels::print_response(&response);
        }
        Command::Repl => {
            channels::repl::run(router, engine).await?;
        }
    }

    Ok(())
}
