//! LinkCash terminal
//!
//! Pays a payment link, a group share or a shop bill from the command line
//! and saves the receipt.

mod checkout;
mod config;
mod prompt;
mod shutdown;
mod terminal;

use checkout::TerminalCheckout;
use clap::Parser;
use config::ConfigLoader;
use linkcash_core::flow::FlowDriver;
use linkcash_sdk::client::BackendClient;
use prompt::Prompt;
use shutdown::spawn_signal_handler;
use std::path::PathBuf;
use std::sync::Arc;
use terminal::{Finish, Terminal};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// LinkCash - pay a payment link from the terminal
#[derive(Parser, Debug)]
#[command(name = "linkcash")]
#[command(version, about, long_about = None)]
struct Args {
    /// Route to open: /link/{id}, /one-time/{id}, /group-payment/{id},
    /// /bill/payment/{qrCode}, or a success route to look up a receipt
    target: String,

    /// Path to the configuration file
    #[arg(short, long, default_value = "./linkcash.toml", env = "LINKCASH_CONFIG")]
    config: PathBuf,

    /// Override the backend base URL (e.g., http://localhost:8080)
    #[arg(short, long, env = "LINKCASH_BASE_URL")]
    base_url: Option<Url>,

    /// Directory receipts are written to
    #[arg(short, long, default_value = ".")]
    receipt_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting linkcash v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.base_url);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let http = reqwest::Client::builder()
        .timeout(loaded_config.backend.timeout)
        .build()?;
    let client = BackendClient::new(loaded_config.backend.base_url).with_http_client(http);
    tracing::info!(base_url = %client.base_url(), "Using payment backend");

    // Shutdown signal shared by the flow, its tasks and the terminal loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    spawn_signal_handler(shutdown_tx.clone());

    let prompt = Arc::new(Prompt::stdin());
    let (checkout, ready_rx) =
        TerminalCheckout::new(loaded_config.checkout.publishable_key, prompt.clone());
    let (driver, handle) = FlowDriver::new(
        client.clone(),
        checkout,
        loaded_config.polling,
        shutdown_rx.clone(),
    );
    let driver_task = tokio::spawn(driver.run());

    handle.open(args.target).await?;

    let terminal = Terminal::new(
        handle,
        prompt,
        client,
        args.receipt_dir,
        loaded_config.polling.max_attempts,
    );
    let finish = terminal.run(ready_rx, shutdown_rx).await;

    // Dispose the flow whatever the outcome
    shutdown_tx.send_replace(true);
    if let Err(e) = driver_task.await {
        tracing::error!("Payment flow task failed: {}", e);
    }

    match finish? {
        Finish::Paid(path) => {
            println!("Receipt saved to {}", path.display());
            Ok(())
        }
        Finish::AlreadyCompleted(message) => {
            println!("{message}");
            Ok(())
        }
        Finish::Failed(error) => {
            tracing::error!(kind = %error.kind, "Payment failed: {}", error.message);
            Err(error.into())
        }
        Finish::Abandoned => {
            tracing::info!("Payment abandoned");
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
