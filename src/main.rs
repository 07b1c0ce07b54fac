use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use receiptkit::{Config, ReceiptService, StateMask, SubscriptionState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File holding the base64 encoded App Store receipt.
    receipt: PathBuf,

    /// Only print records in this state (active, free, expired, canceled).
    /// Repeat to combine; prints every record when omitted.
    #[arg(long = "state", value_parser = parse_state)]
    states: Vec<SubscriptionState>,

    /// Verify against the sandbox only.
    #[arg(long)]
    sandbox: bool,

    /// Overrides the configured retry budget for retryable statuses.
    #[arg(long, env = "RECEIPTKIT_MAX_RETRIES")]
    max_retries: Option<u32>,
}

fn parse_state(s: &str) -> Result<SubscriptionState, String> {
    SubscriptionState::from_str(s).ok_or_else(|| format!("unknown subscription state: {s}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,receiptkit=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().context("failed to load configuration")?;
    if args.sandbox {
        config.iap.sandbox = true;
    }
    if let Some(max_retries) = args.max_retries {
        config.iap.max_retries = max_retries;
    }

    tracing::info!(
        "Loaded configuration - sandbox: {}, max retries: {}",
        config.iap.sandbox,
        config.iap.max_retries
    );

    let receipt = std::fs::read(&args.receipt)
        .with_context(|| format!("failed to read {}", args.receipt.display()))?;
    let receipt = receipt.trim_ascii();

    let mask: StateMask = args.states.into_iter().collect();
    let service = ReceiptService::new(&config.iap)?;
    let subscriptions = service.get_entitlements(receipt, mask).await?;

    println!("{}", serde_json::to_string_pretty(&subscriptions)?);

    Ok(())
}
