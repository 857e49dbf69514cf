//! Campaign CLI entry point.
//!
//! Connects to the configured JSON-RPC node and wallet, then either prints
//! the campaign or submits one transaction and prints the resulting state.

use std::fmt::Write as _;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use campaign_client::config::Config;
use campaign_client::rpc::{JsonRpcContract, NodeWallet};
use campaign_client::{CampaignSession, DisplayHistory, UserIntent, ViewModel};

#[derive(Debug, Parser)]
#[command(name = "campaign", version, about = "Inspect and fund an on-chain crowdfunding campaign")]
struct Cli {
    /// Print the resulting view as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the campaign summary and donation history.
    Show,
    /// Contribute an amount in ether, e.g. `0.001`.
    Fund { amount: String },
    /// Withdraw all raised funds (owner only).
    Withdraw,
    /// Reclaim your contribution, if the campaign allows it.
    Refund,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    let client = Client::builder().timeout(config.request_timeout).build()?;
    let contract = Arc::new(JsonRpcContract::new(client.clone(), &config));
    let wallet = Arc::new(NodeWallet::new(client, &config));
    let session = CampaignSession::new(contract, wallet);
    info!("Campaign contract: {}", config.contract_address);

    let view = match cli.command {
        Command::Show => {
            let connected = match session.auto_connect().await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Continuing without a wallet: {e}");
                    None
                }
            };
            if connected.is_none() {
                session.refresh().await?;
            }
            session.current_view().await
        }
        Command::Fund { amount } => run(&session, UserIntent::Fund(amount)).await?,
        Command::Withdraw => run(&session, UserIntent::Withdraw).await?,
        Command::Refund => run(&session, UserIntent::Refund).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render(&view));
    }
    Ok(())
}

async fn run(session: &CampaignSession, intent: UserIntent) -> anyhow::Result<ViewModel> {
    if session.auto_connect().await?.is_none() {
        session.handle(UserIntent::Connect).await?;
    }
    Ok(session.handle(intent).await?)
}

fn render(view: &ViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Contract:  {}", view.contract_address);
    match &view.identity {
        Some(identity) => {
            let _ = writeln!(out, "Connected: {}", identity.short());
        }
        None => {
            let _ = writeln!(out, "Connected: -");
        }
    }

    if let Some(campaign) = &view.campaign {
        let s = &campaign.snapshot;
        let _ = writeln!(out, "\n{}\n{}\n", s.name, s.description);
        let _ = writeln!(out, "Goal:      {} ETH", s.goal);
        let _ = writeln!(
            out,
            "Raised:    {} ETH ({}%)",
            s.total_raised, campaign.progress_percent
        );
        let _ = writeln!(out, "Owner:     {}", s.owner);

        let _ = writeln!(out, "\nDonations:");
        match &campaign.history {
            DisplayHistory::NoContributionsYet => {
                let _ = writeln!(out, "  No contributions yet");
            }
            DisplayHistory::Entries(entries) => {
                for c in entries {
                    let _ = writeln!(out, "  {}: {} ETH", c.contributor.short(), c.amount);
                }
            }
        }
    }

    let a = &view.actions;
    let _ = writeln!(
        out,
        "\nActions:   fund={} withdraw={} refund={}",
        a.can_fund, a.can_withdraw, a.can_refund
    );
    if let Some(e) = &view.last_sync_error {
        let _ = writeln!(out, "Last sync failed: {e}");
    }
    out
}
