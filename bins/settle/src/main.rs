//! Tripper CLI
//!
//! Computes group balances and settlements over a JSON fixture and prints them as JSON.
//! `settle` writes the fixture back so `history` sees every stored snapshot.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tripper_core::settlement::{SettlementError, SettlementService};
use tripper_infra::MemoryStore;
use tripper_shared::types::{CurrencyCode, GroupId, UserId};
use tripper_shared::{AppConfig, AppError};

mod rates;

use rates::Rates;

/// Tripper - group trip balances and settlements
#[derive(Parser)]
#[command(name = "tripper", version, about, long_about = None)]
struct Cli {
    /// JSON fixture with users, groups, items and snapshots
    #[arg(long, env = "TRIPPER_FIXTURE")]
    fixture: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current net balance of every user in a group
    Balances {
        /// Group ID
        group_id: GroupId,
    },

    /// List the currencies expenses may use
    Currencies,

    /// Recalculate the settlement of a group and store a snapshot in the fixture
    Settle {
        /// Group ID
        group_id: GroupId,
        /// Requesting user (must be a current member)
        #[arg(long = "as")]
        requested_by: UserId,
    },

    /// List stored settlements of a group, newest first
    History {
        /// Group ID
        group_id: GroupId,
        /// Requesting user (must be a current member)
        #[arg(long = "as")]
        requested_by: UserId,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.json);

    match run(cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tripper=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the JSON result, logs go to stderr
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

type Service = SettlementService<MemoryStore, Rates>;

async fn run(cli: Cli) -> Result<String> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let base_currency = config
        .settlement
        .base_currency()
        .context("Invalid settlement.base_currency")?;
    let rates = Rates::from_config(&config.exchange_rates)?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let output = match cli.command {
        Commands::Currencies => {
            let codes = rates
                .supported_currencies(base_currency)
                .await
                .context("Failed to list supported currencies")?;
            serde_json::to_string_pretty(&codes)?
        }
        Commands::Balances { group_id } => {
            let (_, _, service) = open_fixture(cli.fixture, rates, base_currency)?;
            let report = service
                .compute_balances(group_id, &cancel)
                .await
                .map_err(describe)?;
            serde_json::to_string_pretty(&report)?
        }
        Commands::Settle {
            group_id,
            requested_by,
        } => {
            let (fixture, store, service) = open_fixture(cli.fixture, rates, base_currency)?;
            let snapshot = service
                .compute_settlement(group_id, requested_by, &cancel)
                .await
                .map_err(describe)?;
            store
                .write_json_file(&fixture)
                .context("Failed to store the snapshot in the fixture")?;
            info!(snapshot_id = %snapshot.id, fixture = %fixture.display(), "snapshot stored");
            serde_json::to_string_pretty(&snapshot)?
        }
        Commands::History {
            group_id,
            requested_by,
        } => {
            let (_, _, service) = open_fixture(cli.fixture, rates, base_currency)?;
            let history = service
                .settlement_history(group_id, requested_by)
                .await
                .map_err(describe)?;
            serde_json::to_string_pretty(&history)?
        }
    };

    Ok(output)
}

/// Loads the fixture and builds the service over it.
fn open_fixture(
    fixture: Option<PathBuf>,
    rates: Rates,
    base_currency: CurrencyCode,
) -> Result<(PathBuf, Arc<MemoryStore>, Service)> {
    let fixture = fixture.context("--fixture (or TRIPPER_FIXTURE) is required for this command")?;
    let store = Arc::new(MemoryStore::from_json_file(&fixture)?);
    info!(fixture = %fixture.display(), %base_currency, "fixture loaded");

    let service = SettlementService::new(Arc::clone(&store), rates, base_currency);
    Ok((fixture, store, service))
}

/// Prefixes a settlement failure with its application error code.
fn describe(err: SettlementError) -> anyhow::Error {
    let detail = err.error_code();
    let app = AppError::from(err);
    anyhow::anyhow!("[{} / {}] {}", app.error_code(), detail, app)
}
