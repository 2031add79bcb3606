//! Conformance setup CLI
//!
//! Provisions funded accounts with trust lines against a ledger server, or
//! waits for its validated ledger to advance.

use anyhow::Context;
use clap::{Parser, Subcommand};
use conformance_cli::{wait_for_ready, FileConfig};
use conformance_provisions::{
    Budget, ConvergenceGate, GateConfig, ProvisionConfig, ProvisioningPipeline, SetupOutcome,
};
use conformance_rpc::{HttpTransport, RpcClient};
use conformance_types::{Address, CurrencyCode, TrustlineSpec};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "conformance-setup")]
#[command(about = "Provision accounts and trust lines for conformance scenarios")]
#[command(version)]
struct Cli {
    /// JSON-RPC endpoint of the server under test
    #[arg(long, global = true, default_value = "http://127.0.0.1:5005")]
    url: String,

    /// Per-request timeout (e.g., "30s")
    #[arg(long, global = true, default_value = "30s")]
    request_timeout: humantime::Duration,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fund new accounts and establish a trust line on each
    Provision {
        /// Number of accounts to provision
        #[arg(short = 'n', long)]
        accounts: usize,

        /// Currency code of the trust line
        #[arg(long)]
        currency: String,

        /// Issuer address of the trust line
        #[arg(long)]
        issuer: String,

        /// Trust line limit
        #[arg(long, default_value = "1000000000")]
        limit: String,

        /// Override the trust line limit
        #[arg(long)]
        trustline_limit: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Accounts worked on at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Give up after this long (e.g., "10m")
        #[arg(long)]
        deadline: Option<humantime::Duration>,

        /// Close ledgers with ledger_accept (standalone servers)
        #[arg(long)]
        force_close: bool,

        /// Check every trust line after convergence
        #[arg(long)]
        verify: bool,

        /// Wait for the server to be ready before starting
        #[arg(long)]
        wait_ready: bool,
    },

    /// Wait until the validated ledger advances
    WaitLedger {
        /// Give up after this long
        #[arg(long, default_value = "30s")]
        timeout: humantime::Duration,

        /// Time between polls
        #[arg(long, default_value = "1s")]
        poll_interval: humantime::Duration,

        /// Close the open ledger with ledger_accept first
        #[arg(long)]
        force_close: bool,
    },

    /// Print a freshly generated wallet
    Propose,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let transport = HttpTransport::with_timeout(&cli.url, *cli.request_timeout)?;
    let client = RpcClient::new(transport);

    match cli.command {
        Commands::Provision {
            accounts,
            currency,
            issuer,
            limit,
            trustline_limit,
            config,
            concurrency,
            deadline,
            force_close,
            verify,
            wait_ready,
        } => {
            let mut provision_config = ProvisionConfig::default();
            if let Some(path) = config {
                provision_config = FileConfig::load(&path)
                    .and_then(|file| file.apply(provision_config))
                    .with_context(|| format!("loading {}", path.display()))?;
            }
            if let Some(concurrency) = concurrency {
                provision_config.concurrency = concurrency;
            }
            if let Some(deadline) = deadline {
                provision_config.deadline = Some(*deadline);
            }
            provision_config.gate.force_close |= force_close;
            provision_config.verify_trustlines |= verify;

            let spec = TrustlineSpec::new(
                CurrencyCode::parse(&currency)?,
                Address::parse(&issuer)?,
                limit,
            )?;

            if wait_ready {
                wait_for_ready(&client, Duration::from_secs(60), Duration::from_secs(1)).await?;
            }

            let pipeline = ProvisioningPipeline::new(client, provision_config);
            match pipeline
                .setup_env(accounts, &spec, trustline_limit.as_deref())
                .await?
            {
                SetupOutcome::Complete(batch) => {
                    println!("{}", serde_json::to_string_pretty(&batch.accounts)?);
                }
                SetupOutcome::Failed { progress, error } => {
                    anyhow::bail!("provisioning failed ({}): {}", progress, error);
                }
            }
        }

        Commands::WaitLedger {
            timeout,
            poll_interval,
            force_close,
        } => {
            let gate = GateConfig {
                poll_interval: *poll_interval,
                timeout: *timeout,
                force_close,
            };
            let index = ConvergenceGate::new(&client, &gate)
                .wait(&Budget::unbounded())
                .await?;
            println!("{}", index.0);
        }

        Commands::Propose => {
            let wallet = client.wallet_propose().await?;
            println!("{}", serde_json::to_string_pretty(&wallet)?);
        }
    }

    Ok(())
}
