//! Threat Ledger CLI
//!
//! Operator front end for the threat ledger client.
//!
//! # Architecture Overview
//!
//! ```text
//!   threat-ledger <command>
//!        │
//!        ▼
//!   ┌─────────────┐   ┌──────────────────────────────────────────────┐
//!   │   config    │──▶│                ThreatLedger                  │
//!   │ TOML + env  │   │  digest ─ monitor ─ resolver ─ tx pipeline   │
//!   └─────────────┘   └──────────────────────┬───────────────────────┘
//!                                            │ JSON-RPC
//!                                            ▼
//!                                   ledger node + ThreatIntelligence
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

use threat_ledger::config::load_or_default;
use threat_ledger::observability::logging::init_logging;
use threat_ledger::resilience::retry_with_backoff;
use threat_ledger::{NewThreat, ThreatLedger, ThreatSignature, TxError};

#[derive(Parser)]
#[command(name = "threat-ledger")]
#[command(about = "Record and query threat verdicts on the ThreatIntelligence ledger", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a threat verdict
    Report {
        /// Threat identifier; defaults to the URL
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        url: String,
        /// benign, defacement, phishing or malware
        #[arg(long)]
        signature: ThreatSignature,
        /// Severity, 1-10
        #[arg(long)]
        level: u8,
        /// Classifier confidence, 0.0-1.0
        #[arg(long)]
        confidence: f64,
        /// Mark the threat as benign instead of malicious
        #[arg(long)]
        benign: bool,
    },
    /// Mark a reported threat as verified
    Verify { id: String },
    /// Show one threat record
    Show { id: String },
    /// List all threat digests
    List,
    /// Count threat records
    Count,
    /// Show client and ledger status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("Error: failed to initialize logging: {}", e);
        return ExitCode::from(2);
    }

    tracing::info!(
        rpc_url = %config.node.rpc_url,
        network = %config.deployment.network,
        "threat-ledger v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let ledger = match ThreatLedger::connect(&config).await {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!(error = %e, "Initialization failed");
            eprintln!("Error: {}", e);
            return ExitCode::from(3);
        }
    };

    let result = match cli.command {
        Commands::Report {
            id,
            url,
            signature,
            level,
            confidence,
            benign,
        } => {
            let threat = NewThreat {
                threat_id: id.unwrap_or_else(|| url.clone()),
                url,
                signature,
                level,
                confidence,
                is_malicious: !benign,
            };
            let outcome = retry_with_backoff(&config.retry, "report", || {
                ledger.report_threat(&threat)
            })
            .await;
            outcome.and_then(|outcome| print_json(&outcome))
        }
        Commands::Verify { id } => ledger
            .verify_threat(&id)
            .await
            .and_then(|outcome| print_json(&outcome)),
        Commands::Show { id } => match ledger.get_threat_info(&id).await {
            Ok(Some(record)) => print_json(&record),
            Ok(None) => {
                eprintln!("No threat recorded for '{}'", id);
                return ExitCode::from(4);
            }
            Err(e) => Err(e),
        },
        Commands::List => print_json(&ledger.get_all_threat_ids().await),
        Commands::Count => print_json(&ledger.get_threats_count().await),
        Commands::Status => print_json(&ledger.status().await),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error ({}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TxError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TxError::validation(format!("cannot encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
