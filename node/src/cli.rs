//! # CLI Interface
//!
//! Defines the command-line argument structure for `vaultline-node` using
//! `clap` derive. Supports five subcommands: `serve`, `inspect`,
//! `evaluate`, `build`, and `version`.
//!
//! Vault definitions, UTXOs and proposals are read from JSON files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use vaultline_contracts::{SpendFunction, Vault};
use vaultline_protocol::config::{BuilderParams, DEFAULT_FEE_RATE, MAX_FEE_ITERATIONS};

use crate::logging::LogFormat;

/// Vaultline covenant vault verifier and transaction builder.
#[derive(Parser, Debug)]
#[command(
    name = "vaultline-node",
    about = "Vaultline covenant vault verifier and transaction builder",
    version,
    propagate_version = true
)]
pub struct VaultlineCli {
    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "VAULTLINE_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API over an in-memory ledger.
    Serve(ServeArgs),
    /// Print a vault's commitment and selector table.
    Inspect(InspectArgs),
    /// Verify a proposal against a set of vaults.
    Evaluate(EvaluateArgs),
    /// Build an unsigned spend of one vault UTXO.
    Build(BuildArgs),
    /// Print version information and exit.
    Version,
}

/// Fee knobs shared by `serve` and `build`.
#[derive(Args, Debug, Clone, Copy)]
pub struct BuilderArgs {
    /// Fee rate in satoshis per byte.
    #[arg(long, env = "VAULTLINE_FEE_RATE", default_value_t = DEFAULT_FEE_RATE)]
    pub fee_rate: u64,

    /// Fee-estimation passes before giving up.
    #[arg(long, env = "VAULTLINE_MAX_FEE_ITERATIONS", default_value_t = MAX_FEE_ITERATIONS)]
    pub max_fee_iterations: usize,
}

impl BuilderArgs {
    pub fn params(&self) -> BuilderParams {
        BuilderParams {
            fee_rate: self.fee_rate,
            max_iterations: self.max_fee_iterations,
        }
    }
}

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind both listeners on.
    #[arg(long, env = "VAULTLINE_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Port for the REST API.
    #[arg(long, env = "VAULTLINE_RPC_PORT", default_value_t = 9741)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VAULTLINE_METRICS_PORT", default_value_t = 9742)]
    pub metrics_port: u16,

    /// Vault definition files to register at startup. Each holds one
    /// definition or an array of them.
    #[arg(long = "vaults", env = "VAULTLINE_VAULTS", value_delimiter = ',')]
    pub vaults: Vec<PathBuf>,

    /// JSON array of UTXOs to seed the ledger with.
    #[arg(long, env = "VAULTLINE_LEDGER_SEED")]
    pub ledger_seed: Option<PathBuf>,

    /// Chain height the ledger starts at.
    #[arg(long, env = "VAULTLINE_HEIGHT", default_value_t = 0)]
    pub height: u32,

    #[command(flatten)]
    pub builder: BuilderArgs,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Vault definition file.
    pub vault: PathBuf,
}

/// Arguments for the `evaluate` subcommand.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Proposal JSON file.
    pub proposal: PathBuf,

    /// Vault definition files the proposal's inputs may be locked by.
    #[arg(long = "vaults", value_delimiter = ',', required = true)]
    pub vaults: Vec<PathBuf>,

    /// Chain tip height to evaluate at.
    #[arg(long, env = "VAULTLINE_HEIGHT")]
    pub height: u32,
}

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Vault definition file.
    #[arg(long)]
    pub vault: PathBuf,

    /// Function to run, e.g. `owner_spend` or `execute_recurring`.
    #[arg(long)]
    pub function: SpendFunction,

    /// The vault UTXO to spend, as JSON.
    #[arg(long)]
    pub utxo: PathBuf,

    /// Build parameters (amount, destination, mask, ...), as JSON.
    #[arg(long)]
    pub request: Option<PathBuf>,

    /// Chain tip height to build at.
    #[arg(long, env = "VAULTLINE_HEIGHT")]
    pub height: u32,

    #[command(flatten)]
    pub builder: BuilderArgs,
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VaultFile {
    Many(Vec<Vault>),
    One(Vault),
}

/// Load and validate every definition in `paths`.
pub fn load_vaults(paths: &[PathBuf]) -> Result<Vec<Vault>> {
    let mut vaults = Vec::new();
    for path in paths {
        let loaded = match read_json::<VaultFile>(path)? {
            VaultFile::Many(many) => many,
            VaultFile::One(one) => vec![one],
        };
        for vault in loaded {
            vault
                .validate()
                .with_context(|| format!("invalid vault in {}", path.display()))?;
            vaults.push(vault);
        }
    }
    Ok(vaults)
}
