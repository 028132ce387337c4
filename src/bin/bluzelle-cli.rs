use std::collections::BTreeMap;
use std::path::PathBuf;

use bluzelle_client::config::load_config;
use bluzelle_client::observability::logging::init_logging;
use bluzelle_client::{BluzelleClient, GasInfo, Lease};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "bluzelle-cli")]
#[command(about = "Command line client for the Bluzelle key-value database", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "bluzelle.toml")]
    config: PathBuf,

    #[command(flatten)]
    gas: GasArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides of the configured gas directive for transactions.
#[derive(Args)]
struct GasArgs {
    #[arg(long, global = true)]
    gas_price: Option<u64>,

    #[arg(long, global = true)]
    max_gas: Option<u64>,

    #[arg(long, global = true)]
    max_fee: Option<u64>,
}

impl GasArgs {
    fn directive(&self) -> Option<GasInfo> {
        let gas = GasInfo {
            gas_price: self.gas_price,
            max_gas: self.max_gas,
            max_fee: self.max_fee,
        };
        (!gas.is_empty()).then_some(gas)
    }
}

#[derive(Args)]
struct LeaseArgs {
    /// Lease in seconds; the chain default applies when omitted
    #[arg(long)]
    lease_secs: Option<i64>,
}

impl LeaseArgs {
    fn lease(&self) -> Result<Option<Lease>, bluzelle_client::BluzelleError> {
        self.lease_secs.map(Lease::from_seconds).transpose()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new key
    Create {
        key: String,
        value: String,
        #[command(flatten)]
        lease: LeaseArgs,
    },
    /// Update an existing key
    Update {
        key: String,
        value: String,
        #[command(flatten)]
        lease: LeaseArgs,
    },
    /// Delete a key
    Delete { key: String },
    /// Rename a key
    Rename { key: String, new_key: String },
    /// Renew the lease of a key
    RenewLease {
        key: String,
        #[command(flatten)]
        lease: LeaseArgs,
    },
    /// Renew the lease of every key
    RenewLeaseAll {
        #[command(flatten)]
        lease: LeaseArgs,
    },
    /// Delete every key in the namespace
    DeleteAll,
    /// Update several keys at once, given as key=value pairs
    MultiUpdate {
        #[arg(required = true, value_parser = parse_pair)]
        pairs: Vec<(String, String)>,
    },
    /// Read a key through a transaction
    TxRead { key: String },
    /// Check a key through a transaction
    TxHas { key: String },
    /// List keys through a transaction
    TxKeys,
    /// Count keys through a transaction
    TxCount,
    /// List key-value pairs through a transaction
    TxKeyValues,
    /// Lease of a key in seconds, through a transaction
    TxGetLease { key: String },
    /// Shortest leases, through a transaction
    TxGetNShortestLeases { n: i64 },
    /// Read a key
    Read {
        key: String,
        #[arg(long)]
        prove: bool,
    },
    /// Check whether a key exists
    Has { key: String },
    /// List keys
    Keys,
    /// Count keys
    Count,
    /// List key-value pairs
    KeyValues,
    /// Lease of a key in seconds
    GetLease { key: String },
    /// The n keys closest to expiry
    GetNShortestLeases { n: i64 },
    /// Account data of the session address
    Account,
    /// Node application version
    Version,
    /// Check that the gateway answers
    Health,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    init_logging(&config.observability.log_level);
    tracing::debug!(config = ?config, "Configuration loaded");

    let db = BluzelleClient::connect(&config).await?;
    let gas = cli.gas.directive();

    let output = match cli.command {
        Commands::Create { key, value, lease } => {
            db.create(&key, &value, lease.lease()?, gas).await?;
            json!({"ok": true})
        }
        Commands::Update { key, value, lease } => {
            db.update(&key, &value, lease.lease()?, gas).await?;
            json!({"ok": true})
        }
        Commands::Delete { key } => {
            db.delete(&key, gas).await?;
            json!({"ok": true})
        }
        Commands::Rename { key, new_key } => {
            db.rename(&key, &new_key, gas).await?;
            json!({"ok": true})
        }
        Commands::RenewLease { key, lease } => {
            db.renew_lease(&key, lease.lease()?, gas).await?;
            json!({"ok": true})
        }
        Commands::RenewLeaseAll { lease } => {
            db.renew_lease_all(lease.lease()?, gas).await?;
            json!({"ok": true})
        }
        Commands::DeleteAll => {
            db.delete_all(gas).await?;
            json!({"ok": true})
        }
        Commands::MultiUpdate { pairs } => {
            let entries: BTreeMap<String, String> = pairs.into_iter().collect();
            db.update_many(&entries, gas).await?;
            json!({"ok": true})
        }
        Commands::TxRead { key } => json!({"value": db.tx_read(&key, gas).await?}),
        Commands::TxHas { key } => json!({"has": db.tx_has(&key, gas).await?}),
        Commands::TxKeys => json!({"keys": db.tx_keys(gas).await?}),
        Commands::TxCount => json!({"count": db.tx_count(gas).await?}),
        Commands::TxKeyValues => serde_json::to_value(db.tx_key_values(gas).await?)?,
        Commands::TxGetLease { key } => json!({"lease_secs": db.tx_get_lease(&key, gas).await?}),
        Commands::TxGetNShortestLeases { n } => serde_json::to_value(db.tx_get_n_shortest_leases(n, gas).await?)?,
        Commands::Read { key, prove } => json!({"value": db.read(&key, prove).await?}),
        Commands::Has { key } => json!({"has": db.has(&key).await?}),
        Commands::Keys => json!({"keys": db.keys().await?}),
        Commands::Count => json!({"count": db.count().await?}),
        Commands::KeyValues => serde_json::to_value(db.key_values().await?)?,
        Commands::GetLease { key } => json!({"lease_secs": db.get_lease(&key).await?}),
        Commands::GetNShortestLeases { n } => serde_json::to_value(db.get_n_shortest_leases(n).await?)?,
        Commands::Account => serde_json::to_value(db.account().await?)?,
        Commands::Version => json!({"version": db.version().await?}),
        Commands::Health => json!({"healthy": db.is_healthy().await}),
    };

    print_output(&output)
}

fn print_output(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
