//! `vouchd`: the vouch auditor tool.
//!
//! Maintains a persisted audit log of key-transparency directories and
//! answers range queries over their verified snapshot histories.
//!
//! Snapshot files are postcard-encoded `Vec<Snapshot>`; range output is a
//! postcard-encoded `Response`, as a client would receive it.
//!
//! # Usage
//!
//! ```text
//! vouchd init --address dir.example:443 --key <hex> --file s0-3.bin
//! vouchd extend --id <hex> --file s4-9.bin
//! vouchd status
//! vouchd range --id <hex> --start 2 --end 5 --out range.bin
//! vouchd -c vouch.toml status
//! ```

mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use vouch_auditlog::{AuditLog, HistoryStore};
use vouch_chain::{PublicKey, Snapshot};
use vouch_proto::AuditingRequest;
use vouch_types::{DirectoryId, Epoch};

use config::CliConfig;

// -----------------------------------------------------------------------
// CLI definition
// -----------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "vouchd", version, about = "Key-transparency auditor")]
struct Cli {
    /// Path to TOML config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override data directory.
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Run fully in-memory (no disk persistence).
    #[arg(short, long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start auditing a directory from its epoch-0 snapshot.
    Init {
        /// Network address of the directory.
        #[arg(short, long)]
        address: String,

        /// Directory public key, hex-encoded.
        #[arg(short, long)]
        key: String,

        /// Snapshot file starting at epoch 0.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Extend a directory's history with newer snapshots.
    Extend {
        /// Directory identity, hex-encoded.
        #[arg(short, long)]
        id: DirectoryId,

        /// Snapshot file continuing the history.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List audited directories.
    Status,

    /// Print (and optionally export) stored snapshots for an epoch range.
    Range {
        /// Directory identity, hex-encoded.
        #[arg(short, long)]
        id: DirectoryId,

        /// First epoch (inclusive).
        #[arg(short, long)]
        start: Epoch,

        /// Last epoch (inclusive).
        #[arg(short, long)]
        end: Epoch,

        /// Write the auditing response to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

// -----------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CliConfig::load(cli.config.as_deref()).context("failed to load config")?;

    setup_tracing(&config.log.level);

    // CLI args override config file values.
    if let Some(dir) = cli.data_dir {
        config.auditor.data_dir = dir;
    }
    if cli.memory {
        config.auditor.memory = true;
    }

    let log = open_log(&config)?;

    match cli.command {
        Commands::Init { address, key, file } => cmd_init(&log, &address, &key, &file),
        Commands::Extend { id, file } => cmd_extend(&log, &id, &file),
        Commands::Status => cmd_status(&log),
        Commands::Range {
            id,
            start,
            end,
            out,
        } => cmd_range(&log, &id, start, end, out.as_deref()),
    }
}

/// Initialize the `tracing` subscriber with the given level filter.
///
/// Respects `RUST_LOG` env var if set, otherwise uses the config value.
fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Open the audit log described by `config`, replaying stored histories.
fn open_log(config: &CliConfig) -> Result<AuditLog> {
    if config.auditor.memory {
        info!("using in-memory audit log");
        return Ok(AuditLog::new());
    }

    std::fs::create_dir_all(&config.auditor.data_dir).context("failed to create data directory")?;

    let path = config.history_path();
    let store = HistoryStore::open(&path).map_err(|e| {
        error!(path = %path.display(), %e, "failed to open history store");
        anyhow::anyhow!("cannot open history store at {}: {e}", path.display())
    })?;

    AuditLog::open(store).context("stored history failed verification")
}

// -----------------------------------------------------------------------
// Commands
// -----------------------------------------------------------------------

fn cmd_init(log: &AuditLog, address: &str, key: &str, file: &Path) -> Result<()> {
    let key = parse_key(key)?;
    let snapshots = read_snapshots(file)?;

    let id = log
        .init_history(address, key, &snapshots)
        .map_err(|e| anyhow::anyhow!("init rejected ({}): {e}", e.status()))?;

    println!("Directory: {id}");
    println!("  address: {address}");
    println!("  latest epoch: {}", snapshots.len() - 1);
    Ok(())
}

fn cmd_extend(log: &AuditLog, id: &DirectoryId, file: &Path) -> Result<()> {
    let snapshots = read_snapshots(file)?;

    let admitted = log
        .extend(id, &snapshots)
        .map_err(|e| anyhow::anyhow!("extend rejected ({}): {e}", e.status()))?;
    let latest = log.latest(id)?;

    println!("Admitted {admitted} snapshots; latest epoch {}", latest.epoch);
    Ok(())
}

fn cmd_status(log: &AuditLog) -> Result<()> {
    let directories = log.directories();
    println!("Audited directories: {}", directories.len());
    for dir in &directories {
        println!(
            "  {} address={} latest_epoch={}",
            dir.id, dir.address, dir.latest_epoch
        );
    }
    Ok(())
}

fn cmd_range(
    log: &AuditLog,
    id: &DirectoryId,
    start: Epoch,
    end: Epoch,
    out: Option<&Path>,
) -> Result<()> {
    let response = log.get_observed_strs(&AuditingRequest {
        directory_id: *id,
        start_epoch: start,
        end_epoch: end,
    });

    let snapshots = match response.as_history() {
        Ok(s) => s,
        Err(_) => bail!("range query failed: {}", response.status),
    };

    for snap in snapshots {
        println!(
            "  epoch={} root={} digest={}",
            snap.epoch,
            snap.root_hash,
            snap.digest()
        );
    }

    if let Some(path) = out {
        let bytes = response.to_bytes()?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote response to {}", path.display());
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

/// Parse a hex-encoded ed25519 public key.
fn parse_key(s: &str) -> Result<PublicKey> {
    let bytes = hex::decode(s.trim()).context("public key is not valid hex")?;
    let arr: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("public key must be 32 bytes, got {}", bytes.len()))?;
    Ok(PublicKey::from(arr))
}

/// Read a postcard-encoded snapshot list.
fn read_snapshots(path: &Path) -> Result<Vec<Snapshot>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    postcard::from_bytes(&bytes)
        .with_context(|| format!("{} is not a postcard snapshot list", path.display()))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
