//! `fog`: drive the engine against the in-process simulated oracle.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use fog_engine::decryption::cleartext::decode_coordinates;
use fog_engine::decryption::snapshot::SnapshotDomain;
use fog_engine::logging::init_logging;
use fog_engine::oracle::simulated::SimulatedStack;
use fog_engine::{EngineConfig, EntityId, FogEngine, Timestamp};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "fog", version = "0.1", about = "Fog-of-war engine CLI")]
struct Cli {
    #[arg(long, help = "JSON engine config; defaults apply when omitted")]
    config: Option<PathBuf>,

    #[arg(long, default_value = "logs")]
    log_dir: String,

    #[arg(long, help = "Write log lines as JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run submit -> request -> callback against the in-process oracle
    Simulate {
        #[arg(short, long)]
        entity: String,

        #[arg(short, long)]
        x: u32,

        #[arg(short, long)]
        y: u32,

        #[arg(long, default_value = "owner")]
        owner: String,

        #[arg(long, help = "Resubmit a new position before the oracle answers")]
        resubmit: bool,
    },

    /// Decode an 8-byte big-endian cleartext into (x, y)
    DecodeCleartext {
        #[arg(long)]
        hex: String,
    },

    /// Snapshot hash of two canonical ciphertexts under the configured domain
    SnapshotHash {
        #[arg(long)]
        x_hex: String,

        #[arg(long)]
        y_hex: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so the file appender flushes on exit.
    let _guard = init_logging(&cli.log_dir, cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            entity,
            x,
            y,
            owner,
            resubmit,
        } => simulate(&config, EntityId::new(owner), EntityId::new(entity), x, y, resubmit)?,

        Commands::DecodeCleartext { hex } => {
            let bytes = hex::decode(hex.trim()).context("cleartext is not valid hex")?;
            let (x, y) = decode_coordinates(&bytes)?;
            println!("x = {x}, y = {y}");
        }

        Commands::SnapshotHash { x_hex, y_hex } => {
            let x = hex::decode(x_hex.trim()).context("x ciphertext is not valid hex")?;
            let y = hex::decode(y_hex.trim()).context("y ciphertext is not valid hex")?;
            let domain = SnapshotDomain::new(config.domain_tag.clone(), config.system_identity.clone());
            println!("{}", domain.hash(&[x, y]));
        }
    }

    Ok(())
}

fn unix_now() -> Result<Timestamp> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_secs())
}

fn simulate(
    config: &EngineConfig,
    owner: EntityId,
    entity: EntityId,
    x: u32,
    y: u32,
    resubmit: bool,
) -> Result<()> {
    let stack = SimulatedStack::new();
    let mut engine = FogEngine::new(config, owner.clone(), stack.collaborators())?;
    let now = unix_now()?;

    if !engine.is_batch_open() {
        engine.open_next_epoch(&owner)?;
    }

    let (hx, hy) = stack.seal_position(x, y)?;
    engine.submit(&entity, hx, hy, false, false, now)?;

    let request_id = engine.request_decryption(&owner, &entity, now)?;
    println!("requested decryption: {request_id}");

    if resubmit {
        let later = now.saturating_add(engine.cooldown_seconds());
        let (nx, ny) = stack.seal_position(x.wrapping_add(1), y.wrapping_add(1))?;
        engine.submit(&entity, nx, ny, false, false, later)?;
        info!(%entity, "position resubmitted while request in flight");
    }

    let response = stack.oracle.fulfil(request_id)?;
    match engine.on_decryption_callback(request_id, &response.cleartext, &response.proof) {
        Ok((dx, dy)) => println!("decrypted {entity}: x = {dx}, y = {dy}"),
        Err(e) if e.is_terminal() || resubmit => {
            warn!(error = %e, "callback rejected");
            println!("callback rejected: {e}");
        }
        Err(e) => bail!(e),
    }

    for record in engine.events() {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
