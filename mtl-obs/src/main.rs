//! mtl-obs - concrete cube test observation entry
//!
//! Works on a draft document (the same JSON the lab backend accepts) so an
//! operator can fill in specimens step by step and submit when complete.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mtl_common::config::{RootFolderInitializer, RootFolderResolver};
use mtl_obs::capture::{CaptureTarget, FileUploadCapture};
use mtl_obs::config::{ObsConfig, MODULE_NAME};
use mtl_obs::events::{EventBus, ObservationEvent};
use mtl_obs::loader::LoadMode;
use mtl_obs::models::{MetadataField, ObservationPayload, OwnerId, PhotoAngle, RowField};
use mtl_obs::persistence::{HttpRemoteStore, LocalStore, SaveOutcome, SqliteLocalStore};
use mtl_obs::validator::ValidationMode;
use mtl_obs::ObservationSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mtl-obs")]
#[command(about = "Concrete cube test observation capture")]
#[command(version)]
struct Args {
    /// Config file (default: <config dir>/mtl/mtl-obs.toml)
    #[arg(short, long, env = "MTL_OBS_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the local fallback database
    #[arg(long, env = "MTL_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Draft document to work on
    #[arg(short, long, default_value = "observations.json")]
    draft: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a draft for a test request
    Init {
        /// Test request id
        #[arg(long)]
        owner: OwnerId,
        /// Specimens on the test request (new drafts only)
        #[arg(long)]
        quantity: Option<usize>,
        /// Continue the saved observations instead of starting fresh
        #[arg(long)]
        edit: bool,
    },
    /// Set a specimen field (specimen numbers start at 1)
    SetRow {
        specimen: usize,
        field: RowField,
        value: String,
    },
    /// Set a form field
    SetMeta { field: MetadataField, value: String },
    /// Append an empty specimen
    AddRow,
    /// Remove a specimen and its photos
    RemoveRow { specimen: usize },
    /// Attach (or with --remove, detach) a specimen photo
    Photo {
        specimen: usize,
        angle: PhotoAngle,
        file: Option<PathBuf>,
        #[arg(long)]
        remove: bool,
    },
    /// Check the draft for completeness
    Validate {
        /// Report every problem instead of the first
        #[arg(long)]
        all: bool,
    },
    /// Validate and save (remote, falling back to the local store)
    Submit,
    /// List drafts held in the local fallback store
    Pending,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ObsConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config)?;

    info!(
        "Starting mtl-obs v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(api = %config.api.base_url, "Configuration loaded");

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_toml_root(config.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    let local = Arc::new(
        SqliteLocalStore::open(&initializer.database_path())
            .await
            .context("Failed to open local store")?,
    );

    if let Command::Pending = args.command {
        return list_pending(local.as_ref()).await;
    }

    let remote = Arc::new(
        HttpRemoteStore::new(config.api.base_url.clone(), config.api.request_timeout())
            .context("Failed to build HTTP client")?,
    );
    let bus = EventBus::default();

    if let Command::Init {
        owner,
        quantity,
        edit,
    } = &args.command
    {
        let session = ObservationSession::from_config(&config, Some(*owner), remote, local, bus);
        let mode = if *edit {
            LoadMode::Edit
        } else {
            LoadMode::New {
                quantity: *quantity,
            }
        };
        let report = session.load(mode).await?;
        if let Some(warning) = &report.warning {
            eprintln!("warning: {}", warning);
        }
        println!("Draft loaded ({})", report.source);
        return write_draft(&session, &args.draft).await;
    }

    let payload = read_draft(&args.draft)?;
    let session =
        ObservationSession::from_config(&config, payload.owner_id, remote, local, bus);
    session
        .replace_draft(payload.into_draft(None, &config.form_defaults))
        .await?;

    match args.command {
        Command::SetRow {
            specimen,
            field,
            value,
        } => {
            let row = session.mutate_row(index(specimen)?, field, &value).await?;
            println!(
                "{}: area {} mm², density {} kg/m³",
                row.label, row.area_mm2, row.density_kg_m3
            );
            write_draft(&session, &args.draft).await
        }
        Command::SetMeta { field, value } => {
            session.mutate_metadata(field, &value).await?;
            if field == MetadataField::AverageStrength {
                if let Some(suggested) = session.suggest_average_strength().await {
                    if suggested != value.trim() {
                        println!("note: specimens average {} MPa", suggested);
                    }
                }
            }
            write_draft(&session, &args.draft).await
        }
        Command::AddRow => {
            let position = session.add_row().await?;
            println!("Added specimen {}", position + 1);
            write_draft(&session, &args.draft).await
        }
        Command::RemoveRow { specimen } => {
            let removed = session.remove_row(index(specimen)?).await?;
            println!("Removed specimen {} ({})", specimen, removed.label);
            write_draft(&session, &args.draft).await
        }
        Command::Photo {
            specimen,
            angle,
            file,
            remove,
        } => {
            let position = index(specimen)?;
            if remove {
                if !session.remove_photo(position, angle).await? {
                    println!("No {} photo for specimen {}", angle, specimen);
                }
            } else {
                let Some(file) = file else {
                    bail!("A photo file is required unless --remove is given");
                };
                let capture = FileUploadCapture::new(file);
                session
                    .capture_photo(&capture, CaptureTarget::new(position, angle))
                    .await?;
            }
            write_draft(&session, &args.draft).await
        }
        Command::Validate { all } => {
            let mode = if all {
                ValidationMode::FullScan
            } else {
                ValidationMode::FirstFailure
            };
            for advisory in session.weight_advisories().await {
                println!("note: {}", advisory);
            }
            let result = session.validate(mode).await;
            if result.ok {
                println!("Draft is complete");
                return Ok(());
            }
            for failure in &result.failures {
                println!("- {}", failure);
            }
            bail!("Draft is not ready to submit");
        }
        Command::Submit => submit(&session, &args.draft).await,
        Command::Init { .. } | Command::Pending => Ok(()),
    }
}

fn init_tracing(config: &ObsConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// 1-based specimen number to row position
fn index(specimen: usize) -> Result<usize> {
    specimen
        .checked_sub(1)
        .context("Specimen numbers start at 1")
}

fn read_draft(path: &Path) -> Result<ObservationPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read draft {} (run `init` first)", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid draft {}", path.display()))
}

async fn write_draft(session: &ObservationSession, path: &Path) -> Result<()> {
    let document = session.draft().await.to_document();
    let content = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

async fn submit(session: &ObservationSession, path: &Path) -> Result<()> {
    let mut events = session.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ObservationEvent::SaveProgress { phase, percent, .. } => {
                    eprintln!("[{:>3.0}%] {}", percent, phase);
                }
                ObservationEvent::SaveFinished { .. } => break,
                _ => {}
            }
        }
    });

    let outcome = match session.save().await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.abort();
            return Err(e.into());
        }
    };
    let _ = progress.await;

    println!("{}", outcome.message());
    match outcome {
        SaveOutcome::RemoteSaved => write_draft(session, path).await,
        SaveOutcome::LocalFallbackSaved { key, cause } => {
            println!("Remote save failed ({}); stored as {}", cause, key);
            write_draft(session, path).await
        }
        SaveOutcome::Rejected(reason) => bail!("Not saved: {}", reason),
    }
}

async fn list_pending(local: &dyn LocalStore) -> Result<()> {
    let entries = local.list().await.context("Failed to list local drafts")?;
    if entries.is_empty() {
        println!("No locally stored drafts");
        return Ok(());
    }
    for entry in entries {
        println!("{}  {}  {} bytes", entry.updated_at, entry.key, entry.size_bytes);
    }
    Ok(())
}
