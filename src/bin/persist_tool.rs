use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use walletpersist::wallet::{
    CURRENT_SCHEMA_VERSION, initial_schema, latest_schema, wallet_migration_registry,
};
use walletpersist::{
    FileSnapshotStorage, MigrationDecision, MigrationRunner, PersistedSnapshot, SchemaKeyDiff,
    SnapshotFormat, SnapshotStorage,
};

#[derive(Parser)]
#[command(name = "wallet-persist")]
#[command(about = "Developer tooling for persisted wallet state")]
struct Cli {
    /// Log migration steps at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show version metadata and the pending migration plan of a snapshot
    Inspect {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
    /// Migrate a snapshot file to the current (or given) schema version
    Migrate {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        #[arg(long, default_value_t = CURRENT_SCHEMA_VERSION)]
        target: u32,
        #[arg(long)]
        dry_run: bool,
    },
    /// List registered wallet migrations
    Versions,
    /// Migrate the initial schema and compare its keys with the latest schema
    SchemaCheck,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Msgpack,
}

impl From<FormatArg> for SnapshotFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => SnapshotFormat::Json,
            FormatArg::Msgpack => SnapshotFormat::MessagePack,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Inspect { snapshot, format } => inspect(&snapshot, format).await,
        Command::Migrate {
            snapshot,
            out,
            format,
            target,
            dry_run,
        } => migrate(&snapshot, out.as_deref(), format, target, dry_run).await,
        Command::Versions => versions(),
        Command::SchemaCheck => schema_check().await,
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_format(path: &Path, explicit: Option<FormatArg>) -> SnapshotFormat {
    if let Some(format) = explicit {
        return format.into();
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("msgpack") | Some("mp") => SnapshotFormat::MessagePack,
        _ => SnapshotFormat::Json,
    }
}

fn runner() -> Result<MigrationRunner> {
    let registry =
        wallet_migration_registry().context("Failed to build wallet migration registry")?;
    Ok(MigrationRunner::new(Arc::new(registry)))
}

async fn load_snapshot(path: &Path, format: SnapshotFormat) -> Result<PersistedSnapshot> {
    FileSnapshotStorage::new(path, format)
        .load()
        .await
        .with_context(|| format!("Failed to load snapshot '{}'", path.display()))?
        .ok_or_else(|| anyhow!("Snapshot '{}' does not exist", path.display()))
}

fn describe(decision: &MigrationDecision) -> String {
    match decision {
        MigrationDecision::FreshInstall => "fresh install, nothing to migrate".to_string(),
        MigrationDecision::UpToDate { version } => format!("up to date at version {}", version),
        MigrationDecision::Downgrade { inbound, current } => format!(
            "snapshot version {} is newer than {}, left untouched",
            inbound, current
        ),
        MigrationDecision::Upgrade { from, to, versions } => format!(
            "upgrade {} -> {} applying {:?}",
            from, to, versions
        ),
    }
}

async fn inspect(path: &Path, format: Option<FormatArg>) -> Result<ExitCode> {
    let snapshot = load_snapshot(path, resolve_format(path, format)).await?;
    let runner = runner()?;

    println!("Snapshot: {}", path.display());
    match snapshot.metadata.version {
        Some(version) => println!("Version: {}", version),
        None => println!("Version: unset (treated as {})", snapshot.version()),
    }
    println!("Rehydrated: {}", snapshot.metadata.rehydrated);
    println!(
        "Slices: {}",
        snapshot.state.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "Plan: {}",
        describe(&runner.plan(Some(&snapshot), CURRENT_SCHEMA_VERSION))
    );
    Ok(ExitCode::SUCCESS)
}

async fn migrate(
    path: &Path,
    out: Option<&Path>,
    format: Option<FormatArg>,
    target: u32,
    dry_run: bool,
) -> Result<ExitCode> {
    let snapshot = load_snapshot(path, resolve_format(path, format)).await?;
    let runner = runner()?;
    let decision = runner.plan(Some(&snapshot), target);

    println!("Plan: {}", describe(&decision));
    if dry_run || decision.is_noop() {
        return Ok(ExitCode::SUCCESS);
    }

    let migrated = runner
        .migrate(Some(snapshot), target)
        .await
        .context("Migration failed")?
        .ok_or_else(|| anyhow!("Migration produced no snapshot"))?;

    let out = out.unwrap_or(path);
    FileSnapshotStorage::new(out, resolve_format(out, format))
        .save(&migrated)
        .await
        .with_context(|| format!("Failed to write migrated snapshot to '{}'", out.display()))?;

    println!(
        "Migrated snapshot written: {} (version {})",
        out.display(),
        migrated.version()
    );
    Ok(ExitCode::SUCCESS)
}

fn versions() -> Result<ExitCode> {
    let registry = wallet_migration_registry()?;
    println!("Current schema version: {}", CURRENT_SCHEMA_VERSION);
    for step in registry.steps() {
        println!("- {:>3}  {}", step.version, step.name);
    }
    Ok(ExitCode::SUCCESS)
}

async fn schema_check() -> Result<ExitCode> {
    let initial = PersistedSnapshot::from_value(initial_schema())?;
    let migrated = runner()?
        .migrate(Some(initial), CURRENT_SCHEMA_VERSION)
        .await
        .context("Migrating the initial schema failed")?
        .ok_or_else(|| anyhow!("Migration produced no snapshot"))?;

    let diff = SchemaKeyDiff::between(&migrated.into_value()?, &latest_schema());
    if diff.is_clean() {
        println!("Schema check: OK");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Schema check: FAILED");
    for key in &diff.missing {
        println!("- missing after migration: {}", key);
    }
    for key in &diff.unexpected {
        println!("- not in latest schema: {}", key);
    }
    Ok(ExitCode::FAILURE)
}
