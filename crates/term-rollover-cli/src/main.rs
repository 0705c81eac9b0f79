mod observability;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;
use term_rollover_core::parse_date;
use term_rollover_pipeline::{
    resolve_terms, rollover_stages, ArchiveSnapshotter, Config, Reconciler, RolloverOptions,
    RolloverPipeline, RunMode, ShapingKind, ShapingPass, StageOutcome, ARCHIVE, PRIMARY, SECONDARY,
};
use term_rollover_store_sqlite::{SqliteStore, StoreProfile};
use time::{Date, OffsetDateTime};
use tracing::info;

use crate::observability::{init_logging, LogFormat};

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "eos")]
#[command(about = "End-of-term rollover, archive, and reconciliation for the course store")]
struct Cli {
    /// YAML config file; `./eos.yaml` is used when present.
    #[arg(long, env = "EOS_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    primary: Option<PathBuf>,

    #[arg(long, global = true)]
    secondary: Option<PathBuf>,

    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// Apply changes. Without this flag every pipeline is a dry run.
    #[arg(long, env = "EOS_EXECUTE", global = true)]
    execute: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Purge, carry forward, and rotate terms on the primary store.
    Rollover(RolloverArgs),
    /// Shape the primary store before it is snapshotted.
    PreArchive(PreArchiveArgs),
    /// Copy the active term's rows into an empty archive store.
    Archive,
    /// Forward next-term course units and clear per-term tables.
    PostArchive,
    /// Merge rows written to the secondary store after cutover into the primary.
    Reconcile(ReconcileArgs),
    /// Show the resolved prior, active, and next terms.
    Terms,
    /// List pipeline stages in execution order.
    Stages,
    Db {
        #[command(subcommand)]
        command: Box<DbCommand>,
    },
}

#[derive(Debug, Args)]
struct RolloverArgs {
    /// Resume at this stage, skipping everything before it.
    #[arg(long)]
    from_stage: Option<String>,
}

#[derive(Debug, Args)]
struct PreArchiveArgs {
    /// Date used to expire incompletes and pending exams; defaults to today.
    #[arg(long, value_parser = date_arg)]
    today: Option<Date>,
}

#[derive(Debug, Args)]
struct ReconcileArgs {
    #[arg(long, value_parser = date_arg)]
    cutover_date: Option<Date>,

    #[arg(long)]
    cutover_minutes: Option<u16>,

    /// Write the plain-text report here as well as printing JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    /// Create any missing tables in a store.
    Init(DbInitArgs),
    Backup(DbBackupArgs),
    IntegrityCheck,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Primary,
    Secondary,
    Archive,
}

impl ProfileArg {
    fn name(self) -> &'static str {
        match self {
            Self::Primary => PRIMARY,
            Self::Secondary => SECONDARY,
            Self::Archive => ARCHIVE,
        }
    }
}

#[derive(Debug, Args)]
struct DbInitArgs {
    #[arg(long, value_enum, default_value_t = ProfileArg::Primary)]
    profile: ProfileArg,
}

#[derive(Debug, Args)]
struct DbBackupArgs {
    #[arg(long)]
    out: PathBuf,
}

fn date_arg(value: &str) -> Result<Date, String> {
    parse_date(value).map_err(|err| err.to_string())
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

/// Print a pipeline report and map its outcome onto the exit status.
fn emit_report(report: &impl serde::Serialize, outcome: StageOutcome) -> Result<ExitCode> {
    emit_json(serde_json::to_value(report).context("failed to serialize report")?)?;
    Ok(match outcome {
        StageOutcome::Success => ExitCode::SUCCESS,
        StageOutcome::Failure => ExitCode::FAILURE,
    })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let mut config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    for (name, path) in [(PRIMARY, &cli.primary), (SECONDARY, &cli.secondary), (ARCHIVE, &cli.archive)]
    {
        if let Some(path) = path {
            config.override_path(name, path.clone())?;
        }
    }
    let mode = RunMode::from_execute_flag(cli.execute);

    match cli.command {
        Command::Rollover(args) => run_rollover(args, &config, mode),
        Command::PreArchive(args) => run_shaping(ShapingKind::PreArchive, args.today, &config, mode),
        Command::Archive => run_archive(&config, mode),
        Command::PostArchive => run_shaping(ShapingKind::PostArchive, None, &config, mode),
        Command::Reconcile(args) => run_reconcile(&args, &config, mode),
        Command::Terms => run_terms(&config),
        Command::Stages => run_stages(&config),
        Command::Db { command } => run_db(*command, &config),
    }
}

fn run_rollover(args: RolloverArgs, config: &Config, mode: RunMode) -> Result<ExitCode> {
    let pipeline = RolloverPipeline::new(config.profile(PRIMARY)?, mode);
    let report = pipeline.run(&RolloverOptions { from_stage: args.from_stage })?;
    emit_report(&report, report.outcome)
}

fn run_shaping(
    kind: ShapingKind,
    today: Option<Date>,
    config: &Config,
    mode: RunMode,
) -> Result<ExitCode> {
    let today = today.unwrap_or_else(|| OffsetDateTime::now_utc().date());
    let report = ShapingPass::new(kind, config.profile(PRIMARY)?, mode).run(today)?;
    emit_report(&report, report.outcome)
}

fn run_archive(config: &Config, mode: RunMode) -> Result<ExitCode> {
    let snapshotter =
        ArchiveSnapshotter::new(config.profile(PRIMARY)?, config.profile(ARCHIVE)?, mode);
    let report = snapshotter.run()?;
    emit_report(&report, report.outcome)
}

fn run_reconcile(args: &ReconcileArgs, config: &Config, mode: RunMode) -> Result<ExitCode> {
    let cutover = config.cutover(args.cutover_date, args.cutover_minutes)?;
    let reconciler = Reconciler::new(config.profile(PRIMARY)?, config.profile(SECONDARY)?, mode);
    let report = reconciler.run(cutover)?;

    if let Some(path) = args.report.as_ref().or(config.reconcile.report_path.as_ref()) {
        report.write_text(path)?;
        info!(path = %path.display(), "reconciliation report written");
    }
    emit_report(&report, report.outcome)
}

fn run_terms(config: &Config) -> Result<ExitCode> {
    let store = config.profile(PRIMARY)?.checkout()?;
    let terms = resolve_terms(&store)?;
    emit_json(serde_json::to_value(&terms).context("failed to serialize terms")?)?;
    Ok(ExitCode::SUCCESS)
}

fn run_stages(config: &Config) -> Result<ExitCode> {
    let rollover = rollover_stages()
        .iter()
        .map(|stage| serde_json::json!({ "name": stage.name, "summary": stage.summary }))
        .collect::<Vec<_>>();
    let primary = config.profile(PRIMARY)?;
    let pre_archive = ShapingPass::new(ShapingKind::PreArchive, primary.clone(), RunMode::DryRun);
    let post_archive = ShapingPass::new(ShapingKind::PostArchive, primary, RunMode::DryRun);

    emit_json(serde_json::json!({
        "rollover": rollover,
        "pre_archive": pre_archive.step_names(),
        "post_archive": post_archive.step_names()
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn run_db(command: DbCommand, config: &Config) -> Result<ExitCode> {
    match command {
        DbCommand::Init(args) => run_db_init(&args, config),
        DbCommand::Backup(args) => run_db_backup(&args, &config.profile(PRIMARY)?),
        DbCommand::IntegrityCheck => run_db_integrity_check(&config.profile(PRIMARY)?),
    }?;
    Ok(ExitCode::SUCCESS)
}

fn run_db_init(args: &DbInitArgs, config: &Config) -> Result<()> {
    let profile = config.profile(args.profile.name())?;
    ensure_parent_dir(&profile.path)?;
    let store = SqliteStore::open(&profile.path)?;
    store.bootstrap_schema()?;
    emit_json(serde_json::json!({
        "profile": profile.name,
        "path": profile.path,
        "status": "ok"
    }))
}

fn run_db_backup(args: &DbBackupArgs, profile: &StoreProfile) -> Result<()> {
    ensure_parent_dir(&args.out)?;
    profile.checkout()?.backup_database(&args.out)?;
    emit_json(serde_json::json!({
        "backup_path": args.out,
        "status": "ok"
    }))
}

fn run_db_integrity_check(profile: &StoreProfile) -> Result<()> {
    let report = profile.checkout()?.integrity_check()?;
    emit_json(serde_json::to_value(&report).context("failed to serialize integrity report")?)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display())),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_version_wraps_non_objects() {
        let wrapped = with_contract_version(serde_json::json!(["clean-holds"]));
        assert_eq!(wrapped["contract_version"], CLI_CONTRACT_VERSION);
        assert_eq!(wrapped["payload"][0], "clean-holds");

        let object = with_contract_version(serde_json::json!({ "status": "ok" }));
        assert_eq!(object["contract_version"], CLI_CONTRACT_VERSION);
        assert_eq!(object["status"], "ok");
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "eos",
            "reconcile",
            "--cutover-date",
            "2025-06-01",
            "--cutover-minutes",
            "480",
            "--primary",
            "/tmp/p.sqlite3",
            "--execute",
        ]);
        let Ok(cli) = cli else {
            panic!("reconcile arguments should parse");
        };
        assert!(cli.execute);
        assert_eq!(cli.primary, Some(PathBuf::from("/tmp/p.sqlite3")));
        let Command::Reconcile(args) = cli.command else {
            panic!("expected reconcile command");
        };
        assert_eq!(args.cutover_minutes, Some(480));
        assert!(args.cutover_date.is_some());
    }

    #[test]
    fn malformed_dates_are_rejected() {
        assert!(Cli::try_parse_from(["eos", "pre-archive", "--today", "2025-02-30"]).is_err());
    }
}
