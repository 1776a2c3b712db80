use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use fs_err as fs;
use semver::Version;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use upgrader_cli::config::{self, CliOverrides, ConfigMerger, MergedConfig};
use upgrader_cli::prompt::{InquireConfirm, multi_select_selector};
use upgrader_core::adapters::{
    AutoConfirm, CommandEngine, HttpRegistry, ShellGitPort, ShellPackageManager,
    resolve_registry_url,
};
use upgrader_core::ports::Confirm;
use upgrader_core::settings::{CodemodSelection, CodemodSettings, UpgradeSettings};
use upgrader_core::{
    CodemodRepository, CodemodRunnerReport, FrameworkSpec, Project, Range, Target, UpgradePorts,
    UpgradeReport, Upgrader, run_codemods,
};
use upgrader_domain::{FindQuery, version};
use upgrader_render::{
    RunEnvelope, render_codemods_table, render_json, render_report_md, render_report_table,
};
use upgrader_transform::{RegisteredTransforms, RunContext, RunServices};
use upgrader_types::CodemodReport;

#[derive(Debug, Parser)]
#[command(
    name = "upgrader",
    version,
    about = "Upgrade a project's framework version and run the codemods that go with it."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Report what would change without writing files or reinstalling.
    #[arg(long, global = true, default_value_t = false)]
    dry: bool,

    /// Verbose logging.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "silent")]
    debug: bool,

    /// Only log errors.
    #[arg(long, global = true, default_value_t = false)]
    silent: bool,

    /// Project root (default: current directory).
    #[arg(long, global = true, default_value = ".")]
    project_path: Utf8PathBuf,

    /// Answer yes to every prompt.
    #[arg(long, short = 'y', global = true, default_value_t = false)]
    yes: bool,

    /// Codemods directory (default: <project_path>/codemods).
    #[arg(long, global = true)]
    codemods_dir: Option<Utf8PathBuf>,

    /// Framework package, e.g. @acme/core.
    #[arg(long, global = true)]
    framework: Option<String>,

    /// Module registry URL.
    #[arg(long, global = true)]
    registry: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upgrade to a release type (major, minor, patch, latest) or an exact version.
    Upgrade(UpgradeArgs),
    /// Run or list codemods without touching dependencies.
    #[command(subcommand)]
    Codemods(CodemodsCommand),
}

#[derive(Debug, Parser)]
struct UpgradeArgs {
    /// major, minor, patch, latest or X.Y.Z
    target: Target,

    /// Run codemods up to this version instead of the upgrade target.
    #[arg(long, value_parser = parse_version)]
    codemods_target: Option<Version>,

    /// Write a run report to this path (markdown for `.md`, JSON otherwise).
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Subcommand)]
enum CodemodsCommand {
    /// Run codemods newer than the installed version, a range, or a single uid.
    Run(CodemodsRunArgs),
    /// List available codemods.
    List(CodemodsListArgs),
}

#[derive(Debug, Parser)]
struct CodemodsRunArgs {
    /// Version range, e.g. ">1.0.0 <=2.0.0".
    #[arg(long, conflicts_with = "uid")]
    range: Option<Range>,

    /// Codemod uid, e.g. 5.0.0-rename-entry-point-code.
    #[arg(long)]
    uid: Option<String>,

    /// Write a run report to this path (markdown for `.md`, JSON otherwise).
    #[arg(long)]
    report: Option<Utf8PathBuf>,
}

#[derive(Debug, Parser)]
struct CodemodsListArgs {
    /// Only codemods whose version is in this range.
    #[arg(long)]
    range: Option<Range>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_version(input: &str) -> Result<Version, String> {
    version::parse(input).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(e) = real_main(cli) {
        error!("{:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn init_tracing(global: &GlobalArgs) {
    let filter = if global.debug {
        EnvFilter::new("debug")
    } else if global.silent {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn real_main(cli: Cli) -> anyhow::Result<()> {
    let merged = merged_config(&cli.global)?;
    match cli.cmd {
        Command::Upgrade(args) => cmd_upgrade(&cli.global, &merged, args),
        Command::Codemods(CodemodsCommand::Run(args)) => cmd_codemods_run(&cli.global, &merged, args),
        Command::Codemods(CodemodsCommand::List(args)) => cmd_codemods_list(&cli.global, &merged, args),
    }
}

fn merged_config(global: &GlobalArgs) -> anyhow::Result<MergedConfig> {
    let file_config =
        config::load_or_default(&global.project_path).context("load upgrader.toml config")?;
    let merged = ConfigMerger::new(file_config).merge(&CliOverrides {
        framework: global.framework.clone(),
        codemods_dir: global.codemods_dir.clone(),
        registry: global.registry.clone(),
        yes: global.yes,
    });
    debug!(
        "merged config: framework={:?}, codemods_dir={}, registry={:?}, engine={:?}",
        merged.framework, merged.codemods_dir, merged.registry_url, merged.engine
    );
    Ok(merged)
}

fn project_root(global: &GlobalArgs) -> anyhow::Result<Utf8PathBuf> {
    global
        .project_path
        .canonicalize_utf8()
        .with_context(|| format!("resolve project path {}", global.project_path))
}

fn open_project(global: &GlobalArgs, merged: &MergedConfig) -> anyhow::Result<(Project, CodemodRepository)> {
    let settings = merged.project_settings(&project_root(global)?)?;
    let framework = FrameworkSpec::new(&settings.framework);
    let project = Project::load(settings.project_path.clone(), &framework)
        .with_context(|| format!("load project at {}", settings.project_path))?;
    let repository = open_repository(&settings.codemods_root())?;
    Ok((project, repository))
}

fn open_repository(root: &Utf8Path) -> anyhow::Result<CodemodRepository> {
    CodemodRepository::open(root).with_context(|| format!("load codemods from {}", root))
}

fn run_context(operation: &'static str, merged: &MergedConfig) -> RunContext {
    let services = RunServices::new(RegisteredTransforms::new())
        .with_engine(CommandEngine::new(&merged.engine));
    RunContext::new(operation, services)
}

fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn confirm_port(merged: &MergedConfig) -> Arc<dyn Confirm> {
    if merged.auto_confirm {
        Arc::new(AutoConfirm(true))
    } else if is_interactive() {
        Arc::new(InquireConfirm)
    } else {
        debug!("stdin is not a terminal; optional requirements will be declined");
        Arc::new(AutoConfirm(false))
    }
}

fn cmd_upgrade(global: &GlobalArgs, merged: &MergedConfig, args: UpgradeArgs) -> anyhow::Result<()> {
    let (project, repository) = open_project(global, merged)?;
    let package = project.framework().package.clone();

    let package_manager = ShellPackageManager::detect(project.cwd());
    let registry_url =
        resolve_registry_url(merged.registry_url.as_deref(), &package_manager, project.cwd());
    debug!(registry = %registry_url, manager = ?package_manager.kind(), "resolved ports");

    let ports = UpgradePorts {
        registry: Arc::new(HttpRegistry::new(registry_url)),
        package_manager: Arc::new(package_manager),
        git: Arc::new(ShellGitPort),
        confirm: confirm_port(merged),
    };
    let settings = UpgradeSettings {
        target: args.target,
        codemods_target: args.codemods_target,
        dry: global.dry,
        parser: merged.parser.clone(),
        git_checks: merged.git_checks,
    };

    let mut ctx = run_context("upgrade", merged);
    let mut upgrader = Upgrader::new(project, repository, ports, settings);
    let report = upgrader.upgrade(&mut ctx);

    match report {
        UpgradeReport::Success {
            from,
            to,
            reports,
            bumped,
        } => {
            let from = from.map_or_else(|| "plugin".to_string(), |v| v.to_string());
            println!(
                "{} {} {} → {}",
                "Upgraded".green().bold(),
                package,
                from,
                to.to_string().green()
            );
            print_reports(&reports, global.dry);
            for dependency in &bumped {
                println!("  {} {} → {}", "bumped".cyan(), dependency, to);
            }
            write_report(args.report.as_deref(), &RunEnvelope::success(ctx.run_id(), &reports))
        }
        UpgradeReport::Failure { error } => {
            write_report(args.report.as_deref(), &RunEnvelope::failure(ctx.run_id(), &error))?;
            Err(error)
        }
    }
}

fn cmd_codemods_run(
    global: &GlobalArgs,
    merged: &MergedConfig,
    args: CodemodsRunArgs,
) -> anyhow::Result<()> {
    let (project, repository) = open_project(global, merged)?;

    let selection = match (args.uid, args.range) {
        (Some(uid), _) => CodemodSelection::Uid(uid),
        (None, Some(range)) => CodemodSelection::Range(range),
        (None, None) => CodemodSelection::Pending,
    };
    let selector = match selection {
        CodemodSelection::Uid(_) => None,
        _ if global.yes || !is_interactive() => None,
        _ => Some(multi_select_selector()),
    };
    let settings = CodemodSettings {
        selection,
        dry: global.dry,
        parser: merged.parser.clone(),
    };

    let mut ctx = run_context("codemods", merged);
    let report = run_codemods(&project, &repository, &settings, selector, &mut ctx);

    match report {
        CodemodRunnerReport::Success { reports } => {
            if reports.is_empty() {
                info!("no codemods to run");
            }
            print_reports(&reports, global.dry);
            write_report(args.report.as_deref(), &RunEnvelope::success(ctx.run_id(), &reports))
        }
        CodemodRunnerReport::Failure { error } => {
            write_report(args.report.as_deref(), &RunEnvelope::failure(ctx.run_id(), &error))?;
            Err(error)
        }
    }
}

fn cmd_codemods_list(
    global: &GlobalArgs,
    merged: &MergedConfig,
    args: CodemodsListArgs,
) -> anyhow::Result<()> {
    let repository = open_repository(&merged.codemods_root(&project_root(global)?))?;
    let range = args.range.unwrap_or_else(Range::any);
    let collections = repository.find(&FindQuery::in_range(range.clone()));

    match args.format {
        OutputFormat::Text => {
            if collections.is_empty() {
                println!("No codemods match {}.", range);
            } else {
                println!("{}", render_codemods_table(&collections));
                println!();
                println!("Use 'upgrader codemods run --uid <uid>' to run one.");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&collections)?);
        }
    }
    Ok(())
}

fn print_reports(reports: &[CodemodReport], dry: bool) {
    if !reports.is_empty() {
        println!("{}", render_report_table(reports));
    }
    if dry {
        println!("{}", "Dry run: no files were written.".yellow());
    }
}

fn write_report(path: Option<&Utf8Path>, envelope: &RunEnvelope<'_>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent))?;
    }
    let contents = match path.extension() {
        Some("md") => render_report_md(envelope.reports),
        _ => render_json(envelope)?,
    };
    fs::write(path, contents).with_context(|| format!("write {}", path))?;
    info!("wrote run report to {}", path);
    Ok(())
}
