//! CLI command definitions, routing, and tracing setup.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use offliner_localizer::{ProgressReporter, Runner, discover_html_files, scan_file};
use offliner_shared::{
    AppConfig, FileOutcome, RunSummary, init_config, load_config, load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// offliner: make static HTML pages work offline.
#[derive(Parser)]
#[command(
    name = "offliner",
    version,
    about = "Download web fonts and remote images next to HTML pages and rewrite the pages to use them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.offliner/offliner.toml.
    #[arg(long, global = true, env = "OFFLINER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Localize every *.html file directly inside a folder.
    Localize {
        /// Folder to process. Prompted for when omitted (unless --yes).
        folder: Option<String>,

        /// Skip the prompts; an omitted folder means the current directory.
        #[arg(short, long)]
        yes: bool,

        /// List the remote references of each file without changing anything.
        #[arg(long, conflicts_with = "json")]
        dry_run: bool,

        /// Print the run summary as JSON instead of text.
        #[arg(long, requires = "yes")]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// free for the summary.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "offliner=info",
        1 => "offliner=debug",
        _ => "offliner=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Localize {
            folder,
            yes,
            dry_run,
            json,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            cmd_localize(&config, folder.as_deref(), yes, dry_run, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// localize
// ---------------------------------------------------------------------------

async fn cmd_localize(
    config: &AppConfig,
    folder: Option<&str>,
    yes: bool,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let folder = match folder {
        Some(folder) => folder_from_input(folder),
        None if yes => folder_from_input(""),
        None => {
            println!("{}", "=".repeat(60));
            println!("OFFLINER");
            println!("{}", "=".repeat(60));
            folder_from_input(&prompt("\nEnter folder path (press Enter for current dir): ")?)
        }
    };

    if !folder.is_dir() {
        println!("\n✗ Folder not found: {}", folder.display());
        return Ok(());
    }

    let files = discover_html_files(&folder)?;
    if files.is_empty() {
        println!("\n✗ No HTML files found in {}", folder.display());
        return Ok(());
    }

    if !json {
        println!("\nFound {} HTML files:", files.len());
        for (i, file) in files.iter().enumerate() {
            println!("  {}. {}", i + 1, file_name(file));
        }
    }

    if dry_run {
        return print_scan(config, &files);
    }

    if !yes && !is_confirmed(&prompt("\nProcess these? (y/n): ")?) {
        println!("Cancelled.");
        return Ok(());
    }

    info!(folder = %folder.display(), files = files.len(), "localizing folder");

    let mut runner = Runner::new(&folder, config)?;
    let reporter = CliProgress::new();
    let summary = runner.run(&files, &reporter).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(config, &summary);
    }

    Ok(())
}

fn print_scan(config: &AppConfig, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let refs = scan_file(file, &config.fonts)?;
        println!("\n{}: {} remote reference(s)", file_name(file), refs.len());
        for reference in refs {
            println!("  {:<16} {}", reference.kind.to_string(), reference.url);
        }
    }
    println!("\nDry run: no files were changed.");
    Ok(())
}

fn print_summary(config: &AppConfig, summary: &RunSummary) {
    println!();
    println!("{}", "=".repeat(60));
    println!("DONE!");
    println!("{}", "=".repeat(60));
    println!();
    println!("  Updated:   {}", summary.updated());
    println!("  Unchanged: {}", summary.unchanged());
    println!("  Not found: {}", summary.not_found());
    println!("  Failed:    {}", summary.failed());
    println!("  Downloads: {}", summary.downloads);
    println!();
    println!("Folders:");
    println!("  ./{}/  - Font files", config.output.fonts_dir);
    println!("  ./{}/ - Images", config.output.images_dir);
    println!();
    println!("Backups: .html.{} files", config.output.backup_suffix);
    println!();
}

/// Read one trimmed line from stdin after printing `message`.
fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Empty input means the current directory.
fn folder_from_input(input: &str) -> PathBuf {
    let input = input.trim();
    if input.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(input)
    }
}

fn is_confirmed(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn file_started(&self, path: &Path, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Processing [{current}/{total}] {}", file_name(path)));
    }

    fn file_finished(&self, path: &Path, outcome: &FileOutcome) {
        let name = file_name(path);
        let line = match outcome {
            FileOutcome::Updated {
                backup_created,
                report,
            } => {
                let backup = if *backup_created {
                    ", backup created"
                } else {
                    ""
                };
                format!(
                    "✓ Updated: {name} ({} font(s), {} image(s), {} failed{backup})",
                    report.fonts_localized,
                    report.images_localized,
                    report.failures()
                )
            }
            FileOutcome::Unchanged => format!("→ No changes needed: {name}"),
            FileOutcome::NotFound => format!("✗ File not found: {name}"),
            FileOutcome::Failed { error } => format!("✗ Failed: {name}: {error}"),
        };
        self.spinner.println(line);
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("failed to render config: {e}"))?;
    println!("{toml_str}");
    Ok(())
}
