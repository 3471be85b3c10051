//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docweave_core::pipeline::{BuildReport, ProgressReporter};
use docweave_shared::{AppConfig, BuildConfig, DocId, init_config, resolve_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docweave: turn a folder of markdown lessons into a browsable site.
#[derive(Parser)]
#[command(
    name = "docweave",
    version,
    about = "Build a static documentation site from a directory of markdown lessons.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of `<INPUT>/docweave.toml` or the user config.
    #[arg(long, global = true, env = "DOCWEAVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Build the site: one HTML page per markdown file plus index and search data.
    Build {
        /// Directory containing the markdown sources.
        input: PathBuf,

        /// Directory to write the site into (created if missing).
        output: PathBuf,
    },

    /// Parse every document and report structural problems without writing.
    Check {
        /// Directory containing the markdown sources.
        input: PathBuf,

        /// Exit non-zero if any diagnostic is reported.
        #[arg(long)]
        strict: bool,
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
    /// Initialize the user config file with defaults.
    Init,
    /// Show resolved configuration.
    Show {
        /// Content directory whose `docweave.toml` should be considered.
        input: Option<PathBuf>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docweave=info",
        1 => "docweave=debug",
        _ => "docweave=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    let explicit = cli.config.as_deref();
    match cli.command {
        Command::Build { input, output } => cmd_build(explicit, input, output).await,
        Command::Check { input, strict } => cmd_check(explicit, input, strict).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show { input } => cmd_config_show(explicit, input.as_deref()).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(explicit: Option<&Path>, input: PathBuf, output: PathBuf) -> Result<()> {
    let config = resolve_config(explicit, Some(&input))?;
    let build_config = BuildConfig::new(&config, input, output);

    info!(
        input = %build_config.input_root.display(),
        output = %build_config.output_root.display(),
        "building site"
    );

    let reporter = CliProgress::new();
    let report = match docweave_core::pipeline::build_site(&build_config, &reporter).await {
        Ok(report) => report,
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    println!();
    println!("  Site built successfully!");
    println!("  Documents: {}", report.document_count);
    println!("  Sections:  {}", report.section_count);
    println!("  Artifacts: {}", report.artifacts.len() + 1);
    println!("  Path:      {}", report.output_root.display());
    println!("  Time:      {:.1}s", report.elapsed.as_secs_f64());
    println!();
    Ok(())
}

async fn cmd_check(explicit: Option<&Path>, input: PathBuf, strict: bool) -> Result<()> {
    let config = resolve_config(explicit, Some(&input))?;
    // Nothing is written; the output root is never touched.
    let build_config = BuildConfig::new(&config, input, PathBuf::new());

    let report = docweave_core::pipeline::check_site(&build_config).await?;

    for doc in &report.documents {
        println!(
            "{:<40} {:>3} sections  {}",
            doc.id.as_str(),
            doc.sections,
            doc.title
        );
        for diagnostic in &doc.diagnostics {
            println!("    {diagnostic}");
        }
    }

    let count = report.diagnostic_count();
    println!();
    println!(
        "  {} documents checked, {count} diagnostic(s)",
        report.documents.len()
    );

    if strict && count > 0 {
        return Err(eyre!("{count} diagnostic(s) reported in strict mode"));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(explicit: Option<&Path>, input: Option<&Path>) -> Result<()> {
    let config: AppConfig = resolve_config(explicit, input)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
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
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn document_parsed(&self, id: &DocId, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Parsing [{current}/{total}] {id}"));
    }

    fn page_written(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Writing [{current}/{total}] {path}"));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}
