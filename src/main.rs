//! evmtrack - earned value analytics for construction projects
//!
//! A CLI tool that loads a project dataset, regenerates weekly plans and
//! actuals, and writes an S-curve and alert report.
//!
//! Exit codes:
//!   0 - Success (no alerts above threshold, or no --fail-on set)
//!   1 - Runtime error (invalid arguments, config, dataset, unknown id, etc.)
//!   2 - Alerts found at or above --fail-on severity

use anyhow::{Context, Result};
use chrono::Local;
use evmtrack::analysis::any_at_or_above;
use evmtrack::cli::{Args, FailOnLevel, OutputFormat};
use evmtrack::config::{Config, CONFIG_FILE};
use evmtrack::dataset::Dataset;
use evmtrack::evm::{EngineConfig, EvmEngine};
use evmtrack::models::Severity;
use evmtrack::report::{self, ReportRequest};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    // Config is read before logging starts so it can enable verbose output
    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, config.general.verbose);

    info!("evmtrack v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    log_config_source(&config_source);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .evmtrack.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the labor rate, alert thresholds and report.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if config_verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already set");
    }
}

/// Run the complete workflow. Returns exit code (0 or 2).
fn run(args: Args, mut config: Config) -> Result<i32> {
    config.merge_with_args(&args);

    let data_path = args.data.clone().context("--data is required")?;

    // Step 1: Load the dataset
    println!("📥 Loading dataset: {}", data_path.display());
    let store = Dataset::load(&data_path)?.into_store()?;

    // Step 2: Build the report
    let engine = EvmEngine::new(&store, EngineConfig::from(&config));
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let request = ReportRequest {
        dataset: data_path.display().to_string(),
        scope: args.alert_scope(),
        from: args.from,
        to: args.to,
        today,
    };

    println!("🔬 Analyzing {} as of {}...", request.scope, today);
    let report = report::build_report(&engine, &store, &request)?;

    // Step 3: Render and save
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    let output_path = output_path(&args, &config);
    report::generator::save_report(&output, &output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    // Print summary
    let summary = &report.summary;
    println!("\n📊 Summary:");
    println!(
        "   Tasks analyzed: {} (skipped: {})",
        report.metadata.tasks_analyzed, report.metadata.tasks_skipped
    );
    if let Some(ref snapshot) = report.snapshot {
        println!(
            "   Week of {}: PV {:.2} | EV {:.2} | AC {:.2}",
            snapshot.as_of, snapshot.pv, snapshot.ev, snapshot.ac
        );
        println!(
            "   CPI {} | SPI {}",
            snapshot.cpi.map_or("n/a".to_string(), |v| format!("{:.3}", v)),
            snapshot.spi.map_or("n/a".to_string(), |v| format!("{:.3}", v))
        );
    }
    println!("   Total alerts: {}", summary.total);
    println!(
        "   - {} High: {} | {} Medium: {}",
        Severity::High.emoji(),
        summary.high,
        Severity::Medium.emoji(),
        summary.medium
    );
    println!("\n✅ Report saved to: {}", output_path.display());

    // Check --fail-on threshold
    if let Some(fail_level) = args.fail_on {
        if any_at_or_above(&report.alerts, fail_on_to_severity(fail_level)) {
            eprintln!(
                "\n⛔ Alerts found at or above {:?} severity. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Where to write the report. A JSON report without an explicit path gets
/// the configured name with a `.json` extension.
fn output_path(args: &Args, config: &Config) -> PathBuf {
    let path = PathBuf::from(&config.general.output);
    if args.output.is_none() && args.format == OutputFormat::Json {
        path.with_extension("json")
    } else {
        path
    }
}

/// Convert FailOnLevel to Severity for comparison.
fn fail_on_to_severity(level: FailOnLevel) -> Severity {
    match level {
        FailOnLevel::Medium => Severity::Medium,
        FailOnLevel::High => Severity::High,
    }
}

/// Where the configuration in effect came from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConfigSource {
    /// `--config FILE`
    Explicit(PathBuf),
    /// `./.evmtrack.toml`
    Default,
    /// No file present.
    BuiltIn,
    /// `./.evmtrack.toml` exists but could not be loaded.
    Rejected,
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go to stderr directly.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    Ok(resolve_default_config(Config::load_default()))
}

/// Fall back to built-in defaults when the default file is absent or broken.
fn resolve_default_config(loaded: Result<Option<Config>>) -> (Config, ConfigSource) {
    match loaded {
        Ok(Some(config)) => (config, ConfigSource::Default),
        Ok(None) => (Config::default(), ConfigSource::BuiltIn),
        Err(e) => {
            eprintln!("Warning: ignoring {}: {:#}", CONFIG_FILE, e);
            (Config::default(), ConfigSource::Rejected)
        }
    }
}

/// Report which configuration is in effect, once logging is up.
fn log_config_source(source: &ConfigSource) {
    match source {
        ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE),
        ConfigSource::BuiltIn => debug!("No config file found, using defaults"),
        ConfigSource::Rejected => warn!("{} could not be loaded, using defaults", CONFIG_FILE),
    }
}
