//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::evm::AlertScope;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// evmtrack - earned value analytics for construction projects
///
/// Spreads task budgets across weeks, aggregates approved progress, builds
/// PV/EV/AC S-curves with CPI/SPI and reports cost, schedule and overdue
/// alerts.
///
/// Examples:
///   evmtrack --data obra.json
///   evmtrack --data obra.json --scope project --id p-edificio --format json
///   evmtrack --data obra.json --scope task --id fundaciones --from 2024-01-01 --to 2024-03-31
///   evmtrack --data obra.json --fail-on high
///   evmtrack --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON dataset with projects, stages, tasks and progress entries
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub data: Option<PathBuf>,

    /// What to analyze
    #[arg(short, long, default_value = "all", value_name = "SCOPE")]
    pub scope: ScopeKind,

    /// Identifier of the task, stage or project selected by --scope
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// First week to include in curves (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Last week to include in curves (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Reference date for overdue checks (YYYY-MM-DD, default: today)
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,

    /// Cost of one approved labor hour
    ///
    /// Overrides [evm] labor_rate from the config file.
    #[arg(long, value_name = "AMOUNT", env = "EVMTRACK_LABOR_RATE")]
    pub labor_rate: Option<f64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .evmtrack.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Leave the weekly S-curve table out of the report
    #[arg(long)]
    pub no_curves: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail if alerts at or above this severity are found
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is exceeded.
    /// Values: high, medium
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<FailOnLevel>,

    /// Generate a default .evmtrack.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Level of the hierarchy to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ScopeKind {
    /// Every task in the dataset
    #[default]
    All,
    Project,
    Stage,
    Task,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Severity level for --fail-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum FailOnLevel {
    Medium,
    High,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match (self.scope, &self.id) {
            (ScopeKind::All, Some(_)) => {
                return Err("--id cannot be used with --scope all".to_string());
            }
            (ScopeKind::All, None) => {}
            (_, None) => {
                return Err(format!("--scope {:?} requires --id", self.scope).to_lowercase());
            }
            _ => {}
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if to < from {
                return Err("--to must not be before --from".to_string());
            }
        }

        if let Some(rate) = self.labor_rate {
            if !rate.is_finite() || rate < 0.0 {
                return Err("Labor rate must be a finite non-negative number".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate dataset path if provided
        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// The alert/curve scope selected by --scope and --id.
    pub fn alert_scope(&self) -> AlertScope {
        let id = self.id.clone().unwrap_or_default();
        match self.scope {
            ScopeKind::All => AlertScope::All,
            ScopeKind::Project => AlertScope::Project(id),
            ScopeKind::Stage => AlertScope::Stage(id),
            ScopeKind::Task => AlertScope::Task(id),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
