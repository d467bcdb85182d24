//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.evmtrack.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".evmtrack.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Earned value settings.
    #[serde(default)]
    pub evm: EvmConfig,

    /// Alert thresholds.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "evm_report.md".to_string()
}

/// Earned value computation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvmConfig {
    /// Cost of one approved labor hour.
    #[serde(default = "default_labor_rate")]
    pub labor_rate: f64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            labor_rate: default_labor_rate(),
        }
    }
}

fn default_labor_rate() -> f64 {
    crate::evm::DEFAULT_LABOR_RATE
}

/// Alert threshold settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// CPI below this raises a cost alert.
    #[serde(default = "default_warning_threshold")]
    pub cost_threshold: f64,

    /// CPI below this raises it at high severity.
    #[serde(default = "default_high_threshold")]
    pub cost_high_threshold: f64,

    /// SPI below this raises a schedule alert.
    #[serde(default = "default_warning_threshold")]
    pub schedule_threshold: f64,

    /// SPI below this raises it at high severity.
    #[serde(default = "default_high_threshold")]
    pub schedule_high_threshold: f64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            cost_threshold: default_warning_threshold(),
            cost_high_threshold: default_high_threshold(),
            schedule_threshold: default_warning_threshold(),
            schedule_high_threshold: default_high_threshold(),
        }
    }
}

fn default_warning_threshold() -> f64 {
    0.9
}

fn default_high_threshold() -> f64 {
    0.8
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the weekly S-curve table.
    #[serde(default = "default_true")]
    pub include_curves: bool,

    /// Maximum curve rows printed in Markdown (latest weeks are kept).
    #[serde(default = "default_max_curve_rows")]
    pub max_curve_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_curves: true,
            max_curve_rows: default_max_curve_rows(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_curve_rows() -> usize {
    52
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !self.evm.labor_rate.is_finite() || self.evm.labor_rate < 0.0 {
            anyhow::bail!("labor_rate must be a finite non-negative number");
        }
        let a = &self.alerts;
        if a.cost_high_threshold > a.cost_threshold {
            anyhow::bail!("cost_high_threshold must not exceed cost_threshold");
        }
        if a.schedule_high_threshold > a.schedule_threshold {
            anyhow::bail!("schedule_high_threshold must not exceed schedule_threshold");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(rate) = args.labor_rate {
            self.evm.labor_rate = rate;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        if args.no_curves {
            self.report.include_curves = false;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.output, "evm_report.md");
        assert_eq!(config.evm.labor_rate, 20_000.0);
        assert_eq!(config.alerts.cost_threshold, 0.9);
        assert_eq!(config.alerts.schedule_high_threshold, 0.8);
        assert!(config.report.include_curves);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "obra.md"
verbose = true

[evm]
labor_rate = 15000.0

[alerts]
cost_threshold = 0.95
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "obra.md");
        assert!(config.general.verbose);
        assert_eq!(config.evm.labor_rate, 15_000.0);
        assert_eq!(config.alerts.cost_threshold, 0.95);
        assert_eq!(config.alerts.cost_high_threshold, 0.8);
        assert_eq!(config.report.max_curve_rows, 52);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[evm]"));
        assert!(toml_str.contains("[alerts]"));
        assert!(toml_str.contains("labor_rate"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        writeln!(file, "[evm]\nlabor_rate = 12500.0").unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.evm.labor_rate, 12_500.0);
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[alerts]\ncost_threshold = 0.7\ncost_high_threshold = 0.8\n")
            .unwrap();
        assert!(Config::load(&path).is_err());

        let mut config = Config::default();
        config.evm.labor_rate = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_finite_labor_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inf.toml");
        std::fs::write(&path, "[evm]\nlabor_rate = inf\n").unwrap();
        assert!(Config::load(&path).is_err());

        let mut config = Config::default();
        config.evm.labor_rate = f64::NAN;
        assert!(config.validate().is_err());
        config.evm.labor_rate = 0.0;
        assert!(config.validate().is_ok());
    }
}
