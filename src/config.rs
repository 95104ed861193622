use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "RUSTY_HOTFIRE_CONFIG";

/// Tunables and presets for the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Above this many rows the test-data overview is downsampled.
    pub max_plot_points: usize,
    /// RP-1, kg/m³.
    pub fuel_density: f64,
    /// LOX, kg/m³.
    pub oxidizer_density: f64,
    pub ambient_pressure_psi: f64,
    pub max_margin_percent: f64,
    pub max_downsample: usize,
    pub max_smoothing: usize,
    pub venturi_cd: f64,
    pub venturi_expansion: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_plot_points: 2000,
            fuel_density: 820.0,
            oxidizer_density: 1141.0,
            ambient_pressure_psi: 14.7,
            max_margin_percent: 30.0,
            max_downsample: 50,
            max_smoothing: 101,
            venturi_cd: 0.95,
            venturi_expansion: 1.0,
        }
    }
}

impl AnalyzerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AnalyzerConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        if config.max_plot_points == 0 {
            anyhow::bail!("max_plot_points must be at least 1");
        }
        Ok(config)
    }

    /// Config from `$RUSTY_HOTFIRE_CONFIG`, or defaults when unset or broken.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::load(Path::new(&path)) {
            Ok(config) => {
                log::info!("Loaded config from {}", Path::new(&path).display());
                config
            }
            Err(e) => {
                log::error!("{e:#}; using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fuel_density": 789.0, "max_plot_points": 500}}"#).unwrap();
        let config = AnalyzerConfig::load(file.path()).unwrap();
        assert_eq!(config.fuel_density, 789.0);
        assert_eq!(config.max_plot_points, 500);
        assert_eq!(config.oxidizer_density, 1141.0);
        assert_eq!(config.max_margin_percent, 30.0);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = AnalyzerConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn zero_plot_points_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_plot_points": 0}}"#).unwrap();
        assert!(AnalyzerConfig::load(file.path()).is_err());
    }
}
