//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. Every field has a
//! built-in default, so a missing or partial file still yields a runnable
//! configuration. Root folder priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`EJ_ROOT_FOLDER`)
//! 3. TOML `root_folder` key
//! 4. Current working directory (fallback)

use crate::indicators::{
    default_cluster_features, default_correlation_features, default_hazard_indicators,
    default_pollution_indicators, ClusterFeature, Indicator,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ROOT_FOLDER_ENV: &str = "EJ_ROOT_FOLDER";
pub const CONFIG_FILE_ENV: &str = "EJ_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Project root; input/output folders default to subfolders of it
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// `EnvFilter` directive applying `level` to both pipeline crates
    pub fn filter_directive(&self) -> String {
        format!("ej_analyze={0},ej_common={0}", self.level)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Geographic subset applied while reading the national source files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFilter {
    /// Exposure table `STATE_NAME` value
    #[serde(default = "default_state_name")]
    pub state_name: String,

    /// Vulnerability table `STATE` value
    #[serde(default = "default_state")]
    pub state: String,

    /// County names; empty keeps every county of the state
    #[serde(default = "default_counties")]
    pub counties: Vec<String>,

    /// Designation table `NYC_Region` value
    #[serde(default = "default_designation_region")]
    pub designation_region: String,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            state_name: default_state_name(),
            state: default_state(),
            counties: default_counties(),
            designation_region: default_designation_region(),
        }
    }
}

impl RegionFilter {
    pub fn includes_county(&self, county: &str) -> bool {
        self.counties.is_empty() || self.counties.iter().any(|c| c == county)
    }
}

fn default_state_name() -> String {
    "NEW YORK".to_string()
}

fn default_state() -> String {
    "New York".to_string()
}

fn default_counties() -> Vec<String> {
    [
        "New York County",
        "Kings County",
        "Bronx County",
        "Queens County",
        "Richmond County",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

fn default_designation_region() -> String {
    "NYC".to_string()
}

/// Pipeline settings: inputs, indicator sets and clustering parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input folder (defaults to `<root>/input_data`)
    #[serde(default)]
    pub input_dir: Option<PathBuf>,

    /// Output folder (defaults to `<root>/output_data`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default = "default_exposure_file")]
    pub exposure_file: String,

    #[serde(default = "default_vulnerability_file")]
    pub vulnerability_file: String,

    #[serde(default = "default_designation_file")]
    pub designation_file: String,

    #[serde(default = "default_crosswalk_file")]
    pub crosswalk_file: String,

    #[serde(default)]
    pub region: RegionFilter,

    #[serde(default = "default_pollution_indicators")]
    pub pollution_indicators: Vec<Indicator>,

    #[serde(default = "default_hazard_indicators")]
    pub hazard_indicators: Vec<Indicator>,

    #[serde(default = "default_cluster_features")]
    pub cluster_features: Vec<ClusterFeature>,

    /// Features of the indicator correlation matrix
    #[serde(default = "default_correlation_features")]
    pub correlation_features: Vec<ClusterFeature>,

    /// Number of k-means clusters
    #[serde(default = "default_clusters")]
    pub clusters: usize,

    /// k-means seed; same seed and input give the same labels
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Independent k-means++ initializations (lowest inertia kept)
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Centroid-shift convergence tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Size of the top-burden diagnostic view
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Raw vulnerability value meaning "not computed"
    #[serde(default = "default_svi_missing_sentinel")]
    pub svi_missing_sentinel: Option<f64>,
}

fn default_exposure_file() -> String {
    "EJScreen_2024_Tract_with_AS_CNMI_GU_VI.csv".to_string()
}

fn default_vulnerability_file() -> String {
    "SVI_2022_US.csv".to_string()
}

fn default_designation_file() -> String {
    "Final_Disadvantaged_Communities__DAC__2023_20250502.csv".to_string()
}

fn default_crosswalk_file() -> String {
    "nhgis_tr2010_tr2020_36.csv".to_string()
}

fn default_clusters() -> usize {
    4
}

fn default_seed() -> u64 {
    100
}

fn default_n_init() -> usize {
    10
}

fn default_max_iter() -> usize {
    300
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_top_n() -> usize {
    10
}

fn default_svi_missing_sentinel() -> Option<f64> {
    Some(-999.0)
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            output_dir: None,
            exposure_file: default_exposure_file(),
            vulnerability_file: default_vulnerability_file(),
            designation_file: default_designation_file(),
            crosswalk_file: default_crosswalk_file(),
            region: RegionFilter::default(),
            pollution_indicators: default_pollution_indicators(),
            hazard_indicators: default_hazard_indicators(),
            cluster_features: default_cluster_features(),
            correlation_features: default_correlation_features(),
            clusters: default_clusters(),
            seed: default_seed(),
            n_init: default_n_init(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            top_n: default_top_n(),
            svi_missing_sentinel: default_svi_missing_sentinel(),
        }
    }
}

impl PipelineConfig {
    /// Reject settings that would make a stage undefined
    pub fn validate(&self) -> Result<()> {
        if self.clusters == 0 {
            return Err(Error::Config("clusters must be at least 1".to_string()));
        }
        if self.n_init == 0 {
            return Err(Error::Config("n_init must be at least 1".to_string()));
        }
        if self.max_iter == 0 {
            return Err(Error::Config("max_iter must be at least 1".to_string()));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Error::Config("tolerance must be non-negative".to_string()));
        }
        if self.pollution_indicators.is_empty() {
            return Err(Error::Config("pollution_indicators is empty".to_string()));
        }
        if self.hazard_indicators.is_empty() {
            return Err(Error::Config("hazard_indicators is empty".to_string()));
        }
        if self.cluster_features.is_empty() {
            return Err(Error::Config("cluster_features is empty".to_string()));
        }
        if self.correlation_features.is_empty() {
            return Err(Error::Config("correlation_features is empty".to_string()));
        }
        for (list, features) in [
            ("cluster_features", &self.cluster_features),
            ("correlation_features", &self.correlation_features),
        ] {
            let mut seen = HashSet::new();
            for feature in features {
                if !seen.insert(*feature) {
                    return Err(Error::Config(format!(
                        "{} lists '{}' more than once",
                        list, feature
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn input_dir(&self, root: &Path) -> PathBuf {
        self.input_dir
            .clone()
            .unwrap_or_else(|| root.join("input_data"))
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| root.join("output_data"))
    }
}

/// Load TOML configuration from an explicit path
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration, falling back to defaults when no file is found
///
/// An explicitly requested file that is missing or malformed is an error;
/// an absent default file is not.
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        info!("Loading configuration from {}", path.display());
        return load_toml_config(path);
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        let path = PathBuf::from(path);
        info!("Loading configuration from {} ({})", path.display(), CONFIG_FILE_ENV);
        return load_toml_config(&path);
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_toml_config(&path)
        }
        _ => {
            warn!("No configuration file found, using built-in defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// `<config dir>/ej-analyze/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ej-analyze").join("config.toml"))
}

/// Resolve the project root folder
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: working directory
    PathBuf::from(".")
}
