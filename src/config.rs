//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/sponsor-tree/sponsor-tree.toml`
//! 3. Local config: `<project_dir>/.sponsor-tree.toml`
//! 4. Environment variables: `SPONSOR_TREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::WeightingPolicy;
use crate::application::ApplicationError;
use crate::domain::Topology;
use crate::util::path::{expand_path, resolve_against};

const APP_NAME: &str = "sponsor-tree";
const LOCAL_CONFIG_FILE: &str = ".sponsor-tree.toml";

/// Commission settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CommissionSettings {
    /// Exponent of the automatic upline weighting `(k - i)^exponent`
    pub exponent: f64,
    /// Nearest-first fractions used by `distribute` when none are given
    pub default_percentages: Vec<f64>,
}

impl Default for CommissionSettings {
    fn default() -> Self {
        Self {
            exponent: WeightingPolicy::default().exponent,
            default_percentages: vec![0.10, 0.05],
        }
    }
}

impl CommissionSettings {
    pub fn policy(&self) -> WeightingPolicy {
        WeightingPolicy::new(self.exponent)
    }
}

/// Raw commission settings: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCommissionSettings {
    pub exponent: Option<f64>,
    pub default_percentages: Option<Vec<f64>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub topology: Option<Topology>,
    pub commission: RawCommissionSettings,
}

/// Unified configuration for sponsor-tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Member file (default: `<data dir>/sponsor-tree/members.tsv`)
    pub data_file: PathBuf,
    /// `unbounded` or `binary`
    pub topology: Topology,
    pub commission: CommissionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            topology: Topology::default(),
            commission: CommissionSettings::default(),
        }
    }
}

fn default_data_file() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("members.tsv"))
        .unwrap_or_else(|| PathBuf::from("~/.sponsor-tree/members.tsv"))
}

/// Get the XDG config directory for sponsor-tree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(format!("{APP_NAME}.toml")))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.data_file = expand_path(&self.data_file);
    }

    /// Overlay wins wherever it specifies a value. Arrays are replaced, not merged.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_file: overlay
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            topology: overlay.topology.unwrap_or(self.topology),
            commission: CommissionSettings {
                exponent: overlay
                    .commission
                    .exponent
                    .unwrap_or(self.commission.exponent),
                default_percentages: overlay
                    .commission
                    .default_percentages
                    .clone()
                    .unwrap_or_else(|| self.commission.default_percentages.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a `.sponsor-tree.toml`
    ///
    /// A relative `data_file` from the local config is resolved against
    /// `project_dir`.
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let mut raw = load_raw_settings(&local_path)?;
                raw.data_file = raw
                    .data_file
                    .map(|p| resolve_against(dir, &expand_path(&p)));
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply SPONSOR_TREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`: `SPONSOR_TREE_COMMISSION__EXPONENT=0.7`.
    /// Lists are comma separated.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("SPONSOR_TREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("commission.default_percentages"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("topology") {
            settings.topology = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_float("commission.exponent") {
            settings.commission.exponent = val;
        }
        if let Ok(val) = config.get::<Vec<f64>>("commission.default_percentages") {
            settings.commission.default_percentages = val;
        }

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ApplicationError> {
        if !self.commission.exponent.is_finite() {
            return Err(ApplicationError::Config {
                message: format!(
                    "commission.exponent must be a finite number, got {}",
                    self.commission.exponent
                ),
            });
        }
        if let Some(bad) = self
            .commission
            .default_percentages
            .iter()
            .find(|p| !p.is_finite() || **p < 0.0)
        {
            return Err(ApplicationError::Config {
                message: format!("commission.default_percentages: invalid entry {}", bad),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# sponsor-tree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/sponsor-tree/sponsor-tree.toml
#   Local:  <project_dir>/.sponsor-tree.toml
#   Env:    SPONSOR_TREE_* environment variables
#           (nested keys with "__", e.g. SPONSOR_TREE_COMMISSION__EXPONENT)

# Member file; ~ and $VAR are expanded
# data_file = "~/.local/share/sponsor-tree/members.tsv"

# "unbounded" (any number of direct recruits) or "binary" (at most two)
# topology = "unbounded"

[commission]
# Upline weighting: the member at root-first position i of k receives
# (k - i)^exponent of the pool, normalized. 0 splits equally.
# exponent = 0.5

# Fractions of the full sale for `distribute`, nearest sponsor first
# default_percentages = [0.10, 0.05]
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
