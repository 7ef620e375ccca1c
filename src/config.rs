use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::constants;
use crate::error::{ImporterError, Result};
use crate::types::Direction;

/// Runtime configuration, read from TOML; every field has a default
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Normalized group names whose rows are skipped entirely
    pub excluded_groups: Vec<String>,
    /// CIDR that makes a port-less egress row an all-traffic rule
    pub all_traffic_cidr: String,
    pub import: ImportConfig,
    pub resource_types: ResourceTypes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Command each import line starts with
    pub command: String,
    pub flavor: ScriptFlavor,
}

/// Shell the import script is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScriptFlavor {
    /// Windows batch file (`@echo off` ... `pause`)
    Batch,
    /// POSIX shell script
    Shell,
}

/// Terraform resource type names per entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceTypes {
    pub group: String,
    pub ingress: String,
    pub egress: String,
}

impl ResourceTypes {
    pub fn for_direction(&self, direction: Direction) -> &str {
        match direction {
            Direction::Ingress => &self.ingress,
            Direction::Egress => &self.egress,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            excluded_groups: Vec::new(),
            all_traffic_cidr: constants::UNIVERSAL_CIDR.to_string(),
            import: ImportConfig::default(),
            resource_types: ResourceTypes::default(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            command: constants::DEFAULT_IMPORT_COMMAND.to_string(),
            flavor: ScriptFlavor::Batch,
        }
    }
}

impl Default for ResourceTypes {
    fn default() -> Self {
        Self {
            group: constants::GROUP_RESOURCE_TYPE.to_string(),
            ingress: constants::INGRESS_RESOURCE_TYPE.to_string(),
            egress: constants::EGRESS_RESOURCE_TYPE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `sg_importer.toml` in the
    /// working directory is used when present, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    debug!("No config file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImporterError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.import.command.trim().is_empty() {
            return Err(ImporterError::Config("import.command must not be empty".to_string()));
        }
        for (field, value) in [
            ("resource_types.group", &self.resource_types.group),
            ("resource_types.ingress", &self.resource_types.ingress),
            ("resource_types.egress", &self.resource_types.egress),
        ] {
            if value.trim().is_empty() {
                return Err(ImporterError::Config(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    /// Whether rows of this normalized group name are skipped
    pub fn is_excluded(&self, group_name: &str) -> bool {
        self.excluded_groups.iter().any(|g| g == group_name)
    }
}
