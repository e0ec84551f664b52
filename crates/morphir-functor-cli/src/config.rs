//! Configuration for the `morphir-functor` CLI.
//!
//! Read from `morphir-functor.toml` or `morphir-functor.json`; the format is
//! chosen by file extension.

use crate::error::{CliError, Result};
use morphir_functor::Prelude;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TOML_FILE_NAME: &str = "morphir-functor.toml";
pub const JSON_FILE_NAME: &str = "morphir-functor.json";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FunctorConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSection,

    /// Contracts defined on top of the prelude, in order
    #[serde(default)]
    pub contracts: Vec<ContractSection>,
}

/// [logging] section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LoggingSection {
    /// Filter directive used when neither `MORPHIR_FUNCTOR_LOG` nor `RUST_LOG` is set
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// [[contracts]] entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ContractSection {
    pub name: String,
    /// Signature text, e.g. `type t val show : t -> string`
    pub source: String,
}

impl FunctorConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            return serde_json::from_str(&content).map_err(|source| CliError::Json {
                path: path.to_path_buf(),
                source,
            });
        }

        toml::from_str(&content).map_err(|source| CliError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, otherwise the nearest discovered file, otherwise defaults.
    pub fn resolve(path: Option<&Path>, start_dir: &Path) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(|| discover_config(start_dir)) {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// The prelude with the configured contracts defined into its registry.
    pub fn prelude(&self) -> Result<Prelude> {
        let mut prelude = Prelude::load()?;
        for contract in &self.contracts {
            prelude
                .registry_mut()
                .define_parsed(contract.name.as_str(), &contract.source)
                .map_err(|source| CliError::ConfiguredContract {
                    name: contract.name.clone(),
                    source,
                })?;
        }
        Ok(prelude)
    }
}

/// Walk up from `start_dir` looking for `morphir-functor.toml`, then `morphir-functor.json`.
pub fn discover_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir.ancestors().find_map(|dir| {
        [TOML_FILE_NAME, JSON_FILE_NAME]
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}
