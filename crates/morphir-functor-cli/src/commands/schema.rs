//! JSON schema of the configuration file

use crate::config::FunctorConfig;
use crate::error::{CliError, Result};
use schemars::schema_for;
use starbase::AppResult;
use std::path::PathBuf;
use tracing::info;

pub fn schema_json() -> Result<String> {
    serde_json::to_string_pretty(&schema_for!(FunctorConfig)).map_err(CliError::Output)
}

/// Print the schema, or write it to `output`.
pub fn run_schema(output: Option<PathBuf>) -> AppResult {
    let json = schema_json()?;
    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "wrote configuration schema");
        }
        None => println!("{json}"),
    }
    Ok(None)
}
