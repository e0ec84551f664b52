//! Human and JSON rendering of command reports

use crate::error::{CliError, Result};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn render<T>(&self, report: &T) -> Result<String>
    where
        T: Serialize + fmt::Display,
    {
        match self {
            OutputFormat::Human => Ok(report.to_string()),
            OutputFormat::Json => serde_json::to_string_pretty(report).map_err(CliError::Output),
        }
    }
}

/// Print `report` to stdout in the requested format.
pub fn write_output<T>(format: OutputFormat, report: &T) -> Result<()>
where
    T: Serialize + fmt::Display,
{
    println!("{}", format.render(report)?);
    Ok(())
}
