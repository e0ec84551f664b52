//! Check a module against a contract

use crate::error::{CliError, Result};
use crate::output::{write_output, OutputFormat};
use indexmap::IndexMap;
use morphir_functor::{satisfies, Name, Prelude};
use owo_colors::OwoColorize;
use serde::Serialize;
use starbase::AppResult;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub module: String,
    pub contract: String,
    pub satisfied: bool,
    /// Contract type members and the module types they were matched with
    pub bindings: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.satisfied {
            write!(
                f,
                "{} {} satisfies {}",
                "ok".green().bold(),
                self.module.bold(),
                self.contract.bold()
            )?;
            for (name, ty) in &self.bindings {
                write!(f, "\n  type {name} = {ty}")?;
            }
            Ok(())
        } else {
            write!(
                f,
                "{} {} does not satisfy {}",
                "error".red().bold(),
                self.module.bold(),
                self.contract.bold()
            )?;
            if let Some(error) = &self.error {
                write!(f, ": {error}")?;
            }
            Ok(())
        }
    }
}

/// Run the satisfaction check. A failed check is a report, not an error.
pub fn check_report(prelude: &Prelude, module: &str, contract: &str) -> Result<CheckReport> {
    let target = prelude
        .module(module)
        .ok_or_else(|| CliError::UnknownModule(module.to_string()))?;
    let spec = prelude
        .registry()
        .lookup(&Name::new(contract))
        .ok_or_else(|| CliError::UnknownContract(contract.to_string()))?;

    let mut report = CheckReport {
        module: module.to_string(),
        contract: contract.to_string(),
        satisfied: false,
        bindings: IndexMap::new(),
        error: None,
        member: None,
    };
    match satisfies(target, spec) {
        Ok(satisfaction) => {
            report.satisfied = true;
            report.bindings = satisfaction
                .env()
                .locals()
                .map(|(name, ty)| (name.to_string(), ty.to_string()))
                .collect();
        }
        Err(err) => {
            report.member = err.member().map(|m| m.to_string());
            report.error = Some(err.to_string());
        }
    }
    Ok(report)
}

pub fn run_check(prelude: &Prelude, module: String, contract: String, format: OutputFormat) -> AppResult {
    let report = check_report(prelude, &module, &contract)?;
    write_output(format, &report)?;
    Ok(if report.satisfied { None } else { Some(1) })
}
