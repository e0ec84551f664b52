//! Apply `with type` constraints to a contract

use crate::error::{CliError, Result};
use crate::output::{write_output, OutputFormat};
use morphir_functor::syntax::parse_constraints;
use morphir_functor::{InterfaceRegistry, Name};
use serde::Serialize;
use starbase::AppResult;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct RefineReport {
    pub contract: String,
    pub constraints: Vec<String>,
    pub signature: String,
}

impl fmt::Display for RefineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contract)?;
        for constraint in &self.constraints {
            write!(f, " with {constraint}")?;
        }
        write!(f, "\n{}", self.signature)
    }
}

/// Refine `contract` by every clause of `constraints`, left to right.
///
/// Each entry may hold several clauses joined with `and`.
pub fn refine_report(
    registry: &InterfaceRegistry,
    contract: &str,
    constraints: &[String],
) -> Result<RefineReport> {
    let base = registry
        .lookup(&Name::new(contract))
        .ok_or_else(|| CliError::UnknownContract(contract.to_string()))?;

    let mut parsed = Vec::new();
    for source in constraints {
        parsed.extend(parse_constraints(source)?);
    }
    let refined = base.constrain(&parsed)?;

    Ok(RefineReport {
        contract: contract.to_string(),
        constraints: parsed.iter().map(ToString::to_string).collect(),
        signature: refined.to_string(),
    })
}

pub fn run_refine(
    registry: &InterfaceRegistry,
    contract: String,
    constraints: Vec<String>,
    format: OutputFormat,
) -> AppResult {
    let report = refine_report(registry, &contract, &constraints)?;
    write_output(format, &report)?;
    Ok(None)
}
