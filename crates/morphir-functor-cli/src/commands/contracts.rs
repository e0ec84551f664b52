//! List the registered contracts

use crate::error::{CliError, Result};
use crate::output::{write_output, OutputFormat};
use morphir_functor::{Contract, InterfaceRegistry, Name};
use owo_colors::OwoColorize;
use serde::Serialize;
use starbase::AppResult;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct ContractEntry {
    pub id: String,
    pub name: String,
    pub signature: String,
}

impl ContractEntry {
    fn new(id: impl fmt::Display, contract: &Contract) -> Self {
        Self {
            id: id.to_string(),
            name: contract.name().to_string(),
            signature: contract.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ContractsReport {
    pub contracts: Vec<ContractEntry>,
}

impl fmt::Display for ContractsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.contracts.iter().enumerate() {
            if i > 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{} [{}]\n{}", entry.name.bold(), entry.id.dimmed(), entry.signature)?;
        }
        Ok(())
    }
}

/// Every contract, or only `name` when given.
pub fn contracts_report(registry: &InterfaceRegistry, name: Option<&str>) -> Result<ContractsReport> {
    let contracts = match name {
        Some(name) => {
            let key = Name::new(name);
            let (id, contract) = registry
                .id_of(&key)
                .zip(registry.lookup(&key))
                .ok_or_else(|| CliError::UnknownContract(name.to_string()))?;
            vec![ContractEntry::new(id, contract)]
        }
        None => registry
            .iter()
            .map(|(id, contract)| ContractEntry::new(id, contract))
            .collect(),
    };
    Ok(ContractsReport { contracts })
}

pub fn run_contracts(
    registry: &InterfaceRegistry,
    name: Option<String>,
    format: OutputFormat,
) -> AppResult {
    let report = contracts_report(registry, name.as_deref())?;
    write_output(format, &report)?;
    Ok(None)
}
