//! CLI error types

use miette::Diagnostic;
use morphir_functor::FunctorError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(code(morphir_functor::functor))]
    Functor(#[from] FunctorError),

    #[error("failed to access {}", path.display())]
    #[diagnostic(code(morphir_functor::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}", path.display())]
    #[diagnostic(code(morphir_functor::config::toml))]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {}", path.display())]
    #[diagnostic(code(morphir_functor::config::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("contract `{name}` in configuration is invalid")]
    #[diagnostic(
        code(morphir_functor::config::contract),
        help("check the `source` of this `[[contracts]]` entry")
    )]
    ConfiguredContract {
        name: String,
        #[source]
        source: FunctorError,
    },

    #[error("unknown contract `{0}`")]
    #[diagnostic(code(morphir_functor::unknown), help("run `morphir-functor contracts` to list them"))]
    UnknownContract(String),

    #[error("unknown module `{0}`")]
    #[diagnostic(code(morphir_functor::unknown))]
    UnknownModule(String),

    #[error("unknown generator `{0}`")]
    #[diagnostic(code(morphir_functor::unknown))]
    UnknownGenerator(String),

    #[error("failed to serialize output")]
    #[diagnostic(code(morphir_functor::output))]
    Output(#[source] serde_json::Error),

    #[error("{0:#}")]
    #[diagnostic(code(morphir_functor::internal))]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Internal(err)
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
