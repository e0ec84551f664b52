//! Morphir functor CLI library
//!
//! Exposes the command implementations for programmatic use and testing.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use config::{FunctorConfig, LogFormat};
pub use error::CliError;
pub use output::OutputFormat;
