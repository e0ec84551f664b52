use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use morphir_functor_cli::commands::{
    run_check, run_contracts, run_instantiate, run_refine, run_schema,
};
use morphir_functor_cli::{logging, FunctorConfig, LogFormat, OutputFormat};
use starbase::{App, AppResult, AppSession};
use std::path::PathBuf;
use std::sync::Arc;

/// Check, refine and instantiate Morphir module contracts
#[derive(Parser)]
#[command(name = "morphir-functor")]
#[command(about = "Signatures, generators and generative types for Morphir modules", long_about = None)]
#[command(version)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Print help
    #[arg(short, long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Print version
    #[arg(short = 'V', long, action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Path to morphir-functor.toml or morphir-functor.json
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log line format, overriding the configuration
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Subcommand)]
enum Commands {
    /// List registered contracts
    Contracts {
        /// Print only this contract
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Check a module against a contract
    Check {
        /// Prelude module, e.g. IntAscending
        #[arg(short, long)]
        module: String,
        /// Contract name, e.g. Comparable
        #[arg(short, long)]
        contract: String,
    },
    /// Refine a contract with `with type` constraints
    Refine {
        #[arg(short, long)]
        contract: String,
        /// Constraint such as "type t := int"; repeatable
        #[arg(short, long = "with", value_name = "CONSTRAINT", required = true)]
        with: Vec<String>,
    },
    /// Apply a generator to a module
    Instantiate {
        /// Generator name, e.g. MakeInterval
        #[arg(short, long)]
        generator: String,
        /// Argument module, e.g. IntDescending
        #[arg(short, long)]
        input: String,
        /// Operation to evaluate on the result, e.g. "create 3 4"; repeatable
        #[arg(long = "call", value_name = "CALL")]
        calls: Vec<String>,
    },
    /// Print the JSON schema of the configuration file
    Schema {
        /// Write the schema to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone)]
struct FunctorSession {
    command: Commands,
    config: Arc<FunctorConfig>,
    format: OutputFormat,
}

#[async_trait::async_trait]
impl AppSession for FunctorSession {
    async fn execute(&mut self) -> AppResult {
        let format = self.format;
        let prelude = || self.config.prelude();
        match &self.command {
            Commands::Contracts { name } => run_contracts(prelude()?.registry(), name.clone(), format),
            Commands::Check { module, contract } => {
                run_check(&prelude()?, module.clone(), contract.clone(), format)
            }
            Commands::Refine { contract, with } => {
                run_refine(prelude()?.registry(), contract.clone(), with.clone(), format)
            }
            Commands::Instantiate {
                generator,
                input,
                calls,
            } => run_instantiate(
                &prelude()?,
                generator.clone(),
                input.clone(),
                calls.clone(),
                format,
            ),
            Commands::Schema { output } => run_schema(output.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> starbase::MainResult {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().into_diagnostic()?;
    let config = FunctorConfig::resolve(cli.config.as_deref(), &cwd)?;
    let _guard = logging::init(&config.logging, cli.log_format)
        .map_err(|err| miette::miette!("{err:#}"))?;

    let session = FunctorSession {
        command: cli.command,
        config: Arc::new(config),
        format: OutputFormat::from_flag(cli.json),
    };

    let exit_code = App::default()
        .run(
            session,
            |mut session| async move { session.execute().await },
        )
        .await?;

    Ok(std::process::ExitCode::from(exit_code))
}
