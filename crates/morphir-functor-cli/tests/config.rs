//! Configuration loading and discovery

use morphir_functor_cli::config::{discover_config, JSON_FILE_NAME, TOML_FILE_NAME};
use morphir_functor_cli::{CliError, FunctorConfig, LogFormat};

const TOML_CONFIG: &str = r#"
[logging]
level = "morphir_functor=debug"
format = "json"

[[contracts]]
name = "Showable"
source = """
type t
val show : t -> string
"""

[[contracts]]
name = "ShowComparable"
source = "include Comparable include Showable with type t := t"
"#;

const JSON_CONFIG: &str = r#"{
    "logging": { "level": "info" },
    "contracts": [
        { "name": "Zero", "source": "type t val zero : t" }
    ]
}"#;

#[test]
fn test_load_toml() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(TOML_FILE_NAME);
    std::fs::write(&path, TOML_CONFIG)?;

    let config = FunctorConfig::load(&path)?;
    assert_eq!(config.logging.level, "morphir_functor=debug");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.contracts.len(), 2);

    let prelude = config.prelude()?;
    let combined = prelude
        .registry()
        .lookup(&"ShowComparable".into())
        .expect("configured contract");
    assert_eq!(combined.types().len(), 1);
    assert_eq!(combined.values().len(), 2);
    Ok(())
}

#[test]
fn test_load_json() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(JSON_FILE_NAME);
    std::fs::write(&path, JSON_CONFIG)?;

    let config = FunctorConfig::load(&path)?;
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.contracts[0].name, "Zero");
    Ok(())
}

#[test]
fn test_invalid_files_name_the_path() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let toml_path = dir.path().join(TOML_FILE_NAME);
    std::fs::write(&toml_path, "[logging\nlevel = 1")?;
    assert!(matches!(
        FunctorConfig::load(&toml_path),
        Err(CliError::Toml { path, .. }) if path == toml_path
    ));

    let json_path = dir.path().join(JSON_FILE_NAME);
    std::fs::write(&json_path, "{ \"contracts\": 3 }")?;
    assert!(matches!(
        FunctorConfig::load(&json_path),
        Err(CliError::Json { .. })
    ));

    let missing = dir.path().join("absent.toml");
    assert!(matches!(FunctorConfig::load(&missing), Err(CliError::Io { .. })));
    Ok(())
}

#[test]
fn test_discovery_walks_up_and_prefers_toml() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = dir.path().join("a").join("b");
    std::fs::create_dir_all(&nested)?;
    assert_eq!(discover_config(&nested), None);

    std::fs::write(dir.path().join(JSON_FILE_NAME), JSON_CONFIG)?;
    assert_eq!(discover_config(&nested), Some(dir.path().join(JSON_FILE_NAME)));

    std::fs::write(dir.path().join(TOML_FILE_NAME), TOML_CONFIG)?;
    assert_eq!(discover_config(&nested), Some(dir.path().join(TOML_FILE_NAME)));

    let config = FunctorConfig::resolve(None, &nested)?;
    assert_eq!(config.contracts.len(), 2);
    Ok(())
}

#[test]
fn test_explicit_path_wins_over_discovery() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join(TOML_FILE_NAME), TOML_CONFIG)?;
    let explicit = dir.path().join("other.json");
    std::fs::write(&explicit, JSON_CONFIG)?;

    let config = FunctorConfig::resolve(Some(&explicit), dir.path())?;
    assert_eq!(config.contracts[0].name, "Zero");
    Ok(())
}
