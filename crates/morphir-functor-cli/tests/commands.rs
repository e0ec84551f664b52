//! Command reports over the prelude

use morphir_functor::Prelude;
use morphir_functor_cli::commands::{
    check_report, contracts_report, instantiate_report, refine_report, schema_json,
};
use morphir_functor_cli::{CliError, OutputFormat};
use rstest::{fixture, rstest};

#[fixture]
fn prelude() -> Prelude {
    Prelude::load().unwrap()
}

fn calls(sources: &[&str]) -> Vec<String> {
    sources.iter().map(|s| s.to_string()).collect()
}

#[rstest]
fn test_contracts_lists_prelude(prelude: Prelude) {
    let report = contracts_report(prelude.registry(), None).unwrap();
    let names: Vec<_> = report.contracts.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"Comparable"));
    assert!(names.contains(&"IntervalIntf"));

    let single = contracts_report(prelude.registry(), Some("Comparable")).unwrap();
    assert_eq!(single.contracts.len(), 1);
    assert!(single.contracts[0].signature.contains("val compare : t -> t -> int"));

    assert!(matches!(
        contracts_report(prelude.registry(), Some("Nope")),
        Err(CliError::UnknownContract(name)) if name == "Nope"
    ));
}

#[rstest]
#[case("IntAscending", "Comparable", true, None)]
#[case("IntWithSexp", "SexpComparable", true, None)]
#[case("Three", "XInt", true, None)]
#[case("Three", "Comparable", false, Some("t"))]
#[case("IntAscending", "Sexpable", false, Some("to_sexp"))]
fn test_check(
    prelude: Prelude,
    #[case] module: &str,
    #[case] contract: &str,
    #[case] satisfied: bool,
    #[case] member: Option<&str>,
) {
    let report = check_report(&prelude, module, contract).unwrap();
    assert_eq!(report.satisfied, satisfied);
    assert_eq!(report.member.as_deref(), member);
    assert_eq!(report.error.is_some(), !satisfied);
}

#[rstest]
fn test_check_reports_bindings(prelude: Prelude) {
    let report = check_report(&prelude, "IntAscending", "Comparable").unwrap();
    assert_eq!(report.bindings.get("t").map(String::as_str), Some("int"));
}

#[rstest]
fn test_check_unknown_names(prelude: Prelude) {
    assert!(matches!(
        check_report(&prelude, "Missing", "Comparable"),
        Err(CliError::UnknownModule(_))
    ));
    assert!(matches!(
        check_report(&prelude, "Three", "Missing"),
        Err(CliError::UnknownContract(_))
    ));
}

#[rstest]
fn test_refine(prelude: Prelude) {
    let report = refine_report(
        prelude.registry(),
        "IntervalIntf",
        &calls(&["type endpoint := int"]),
    )
    .unwrap();
    assert_eq!(report.constraints, vec!["type endpoint := int"]);
    assert!(!report.signature.contains("endpoint"));
    assert!(report.signature.contains("val create : int -> int -> t"));

    let shared = refine_report(
        prelude.registry(),
        "Comparable",
        &calls(&["with type t = string"]),
    )
    .unwrap();
    assert!(shared.signature.contains("type t = string"));
}

#[rstest]
fn test_refine_rejects_bad_constraints(prelude: Prelude) {
    let err = refine_report(prelude.registry(), "Comparable", &calls(&["type u = int"])).unwrap_err();
    assert!(matches!(err, CliError::Functor(_)), "{err}");

    let err = refine_report(prelude.registry(), "Comparable", &calls(&["type t ="])).unwrap_err();
    assert!(matches!(err, CliError::Functor(_)), "{err}");
}

#[rstest]
#[case("IntAscending", &["create 4 3", "create 3 4", "is_empty $0", "is_empty $1"],
    &["Empty", "Interval (3, 4)", "true", "false"])]
#[case("IntDescending", &["create 4 3", "contains $0 3"], &["Interval (4, 3)", "true"])]
#[case("StringComparable", &["create \"apple\" \"pear\"", "contains $0 \"kiwi\""],
    &["Interval (\"apple\", \"pear\")", "true"])]
fn test_instantiate_calls(
    prelude: Prelude,
    #[case] input: &str,
    #[case] sources: &[&str],
    #[case] expected: &[&str],
) {
    let report = instantiate_report(&prelude, "MakeInterval", input, &calls(sources)).unwrap();
    assert_eq!(report.module, format!("MakeInterval({input})"));
    let results: Vec<_> = report.calls.iter().map(|c| c.result.as_str()).collect();
    assert_eq!(results, expected);
}

#[rstest]
fn test_instantiate_signature_and_json(prelude: Prelude) {
    let report =
        instantiate_report(&prelude, "MakeInterval", "IntAscending", &calls(&["create 1 2"])).unwrap();
    assert!(report.signature.contains("type endpoint = int"));

    let json = OutputFormat::Json.render(&report).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["generator"], "MakeInterval");
    assert_eq!(value["calls"][0]["call"], "create 1 2");
}

#[rstest]
fn test_instantiate_failures(prelude: Prelude) {
    let err = instantiate_report(&prelude, "MakeInterval", "Three", &[]).unwrap_err();
    assert!(matches!(err, CliError::Functor(_)), "{err}");

    let err = instantiate_report(&prelude, "MakeInterval", "IntAscending", &calls(&["is_empty $0"]))
        .unwrap_err();
    assert!(matches!(err, CliError::Internal(_)), "{err}");

    assert!(matches!(
        instantiate_report(&prelude, "Nope", "IntAscending", &[]),
        Err(CliError::UnknownGenerator(_))
    ));
}

#[test]
fn test_schema_describes_config() {
    let schema: serde_json::Value = serde_json::from_str(&schema_json().unwrap()).unwrap();
    let properties = &schema["properties"];
    assert!(properties.get("logging").is_some());
    assert!(properties.get("contracts").is_some());
}
