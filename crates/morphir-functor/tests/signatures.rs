//! Contract syntax, refinement and satisfaction tests

use morphir_functor::syntax::{parse_constraints, parse_signature};
use morphir_functor::{
    satisfies, Contract, FunctorError, InterfaceRegistry, Member, ModuleBuilder, Name, Type,
    TypeSpecification, Value,
};
use rstest::rstest;

#[rstest]
#[case("sig\n  type t\n  val compare : t -> t -> int\nend")]
#[case("sig\n  type endpoint = int\n  type t = Interval of endpoint * endpoint | Empty\n  val create : endpoint -> endpoint -> t\nend")]
#[case("sig\n  type t = Leaf | Node of t * (int -> int) * t\n  val fold : (int -> int) -> t -> list(int)\nend")]
#[case("sig\n  type t = unit -> string\n  val pair : t * (t * int) -> unit\nend")]
fn test_parse_then_print_is_stable(#[case] source: &str) {
    let parsed = Contract::parse("C", source).unwrap();
    assert_eq!(parsed.to_string(), source);
    assert_eq!(Contract::parse("C", &parsed.to_string()).unwrap(), parsed);
}

#[test]
fn test_destructive_substitution_rewrites_every_occurrence() {
    let registry = InterfaceRegistry::with_prelude().unwrap();
    let interval = registry.lookup(&Name::new("IntervalIntf")).unwrap();
    let constraints = parse_constraints("with type endpoint := int").unwrap();
    let refined = interval.constrain(&constraints).unwrap();

    assert!(refined.type_spec(&Name::new("endpoint")).is_none());
    assert!(refined.free_types().is_empty());
    let printed = refined.to_string();
    assert!(!printed.contains("endpoint"), "{printed}");
    assert!(printed.contains("val create : int -> int -> t"));
    assert!(printed.contains("val contains : t -> int -> bool"));
}

#[test]
fn test_sharing_constraint_keeps_member() {
    let registry = InterfaceRegistry::with_prelude().unwrap();
    let interval = registry.lookup(&Name::new("IntervalIntf")).unwrap();
    let refined = interval.with_type("endpoint", Type::int()).unwrap();
    assert_eq!(
        refined.type_spec(&Name::new("endpoint")),
        Some(&TypeSpecification::Manifest(Type::int()))
    );
    assert!(refined.to_string().contains("val create : endpoint -> endpoint -> t"));
}

#[test]
fn test_include_without_substitution_is_ambiguous() {
    let registry = InterfaceRegistry::with_prelude().unwrap();
    let err = registry
        .parse("Both", "include Comparable include Sexpable")
        .unwrap_err();
    assert!(matches!(err, FunctorError::AmbiguousMember { member } if member == "t"));

    let merged = registry
        .parse(
            "Both",
            "include Comparable include Sexpable with type t := t",
        )
        .unwrap();
    assert_eq!(merged.types().len(), 1);
}

#[test]
fn test_identical_manifest_members_merge() {
    let registry = InterfaceRegistry::with_prelude().unwrap();
    let merged = registry
        .parse(
            "IntBoth",
            "include Comparable with type t = int
             include Sexpable with type t = int",
        )
        .unwrap();
    assert_eq!(
        merged.type_spec(&Name::new("t")),
        Some(&TypeSpecification::Manifest(Type::int()))
    );
}

#[test]
fn test_syntax_error_reports_offset() {
    let err = parse_signature(Name::new("C"), "type t\nval x t", &|_| None).unwrap_err();
    match err {
        FunctorError::Syntax { offset, message } => {
            assert_eq!(offset, 13);
            assert_eq!(message, "expected `:`, found `t`");
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn int_module(with_zero: bool) -> morphir_functor::Module {
    let mut builder = ModuleBuilder::new("Ints");
    builder.alias("t", Type::int()).unwrap();
    builder
        .value(
            "compare",
            Type::arrows(vec![Type::local("t"), Type::local("t")], Type::int()),
            Value::function("compare", 2, |_| Ok(Value::int(0))),
        )
        .unwrap();
    if with_zero {
        builder.value("zero", Type::local("t"), Value::int(0)).unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn test_width_subtyping() {
    let comparable = Contract::parse("Comparable", "type t val compare : t -> t -> int").unwrap();
    let satisfaction = satisfies(&int_module(true), &comparable).unwrap();
    assert_eq!(satisfaction.env().local(&Name::new("t")), Some(&Type::int()));
}

#[rstest]
#[case("type t val zero : t", "zero")]
#[case("type u", "u")]
fn test_missing_member(#[case] source: &str, #[case] member: &str) {
    let contract = Contract::parse("C", source).unwrap();
    let err = satisfies(&int_module(false), &contract).unwrap_err();
    assert!(matches!(err, FunctorError::MissingMember { member: m } if m == member));
}

#[rstest]
#[case("type t = string", "t")]
#[case("type t val compare : t -> int", "compare")]
#[case("type t = A | B", "t")]
fn test_type_mismatch(#[case] source: &str, #[case] member: &str) {
    let contract = Contract::parse("C", source).unwrap();
    let err = satisfies(&int_module(false), &contract).unwrap_err();
    assert!(
        matches!(&err, FunctorError::TypeMismatch { member: m, .. } if *m == member),
        "unexpected error: {err}"
    );
}

#[test]
fn test_define_checks_local_order() {
    let mut registry = InterfaceRegistry::new();
    let err = registry
        .define(
            "Backwards",
            [
                ("make", Member::value(Type::function(Type::int(), Type::local("t")))),
                ("t", Member::abstract_type()),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, FunctorError::UnboundType { name } if name == "t"));
}
