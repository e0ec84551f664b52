//! Ready-made contracts, modules and generators.
//!
//! The centrepiece is `MakeInterval`, a generator from comparable endpoints
//! to intervals over them, in four flavours:
//!
//! | Generator              | Output                                             |
//! |------------------------|----------------------------------------------------|
//! | `MakeInterval`         | `IntervalIntf with type endpoint = Endpoint.t`     |
//! | `MakeIntervalAbstract` | `IntervalIntf` (endpoints stay abstract)           |
//! | `MakeIntervalExposed`  | visible `Interval`/`Empty` constructors            |
//! | `MakeIntervalSexp`     | `IntervalIntf` and `Sexpable` merged over one `t`  |

use crate::contract::{ConstructorSpecification, Contract};
use crate::error::{FunctorError, Result};
use crate::generator::Generator;
use crate::module::{Module, ModuleBuilder, VariantConstructors};
use crate::naming::Name;
use crate::registry::InterfaceRegistry;
use crate::types::Type;
use crate::value::Value;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::sync::Arc;

pub const COMPARABLE: &str = "
type t
val compare : t -> t -> int
";

pub const SEXPABLE: &str = "
type t
val to_sexp : t -> string
";

pub const INTERVAL_INTF: &str = "
type t
type endpoint
val create : endpoint -> endpoint -> t
val is_empty : t -> bool
val contains : t -> endpoint -> bool
val intersect : t -> t -> t
";

pub const XINT: &str = "
val x : int
";

pub const SEXP_COMPARABLE: &str = "
type t
include Comparable with type t := t
include Sexpable with type t := t
";

const INTERVAL_SHARED: &str = "include IntervalIntf with type endpoint = Endpoint.t";

const INTERVAL_EXPOSED: &str = "
type endpoint = Endpoint.t
type t = Interval of endpoint * endpoint | Empty
val create : endpoint -> endpoint -> t
val is_empty : t -> bool
val contains : t -> endpoint -> bool
val intersect : t -> t -> t
";

const INTERVAL_SEXP: &str = "
type t
include IntervalIntf with type t := t and type endpoint := Endpoint.t
include Sexpable with type t := t
";

/// Define the prelude contracts in `registry`.
pub fn define_contracts(registry: &mut InterfaceRegistry) -> Result<()> {
    registry.define_parsed("Comparable", COMPARABLE)?;
    registry.define_parsed("Sexpable", SEXPABLE)?;
    registry.define_parsed("IntervalIntf", INTERVAL_INTF)?;
    registry.define_parsed("XInt", XINT)?;
    registry.define_parsed("SexpComparable", SEXP_COMPARABLE)?;
    Ok(())
}

fn contract(registry: &InterfaceRegistry, name: &str) -> Result<Contract> {
    registry
        .lookup(&Name::new(name))
        .map(|c| Contract::clone(c))
        .ok_or(FunctorError::MissingMember {
            member: Name::new(name),
        })
}

fn int_arg(op: &str, value: &Value) -> Result<i64> {
    value
        .as_int()
        .ok_or_else(|| FunctorError::Evaluation(format!("{op}: expected an int, got {}", value.kind())))
}

fn comparable_module(
    label: &str,
    t: Type,
    compare: impl Fn(&Value, &Value) -> Result<Ordering> + Send + Sync + 'static,
) -> Result<ModuleBuilder> {
    let mut builder = ModuleBuilder::new(label);
    builder.alias("t", t)?.value(
        "compare",
        Type::arrows(vec![Type::local("t"), Type::local("t")], Type::int()),
        Value::function("compare", 2, move |args| {
            let ordering = compare(&args[0], &args[1])?;
            Ok(Value::int(ordering as i64))
        }),
    )?;
    Ok(builder)
}

fn ascending(a: &Value, b: &Value) -> Result<Ordering> {
    Ok(int_arg("compare", a)?.cmp(&int_arg("compare", b)?))
}

/// `IntAscending`: integers in their usual order.
pub fn int_ascending() -> Result<Module> {
    comparable_module("IntAscending", Type::int(), ascending)?.build()
}

/// `IntDescending`: integers in reverse order.
pub fn int_descending() -> Result<Module> {
    comparable_module("IntDescending", Type::int(), |a, b| {
        Ok(ascending(a, b)?.reverse())
    })?
    .build()
}

/// `StringComparable`: strings in lexicographic order.
pub fn string_comparable() -> Result<Module> {
    comparable_module("StringComparable", Type::string(), |a, b| {
        match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => Ok(a.cmp(b)),
            _ => Err(FunctorError::Evaluation("compare: expected strings".into())),
        }
    })?
    .build()
}

/// `IntWithSexp`: ascending integers that print themselves.
pub fn int_with_sexp() -> Result<Module> {
    let mut builder = comparable_module("IntWithSexp", Type::int(), ascending)?;
    builder.value(
        "to_sexp",
        Type::function(Type::local("t"), Type::string()),
        Value::function("to_sexp", 1, |args| {
            Ok(Value::string(int_arg("to_sexp", &args[0])?.to_string()))
        }),
    )?;
    builder.build()
}

/// `Three`: a module with `x = 3`.
pub fn three() -> Result<Module> {
    let mut builder = ModuleBuilder::new("Three");
    builder.value("x", Type::int(), Value::int(3))?;
    builder.build()
}

/// `Increment : XInt -> XInt` adds one to `x`.
pub fn increment(registry: &InterfaceRegistry) -> Result<Generator> {
    let xint = contract(registry, "XInt")?;
    Generator::new("Increment", "M", xint.clone(), |m, out| {
        let x = int_arg("x", &m.value("x")?)?;
        let next = x
            .checked_add(1)
            .ok_or_else(|| FunctorError::Evaluation(format!("Increment: x = {x} overflows")))?;
        out.value("x", Type::int(), Value::int(next))?;
        Ok(())
    })
    .with_output(xint)
}

/// Interval operations over an endpoint module. Interval values keep their
/// endpoints in the endpoint module's representation.
struct Intervals {
    constructors: VariantConstructors,
    compare: Value,
}

impl Intervals {
    fn compare(&self, a: &Value, b: &Value) -> Result<i64> {
        int_arg("compare", &self.compare.apply(&[a.clone(), b.clone()])?)
    }

    fn empty(&self) -> Result<Value> {
        self.constructors.make("Empty", vec![])
    }

    fn create(&self, low: Value, high: Value) -> Result<Value> {
        if self.compare(&low, &high)? > 0 {
            self.empty()
        } else {
            self.constructors.make("Interval", vec![low, high])
        }
    }

    fn bounds<'v>(&self, op: &str, value: &'v Value) -> Result<Option<(&'v Value, &'v Value)>> {
        match value.as_variant() {
            Some((ctor, [low, high])) if ctor == "Interval" => Ok(Some((low, high))),
            Some((ctor, [])) if ctor == "Empty" => Ok(None),
            _ => Err(FunctorError::Evaluation(format!(
                "{op}: expected an interval, got {}",
                value.kind()
            ))),
        }
    }

    fn contains(&self, interval: &Value, x: &Value) -> Result<bool> {
        Ok(match self.bounds("contains", interval)? {
            None => false,
            Some((low, high)) => self.compare(x, low)? >= 0 && self.compare(x, high)? <= 0,
        })
    }

    fn intersect(&self, a: &Value, b: &Value) -> Result<Value> {
        match (self.bounds("intersect", a)?, self.bounds("intersect", b)?) {
            (Some((l1, h1)), Some((l2, h2))) => {
                let low = if self.compare(l1, l2)? >= 0 { l1 } else { l2 };
                let high = if self.compare(h1, h2)? <= 0 { h1 } else { h2 };
                self.create(low.clone(), high.clone())
            }
            _ => self.empty(),
        }
    }
}

/// The body shared by every `MakeInterval` flavour.
fn interval_body(endpoint: &Module, out: &mut ModuleBuilder, with_sexp: bool) -> Result<()> {
    let endpoint_t = Type::local("endpoint");
    let t = Type::local("t");
    out.alias("endpoint", Type::projection("Endpoint", "t"))?;
    let constructors = out.variant(
        "t",
        vec![
            ConstructorSpecification::new("Interval", vec![endpoint_t.clone(), endpoint_t.clone()]),
            ConstructorSpecification::new("Empty", vec![]),
        ],
    )?;
    let ops = Arc::new(Intervals {
        constructors,
        compare: endpoint.value("compare")?,
    });

    let create = {
        let ops = ops.clone();
        Value::function("create", 2, move |args| ops.create(args[0].clone(), args[1].clone()))
    };
    let is_empty = {
        let ops = ops.clone();
        Value::function("is_empty", 1, move |args| {
            Ok(Value::bool(ops.bounds("is_empty", &args[0])?.is_none()))
        })
    };
    let contains = {
        let ops = ops.clone();
        Value::function("contains", 2, move |args| {
            Ok(Value::bool(ops.contains(&args[0], &args[1])?))
        })
    };
    let intersect = {
        let ops = ops.clone();
        Value::function("intersect", 2, move |args| ops.intersect(&args[0], &args[1]))
    };

    out.value(
        "create",
        Type::arrows(vec![endpoint_t.clone(), endpoint_t.clone()], t.clone()),
        create,
    )?
    .value("is_empty", Type::function(t.clone(), Type::bool()), is_empty)?
    .value(
        "contains",
        Type::arrows(vec![t.clone(), endpoint_t], Type::bool()),
        contains,
    )?
    .value(
        "intersect",
        Type::arrows(vec![t.clone(), t.clone()], t.clone()),
        intersect,
    )?;

    if with_sexp {
        let endpoint_sexp = endpoint.value("to_sexp")?;
        let to_sexp = Value::function("to_sexp", 1, move |args| {
            let text = match ops.bounds("to_sexp", &args[0])? {
                None => "Empty".to_string(),
                Some((low, high)) => {
                    let show = |v: &Value| -> Result<String> {
                        let shown = endpoint_sexp.apply(&[v.clone()])?;
                        shown.as_str().map(str::to_string).ok_or_else(|| {
                            FunctorError::Evaluation(format!(
                                "to_sexp: endpoint rendered as {}, expected a string",
                                shown.kind()
                            ))
                        })
                    };
                    format!("(Interval ({} {}))", show(low)?, show(high)?)
                }
            };
            Ok(Value::string(text))
        });
        out.value("to_sexp", Type::function(t, Type::string()), to_sexp)?;
    }
    Ok(())
}

/// `MakeInterval (Endpoint : Comparable) : IntervalIntf with type endpoint = Endpoint.t`
pub fn make_interval(registry: &InterfaceRegistry) -> Result<Generator> {
    let output = registry.parse("IntervalIntf", INTERVAL_SHARED)?;
    Generator::new("MakeInterval", "Endpoint", contract(registry, "Comparable")?, |e, out| {
        interval_body(e, out, false)
    })
    .with_output(output)
}

/// `MakeIntervalAbstract (Endpoint : Comparable) : IntervalIntf`. Nothing
/// relates `endpoint` to the argument, so no interval can be created.
pub fn make_interval_abstract(registry: &InterfaceRegistry) -> Result<Generator> {
    let output = contract(registry, "IntervalIntf")?;
    Generator::new(
        "MakeIntervalAbstract",
        "Endpoint",
        contract(registry, "Comparable")?,
        |e, out| interval_body(e, out, false),
    )
    .with_output(output)
}

/// `MakeIntervalExposed`: like `MakeInterval` but with visible constructors.
pub fn make_interval_exposed(registry: &InterfaceRegistry) -> Result<Generator> {
    let output = registry.parse("IntervalExposed", INTERVAL_EXPOSED)?;
    Generator::new(
        "MakeIntervalExposed",
        "Endpoint",
        contract(registry, "Comparable")?,
        |e, out| interval_body(e, out, false),
    )
    .with_output(output)
}

/// `MakeIntervalSexp (Endpoint : SexpComparable)`: intervals that are also
/// `Sexpable`, with endpoints substituted away.
pub fn make_interval_sexp(registry: &InterfaceRegistry) -> Result<Generator> {
    let output = registry.parse("IntervalSexp", INTERVAL_SEXP)?;
    Generator::new(
        "MakeIntervalSexp",
        "Endpoint",
        contract(registry, "SexpComparable")?,
        |e, out| interval_body(e, out, true),
    )
    .with_output(output)
}

/// The prelude registry, modules and generators, keyed by name.
#[derive(Debug, Clone)]
pub struct Prelude {
    registry: InterfaceRegistry,
    modules: IndexMap<Name, Module>,
    generators: IndexMap<Name, Generator>,
}

impl Prelude {
    pub fn load() -> Result<Self> {
        let registry = InterfaceRegistry::with_prelude()?;
        let modules = [
            int_ascending()?,
            int_descending()?,
            string_comparable()?,
            int_with_sexp()?,
            three()?,
        ]
        .into_iter()
        .map(|m| (m.label(), m))
        .collect();
        let generators = [
            increment(&registry)?,
            make_interval(&registry)?,
            make_interval_abstract(&registry)?,
            make_interval_exposed(&registry)?,
            make_interval_sexp(&registry)?,
        ]
        .into_iter()
        .map(|g| (g.name(), g))
        .collect();
        Ok(Self {
            registry,
            modules,
            generators,
        })
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut InterfaceRegistry {
        &mut self.registry
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(&Name::new(name))
    }

    pub fn generator(&self, name: &str) -> Option<&Generator> {
        self.generators.get(&Name::new(name))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.generators.values()
    }
}
