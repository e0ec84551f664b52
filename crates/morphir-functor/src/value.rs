//! Runtime values carried by module members.

use crate::error::{FunctorError, Result};
use crate::identity::TypeTag;
use crate::naming::Name;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

type NativeBody = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A host function exposed as a module operation.
///
/// Functions take all of their (uncurried) arguments at once: a member of
/// type `a -> b -> c` is a function of arity 2.
#[derive(Clone)]
pub struct NativeFunction {
    name: Name,
    arity: usize,
    body: Arc<NativeBody>,
}

impl NativeFunction {
    pub fn new<F>(name: impl Into<Name>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if args.len() != self.arity {
            return Err(FunctorError::Arity {
                operation: self.name,
                expected: self.arity,
                actual: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fun {}/{}>", self.name, self.arity)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

/// A value built with a constructor of a variant type.
///
/// Only the module that declares the variant can build one, so the brand
/// always names a type whose invariants that module maintains.
///
/// ```compile_fail
/// use morphir_functor::value::VariantValue;
/// let forged = VariantValue { tag: todo!(), constructor: "Interval".into(), args: vec![] };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VariantValue {
    tag: TypeTag,
    constructor: Name,
    args: Vec<Value>,
}

impl VariantValue {
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn constructor(&self) -> Name {
        self.constructor
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// A value whose representation is hidden behind an abstract type.
///
/// Created and opened only at a seal boundary.
///
/// ```compile_fail
/// use morphir_functor::value::SealedValue;
/// let forged = SealedValue { tag: todo!(), inner: Box::new(morphir_functor::Value::int(41)) };
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SealedValue {
    tag: TypeTag,
    inner: Box<Value>,
}

impl SealedValue {
    pub(crate) fn new(tag: TypeTag, inner: Value) -> Self {
        Self {
            tag,
            inner: Box::new(inner),
        }
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub(crate) fn into_inner(self) -> Value {
        *self.inner
    }
}

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Variant(VariantValue),
    Sealed(SealedValue),
    Function(NativeFunction),
}

impl Value {
    pub fn int(i: i64) -> Self {
        Value::Int(i)
    }

    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn tuple(elements: Vec<Value>) -> Self {
        Value::Tuple(elements)
    }

    pub(crate) fn variant(tag: TypeTag, constructor: impl Into<Name>, args: Vec<Value>) -> Self {
        Value::Variant(VariantValue {
            tag,
            constructor: constructor.into(),
            args,
        })
    }

    pub(crate) fn sealed(tag: TypeTag, inner: Value) -> Self {
        Value::Sealed(SealedValue::new(tag, inner))
    }

    pub fn function<F>(name: impl Into<Name>, arity: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Value::Function(NativeFunction::new(name, arity, body))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Constructor and arguments of a variant value.
    pub fn as_variant(&self) -> Option<(Name, &[Value])> {
        match self {
            Value::Variant(v) => Some((v.constructor, &v.args)),
            _ => None,
        }
    }

    /// Brand of a nominal value.
    pub fn tag(&self) -> Option<&TypeTag> {
        match self {
            Value::Variant(v) => Some(&v.tag),
            Value::Sealed(s) => Some(&s.tag),
            _ => None,
        }
    }

    /// Short description used in mismatch reports.
    pub fn kind(&self) -> String {
        match self {
            Value::Unit => "unit".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::String(_) => "string".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Tuple(elements) => format!("{}-tuple", elements.len()),
            Value::Variant(VariantValue { tag, .. }) | Value::Sealed(SealedValue { tag, .. }) => {
                tag.to_string()
            }
            Value::Function(f) => format!("function of arity {}", f.arity()),
        }
    }

    /// Apply a function value.
    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(FunctorError::Evaluation(format!(
                "cannot apply a value of kind {}",
                other.kind()
            ))),
        }
    }

    /// JSON rendering for machine-readable output. Sealed values stay opaque.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Unit => json!(null),
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::String(s) => json!(s),
            Value::List(items) | Value::Tuple(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Variant(v) => json!({
                "constructor": v.constructor.as_str(),
                "args": v.args.iter().map(Value::to_json).collect::<Vec<_>>(),
            }),
            Value::Sealed(s) => json!({ "abstract": s.tag.to_string() }),
            Value::Function(f) => json!({ "function": f.name().as_str(), "arity": f.arity() }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Value::Variant(VariantValue {
                constructor, args, ..
            }) => match args.as_slice() {
                [] => write!(f, "{constructor}"),
                [single] => write!(f, "{constructor} {single}"),
                many => write!(f, "{constructor} {}", Value::Tuple(many.to_vec())),
            },
            Value::Sealed(_) => f.write_str("<abstr>"),
            Value::Function(_) => f.write_str("<fun>"),
        }
    }
}
