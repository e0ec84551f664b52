//! Value conversion at module boundaries.
//!
//! A module stores each member at its *inner* type and publishes it at its
//! *exposed* type. The two differ only where the module has sealed a type:
//! there the exposed type is `Nominal(tag)` for a tag in the boundary's sealed
//! set, and values cross as [`Value::Sealed`]. Functions are wrapped so that
//! arguments flow in and results flow out through the same conversion.

use crate::error::{FunctorError, Result};
use crate::identity::TypeTag;
use crate::naming::Name;
use crate::types::{Type, BOOL, INT, LIST, STRING};
use crate::value::{NativeFunction, Value};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Inner value leaving the module.
    Export,
    /// Outside value entering the module.
    Import,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Direction::Export => Direction::Import,
            Direction::Import => Direction::Export,
        }
    }
}

/// The sealed tags of one module.
#[derive(Debug)]
pub struct Boundary {
    sealed: HashSet<TypeTag>,
}

impl Boundary {
    pub fn new(sealed: HashSet<TypeTag>) -> Arc<Self> {
        Arc::new(Self { sealed })
    }

    /// A boundary that seals nothing and only checks value shapes.
    pub fn transparent() -> Arc<Self> {
        Self::new(HashSet::new())
    }

    pub fn seals(&self, tag: &TypeTag) -> bool {
        self.sealed.contains(tag)
    }

    /// Convert a member value from its inner type to its exposed type.
    pub fn export(
        self: &Arc<Self>,
        member: Name,
        value: Value,
        inner: &Type,
        exposed: &Type,
    ) -> Result<Value> {
        self.convert(Direction::Export, member, value, inner, exposed)
    }

    /// Convert a value supplied at an exposed type into the inner type,
    /// rejecting values of the wrong shape or brand.
    pub fn import(
        self: &Arc<Self>,
        member: Name,
        value: Value,
        inner: &Type,
        exposed: &Type,
    ) -> Result<Value> {
        self.convert(Direction::Import, member, value, inner, exposed)
    }

    fn convert(
        self: &Arc<Self>,
        direction: Direction,
        member: Name,
        value: Value,
        inner: &Type,
        exposed: &Type,
    ) -> Result<Value> {
        match exposed {
            Type::Nominal(tag) if self.seals(tag) => match direction {
                Direction::Export => Ok(Value::sealed(tag.clone(), value)),
                Direction::Import => match value {
                    Value::Sealed(sealed) if sealed.tag() == tag => Ok(sealed.into_inner()),
                    other => Err(wrong_value(member, exposed, &other)),
                },
            },
            Type::Function(_, _) => self.wrap(direction, member, value, inner, exposed),
            Type::Tuple(exposed_elements) => {
                let Type::Tuple(inner_elements) = inner else {
                    return Err(FunctorError::mismatch(member, exposed, inner));
                };
                match value {
                    Value::Tuple(items)
                        if items.len() == exposed_elements.len()
                            && items.len() == inner_elements.len() =>
                    {
                        let converted = items
                            .into_iter()
                            .zip(inner_elements.iter().zip(exposed_elements))
                            .map(|(item, (i, e))| self.convert(direction, member, item, i, e))
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Value::Tuple(converted))
                    }
                    other => Err(wrong_value(member, exposed, &other)),
                }
            }
            Type::Named(name, exposed_args) if *name == LIST => {
                let (Type::Named(_, inner_args), [exposed_element]) = (inner, exposed_args.as_slice())
                else {
                    return Err(FunctorError::mismatch(member, exposed, inner));
                };
                let Some(inner_element) = inner_args.first() else {
                    return Err(FunctorError::mismatch(member, exposed, inner));
                };
                match value {
                    Value::List(items) => {
                        let converted = items
                            .into_iter()
                            .map(|item| {
                                self.convert(direction, member, item, inner_element, exposed_element)
                            })
                            .collect::<Result<Vec<_>>>()?;
                        Ok(Value::List(converted))
                    }
                    other => Err(wrong_value(member, exposed, &other)),
                }
            }
            _ => {
                check_shape(member, &value, exposed)?;
                Ok(value)
            }
        }
    }

    /// Wrap a function so each call converts its arguments one way and its
    /// result the other.
    fn wrap(
        self: &Arc<Self>,
        direction: Direction,
        member: Name,
        value: Value,
        inner: &Type,
        exposed: &Type,
    ) -> Result<Value> {
        let Value::Function(function) = value else {
            return Err(wrong_value(member, exposed, &value));
        };
        let (exposed_params, exposed_result) = exposed.uncurry();
        let arity = exposed_params.len();
        let (inner_params, inner_result) = split_arrows(inner, arity)
            .ok_or_else(|| FunctorError::mismatch(member, exposed, inner))?;
        if function.arity() != arity {
            return Err(FunctorError::Arity {
                operation: member,
                expected: arity,
                actual: function.arity(),
            });
        }

        let params: Vec<(Type, Type)> = inner_params
            .into_iter()
            .cloned()
            .zip(exposed_params.into_iter().cloned())
            .collect();
        let result = (inner_result.clone(), exposed_result.clone());
        let boundary = Arc::clone(self);
        let name = function.name();

        let wrapped = NativeFunction::new(name, arity, move |args: &[Value]| {
            let converted = args
                .iter()
                .zip(&params)
                .map(|(arg, (inner, exposed))| {
                    boundary.convert(direction.flip(), name, arg.clone(), inner, exposed)
                })
                .collect::<Result<Vec<_>>>()?;
            let output = function.call(&converted)?;
            boundary.convert(direction, name, output, &result.0, &result.1)
        });
        Ok(Value::Function(wrapped))
    }
}

/// The first `count` parameters of a curried function type and what remains.
fn split_arrows(ty: &Type, count: usize) -> Option<(Vec<&Type>, &Type)> {
    let mut params = Vec::with_capacity(count);
    let mut current = ty;
    for _ in 0..count {
        let Type::Function(arg, result) = current else {
            return None;
        };
        params.push(arg.as_ref());
        current = result;
    }
    Some((params, current))
}

/// Check that a value has the shape of a non-sealed type.
fn check_shape(member: Name, value: &Value, ty: &Type) -> Result<()> {
    let ok = match (ty, value) {
        (Type::Nominal(tag), _) => {
            return match value.tag() {
                Some(found) if found == tag => Ok(()),
                Some(found) => Err(FunctorError::TypeIdentityMismatch {
                    expected: tag.clone(),
                    actual: found.clone(),
                }),
                None => Err(wrong_value(member, ty, value)),
            };
        }
        (Type::Named(name, _), Value::Int(_)) => *name == INT,
        (Type::Named(name, _), Value::Bool(_)) => *name == BOOL,
        (Type::Named(name, _), Value::String(_)) => *name == STRING,
        (Type::Unit, Value::Unit) => true,
        // Unresolved names carry no shape to check against.
        (Type::Local(_) | Type::Projection(_, _), _) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(wrong_value(member, ty, value))
    }
}

fn wrong_value(member: Name, expected: &Type, value: &Value) -> FunctorError {
    match (expected, value.tag()) {
        (Type::Nominal(tag), Some(found)) => FunctorError::TypeIdentityMismatch {
            expected: tag.clone(),
            actual: found.clone(),
        },
        _ => FunctorError::mismatch(member, expected, value.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Origin, TypeFacts, TypeIdentityTracker};

    fn sealed_tag(name: &str) -> TypeTag {
        let tracker = TypeIdentityTracker::global();
        let mut facts = TypeFacts::new();
        tracker.mint(
            &mut facts,
            Origin::Seal(tracker.next_module_id()),
            Name::new("M"),
            Name::new(name),
        )
    }

    #[test]
    fn test_sealed_values_round_trip() {
        let tag = sealed_tag("t");
        let boundary = Boundary::new(HashSet::from([tag.clone()]));
        let exposed = Type::Nominal(tag.clone());
        let m = Name::new("zero");

        let sealed = boundary.export(m, Value::int(0), &Type::int(), &exposed).unwrap();
        assert!(matches!(&sealed, Value::Sealed(s) if *s.tag() == tag));
        assert_eq!(sealed.to_string(), "<abstr>");

        let back = boundary.import(m, sealed, &Type::int(), &exposed).unwrap();
        assert_eq!(back, Value::int(0));

        let err = boundary
            .import(m, Value::int(0), &Type::int(), &exposed)
            .unwrap_err();
        assert!(matches!(err, FunctorError::TypeMismatch { .. }));
    }

    #[test]
    fn test_foreign_tag_is_identity_mismatch() {
        let mine = sealed_tag("t");
        let theirs = sealed_tag("t");
        let boundary = Boundary::new(HashSet::from([mine.clone()]));
        let foreign = Value::sealed(theirs, Value::int(1));
        let err = boundary
            .import(Name::new("x"), foreign, &Type::int(), &Type::Nominal(mine))
            .unwrap_err();
        assert!(matches!(err, FunctorError::TypeIdentityMismatch { .. }));
    }

    #[test]
    fn test_functions_are_checked_on_call() {
        let tag = sealed_tag("t");
        let boundary = Boundary::new(HashSet::from([tag.clone()]));
        let succ = Value::function("succ", 1, |args| match args[0].as_int() {
            Some(i) => Ok(Value::int(i + 1)),
            None => Err(FunctorError::Evaluation("succ expects an int".into())),
        });
        let t = Type::Nominal(tag);
        let exposed = Type::function(t.clone(), t.clone());
        let inner = Type::function(Type::int(), Type::int());

        let wrapped = boundary
            .export(Name::new("succ"), succ, &inner, &exposed)
            .unwrap();
        let one = boundary
            .export(Name::new("one"), Value::int(1), &Type::int(), &t)
            .unwrap();
        let two = wrapped.apply(&[one]).unwrap();
        assert_eq!(
            boundary.import(Name::new("two"), two, &Type::int(), &t).unwrap(),
            Value::int(2)
        );

        let err = wrapped.apply(&[Value::int(1)]).unwrap_err();
        assert!(matches!(err, FunctorError::TypeMismatch { .. }));
    }

    #[test]
    fn test_transparent_boundary_checks_shapes() {
        let boundary = Boundary::transparent();
        let pair = Type::tuple(vec![Type::int(), Type::string()]);
        let ok = Value::tuple(vec![Value::int(1), Value::string("a")]);
        assert!(boundary.import(Name::new("p"), ok, &pair, &pair).is_ok());
        let bad = Value::tuple(vec![Value::int(1), Value::int(2)]);
        assert!(boundary.import(Name::new("p"), bad, &pair, &pair).is_err());
    }
}
