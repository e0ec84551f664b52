//! Type identity tracking.
//!
//! Every module, generator and minted type gets its identity from a single
//! process-wide counter. A [`TypeTag`] records where a nominal type came from:
//! the module that defined it, the sealing that hid it, or the functor
//! application (generator, argument) that produced it. Tags compare by origin
//! and local name only, so two applications to different arguments can never
//! agree on a tag even when their representations are identical.

use crate::error::{FunctorError, Result};
use crate::naming::Name;
use crate::types::Type;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::trace;

/// Identity of a module value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(u64);

/// Identity of a generator definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GeneratorId(u64);

impl ModuleId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl GeneratorId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Where a nominal type was minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// A variant type written directly in a module definition.
    Definition(ModuleId),
    /// An abstract type introduced by sealing a module with a contract.
    Seal(ModuleId),
    /// A type produced by applying a generator to an argument module.
    Application {
        generator: GeneratorId,
        argument: ModuleId,
    },
}

/// Brand of a nominal type.
///
/// The `label` is only for diagnostics (`MakeInterval(IntAscending).t`); it
/// takes no part in equality or hashing.
#[derive(Debug, Clone)]
pub struct TypeTag {
    origin: Origin,
    name: Name,
    label: Name,
}

impl TypeTag {
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The local type name the tag was minted for.
    pub fn name(&self) -> Name {
        self.name
    }

    /// Label of the module that owns the type.
    pub fn owner(&self) -> Name {
        self.label
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.name == other.name
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.label, self.name)
    }
}

/// What an output module knows about one of its local types.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeFact {
    /// The type is nominal: values carry this tag.
    Minted(TypeTag),
    /// The type is equal to a concrete type (sharing constraint).
    Alias(Type),
}

/// Type-equality facts attached to one module instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeFacts {
    facts: IndexMap<Name, TypeFact>,
}

impl TypeFacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &Name) -> Option<&TypeFact> {
        self.facts.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &TypeFact)> {
        self.facts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Tag minted for `name`, if the type is nominal.
    pub fn minted(&self, name: &Name) -> Option<&TypeTag> {
        match self.facts.get(name) {
            Some(TypeFact::Minted(tag)) => Some(tag),
            _ => None,
        }
    }

    /// Concrete type `name` is shared with, if any.
    pub fn alias_of(&self, name: &Name) -> Option<&Type> {
        match self.facts.get(name) {
            Some(TypeFact::Alias(ty)) => Some(ty),
            _ => None,
        }
    }

    pub(crate) fn record(&mut self, name: Name, fact: TypeFact) {
        self.facts.insert(name, fact);
    }
}

/// Hands out module, generator and type identities.
#[derive(Debug)]
pub struct TypeIdentityTracker {
    next: AtomicU64,
}

static TRACKER: OnceLock<TypeIdentityTracker> = OnceLock::new();

impl TypeIdentityTracker {
    /// The process-wide tracker. Identities from separate trackers could
    /// collide, so there is no public constructor.
    pub fn global() -> &'static TypeIdentityTracker {
        TRACKER.get_or_init(|| TypeIdentityTracker {
            next: AtomicU64::new(1),
        })
    }

    fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn next_module_id(&self) -> ModuleId {
        ModuleId(self.next())
    }

    pub fn next_generator_id(&self) -> GeneratorId {
        GeneratorId(self.next())
    }

    /// Mint the nominal type `local` for a module under construction and
    /// record it in the module's facts.
    pub fn mint(&self, facts: &mut TypeFacts, origin: Origin, owner: Name, local: Name) -> TypeTag {
        let tag = TypeTag {
            origin,
            name: local,
            label: owner,
        };
        trace!(tag = %tag, ?origin, "minted type");
        facts.record(local, TypeFact::Minted(tag.clone()));
        tag
    }

    /// Record that `local` is equal to `concrete` in a module's facts.
    pub fn alias(&self, facts: &mut TypeFacts, local: Name, concrete: Type) {
        trace!(local = %local, concrete = %concrete, "shared type");
        facts.record(local, TypeFact::Alias(concrete));
    }

    /// Check that a type found at a module boundary is the expected one.
    ///
    /// Two different nominal types are reported as
    /// [`FunctorError::TypeIdentityMismatch`]; any other difference is a
    /// [`FunctorError::TypeMismatch`] for `member`.
    pub fn check(&self, member: Name, expected: &Type, actual: &Type) -> Result<()> {
        if expected == actual {
            return Ok(());
        }
        match first_difference(expected, actual) {
            Some((Type::Nominal(e), Type::Nominal(a))) => Err(FunctorError::TypeIdentityMismatch {
                expected: e.clone(),
                actual: a.clone(),
            }),
            _ => Err(FunctorError::mismatch(member, expected, actual)),
        }
    }
}

/// The outermost pair of sub-terms where two types stop agreeing.
fn first_difference<'a>(expected: &'a Type, actual: &'a Type) -> Option<(&'a Type, &'a Type)> {
    match (expected, actual) {
        (Type::Tuple(es), Type::Tuple(as_)) if es.len() == as_.len() => es
            .iter()
            .zip(as_)
            .find(|(e, a)| e != a)
            .and_then(|(e, a)| first_difference(e, a)),
        (Type::Named(en, es), Type::Named(an, as_)) if en == an && es.len() == as_.len() => es
            .iter()
            .zip(as_)
            .find(|(e, a)| e != a)
            .and_then(|(e, a)| first_difference(e, a)),
        (Type::Function(ea, er), Type::Function(aa, ar)) => {
            if ea != aa {
                first_difference(ea, aa)
            } else {
                first_difference(er, ar)
            }
        }
        (e, a) if e == a => None,
        (e, a) => Some((e, a)),
    }
}
