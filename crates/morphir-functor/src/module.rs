//! Module values.
//!
//! A [`Module`] is an immutable bundle of type definitions and member values
//! together with the contract it exposes. Modules are built directly with a
//! [`ModuleBuilder`] or produced by applying a generator; sealing and
//! restriction return new modules that keep the original alive as their
//! parent, so hidden members still exist at runtime.

use crate::boundary::Boundary;
use crate::contract::{ConstructorSpecification, Contract, Member, TypeSpecification};
use crate::error::{FunctorError, Result};
use crate::identity::{ModuleId, Origin, TypeFact, TypeFacts, TypeIdentityTracker, TypeTag};
use crate::naming::Name;
use crate::registry::satisfies;
use crate::types::{Type, TypeEnv};
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How a module represents one of its types internally.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    /// The type is another (concrete) type.
    Alias(Type),
    /// A variant minted by this module or one of its ancestors.
    ///
    /// `constructors` are empty when they have been hidden.
    Variant {
        tag: TypeTag,
        constructors: Vec<ConstructorSpecification>,
    },
}

impl TypeDefinition {
    pub fn ty(&self) -> Type {
        match self {
            TypeDefinition::Alias(ty) => ty.clone(),
            TypeDefinition::Variant { tag, .. } => Type::Nominal(tag.clone()),
        }
    }
}

/// A type member as consumers see it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposedType {
    /// Concrete type: an alias target or a nominal tag.
    pub ty: Type,
    /// Visible constructors, with argument types resolved.
    pub constructors: Option<Vec<ConstructorSpecification>>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Sealing {
    /// Hide members but keep every type equal to the original.
    Transparent,
    /// Mint abstract types with the given origin.
    Opaque(Origin),
    /// Mint abstract types with a fresh sealing origin.
    Seal,
}

struct ModuleInner {
    id: ModuleId,
    label: Name,
    definitions: IndexMap<Name, TypeDefinition>,
    values: IndexMap<Name, Value>,
    signature: Arc<Contract>,
    env: TypeEnv,
    facts: TypeFacts,
    boundary: Arc<Boundary>,
    parent: Option<Module>,
}

/// A module value. Cloning is cheap and keeps the same identity.
#[derive(Clone)]
pub struct Module {
    inner: Arc<ModuleInner>,
}

impl Module {
    pub fn id(&self) -> ModuleId {
        self.inner.id
    }

    pub fn label(&self) -> Name {
        self.inner.label
    }

    /// The contract this module exposes.
    pub fn signature(&self) -> &Arc<Contract> {
        &self.inner.signature
    }

    pub fn facts(&self) -> &TypeFacts {
        &self.inner.facts
    }

    /// The module this one was restricted or sealed from.
    pub fn parent(&self) -> Option<&Module> {
        self.inner.parent.as_ref()
    }

    pub fn definition(&self, name: &Name) -> Option<&TypeDefinition> {
        self.inner.definitions.get(name)
    }

    /// The exposed type member `name`, if the signature has it.
    pub fn exposed_type(&self, name: &Name) -> Option<ExposedType> {
        let spec = self.inner.signature.type_spec(name)?;
        let ty = self.inner.env.local(name)?.clone();
        let constructors = match spec {
            TypeSpecification::Variant(ctors) => Some(
                ctors
                    .iter()
                    .map(|c| {
                        ConstructorSpecification::new(
                            c.name,
                            c.args.iter().map(|a| self.inner.env.resolve(a)).collect(),
                        )
                    })
                    .collect(),
            ),
            _ => None,
        };
        Some(ExposedType { ty, constructors })
    }

    /// Every exposed type member with its concrete type.
    pub fn exposed_types(&self) -> IndexMap<Name, Type> {
        self.inner
            .signature
            .types()
            .keys()
            .filter_map(|name| Some((*name, self.inner.env.local(name)?.clone())))
            .collect()
    }

    /// The concrete type of exposed value member `name`.
    pub fn exposed_value_type(&self, name: &Name) -> Option<Type> {
        self.inner
            .signature
            .value_type(name)
            .map(|ty| self.inner.env.resolve(ty))
    }

    /// An exposed value member.
    pub fn value(&self, name: impl Into<Name>) -> Result<Value> {
        let name = name.into();
        self.inner
            .values
            .get(&name)
            .cloned()
            .ok_or(FunctorError::MissingMember { member: name })
    }

    /// Apply an exposed operation.
    pub fn call(&self, name: impl Into<Name>, args: &[Value]) -> Result<Value> {
        self.value(name)?.apply(args)
    }

    /// Build a value with a visible constructor of type member `ty`.
    pub fn construct(
        &self,
        ty: impl Into<Name>,
        constructor: impl Into<Name>,
        args: Vec<Value>,
    ) -> Result<Value> {
        let (ty, constructor) = (ty.into(), constructor.into());
        let hidden = || FunctorError::MissingMember {
            member: constructor,
        };
        let spec = self
            .inner
            .signature
            .type_spec(&ty)
            .ok_or(FunctorError::MissingMember { member: ty })?;
        let TypeSpecification::Variant(visible) = spec else {
            return Err(hidden());
        };
        let exposed = visible
            .iter()
            .find(|c| c.name == constructor)
            .ok_or_else(hidden)?;
        let Some(TypeDefinition::Variant { tag, constructors }) = self.inner.definitions.get(&ty)
        else {
            return Err(hidden());
        };
        let inner = constructors
            .iter()
            .find(|c| c.name == constructor)
            .ok_or_else(hidden)?;
        if args.len() != exposed.args.len() {
            return Err(FunctorError::Arity {
                operation: constructor,
                expected: exposed.args.len(),
                actual: args.len(),
            });
        }
        let args = args
            .into_iter()
            .zip(inner.args.iter().zip(&exposed.args))
            .map(|(arg, (inner_ty, exposed_ty))| {
                let exposed_ty = self.inner.env.resolve(exposed_ty);
                self.inner
                    .boundary
                    .import(constructor, arg, inner_ty, &exposed_ty)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::variant(tag.clone(), constructor, args))
    }

    /// Seal this module with `contract` (`module M : S = ...`).
    ///
    /// Abstract members get fresh types, except variants this module defines,
    /// which keep their type and only lose their constructors.
    pub fn seal(&self, contract: &Contract) -> Result<Module> {
        self.restrict(contract, Sealing::Seal, self.label())
    }

    /// The members of `contract` only, with every type left transparent.
    pub fn view(&self, contract: &Contract) -> Result<Module> {
        self.restrict(contract, Sealing::Transparent, self.label())
    }

    pub(crate) fn restrict(&self, contract: &Contract, sealing: Sealing, label: Name) -> Result<Module> {
        let satisfaction = satisfies(self, contract)?;
        let tracker = TypeIdentityTracker::global();
        let id = tracker.next_module_id();
        let origin = match sealing {
            Sealing::Transparent => None,
            Sealing::Opaque(origin) => Some(origin),
            Sealing::Seal => Some(Origin::Seal(id)),
        };

        let mut env = TypeEnv::new();
        let mut facts = TypeFacts::new();
        let mut sealed = HashSet::new();
        let mut definitions = IndexMap::new();
        for (name, spec) in contract.types() {
            let actual = satisfaction
                .env()
                .local(name)
                .cloned()
                .ok_or(FunctorError::MissingMember { member: *name })?;
            let own_variant = self.own_variant(name, &actual);
            let exposed = match (spec, origin) {
                // Manifest members follow whatever their target became here.
                (TypeSpecification::Manifest(declared), _) => {
                    let resolved = env.resolve(declared);
                    match &resolved {
                        Type::Nominal(tag) => facts.record(*name, TypeFact::Minted(tag.clone())),
                        concrete => tracker.alias(&mut facts, *name, concrete.clone()),
                    }
                    resolved
                }
                (TypeSpecification::Abstract, Some(origin)) if own_variant.is_none() => {
                    let tag = tracker.mint(&mut facts, origin, label, *name);
                    sealed.insert(tag.clone());
                    Type::Nominal(tag)
                }
                _ => {
                    match &actual {
                        Type::Nominal(tag) => facts.record(*name, TypeFact::Minted(tag.clone())),
                        concrete => tracker.alias(&mut facts, *name, concrete.clone()),
                    }
                    actual.clone()
                }
            };
            env.bind_local(*name, &exposed);

            let definition = match own_variant {
                Some(tag) => {
                    let constructors = match spec {
                        TypeSpecification::Variant(_) => self
                            .exposed_type(name)
                            .and_then(|e| e.constructors)
                            .unwrap_or_default(),
                        _ => Vec::new(),
                    };
                    TypeDefinition::Variant { tag, constructors }
                }
                None => TypeDefinition::Alias(actual),
            };
            definitions.insert(*name, definition);
        }

        let boundary = Boundary::new(sealed);
        let mut values = IndexMap::new();
        for (name, ty) in contract.values() {
            let inner_ty = self
                .exposed_value_type(name)
                .ok_or(FunctorError::MissingMember { member: *name })?;
            let exposed_ty = env.resolve(ty);
            let value = boundary.export(*name, self.value(*name)?, &inner_ty, &exposed_ty)?;
            values.insert(*name, value);
        }

        debug!(
            module = %label,
            id = %id,
            parent = %self.id(),
            contract = %contract.name(),
            ?sealing,
            hidden = self.inner.values.len().saturating_sub(values.len()),
            "restricted module"
        );
        Ok(Module {
            inner: Arc::new(ModuleInner {
                id,
                label,
                definitions,
                values,
                signature: Arc::new(contract.clone()),
                env,
                facts,
                boundary,
                parent: Some(self.clone()),
            }),
        })
    }

    /// The variant tag behind `name`, when `actual` is a variant this module
    /// (or an ancestor) defined.
    fn own_variant(&self, name: &Name, actual: &Type) -> Option<TypeTag> {
        match (self.inner.definitions.get(name), actual) {
            (Some(TypeDefinition::Variant { tag, .. }), Type::Nominal(found)) if tag == found => {
                Some(tag.clone())
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("signature", &self.inner.signature.to_string())
            .finish()
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module {} : {}", self.inner.label, self.inner.signature)
    }
}

/// Constructors of a variant declared with [`ModuleBuilder::variant`].
///
/// Values of a variant can only be built through this handle or through
/// [`Module::construct`] on a module that still shows the constructors.
#[derive(Debug, Clone)]
pub struct VariantConstructors {
    tag: TypeTag,
    constructors: Vec<(Name, usize)>,
}

impl VariantConstructors {
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Apply `constructor` to `args`.
    pub fn make(&self, constructor: impl Into<Name>, args: Vec<Value>) -> Result<Value> {
        let constructor = constructor.into();
        let arity = self
            .constructors
            .iter()
            .find(|(name, _)| *name == constructor)
            .map(|(_, arity)| *arity)
            .ok_or(FunctorError::MissingMember {
                member: constructor,
            })?;
        if args.len() != arity {
            return Err(FunctorError::Arity {
                operation: constructor,
                expected: arity,
                actual: args.len(),
            });
        }
        Ok(Value::variant(self.tag.clone(), constructor, args))
    }
}

enum Entry {
    Type(TypeSpecification, TypeDefinition),
    Value(Type, Type, Value),
}

/// Builds a module member by member.
///
/// Types are given in terms of the module's own type names (`Type::local`)
/// and, inside a generator body, of the parameter (`Type::projection`).
pub struct ModuleBuilder {
    id: ModuleId,
    label: Name,
    origin: Origin,
    env: TypeEnv,
    facts: TypeFacts,
    entries: IndexMap<Name, Entry>,
}

impl ModuleBuilder {
    pub fn new(label: impl Into<Name>) -> Self {
        let id = TypeIdentityTracker::global().next_module_id();
        Self::with_origin(id, label.into(), Origin::Definition(id))
    }

    /// Builder for the body of a generator applied to `input`.
    pub(crate) fn for_application(label: Name, origin: Origin, parameter: Name, input: &Module) -> Self {
        let id = TypeIdentityTracker::global().next_module_id();
        let mut builder = Self::with_origin(id, label, origin);
        builder.env.bind_module(parameter, input.exposed_types());
        builder
    }

    fn with_origin(id: ModuleId, label: Name, origin: Origin) -> Self {
        Self {
            id,
            label,
            origin,
            env: TypeEnv::new(),
            facts: TypeFacts::new(),
            entries: IndexMap::new(),
        }
    }

    pub fn label(&self) -> Name {
        self.label
    }

    fn claim(&self, name: Name) -> Result<()> {
        if self.entries.contains_key(&name) {
            return Err(FunctorError::AmbiguousMember { member: name });
        }
        Ok(())
    }

    /// Every local and projected name in `ty` must already be known.
    fn check_bound(&self, ty: &Type, variant: Option<Name>) -> Result<()> {
        let mut unbound = None;
        ty.walk(&mut |t| match t {
            Type::Local(name) if Some(*name) != variant && self.env.local(name).is_none() => {
                unbound.get_or_insert(*name);
            }
            Type::Projection(module, member) if self.env.projection(module, member).is_none() => {
                unbound.get_or_insert(*member);
            }
            _ => {}
        });
        match unbound {
            Some(name) => Err(FunctorError::UnboundType { name }),
            None => Ok(()),
        }
    }

    /// `type name = ty`
    pub fn alias(&mut self, name: impl Into<Name>, ty: Type) -> Result<&mut Self> {
        let name = name.into();
        self.claim(name)?;
        self.check_bound(&ty, None)?;
        let resolved = self.env.bind_local(name, &ty);
        TypeIdentityTracker::global().alias(&mut self.facts, name, resolved.clone());
        let spec = TypeSpecification::Manifest(self.env.resolve_projections(&ty));
        self.entries
            .insert(name, Entry::Type(spec, TypeDefinition::Alias(resolved)));
        Ok(self)
    }

    /// `type name = C1 of ... | C2 ...`; returns the constructors of the
    /// freshly minted type for use by the module's own operations.
    pub fn variant(
        &mut self,
        name: impl Into<Name>,
        constructors: Vec<ConstructorSpecification>,
    ) -> Result<VariantConstructors> {
        let name = name.into();
        self.claim(name)?;
        for ctor in &constructors {
            for arg in &ctor.args {
                self.check_bound(arg, Some(name))?;
            }
        }
        let tag = TypeIdentityTracker::global().mint(&mut self.facts, self.origin, self.label, name);
        self.env.bind_local(name, &Type::Nominal(tag.clone()));
        let map = |f: &dyn Fn(&Type) -> Type| {
            constructors
                .iter()
                .map(|c| ConstructorSpecification::new(c.name, c.args.iter().map(f).collect()))
                .collect::<Vec<_>>()
        };
        let spec = TypeSpecification::Variant(map(&|t| self.env.resolve_projections(t)));
        let handle = VariantConstructors {
            tag: tag.clone(),
            constructors: constructors.iter().map(|c| (c.name, c.args.len())).collect(),
        };
        let definition = TypeDefinition::Variant {
            tag,
            constructors: map(&|t| self.env.resolve(t)),
        };
        self.entries.insert(name, Entry::Type(spec, definition));
        Ok(handle)
    }

    /// `let name : ty = value`
    pub fn value(&mut self, name: impl Into<Name>, ty: Type, value: Value) -> Result<&mut Self> {
        let name = name.into();
        self.claim(name)?;
        self.check_bound(&ty, None)?;
        let declared = self.env.resolve_projections(&ty);
        let raw = self.env.resolve(&ty);
        self.entries.insert(name, Entry::Value(declared, raw, value));
        Ok(self)
    }

    /// Finish the module. Its signature lists every member as defined.
    pub fn build(self) -> Result<Module> {
        let boundary = Boundary::transparent();
        let mut members = Vec::with_capacity(self.entries.len());
        let mut definitions = IndexMap::new();
        let mut values = IndexMap::new();
        let mut value_members = Vec::new();
        for (name, entry) in self.entries {
            match entry {
                Entry::Type(spec, definition) => {
                    members.push((name, Member::Type(spec)));
                    definitions.insert(name, definition);
                }
                Entry::Value(declared, raw, value) => {
                    let value = boundary.export(name, value, &raw, &raw)?;
                    value_members.push((name, Member::Value(declared)));
                    values.insert(name, value);
                }
            }
        }
        members.extend(value_members);
        let signature = Contract::new(self.label, members)?;
        debug!(module = %self.label, id = %self.id, types = definitions.len(), values = values.len(), "built module");
        Ok(Module {
            inner: Arc::new(ModuleInner {
                id: self.id,
                label: self.label,
                definitions,
                values,
                signature: Arc::new(signature),
                env: self.env,
                facts: self.facts,
                boundary,
                parent: None,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_compare() -> Value {
        Value::function("compare", 2, |args| match (args[0].as_int(), args[1].as_int()) {
            (Some(a), Some(b)) => Ok(Value::int((a - b).signum())),
            _ => Err(FunctorError::Evaluation("compare expects ints".into())),
        })
    }

    fn int_module() -> Module {
        let mut builder = ModuleBuilder::new("IntOrder");
        builder.alias("t", Type::int()).unwrap();
        builder
            .value(
                "compare",
                Type::arrows(vec![Type::local("t"), Type::local("t")], Type::int()),
                int_compare(),
            )
            .unwrap();
        builder.value("zero", Type::local("t"), Value::int(0)).unwrap();
        builder.build().unwrap()
    }

    fn comparable() -> Contract {
        Contract::parse("Comparable", "type t val compare : t -> t -> int").unwrap()
    }

    #[test]
    fn test_built_signature() {
        let module = int_module();
        assert_eq!(
            module.signature().to_string(),
            "sig\n  type t = int\n  val compare : t -> t -> int\n  val zero : t\nend"
        );
        assert_eq!(
            module.call("compare", &[Value::int(1), Value::int(2)]).unwrap(),
            Value::int(-1)
        );
    }

    #[test]
    fn test_builder_rejects_unbound_and_duplicates() {
        let mut builder = ModuleBuilder::new("Bad");
        assert!(matches!(
            builder.value("x", Type::local("t"), Value::int(1)),
            Err(FunctorError::UnboundType { .. })
        ));
        builder.alias("t", Type::int()).unwrap();
        assert!(matches!(
            builder.alias("t", Type::string()),
            Err(FunctorError::AmbiguousMember { .. })
        ));
    }

    #[test]
    fn test_function_arity_must_match_type() {
        let mut builder = ModuleBuilder::new("Bad");
        builder
            .value(
                "f",
                Type::arrows(vec![Type::int(), Type::int()], Type::int()),
                Value::function("f", 1, |args| Ok(args[0].clone())),
            )
            .unwrap();
        assert!(matches!(builder.build(), Err(FunctorError::Arity { .. })));
    }

    #[test]
    fn test_seal_hides_representation_and_extra_members() {
        let sealed = int_module().seal(&comparable()).unwrap();
        assert!(matches!(
            sealed.value("zero"),
            Err(FunctorError::MissingMember { .. })
        ));
        assert!(sealed.parent().is_some_and(|p| p.value("zero").is_ok()));

        let err = sealed
            .call("compare", &[Value::int(1), Value::int(2)])
            .unwrap_err();
        assert!(matches!(err, FunctorError::TypeMismatch { .. }));

        let t = sealed.exposed_type(&Name::new("t")).unwrap();
        assert!(matches!(t.ty, Type::Nominal(_)));
        assert!(sealed.facts().minted(&Name::new("t")).is_some());
    }

    #[test]
    fn test_two_seals_are_distinct_types() {
        let module = int_module();
        let a = module.seal(&comparable()).unwrap();
        let b = module.seal(&comparable()).unwrap();
        assert_ne!(
            a.exposed_type(&Name::new("t")).unwrap().ty,
            b.exposed_type(&Name::new("t")).unwrap().ty
        );
    }

    #[test]
    fn test_view_keeps_types_transparent() {
        let view = int_module().view(&comparable()).unwrap();
        assert_eq!(view.exposed_type(&Name::new("t")).unwrap().ty, Type::int());
        assert_eq!(
            view.call("compare", &[Value::int(3), Value::int(3)]).unwrap(),
            Value::int(0)
        );
        assert!(view.value("zero").is_err());
    }

    #[test]
    fn test_seal_keeps_own_variant_tag_but_hides_constructors() {
        let mut builder = ModuleBuilder::new("Shapes");
        let shapes = builder
            .variant(
                "t",
                vec![
                    ConstructorSpecification::new("Dot", vec![]),
                    ConstructorSpecification::new("Line", vec![Type::int()]),
                ],
            )
            .unwrap();
        let module = builder.build().unwrap();
        let line = module.construct("t", "Line", vec![Value::int(4)]).unwrap();
        assert_eq!(line.to_string(), "Line 4");

        let sealed = module.seal(&Contract::parse("Shape", "type t").unwrap()).unwrap();
        assert_eq!(
            sealed.exposed_type(&Name::new("t")).unwrap().ty,
            Type::Nominal(shapes.tag().clone())
        );
        assert!(matches!(
            sealed.construct("t", "Line", vec![Value::int(4)]),
            Err(FunctorError::MissingMember { member }) if member == "Line"
        ));
        assert_eq!(shapes.make("Line", vec![Value::int(4)]).unwrap(), line);
    }

    #[test]
    fn test_variant_handle_checks_constructor_and_arity() {
        let mut builder = ModuleBuilder::new("Shapes");
        let shapes = builder
            .variant("t", vec![ConstructorSpecification::new("Dot", vec![])])
            .unwrap();
        assert_eq!(shapes.make("Dot", vec![]).unwrap().tag(), Some(shapes.tag()));
        assert!(matches!(
            shapes.make("Line", vec![]),
            Err(FunctorError::MissingMember { member }) if member == "Line"
        ));
        assert!(matches!(
            shapes.make("Dot", vec![Value::int(1)]),
            Err(FunctorError::Arity { expected: 0, actual: 1, .. })
        ));
    }

    #[test]
    fn test_seal_keeps_manifest_equal_to_sealed_target() {
        let mut builder = ModuleBuilder::new("Pair");
        builder.alias("t", Type::int()).unwrap();
        builder.alias("u", Type::int()).unwrap();
        builder
            .value(
                "make",
                Type::function(Type::int(), Type::local("t")),
                Value::function("make", 1, |args| Ok(args[0].clone())),
            )
            .unwrap();
        builder
            .value(
                "use_u",
                Type::function(Type::local("u"), Type::int()),
                Value::function("use_u", 1, |args| Ok(args[0].clone())),
            )
            .unwrap();
        let contract = Contract::parse(
            "Linked",
            "type t type u = t val make : int -> t val use_u : u -> int",
        )
        .unwrap();
        let sealed = builder.build().unwrap().seal(&contract).unwrap();

        let t = sealed.exposed_type(&Name::new("t")).unwrap().ty;
        let u = sealed.exposed_type(&Name::new("u")).unwrap().ty;
        assert!(matches!(t, Type::Nominal(_)));
        assert_eq!(u, t);

        let made = sealed.call("make", &[Value::int(7)]).unwrap();
        assert_eq!(sealed.call("use_u", &[made]).unwrap(), Value::int(7));
        assert!(sealed.call("use_u", &[Value::int(7)]).is_err());
    }
}
