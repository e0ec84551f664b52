//! Contracts (module signatures).
//!
//! A contract lists the type and value members a module must provide. Type
//! members are abstract, manifest (`type t = int`) or variants with visible
//! constructors. Contracts never change after construction: [`Contract::with_type`]
//! and [`Contract::with_type_destructive`] return refined copies.

use crate::error::{FunctorError, Result};
use crate::naming::Name;
use crate::syntax;
use crate::types::{Type, TypeEnv};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;

/// A constructor of a variant type member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorSpecification {
    pub name: Name,
    pub args: Vec<Type>,
}

impl ConstructorSpecification {
    pub fn new(name: impl Into<Name>, args: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    fn map_args(&self, f: impl Fn(&Type) -> Type) -> Self {
        Self {
            name: self.name,
            args: self.args.iter().map(f).collect(),
        }
    }
}

/// Type specification of a type member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpecification {
    /// `type t`: any definition satisfies it, and the representation is
    /// hidden once the contract is applied.
    Abstract,
    /// `type t = T`: the module's `t` must equal `T`.
    Manifest(Type),
    /// `type t = A of x | B`: the module's `t` must be a variant with exactly
    /// these constructors.
    Variant(Vec<ConstructorSpecification>),
}

impl TypeSpecification {
    fn map_types(&self, f: impl Fn(&Type) -> Type) -> Self {
        match self {
            TypeSpecification::Abstract => TypeSpecification::Abstract,
            TypeSpecification::Manifest(ty) => TypeSpecification::Manifest(f(ty)),
            TypeSpecification::Variant(ctors) => {
                TypeSpecification::Variant(ctors.iter().map(|c| c.map_args(&f)).collect())
            }
        }
    }

    fn types(&self) -> Vec<&Type> {
        match self {
            TypeSpecification::Abstract => Vec::new(),
            TypeSpecification::Manifest(ty) => vec![ty],
            TypeSpecification::Variant(ctors) => ctors.iter().flat_map(|c| &c.args).collect(),
        }
    }
}

/// A member as supplied to [`Contract::new`].
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Type(TypeSpecification),
    Value(Type),
}

impl Member {
    pub fn abstract_type() -> Self {
        Member::Type(TypeSpecification::Abstract)
    }

    pub fn manifest(ty: Type) -> Self {
        Member::Type(TypeSpecification::Manifest(ty))
    }

    pub fn variant(constructors: Vec<ConstructorSpecification>) -> Self {
        Member::Type(TypeSpecification::Variant(constructors))
    }

    pub fn value(ty: Type) -> Self {
        Member::Value(ty)
    }
}

/// A `with type` refinement.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `with type m = T`
    Sharing { member: Name, ty: Type },
    /// `with type m := T`
    Substitution { member: Name, ty: Type },
}

impl Constraint {
    pub fn sharing(member: impl Into<Name>, ty: Type) -> Self {
        Constraint::Sharing {
            member: member.into(),
            ty,
        }
    }

    pub fn substitution(member: impl Into<Name>, ty: Type) -> Self {
        Constraint::Substitution {
            member: member.into(),
            ty,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Sharing { member, ty } => write!(f, "type {member} = {ty}"),
            Constraint::Substitution { member, ty } => write!(f, "type {member} := {ty}"),
        }
    }
}

/// A named module signature.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    name: Name,
    types: IndexMap<Name, TypeSpecification>,
    values: IndexMap<Name, Type>,
}

impl Contract {
    /// Build a contract from members in declaration order.
    ///
    /// Member names must be unique, and every local type name must refer to
    /// a type member declared earlier (a variant may refer to itself).
    pub fn new<N>(name: impl Into<Name>, members: impl IntoIterator<Item = (N, Member)>) -> Result<Self>
    where
        N: Into<Name>,
    {
        let mut contract = Contract::empty(name.into());
        for (member, spec) in members {
            let member = member.into();
            if contract.has_member(&member) {
                return Err(FunctorError::AmbiguousMember { member });
            }
            match spec {
                Member::Type(spec) => {
                    let this = matches!(spec, TypeSpecification::Variant(_)).then_some(member);
                    contract.check_bound(spec.types(), this)?;
                    contract.types.insert(member, spec);
                }
                Member::Value(ty) => {
                    contract.check_bound(vec![&ty], None)?;
                    contract.values.insert(member, ty);
                }
            }
        }
        debug!(contract = %contract.name, types = contract.types.len(), values = contract.values.len(), "defined contract");
        Ok(contract)
    }

    /// Parse a contract from signature syntax. `include` is not available
    /// without a registry; see [`crate::InterfaceRegistry::define_parsed`].
    pub fn parse(name: impl Into<Name>, source: &str) -> Result<Self> {
        syntax::parse_signature(name.into(), source, &|_| None)
    }

    fn empty(name: Name) -> Self {
        Self {
            name,
            types: IndexMap::new(),
            values: IndexMap::new(),
        }
    }

    /// A contract fragment that may mention type names it does not declare.
    /// Fragments are only useful as parts of [`Contract::merge`].
    pub(crate) fn fragment(name: Name, members: Vec<(Name, Member)>) -> Result<Self> {
        let mut contract = Contract::empty(name);
        for (member, spec) in members {
            if contract.has_member(&member) {
                return Err(FunctorError::AmbiguousMember { member });
            }
            match spec {
                Member::Type(spec) => {
                    contract.types.insert(member, spec);
                }
                Member::Value(ty) => {
                    contract.values.insert(member, ty);
                }
            }
        }
        Ok(contract)
    }

    /// `recursive` names a variant being declared, which may refer to itself.
    fn check_bound(&self, types: Vec<&Type>, recursive: Option<Name>) -> Result<()> {
        for ty in types {
            for local in ty.locals() {
                if recursive != Some(local) && !self.types.contains_key(&local) {
                    return Err(FunctorError::UnboundType { name: local });
                }
            }
        }
        Ok(())
    }

    /// Check the whole contract: type members may refer to earlier types (or
    /// to themselves for variants), values may refer to any type member.
    fn validate(&self) -> Result<()> {
        for (index, (name, spec)) in self.types.iter().enumerate() {
            let recursive = matches!(spec, TypeSpecification::Variant(_));
            for ty in spec.types() {
                for local in ty.locals() {
                    let earlier = self
                        .types
                        .get_index_of(&local)
                        .is_some_and(|i| i < index || (recursive && local == *name));
                    if !earlier {
                        return Err(FunctorError::UnboundType { name: local });
                    }
                }
            }
        }
        if let Some(name) = self.free_types().into_iter().next() {
            return Err(FunctorError::UnboundType { name });
        }
        Ok(())
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn types(&self) -> &IndexMap<Name, TypeSpecification> {
        &self.types
    }

    pub fn values(&self) -> &IndexMap<Name, Type> {
        &self.values
    }

    pub fn type_spec(&self, name: &Name) -> Option<&TypeSpecification> {
        self.types.get(name)
    }

    pub fn value_type(&self, name: &Name) -> Option<&Type> {
        self.values.get(name)
    }

    pub fn has_member(&self, name: &Name) -> bool {
        self.types.contains_key(name) || self.values.contains_key(name)
    }

    /// Local type names that are referenced but not declared.
    pub fn free_types(&self) -> Vec<Name> {
        let mut free = Vec::new();
        let all = self
            .types
            .values()
            .flat_map(TypeSpecification::types)
            .chain(self.values.values());
        for ty in all {
            for local in ty.locals() {
                if !self.types.contains_key(&local) && !free.contains(&local) {
                    free.push(local);
                }
            }
        }
        free
    }

    /// Rename the contract.
    /// `self with type member = ty`: make an abstract type member manifest.
    pub fn with_type(&self, member: impl Into<Name>, ty: Type) -> Result<Self> {
        let refined = self.share(member.into(), ty)?;
        refined.validate()?;
        Ok(refined)
    }

    fn share(&self, member: Name, ty: Type) -> Result<Self> {
        let spec = self.refinable(member, &ty)?;
        let mut refined = self.clone();
        if matches!(spec, TypeSpecification::Abstract) {
            if let Some(slot) = refined.types.get_mut(&member) {
                *slot = TypeSpecification::Manifest(ty);
            }
        }
        Ok(refined)
    }

    /// `self with type member := ty`: drop the type member and rewrite every
    /// occurrence of it to `ty`. The result may mention names that are free
    /// until it is merged into a larger contract.
    pub fn with_type_destructive(&self, member: impl Into<Name>, ty: Type) -> Result<Self> {
        let member = member.into();
        self.refinable(member, &ty)?;
        let mut refined = Contract::empty(self.name);
        for (name, spec) in &self.types {
            if *name != member {
                let rewritten = spec.map_types(|t| t.substitute_local(&member, &ty));
                refined.types.insert(*name, rewritten);
            }
        }
        for (name, value_ty) in &self.values {
            refined
                .values
                .insert(*name, value_ty.substitute_local(&member, &ty));
        }
        Ok(refined)
    }

    fn refinable(&self, member: Name, ty: &Type) -> Result<&TypeSpecification> {
        let spec = self
            .types
            .get(&member)
            .ok_or(FunctorError::MissingMember { member })?;
        match spec {
            TypeSpecification::Abstract => Ok(spec),
            TypeSpecification::Manifest(existing) if existing == ty => Ok(spec),
            TypeSpecification::Manifest(existing) => Err(FunctorError::mismatch(member, existing, ty)),
            TypeSpecification::Variant(_) => Err(FunctorError::mismatch(member, "a variant", ty)),
        }
    }

    /// Apply constraints left to right. Like [`Contract::with_type_destructive`],
    /// the result is not checked for free names.
    pub fn constrain(&self, constraints: &[Constraint]) -> Result<Self> {
        let mut refined = self.clone();
        for constraint in constraints {
            refined = match constraint {
                Constraint::Sharing { member, ty } => refined.share(*member, ty.clone())?,
                Constraint::Substitution { member, ty } => {
                    refined.with_type_destructive(*member, ty.clone())?
                }
            };
        }
        Ok(refined)
    }

    /// Combine several contracts into one.
    ///
    /// A member name may appear in more than one part only when every
    /// occurrence is the same value type, or the same non-abstract type
    /// specification. Two abstract types of the same name are independent
    /// types and make the merge ambiguous; substitute one of them away first.
    pub fn merge(name: impl Into<Name>, parts: &[Contract]) -> Result<Self> {
        let mut merged = Contract::empty(name.into());
        for part in parts {
            for (member, spec) in &part.types {
                if merged.values.contains_key(member) {
                    return Err(FunctorError::AmbiguousMember { member: *member });
                }
                match merged.types.get(member) {
                    None => {
                        merged.types.insert(*member, spec.clone());
                    }
                    Some(existing) if existing == spec && !matches!(spec, TypeSpecification::Abstract) => {}
                    Some(_) => return Err(FunctorError::AmbiguousMember { member: *member }),
                }
            }
            for (member, ty) in &part.values {
                if merged.types.contains_key(member) {
                    return Err(FunctorError::AmbiguousMember { member: *member });
                }
                match merged.values.get(member) {
                    None => {
                        merged.values.insert(*member, ty.clone());
                    }
                    Some(existing) if existing == ty => {}
                    Some(_) => return Err(FunctorError::AmbiguousMember { member: *member }),
                }
            }
        }
        merged.validate()?;
        debug!(contract = %merged.name, parts = parts.len(), "merged contracts");
        Ok(merged)
    }

    /// Replace `Module.t` projections using `env`.
    pub fn resolve_projections(&self, env: &TypeEnv) -> Self {
        Self {
            name: self.name,
            types: self
                .types
                .iter()
                .map(|(name, spec)| (*name, spec.map_types(|t| env.resolve_projections(t))))
                .collect(),
            values: self
                .values
                .iter()
                .map(|(name, ty)| (*name, env.resolve_projections(ty)))
                .collect(),
        }
    }

    /// Module names this contract projects from (`Endpoint` in `Endpoint.t`).
    pub fn projected_modules(&self) -> Vec<Name> {
        let mut found = Vec::new();
        let all = self
            .types
            .values()
            .flat_map(TypeSpecification::types)
            .chain(self.values.values());
        for ty in all {
            ty.walk(&mut |t| {
                if let Type::Projection(module, _) = t {
                    if !found.contains(module) {
                        found.push(*module);
                    }
                }
            });
        }
        found
    }
}

fn write_arg(f: &mut fmt::Formatter<'_>, ty: &Type) -> fmt::Result {
    if matches!(ty, Type::Tuple(_) | Type::Function(_, _)) {
        write!(f, "({ty})")
    } else {
        write!(f, "{ty}")
    }
}

impl fmt::Display for ConstructorSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            f.write_str(if i == 0 { " of " } else { " * " })?;
            write_arg(f, arg)?;
        }
        Ok(())
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sig")?;
        for (name, spec) in &self.types {
            match spec {
                TypeSpecification::Abstract => writeln!(f, "  type {name}")?,
                TypeSpecification::Manifest(ty) => writeln!(f, "  type {name} = {ty}")?,
                TypeSpecification::Variant(ctors) => {
                    write!(f, "  type {name} =")?;
                    for (i, ctor) in ctors.iter().enumerate() {
                        f.write_str(if i == 0 { " " } else { " | " })?;
                        write!(f, "{ctor}")?;
                    }
                    writeln!(f)?;
                }
            }
        }
        for (name, ty) in &self.values {
            writeln!(f, "  val {name} : {ty}")?;
        }
        write!(f, "end")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparable() -> Contract {
        Contract::new(
            "Comparable",
            [
                ("t", Member::abstract_type()),
                (
                    "compare",
                    Member::value(Type::arrows(vec![Type::local("t"), Type::local("t")], Type::int())),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_duplicates_and_unbound() {
        let dup = Contract::new("C", [("t", Member::abstract_type()), ("t", Member::abstract_type())]);
        assert!(matches!(dup, Err(FunctorError::AmbiguousMember { .. })));

        let unbound = Contract::new("C", [("f", Member::value(Type::local("u")))]);
        assert!(matches!(unbound, Err(FunctorError::UnboundType { .. })));
    }

    #[test]
    fn test_variant_may_refer_to_itself() {
        let list = Contract::new(
            "IntList",
            [(
                "t",
                Member::variant(vec![
                    ConstructorSpecification::new("Nil", vec![]),
                    ConstructorSpecification::new("Cons", vec![Type::int(), Type::local("t")]),
                ]),
            )],
        );
        assert!(list.is_ok());
    }

    #[test]
    fn test_with_type_makes_manifest() {
        let refined = comparable().with_type("t", Type::int()).unwrap();
        assert_eq!(
            refined.type_spec(&Name::new("t")),
            Some(&TypeSpecification::Manifest(Type::int()))
        );
        assert!(refined.with_type("t", Type::string()).is_err());
        assert!(matches!(
            comparable().with_type("u", Type::int()),
            Err(FunctorError::MissingMember { .. })
        ));
    }

    #[test]
    fn test_destructive_substitution_removes_member() {
        let refined = comparable().with_type_destructive("t", Type::int()).unwrap();
        assert!(refined.type_spec(&Name::new("t")).is_none());
        assert_eq!(
            refined.value_type(&Name::new("compare")).map(ToString::to_string),
            Some("int -> int -> int".to_string())
        );
        assert!(!refined.to_string().contains(" t"));
    }

    #[test]
    fn test_merge_rejects_two_abstract_types() {
        let sexpable = Contract::new(
            "Sexpable",
            [
                ("t", Member::abstract_type()),
                ("to_sexp", Member::value(Type::function(Type::local("t"), Type::string()))),
            ],
        )
        .unwrap();
        let err = Contract::merge("Both", &[comparable(), sexpable.clone()]).unwrap_err();
        assert!(matches!(err, FunctorError::AmbiguousMember { member } if member == "t"));

        let fixed = sexpable.with_type_destructive("t", Type::local("t")).unwrap();
        let merged = Contract::merge("Both", &[comparable(), fixed]).unwrap();
        assert_eq!(merged.types().len(), 1);
        assert_eq!(merged.values().len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            comparable().to_string(),
            "sig\n  type t\n  val compare : t -> t -> int\nend"
        );
    }
}
