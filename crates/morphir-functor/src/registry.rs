//! Interface registry and structural satisfaction.

use crate::contract::{Contract, Member, TypeSpecification};
use crate::error::{FunctorError, Result};
use crate::module::Module;
use crate::naming::Name;
use crate::prelude;
use crate::syntax;
use crate::types::TypeEnv;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handle of a contract defined in an [`InterfaceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContractId(usize);

impl ContractId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Named contracts. Names are defined once and never replaced.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    contracts: IndexMap<Name, Arc<Contract>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the prelude contracts.
    pub fn with_prelude() -> Result<Self> {
        let mut registry = Self::new();
        prelude::define_contracts(&mut registry)?;
        Ok(registry)
    }

    /// Define a contract from members in declaration order.
    pub fn define<N>(
        &mut self,
        name: impl Into<Name>,
        members: impl IntoIterator<Item = (N, Member)>,
    ) -> Result<ContractId>
    where
        N: Into<Name>,
    {
        self.insert(Contract::new(name, members)?)
    }

    /// Define a contract from signature syntax. `include` may name any
    /// contract already in the registry.
    pub fn define_parsed(&mut self, name: impl Into<Name>, source: &str) -> Result<ContractId> {
        let contract = self.parse(name, source)?;
        self.insert(contract)
    }

    /// Parse signature syntax against this registry without defining it.
    pub fn parse(&self, name: impl Into<Name>, source: &str) -> Result<Contract> {
        let resolve = |name: &Name| self.lookup(name).map(|c| Contract::clone(c));
        syntax::parse_signature(name.into(), source, &resolve)
    }

    /// Add an already built contract.
    pub fn insert(&mut self, contract: Contract) -> Result<ContractId> {
        let name = contract.name();
        if self.contracts.contains_key(&name) {
            return Err(FunctorError::AmbiguousMember { member: name });
        }
        let (index, _) = self.contracts.insert_full(name, Arc::new(contract));
        debug!(contract = %name, id = index, "registered contract");
        Ok(ContractId(index))
    }

    pub fn get(&self, id: ContractId) -> Option<&Arc<Contract>> {
        self.contracts.get_index(id.0).map(|(_, c)| c)
    }

    pub fn lookup(&self, name: &Name) -> Option<&Arc<Contract>> {
        self.contracts.get(name)
    }

    pub fn id_of(&self, name: &Name) -> Option<ContractId> {
        self.contracts.get_index_of(name).map(ContractId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContractId, &Arc<Contract>)> {
        self.contracts
            .values()
            .enumerate()
            .map(|(i, c)| (ContractId(i), c))
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    /// Check `module` against a registered contract.
    pub fn satisfies(&self, module: &Module, id: ContractId) -> Result<Satisfaction> {
        let contract = self.get(id).ok_or(FunctorError::UnknownContract { id })?;
        satisfies(module, contract)
    }
}

/// A successful satisfaction check.
#[derive(Debug, Clone, PartialEq)]
pub struct Satisfaction {
    env: TypeEnv,
}

impl Satisfaction {
    /// Each contract type name bound to the module's type for it.
    pub fn env(&self) -> &TypeEnv {
        &self.env
    }
}

/// Check that `module` provides at least the members of `contract` with
/// compatible types. Extra members are allowed.
pub fn satisfies(module: &Module, contract: &Contract) -> Result<Satisfaction> {
    check(module, contract).inspect_err(|err| {
        debug!(module = %module.label(), contract = %contract.name(), error = %err, "contract not satisfied");
    })
}

fn check(module: &Module, contract: &Contract) -> Result<Satisfaction> {
    let mut env = TypeEnv::new();
    for (name, spec) in contract.types() {
        let exposed = module
            .exposed_type(name)
            .ok_or(FunctorError::MissingMember { member: *name })?;
        match spec {
            TypeSpecification::Abstract => {
                env.bind_local(*name, &exposed.ty);
            }
            TypeSpecification::Manifest(expected) => {
                let expected = env.resolve(expected);
                if expected != exposed.ty {
                    return Err(FunctorError::mismatch(*name, expected, exposed.ty));
                }
                env.bind_local(*name, &exposed.ty);
            }
            TypeSpecification::Variant(expected) => {
                env.bind_local(*name, &exposed.ty);
                let describe = || {
                    expected
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" | ")
                };
                let Some(actual) = exposed.constructors.as_ref() else {
                    return Err(FunctorError::mismatch(*name, describe(), &exposed.ty));
                };
                let agrees = expected.len() == actual.len()
                    && expected.iter().zip(actual).all(|(e, a)| {
                        e.name == a.name
                            && e.args.len() == a.args.len()
                            && e.args.iter().zip(&a.args).all(|(et, at)| env.resolve(et) == *at)
                    });
                if !agrees {
                    let found = actual
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" | ");
                    return Err(FunctorError::mismatch(*name, describe(), found));
                }
            }
        }
    }
    for (name, ty) in contract.values() {
        let actual = module
            .exposed_value_type(name)
            .ok_or(FunctorError::MissingMember { member: *name })?;
        let expected = env.resolve(ty);
        if expected != actual {
            return Err(FunctorError::mismatch(*name, expected, actual));
        }
    }
    Ok(Satisfaction { env })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn test_define_rejects_redefinition() {
        let mut registry = InterfaceRegistry::new();
        let id = registry
            .define("XInt", [("x", Member::value(Type::int()))])
            .unwrap();
        assert_eq!(registry.get(id).map(|c| c.name()), Some(Name::new("XInt")));
        assert!(matches!(
            registry.define("XInt", [("y", Member::value(Type::int()))]),
            Err(FunctorError::AmbiguousMember { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_define_parsed_with_include() {
        let mut registry = InterfaceRegistry::new();
        registry
            .define_parsed("Comparable", "type t val compare : t -> t -> int")
            .unwrap();
        registry
            .define_parsed("Showable", "type t val show : t -> string")
            .unwrap();
        let id = registry
            .define_parsed(
                "ShowComparable",
                "type t
                 include Comparable with type t := t
                 include Showable with type t := t",
            )
            .unwrap();
        let contract = registry.get(id).unwrap();
        assert_eq!(contract.types().len(), 1);
        assert_eq!(
            contract.values().keys().map(Name::as_str).collect::<Vec<_>>(),
            vec!["compare", "show"]
        );
        assert_eq!(registry.id_of(&Name::new("ShowComparable")), Some(id));
    }

    #[test]
    fn test_prelude_contracts() {
        let registry = InterfaceRegistry::with_prelude().unwrap();
        for name in ["Comparable", "Sexpable", "IntervalIntf", "XInt"] {
            assert!(registry.lookup(&Name::new(name)).is_some(), "{name} missing");
        }
    }

    #[test]
    fn test_satisfies_by_id_rejects_foreign_ids() {
        let mut wide = InterfaceRegistry::new();
        wide.define_parsed("Zero", "val zero : int").unwrap();
        let foreign = wide.define_parsed("One", "val one : int").unwrap();

        let mut narrow = InterfaceRegistry::new();
        let zero_id = narrow.define_parsed("Zero", "val zero : int").unwrap();

        let mut builder = crate::module::ModuleBuilder::new("Zeroes");
        builder
            .value("zero", Type::int(), crate::value::Value::int(0))
            .unwrap();
        let module = builder.build().unwrap();

        assert!(narrow.satisfies(&module, zero_id).is_ok());
        let err = narrow.satisfies(&module, foreign).unwrap_err();
        assert!(matches!(err, FunctorError::UnknownContract { id } if id == foreign));
        assert_eq!(err.to_string(), "no contract registered as c1");
        assert_eq!(err.member(), None);
    }
}
