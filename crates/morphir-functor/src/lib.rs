//! Module functors for Morphir.
//!
//! This crate models ML-style module signatures (contracts), modules, and
//! functors (generators) that build new modules from a contract-checked
//! argument. It tracks which output types are shared with the argument and
//! which are freshly minted, so that two applications of the same functor
//! never produce interchangeable abstract types.
//!
//! # Example
//!
//! ```rust,ignore
//! let prelude = Prelude::load()?;
//! let make_interval = prelude.generator("MakeInterval")?;
//! let ints = instantiate(make_interval, prelude.module("IntAscending")?)?;
//! let empty = ints.call("create", &[Value::int(4), Value::int(3)])?;
//! ```

pub mod boundary;
pub mod contract;
pub mod error;
pub mod generator;
pub mod identity;
pub mod module;
pub mod naming;
pub mod prelude;
pub mod registry;
pub mod syntax;
pub mod types;
pub mod value;

pub use contract::{Constraint, ConstructorSpecification, Contract, Member, TypeSpecification};
pub use error::{FunctorError, Result, Side};
pub use generator::{instantiate, Generator};
pub use identity::{GeneratorId, ModuleId, Origin, TypeFact, TypeFacts, TypeIdentityTracker, TypeTag};
pub use module::{ExposedType, Module, ModuleBuilder, TypeDefinition, VariantConstructors};
pub use naming::Name;
pub use prelude::Prelude;
pub use registry::{satisfies, ContractId, InterfaceRegistry, Satisfaction};
pub use types::{Type, TypeEnv};
pub use value::{NativeFunction, SealedValue, Value, VariantValue};
