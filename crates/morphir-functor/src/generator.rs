//! Generators (functors) and their instantiation.

use crate::contract::Contract;
use crate::error::{FunctorError, Result, Side};
use crate::identity::{GeneratorId, Origin, TypeIdentityTracker};
use crate::module::{Module, ModuleBuilder, Sealing};
use crate::naming::Name;
use crate::types::TypeEnv;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span};

type Body = dyn Fn(&Module, &mut ModuleBuilder) -> Result<()> + Send + Sync;

/// A mapping from modules satisfying `input` to new modules.
///
/// The body sees its argument only through the input contract. When an
/// output contract is declared, the result is restricted to it and its
/// abstract types are minted per application.
#[derive(Clone)]
pub struct Generator {
    id: GeneratorId,
    name: Name,
    parameter: Name,
    input: Arc<Contract>,
    output: Option<Arc<Contract>>,
    body: Arc<Body>,
}

impl Generator {
    pub fn new<F>(name: impl Into<Name>, parameter: impl Into<Name>, input: Contract, body: F) -> Self
    where
        F: Fn(&Module, &mut ModuleBuilder) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            id: TypeIdentityTracker::global().next_generator_id(),
            name: name.into(),
            parameter: parameter.into(),
            input: Arc::new(input),
            output: None,
            body: Arc::new(body),
        }
    }

    /// Declare the result contract. It may project types of the parameter
    /// (`Endpoint.t`) but of no other module.
    pub fn with_output(mut self, output: Contract) -> Result<Self> {
        if let Some(module) = output
            .projected_modules()
            .into_iter()
            .find(|m| *m != self.parameter)
        {
            return Err(FunctorError::UnboundType { name: module });
        }
        self.output = Some(Arc::new(output));
        Ok(self)
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn parameter(&self) -> Name {
        self.parameter
    }

    pub fn input(&self) -> &Arc<Contract> {
        &self.input
    }

    pub fn output(&self) -> Option<&Arc<Contract>> {
        self.output.as_ref()
    }

    /// Shorthand for [`instantiate`].
    pub fn apply(&self, input: &Module) -> Result<Module> {
        instantiate(self, input)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameter", &self.parameter)
            .field("input", &self.input.name())
            .field("output", &self.output.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} : {})", self.name, self.parameter, self.input.name())?;
        if let Some(output) = &self.output {
            write!(f, " : {}", output.name())?;
        }
        Ok(())
    }
}

/// Apply `generator` to `input`.
///
/// Fails with [`FunctorError::ContractViolation`] when `input` does not
/// satisfy the input contract, or when the body builds a module that does
/// not satisfy the declared output contract. Each call runs the body again
/// and yields a module with a new id; calls with the same argument agree on
/// every minted type.
pub fn instantiate(generator: &Generator, input: &Module) -> Result<Module> {
    let span = info_span!(
        "instantiate",
        generator = %generator.name,
        argument = %input.id(),
    );
    let _guard = span.enter();

    let name = generator.name;
    let violation = |side: Side| {
        move |source: FunctorError| {
            debug!(%side, error = %source, "contract violation");
            FunctorError::ContractViolation {
                generator: name,
                side,
                source: Box::new(source),
            }
        }
    };

    let view = input
        .restrict(&generator.input, Sealing::Transparent, input.label())
        .map_err(violation(Side::Input))?;

    let origin = Origin::Application {
        generator: generator.id,
        argument: input.id(),
    };
    let label = Name::new(&format!("{}({})", generator.name, input.label()));
    let mut builder = ModuleBuilder::for_application(label, origin, generator.parameter, &view);
    (generator.body)(&view, &mut builder)?;
    let raw = builder.build()?;

    let output = match &generator.output {
        None => raw,
        Some(contract) => {
            let mut env = TypeEnv::new();
            env.bind_module(generator.parameter, view.exposed_types());
            let contract = contract.resolve_projections(&env);
            raw.restrict(&contract, Sealing::Opaque(origin), label)
                .map_err(violation(Side::Output))?
        }
    };
    info!(output = %output.id(), label = %output.label(), "instantiated");
    Ok(output)
}
