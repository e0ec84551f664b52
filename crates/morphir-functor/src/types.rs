//! Type expressions.
//!
//! A `Type` is written in terms of the contract or module it appears in:
//! `Local` names refer to sibling type members, `Projection` names a type
//! member of a functor parameter, and `Nominal` is a type that some module
//! has already minted. [`TypeEnv`] resolves the first two into concrete
//! types.
//!
//! # Examples
//!
//! ```rust,ignore
//! // endpoint -> endpoint -> t
//! let create = Type::arrows(
//!     vec![Type::local("endpoint"), Type::local("endpoint")],
//!     Type::local("t"),
//! );
//! ```

use crate::identity::TypeTag;
use crate::naming::Name;
use indexmap::IndexMap;
use std::fmt;

/// Built-in type names.
pub const INT: &str = "int";
pub const BOOL: &str = "bool";
pub const STRING: &str = "string";
pub const LIST: &str = "list";

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Type member of the enclosing contract or module
    ///
    /// Example: `t` in `val compare : t -> t -> int`
    Local(Name),

    /// Built-in type, possibly applied to arguments
    ///
    /// Example: `int`, `list(string)`
    Named(Name, Vec<Type>),

    /// Type member of a functor parameter
    ///
    /// Example: `Endpoint.t`
    Projection(Name, Name),

    /// Type minted by a definition, a sealing or a functor application
    Nominal(TypeTag),

    /// Tuple type
    ///
    /// Example: `endpoint * endpoint`
    Tuple(Vec<Type>),

    /// Function type (curried)
    ///
    /// Example: `t -> int`
    Function(Box<Type>, Box<Type>),

    /// Unit type
    Unit,
}

impl Type {
    pub fn local(name: impl Into<Name>) -> Self {
        Type::Local(name.into())
    }

    pub fn named(name: impl Into<Name>, args: Vec<Type>) -> Self {
        Type::Named(name.into(), args)
    }

    pub fn int() -> Self {
        Type::named(INT, vec![])
    }

    pub fn bool() -> Self {
        Type::named(BOOL, vec![])
    }

    pub fn string() -> Self {
        Type::named(STRING, vec![])
    }

    pub fn list(element: Type) -> Self {
        Type::named(LIST, vec![element])
    }

    pub fn projection(module: impl Into<Name>, member: impl Into<Name>) -> Self {
        Type::Projection(module.into(), member.into())
    }

    pub fn tuple(elements: Vec<Type>) -> Self {
        Type::Tuple(elements)
    }

    pub fn function(arg: Type, result: Type) -> Self {
        Type::Function(Box::new(arg), Box::new(result))
    }

    /// `p1 -> p2 -> ... -> result`
    pub fn arrows(params: Vec<Type>, result: Type) -> Self {
        params
            .into_iter()
            .rev()
            .fold(result, |acc, param| Type::function(param, acc))
    }

    /// Split a curried function type into its parameters and final result.
    /// Non-function types have no parameters.
    pub fn uncurry(&self) -> (Vec<&Type>, &Type) {
        let mut params = Vec::new();
        let mut current = self;
        while let Type::Function(arg, result) = current {
            params.push(arg.as_ref());
            current = result;
        }
        (params, current)
    }

    /// Rebuild this type bottom-up, letting `f` replace any sub-term.
    ///
    /// `f` sees each node before its children; returning `Some` replaces the
    /// node without descending into it.
    pub fn transform<F>(&self, f: &F) -> Type
    where
        F: Fn(&Type) -> Option<Type>,
    {
        if let Some(replaced) = f(self) {
            return replaced;
        }
        match self {
            Type::Named(name, args) => {
                Type::Named(*name, args.iter().map(|a| a.transform(f)).collect())
            }
            Type::Tuple(elements) => Type::Tuple(elements.iter().map(|e| e.transform(f)).collect()),
            Type::Function(arg, result) => Type::function(arg.transform(f), result.transform(f)),
            Type::Local(_) | Type::Projection(_, _) | Type::Nominal(_) | Type::Unit => self.clone(),
        }
    }

    /// Visit every node of this type.
    pub fn walk<F>(&self, f: &mut F)
    where
        F: FnMut(&Type),
    {
        f(self);
        match self {
            Type::Named(_, children) | Type::Tuple(children) => {
                for child in children {
                    child.walk(f);
                }
            }
            Type::Function(arg, result) => {
                arg.walk(f);
                result.walk(f);
            }
            Type::Local(_) | Type::Projection(_, _) | Type::Nominal(_) | Type::Unit => {}
        }
    }

    /// Local type names referenced by this type, in order of appearance.
    pub fn locals(&self) -> Vec<Name> {
        let mut found = Vec::new();
        self.walk(&mut |t| {
            if let Type::Local(name) = t {
                if !found.contains(name) {
                    found.push(*name);
                }
            }
        });
        found
    }

    pub fn mentions_local(&self, name: &Name) -> bool {
        let mut hit = false;
        self.walk(&mut |t| {
            if matches!(t, Type::Local(n) if n == name) {
                hit = true;
            }
        });
        hit
    }

    /// Replace every `Local(name)` with `replacement`.
    pub fn substitute_local(&self, name: &Name, replacement: &Type) -> Type {
        self.transform(&|t| match t {
            Type::Local(n) if n == name => Some(replacement.clone()),
            _ => None,
        })
    }

    // Replace every occurrence of the nominal type `tag` with `Local(name)`.
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Function(arg, result) => {
                if matches!(arg.as_ref(), Type::Function(_, _)) {
                    write!(f, "({arg}) -> {result}")
                } else {
                    write!(f, "{arg} -> {result}")
                }
            }
            Type::Tuple(elements) => {
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" * ")?;
                    }
                    if matches!(element, Type::Function(_, _) | Type::Tuple(_)) {
                        write!(f, "({element})")?;
                    } else {
                        write!(f, "{element}")?;
                    }
                }
                Ok(())
            }
            Type::Local(name) => write!(f, "{name}"),
            Type::Named(name, args) if args.is_empty() => write!(f, "{name}"),
            Type::Named(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Type::Projection(module, member) => write!(f, "{module}.{member}"),
            Type::Nominal(tag) => write!(f, "{tag}"),
            Type::Unit => f.write_str("unit"),
        }
    }
}

/// Resolution of local and parameter type names to concrete types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnv {
    locals: IndexMap<Name, Type>,
    modules: IndexMap<Name, IndexMap<Name, Type>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a local type name. `ty` is resolved against the bindings already
    /// present, so later lookups never need to recurse.
    pub fn bind_local(&mut self, name: Name, ty: &Type) -> Type {
        let resolved = self.resolve(ty);
        self.locals.insert(name, resolved.clone());
        resolved
    }

    /// Bind the type members of a functor parameter.
    pub fn bind_module(&mut self, module: Name, types: IndexMap<Name, Type>) {
        self.modules.insert(module, types);
    }

    pub fn local(&self, name: &Name) -> Option<&Type> {
        self.locals.get(name)
    }

    pub fn locals(&self) -> impl Iterator<Item = (&Name, &Type)> {
        self.locals.iter()
    }

    pub fn projection(&self, module: &Name, member: &Name) -> Option<&Type> {
        self.modules.get(module).and_then(|types| types.get(member))
    }

    /// Replace bound locals and projections; unbound names are left as-is.
    pub fn resolve(&self, ty: &Type) -> Type {
        ty.transform(&|t| match t {
            Type::Local(name) => self.locals.get(name).cloned(),
            Type::Projection(module, member) => self.projection(module, member).cloned(),
            _ => None,
        })
    }

    /// Replace projections only, keeping local names.
    pub fn resolve_projections(&self, ty: &Type) -> Type {
        ty.transform(&|t| match t {
            Type::Projection(module, member) => self.projection(module, member).cloned(),
            _ => None,
        })
    }
}
