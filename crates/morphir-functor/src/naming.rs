//! Interned member names.
//!
//! Every type, value, constructor and module name is interned once in a
//! process-wide rodeo, so names are `Copy` and compare by handle.

use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

static SYMBOLS: OnceLock<ThreadedRodeo> = OnceLock::new();

fn symbols() -> &'static ThreadedRodeo {
    SYMBOLS.get_or_init(ThreadedRodeo::new)
}

/// A member, constructor or module name.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name(Spur);

impl Name {
    /// Intern `s` and return its handle.
    pub fn new(s: &str) -> Self {
        Name(symbols().get_or_intern(s))
    }

    /// Resolve the handle back to its text.
    pub fn as_str(&self) -> &'static str {
        symbols().resolve(&self.0)
    }

    /// Capitalised names denote modules, parameters and constructors.
    pub fn is_capitalized(&self) -> bool {
        self.as_str().chars().next().is_some_and(char::is_uppercase)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name::new(s)
    }
}

impl From<&String> for Name {
    fn from(s: &String) -> Self {
        Name::new(s)
    }
}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({:?})", self.as_str())
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Name::new(&s))
    }
}
