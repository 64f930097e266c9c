//! Construction-time dependency gating.
//!
//! Every provider is built from an options value implementing [`Readiness`]
//! through [`Construct::build`]. [`prepare`] validates the options, checks
//! availability and only then acquires the dependencies, so a provider
//! instance never exists without them.

use crate::error::{Error, Result};
use crate::traits::EmbeddingProvider;

/// An optional runtime dependency and how to obtain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub remedy: String,
}

impl Requirement {
    pub fn new(name: impl Into<String>, remedy: impl Into<String>) -> Self {
        Self { name: name.into(), remedy: remedy.into() }
    }

    pub fn missing(&self) -> Error {
        Error::DependencyMissing { dependency: self.name.clone(), remedy: self.remedy.clone() }
    }
}

pub trait Readiness {
    /// Handles acquired for the provider (devices, loaded models, ...).
    type Deps;

    fn requirement(&self) -> Requirement;

    /// Reject option values no dependency could satisfy.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Whether the dependencies are usable. Must not acquire anything.
    fn is_available(&self) -> bool;

    fn acquire(&self) -> Result<Self::Deps>;
}

pub fn prepare<R: Readiness + ?Sized>(options: &R) -> Result<R::Deps> {
    options.validate()?;
    if !options.is_available() {
        return Err(options.requirement().missing());
    }
    options.acquire()
}

/// Construction path shared by every provider: options in, readiness checked,
/// dependencies acquired, instance out.
pub trait Construct: EmbeddingProvider + Sized {
    type Options: Readiness;

    /// Assemble an instance from already acquired dependencies.
    fn from_deps(options: Self::Options, deps: <Self::Options as Readiness>::Deps) -> Result<Self>;

    fn is_available(options: &Self::Options) -> bool {
        options.is_available()
    }

    fn build(options: Self::Options) -> Result<Self> {
        let deps = prepare(&options)?;
        Self::from_deps(options, deps)
    }
}
