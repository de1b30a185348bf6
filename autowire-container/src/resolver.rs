//! Dependency resolvers.
//!
//! A resolver produces the value for one constructor parameter or property.
//! Every slot ends up with a [`ResolutionStrategy`]: either the default
//! (ask the lookup context for the declared type) or a custom
//! [`DependencyResolver`] attached to the slot in its metadata.
//!
//! # Examples
//! ```
//! use autowire_container::prelude::*;
//! use std::sync::Arc;
//!
//! // Always hands out the same connection string, whatever the container holds.
//! let resolver = Constant::new(String::from("postgres://localhost"));
//! let strategy = ResolutionStrategy::Custom(Arc::new(resolver));
//!
//! let container = ServiceCollection::new().build().unwrap();
//! let value = strategy.resolve(&container, &TypeKey::of::<String>()).unwrap();
//! assert_eq!(*value.downcast::<String>().unwrap(), "postgres://localhost");
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, UnresolvedDependencyError, WiringError};
use crate::key::TypeKey;
use crate::provider::{Instance, ServiceProvider};

/// Produces one dependency value.
///
/// `declared` is the static type of the slot being filled. Implementations
/// may do arbitrary work, but must return an instance of exactly that type:
/// the planner does not check, and a wrong type surfaces as
/// [`WiringError::TypeMismatch`] when the constructor or setter unboxes it.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, provider: &dyn ServiceProvider, declared: &TypeKey) -> Result<Instance>;

    /// Short label used in plan descriptions and traces.
    fn label(&self) -> String {
        autowire_support::rendering::shorten_type_name(std::any::type_name::<Self>())
    }
}

/// Asks the lookup context for the declared type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl DependencyResolver for DefaultResolver {
    fn resolve(&self, provider: &dyn ServiceProvider, declared: &TypeKey) -> Result<Instance> {
        provider.get_service(declared).map_err(|err| match err {
            WiringError::ServiceNotFound(_) => {
                WiringError::UnresolvedDependency(UnresolvedDependencyError {
                    requested: *declared,
                    cause: Box::new(err),
                })
            }
            other => other,
        })
    }

    fn label(&self) -> String {
        "default".to_string()
    }
}

/// How a single slot gets its value.
#[derive(Clone, Default)]
pub enum ResolutionStrategy {
    /// Delegate to the lookup context.
    #[default]
    Default,
    /// Delegate to an attached resolver.
    Custom(Arc<dyn DependencyResolver>),
}

impl ResolutionStrategy {
    pub fn resolve(&self, provider: &dyn ServiceProvider, declared: &TypeKey) -> Result<Instance> {
        match self {
            ResolutionStrategy::Default => {
                trace!(declared = %declared, "Resolving from lookup context");
                DefaultResolver.resolve(provider, declared)
            }
            ResolutionStrategy::Custom(resolver) => {
                trace!(declared = %declared, resolver = %resolver.label(), "Resolving with custom resolver");
                resolver.resolve(provider, declared)
            }
        }
    }

    #[inline]
    pub fn is_custom(&self) -> bool {
        matches!(self, ResolutionStrategy::Custom(_))
    }

    pub fn label(&self) -> String {
        match self {
            ResolutionStrategy::Default => DefaultResolver.label(),
            ResolutionStrategy::Custom(resolver) => format!("custom({})", resolver.label()),
        }
    }
}

impl fmt::Debug for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Default => f.write_str("Default"),
            ResolutionStrategy::Custom(resolver) => {
                f.debug_tuple("Custom").field(&resolver.label()).finish()
            }
        }
    }
}

// ── Built-in custom resolvers ──

/// Resolver backed by a closure.
///
/// ```
/// use autowire_container::prelude::*;
///
/// let resolver = FnResolver::new(|_provider, declared| {
///     assert!(declared.is::<u64>());
///     Ok(Box::new(7u64))
/// });
/// # let _ = resolver;
/// ```
pub struct FnResolver<F> {
    func: F,
    label: Option<&'static str>,
}

impl<F> FnResolver<F>
where
    F: Fn(&dyn ServiceProvider, &TypeKey) -> Result<Instance> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func, label: None }
    }

    /// Names this resolver in plan descriptions.
    pub fn labeled(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }
}

impl<F> DependencyResolver for FnResolver<F>
where
    F: Fn(&dyn ServiceProvider, &TypeKey) -> Result<Instance> + Send + Sync,
{
    fn resolve(&self, provider: &dyn ServiceProvider, declared: &TypeKey) -> Result<Instance> {
        (self.func)(provider, declared)
    }

    fn label(&self) -> String {
        self.label.unwrap_or("FnResolver").to_string()
    }
}

/// Looks the declared type up under a binding name.
///
/// A slot declared as `Arc<dyn Connection>` with `Named::new("replica")`
/// resolves `TypeKey::named::<Arc<dyn Connection>>("replica")`.
#[derive(Debug, Clone, Copy)]
pub struct Named {
    name: &'static str,
}

impl Named {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl DependencyResolver for Named {
    fn resolve(&self, provider: &dyn ServiceProvider, declared: &TypeKey) -> Result<Instance> {
        DefaultResolver.resolve(provider, &declared.with_name(self.name))
    }

    fn label(&self) -> String {
        format!("Named({:?})", self.name)
    }
}

/// Hands out clones of a fixed value.
#[derive(Debug, Clone)]
pub struct Constant<T> {
    value: T,
}

impl<T: Clone + Send + Sync + 'static> Constant<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: Clone + Send + Sync + 'static> DependencyResolver for Constant<T> {
    fn resolve(&self, _provider: &dyn ServiceProvider, _declared: &TypeKey) -> Result<Instance> {
        Ok(Box::new(self.value.clone()))
    }

    fn label(&self) -> String {
        format!(
            "Constant<{}>",
            autowire_support::rendering::shorten_type_name(std::any::type_name::<T>())
        )
    }
}
