//! Core of autowire: metadata-driven registration planning.

pub mod catalog;
pub mod container;
pub mod environment;
pub mod error;
pub mod factory;
pub mod key;
pub mod lifetime;
pub mod metadata;
pub mod planner;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use error::{Result, WiringError};
pub use key::TypeKey;
pub use lifetime::Lifetime;

pub mod prelude {
    pub use crate::catalog::Catalog;
    pub use crate::container::{ServiceCollection, ServiceContainer};
    pub use crate::environment::EnvironmentSelector;
    pub use crate::error::{
        AmbiguousResolverError, ConstructorSelectionError, Result, ServiceNotFoundError,
        SlotKind, TypeMismatchError, UnresolvedDependencyError, WiringError,
    };
    pub use crate::factory::{Factory, PlanDescription};
    pub use crate::key::TypeKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::metadata::{
        Arguments, Component, MetadataProvider, MetadataTable, ParameterInfo, PropertyInfo,
        RegisterService, TypeMetadata, Visibility,
    };
    pub use crate::planner::{PlanCache, RegistrationPlanner};
    pub use crate::provider::{Instance, ServiceProvider, ServiceProviderExt};
    pub use crate::registry::{ServiceDescriptor, ServiceRegistration};
    pub use crate::resolver::{
        Constant, DefaultResolver, DependencyResolver, FnResolver, Named, ResolutionStrategy,
    };
}

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
