//! Service registrations, as the planner hands them to a container.
//!
//! A [`ServiceRegistration`] pairs a [`ServiceDescriptor`] (identity,
//! implementation, lifetime) with the means to build an instance: either a
//! planned [`Factory`] shared by every declaration of the same type, or a
//! plain factory closure for hand-registered services.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::Result;
use crate::factory::Factory;
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::metadata::ProjectionFn;
use crate::provider::{Instance, ServiceProvider};

/// Factory closure for services registered by hand.
///
/// `Arc` rather than `Box`: registrations are cloned into containers that
/// are shared between threads.
pub type FactoryFn = Arc<dyn Fn(&dyn ServiceProvider) -> Result<Instance> + Send + Sync>;

/// Identity, implementation and lifetime of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    /// Key consumers resolve.
    pub service: TypeKey,
    /// Type the factory builds.
    pub implementation: TypeKey,
    pub lifetime: Lifetime,
}

#[derive(Clone)]
enum Activator {
    Planned {
        factory: Arc<Factory>,
        projection: Option<ProjectionFn>,
    },
    Delegate(FactoryFn),
}

/// A descriptor together with the way to instantiate it.
#[derive(Clone)]
pub struct ServiceRegistration {
    descriptor: ServiceDescriptor,
    activator: Activator,
}

impl ServiceRegistration {
    pub(crate) fn planned(
        descriptor: ServiceDescriptor,
        factory: Arc<Factory>,
        projection: Option<ProjectionFn>,
    ) -> Self {
        Self {
            descriptor,
            activator: Activator::Planned { factory, projection },
        }
    }

    /// Registers `factory` under `T`.
    pub fn from_fn<T: Send + Sync + 'static>(
        lifetime: Lifetime,
        factory: impl Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        let key = TypeKey::of::<T>();
        Self::from_erased(
            ServiceDescriptor {
                service: key,
                implementation: key,
                lifetime,
            },
            Arc::new(move |provider: &dyn ServiceProvider| {
                Ok(Box::new(factory(provider)?) as Instance)
            }),
        )
    }

    /// Registers a clone of `value` under `service`.
    pub fn value<T: Clone + Send + Sync + 'static>(service: TypeKey, value: T) -> Self {
        Self::from_erased(
            ServiceDescriptor {
                service,
                implementation: TypeKey::of::<T>(),
                lifetime: Lifetime::Singleton,
            },
            Arc::new(move |_: &dyn ServiceProvider| Ok(Box::new(value.clone()) as Instance)),
        )
    }

    pub fn from_erased(descriptor: ServiceDescriptor, factory: FactoryFn) -> Self {
        Self {
            descriptor,
            activator: Activator::Delegate(factory),
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn service(&self) -> TypeKey {
        self.descriptor.service
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.descriptor.lifetime
    }

    /// The compiled plan, for planned registrations.
    pub fn factory(&self) -> Option<&Arc<Factory>> {
        match &self.activator {
            Activator::Planned { factory, .. } => Some(factory),
            Activator::Delegate(_) => None,
        }
    }

    /// Builds one instance of the service.
    pub fn instantiate(&self, provider: &dyn ServiceProvider) -> Result<Instance> {
        trace!(service = %self.descriptor.service, "Instantiating");
        match &self.activator {
            Activator::Planned { factory, projection } => {
                let instance = factory.invoke(provider)?;
                match projection {
                    Some(project) => project(instance),
                    None => Ok(instance),
                }
            }
            Activator::Delegate(factory) => factory(provider),
        }
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("descriptor", &self.descriptor)
            .field("planned", &self.factory().is_some())
            .finish()
    }
}
