//! # The reference container
//!
//! A minimal lookup context for planned registrations.
//!
//! # Architecture
//! ```text
//! RegistrationPlanner ──plan()──> Vec<ServiceRegistration>
//!                                          │
//!                                          ▼
//!                        ServiceCollection ──build()──> ServiceContainer
//!                                                              │
//!                                                       get_service(key)
//! ```
//!
//! The container records each registration's [`Lifetime`] but does not
//! cache instances: every request invokes the registration again.
//!
//! # Examples
//! ```rust
//! use autowire_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let container = ServiceCollection::new()
//!     .value(String::from("postgres://localhost"))
//!     .factory::<Arc<Database>>(Lifetime::Singleton, |provider| {
//!         let url: String = provider.get()?;
//!         Ok(Arc::new(Database { url }))
//!     })
//!     .build()
//!     .expect("Failed to build container");
//!
//! let db: Arc<Database> = container.get().expect("Failed to resolve");
//! assert_eq!(db.url, "postgres://localhost");
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, instrument, trace};

use autowire_support::rendering::suggest_similar;

use crate::error::{Result, ServiceNotFoundError, WiringError};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::metadata::{Component, MetadataTable};
use crate::planner::RegistrationPlanner;
use crate::provider::{Instance, ServiceProvider};
use crate::registry::{ServiceDescriptor, ServiceRegistration};

const MAX_SUGGESTIONS: usize = 3;

// ============================================================
// ServiceCollection
// ============================================================

/// Collects registrations, then builds a [`ServiceContainer`].
///
/// Errors raised while adding (for example, planning a component) are
/// held back and returned by [`build()`](ServiceCollection::build), so the
/// builder chain stays fluent.
#[derive(Default)]
pub struct ServiceCollection {
    registrations: Vec<ServiceRegistration>,
    allow_override: bool,
    deferred: Option<WiringError>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let later registrations replace earlier ones with the same service
    /// identity.
    pub fn allow_override(mut self, allow: bool) -> Self {
        self.allow_override = allow;
        self
    }

    // ── Hand-written registrations ──

    /// Register a pre-built value; every request receives a clone.
    ///
    /// Use `Arc<T>` for cheap sharing.
    pub fn value<T: Clone + Send + Sync + 'static>(self, value: T) -> Self {
        self.add(ServiceRegistration::value(TypeKey::of::<T>(), value))
    }

    /// Register a pre-built value under a binding name.
    pub fn named_value<T: Clone + Send + Sync + 'static>(self, name: &'static str, value: T) -> Self {
        self.add(ServiceRegistration::value(TypeKey::named::<T>(name), value))
    }

    /// Register a factory closure under `T`.
    pub fn factory<T: Send + Sync + 'static>(
        self,
        lifetime: Lifetime,
        factory: impl Fn(&dyn ServiceProvider) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.add(ServiceRegistration::from_fn(lifetime, factory))
    }

    // ── Planned registrations ──

    pub fn add(mut self, registration: ServiceRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    pub fn add_all(mut self, registrations: impl IntoIterator<Item = ServiceRegistration>) -> Self {
        self.registrations.extend(registrations);
        self
    }

    /// Plan `C` for `environment` and add the resulting registrations.
    pub fn component<C: Component>(self, environment: &str) -> Self {
        let planner = RegistrationPlanner::new(MetadataTable::new().with_component::<C>());
        let planned = planner.plan(&TypeKey::of::<C>(), environment);
        self.add_planned(planned)
    }

    /// Plan every catalogued component for `environment`.
    pub fn scan(self, environment: &str) -> Self {
        let planned = crate::catalog::Catalog.scan(environment);
        self.add_planned(planned)
    }

    fn add_planned(mut self, planned: Result<Vec<ServiceRegistration>>) -> Self {
        match planned {
            Ok(registrations) => self.add_all(registrations),
            Err(error) => {
                debug!(error = %error, "Deferring registration error to build");
                self.deferred.get_or_insert(error);
                self
            }
        }
    }

    /// Descriptors added so far, in insertion order.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        self.registrations.iter().map(|r| *r.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    // ── Build ──

    /// Build the container.
    ///
    /// # Errors
    /// The first error deferred while adding, or
    /// [`WiringError::AlreadyRegistered`] for a duplicate service identity
    /// when overriding is not allowed.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<ServiceContainer> {
        if let Some(error) = self.deferred {
            return Err(error);
        }

        info!(registered = self.registrations.len(), "Building container");

        let mut services: HashMap<TypeKey, ServiceRegistration> = HashMap::new();
        for registration in self.registrations {
            let key = registration.service();
            if !self.allow_override && services.contains_key(&key) {
                return Err(WiringError::AlreadyRegistered(key));
            }
            debug!(key = %key, lifetime = %registration.lifetime(), "Registered service");
            services.insert(key, registration);
        }

        info!(services = services.len(), "Container built");
        Ok(ServiceContainer { services })
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("registered", &self.registrations.len())
            .field("allow_override", &self.allow_override)
            .field("deferred", &self.deferred.is_some())
            .finish()
    }
}

// ============================================================
// ServiceContainer
// ============================================================

/// Immutable, thread-safe lookup context.
///
/// Created by [`ServiceCollection::build()`].
pub struct ServiceContainer {
    services: HashMap<TypeKey, ServiceRegistration>,
}

impl ServiceContainer {
    /// Descriptors of every registered service, ordered by service type name.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let mut descriptors: Vec<ServiceDescriptor> =
            self.services.values().map(|r| *r.descriptor()).collect();
        descriptors.sort_by_key(|d| (d.service.type_name(), d.service.name()));
        descriptors
    }

    pub fn registration(&self, key: &TypeKey) -> Option<&ServiceRegistration> {
        self.services.get(key)
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.services.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn find_suggestions(&self, key: &TypeKey) -> Vec<String> {
        let registered: Vec<String> = self.services.keys().map(ToString::to_string).collect();
        let available: Vec<&str> = registered.iter().map(String::as_str).collect();
        suggest_similar(&key.to_string(), &available, MAX_SUGGESTIONS)
    }
}

impl ServiceProvider for ServiceContainer {
    fn get_service(&self, key: &TypeKey) -> Result<Instance> {
        trace!(key = %key, "Resolving");

        let registration = self.services.get(key).ok_or_else(|| {
            WiringError::ServiceNotFound(ServiceNotFoundError {
                requested: *key,
                suggestions: self.find_suggestions(key),
            })
        })?;

        registration.instantiate(self)
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("registered", &self.services.len())
            .finish()
    }
}

// ============================================================
// Tests
// ============================================================
