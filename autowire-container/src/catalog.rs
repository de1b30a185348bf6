//! Link-time component discovery.
//!
//! `#[derive(Component)]` submits a [`ComponentEntry`] for every component
//! (unless it opts out with `#[component(skip_scan)]`). Hand-written
//! [`Component`] impls can join with [`submit_component!`]:
//!
//! ```
//! use autowire_container::prelude::*;
//! use autowire_container::submit_component;
//!
//! struct Heartbeat;
//!
//! impl Component for Heartbeat {
//!     fn metadata() -> TypeMetadata {
//!         TypeMetadata::builder::<Heartbeat>()
//!             .register(RegisterService::singleton())
//!             .constructor(vec![], |_| Ok(Heartbeat))
//!             .build()
//!     }
//! }
//!
//! submit_component!(Heartbeat);
//!
//! assert!(Catalog.contains(&TypeKey::of::<Heartbeat>()));
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::key::TypeKey;
use crate::metadata::{Component, MetadataProvider, TypeMetadata};
use crate::planner::{PlanCache, RegistrationPlanner};
use crate::registry::ServiceRegistration;

/// A component submitted for discovery.
pub struct ComponentEntry {
    key: fn() -> TypeKey,
    metadata: fn() -> TypeMetadata,
}

impl ComponentEntry {
    pub const fn of<C: Component>() -> Self {
        Self {
            key: TypeKey::of::<C>,
            metadata: C::metadata,
        }
    }

    pub fn key(&self) -> TypeKey {
        (self.key)()
    }

    pub fn metadata(&self) -> TypeMetadata {
        (self.metadata)()
    }
}

inventory::collect!(ComponentEntry);

static INDEX: Lazy<HashMap<TypeKey, &'static ComponentEntry>> = Lazy::new(|| {
    let index: HashMap<TypeKey, &'static ComponentEntry> = inventory::iter::<ComponentEntry>
        .into_iter()
        .map(|entry| (entry.key(), entry))
        .collect();
    debug!(components = index.len(), "Indexed component catalog");
    index
});

// Catalog metadata is fixed for the process, so its factories can be kept.
static PLANS: Lazy<Arc<PlanCache>> = Lazy::new(|| Arc::new(PlanCache::new()));

/// Every component submitted anywhere in the final binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog;

impl Catalog {
    /// Catalogued implementation keys, ordered by type name.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = INDEX.keys().copied().collect();
        keys.sort_by_key(|key| key.type_name());
        keys
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        INDEX.contains_key(key)
    }

    pub fn len(&self) -> usize {
        INDEX.len()
    }

    pub fn is_empty(&self) -> bool {
        INDEX.is_empty()
    }

    /// Plans every catalogued component for `environment`.
    ///
    /// Components are planned in type-name order; the first failure aborts
    /// the scan. Compiled factories are cached for the process lifetime.
    #[instrument(skip(self))]
    pub fn scan(&self, environment: &str) -> Result<Vec<ServiceRegistration>> {
        let planner = RegistrationPlanner::new(*self).with_shared_cache(PLANS.clone());

        let mut registrations = Vec::new();
        for key in self.keys() {
            registrations.extend(planner.plan(&key, environment)?);
        }

        debug!(registrations = registrations.len(), "Catalog scanned");
        Ok(registrations)
    }
}

impl MetadataProvider for Catalog {
    fn type_metadata(&self, ty: &TypeKey) -> Option<TypeMetadata> {
        INDEX.get(ty).map(|entry| entry.metadata())
    }
}

/// Submits a [`Component`] type to the [`Catalog`].
#[macro_export]
macro_rules! submit_component {
    ($component:ty) => {
        $crate::__private::inventory::submit! {
            $crate::catalog::ComponentEntry::of::<$component>()
        }
    };
}
