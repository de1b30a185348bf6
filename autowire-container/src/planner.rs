//! The registration planner.
//!
//! Turns a candidate type's metadata into service registrations:
//!
//! ```text
//! TypeMetadata ──gate──> registration declarations ──┐
//!        │                                            ├──> Vec<ServiceRegistration>
//!        └──compile──> Arc<Factory> (shared) ─────────┘
//! ```
//!
//! # Examples
//! ```
//! use autowire_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock(u64);
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { self.0 }
//! }
//!
//! let table = MetadataTable::new().with(
//!     TypeMetadata::builder::<FixedClock>()
//!         .register(RegisterService::singleton())
//!         .register_as::<Arc<dyn Clock>>(Lifetime::Singleton, |c| Arc::new(c) as Arc<dyn Clock>)
//!         .constructor(vec![ParameterInfo::of::<u64>("epoch")], |args| Ok(FixedClock(args.take()?)))
//!         .build(),
//! );
//!
//! let planner = RegistrationPlanner::new(&table);
//! let registrations = planner.plan(&TypeKey::of::<FixedClock>(), "Production").unwrap();
//! assert_eq!(registrations.len(), 2);
//!
//! let container = ServiceCollection::new()
//!     .value(1_700_000_000u64)
//!     .add_all(registrations)
//!     .build()
//!     .unwrap();
//!
//! let clock: Arc<dyn Clock> = container.get().unwrap();
//! assert_eq!(clock.now(), 1_700_000_000);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, trace};

use crate::environment;
use crate::error::{ConstructorSelectionError, Result, WiringError};
use crate::factory::{Factory, ParameterPlan, PropertyPlan};
use crate::key::TypeKey;
use crate::metadata::{MetadataProvider, TypeMetadata};
use crate::registry::{ServiceDescriptor, ServiceRegistration};
use crate::resolver::ResolutionStrategy;

/// Plans service registrations from component metadata.
pub struct RegistrationPlanner<M> {
    metadata: M,
    cache: Option<Arc<PlanCache>>,
}

impl<M: MetadataProvider> RegistrationPlanner<M> {
    pub fn new(metadata: M) -> Self {
        Self {
            metadata,
            cache: None,
        }
    }

    /// Reuse compiled factories across `plan` calls on this planner.
    ///
    /// The cache belongs to the planner and only ever holds factories
    /// compiled from its own metadata provider.
    pub fn cached(self) -> Self {
        self.with_shared_cache(Arc::new(PlanCache::new()))
    }

    /// Plans through `cache`, which must only be fed by this provider.
    pub(crate) fn with_shared_cache(mut self, cache: Arc<PlanCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// The planner's factory cache, if it has one.
    pub fn cache(&self) -> Option<&PlanCache> {
        self.cache.as_deref()
    }

    /// Produces one registration per declaration on `candidate`.
    ///
    /// Returns an empty list when the environment gate rejects
    /// `environment` or the type declares no registrations. All returned
    /// registrations share one compiled [`Factory`].
    ///
    /// # Errors
    /// - [`WiringError::UnknownType`]: no metadata for `candidate`
    /// - [`WiringError::ConstructorSelection`]: not exactly one constructor
    /// - [`WiringError::AmbiguousResolver`]: a slot has several resolvers
    #[instrument(skip(self, candidate), name = "plan", fields(candidate = %candidate))]
    pub fn plan(&self, candidate: &TypeKey, environment: &str) -> Result<Vec<ServiceRegistration>> {
        let metadata = self
            .metadata
            .type_metadata(candidate)
            .ok_or(WiringError::UnknownType(*candidate))?;

        if !environment::is_enabled(metadata.environment(), environment) {
            debug!(environment, "Excluded by environment gate");
            return Ok(Vec::new());
        }

        if metadata.registrations().is_empty() {
            trace!("No registration declarations");
            return Ok(Vec::new());
        }

        let factory = self.factory_for(&metadata)?;
        let implementation = metadata.implementation();

        let registrations = metadata
            .registrations()
            .iter()
            .map(|declaration| {
                let descriptor = ServiceDescriptor {
                    service: declaration.service_key().unwrap_or(implementation),
                    implementation,
                    lifetime: declaration.lifetime(),
                };
                debug!(
                    service = %descriptor.service,
                    lifetime = %descriptor.lifetime,
                    "Planned registration"
                );
                ServiceRegistration::planned(
                    descriptor,
                    factory.clone(),
                    declaration.projection().cloned(),
                )
            })
            .collect();

        Ok(registrations)
    }

    fn factory_for(&self, metadata: &TypeMetadata) -> Result<Arc<Factory>> {
        match &self.cache {
            Some(cache) => cache.get_or_compile(metadata.implementation(), || compile(metadata)),
            None => compile(metadata).map(Arc::new),
        }
    }
}

/// Compiles the factory plan of one type.
///
/// Reads every resolver declaration once; the returned [`Factory`] never
/// touches metadata again.
pub fn compile(metadata: &TypeMetadata) -> Result<Factory> {
    let owner = metadata.implementation();

    let constructor = match metadata.constructors() {
        [only] => only,
        other => {
            return Err(WiringError::ConstructorSelection(ConstructorSelectionError {
                owner,
                found: other.len(),
            }));
        }
    };

    let parameters = constructor
        .parameters()
        .iter()
        .map(|parameter| {
            Ok(ParameterPlan {
                name: parameter.name(),
                declared: parameter.declared(),
                strategy: parameter.strategy(owner)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut properties = Vec::new();
    for property in metadata.properties() {
        let strategy = property.strategy(owner)?;
        match (&strategy, property.setter()) {
            (ResolutionStrategy::Custom(_), Some(setter)) if setter.is_public() => {
                properties.push(PropertyPlan {
                    name: property.name(),
                    declared: property.declared(),
                    strategy,
                    setter: setter.handle().clone(),
                });
            }
            _ => trace!(property = property.name(), "Property not injectable, skipped"),
        }
    }

    debug!(
        implementation = %owner,
        parameters = parameters.len(),
        properties = properties.len(),
        "Compiled factory"
    );

    Ok(Factory::new(
        owner,
        parameters,
        constructor.handle().clone(),
        properties,
    ))
}

/// Compiled factories keyed by implementation type.
///
/// Lets planning the same type again, under another environment, reuse the
/// factory compiled the first time. Keys carry no provider identity, so a
/// cache is owned by one planner (see [`RegistrationPlanner::cached`]) and
/// never shared between metadata providers.
pub struct PlanCache {
    factories: RwLock<HashMap<TypeKey, Arc<Factory>>>,
}

impl PlanCache {
    pub(crate) fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached factory for `key`, compiling it on first use.
    ///
    /// Compilation runs outside the lock; if two threads race on the same
    /// key, the first stored factory wins.
    pub(crate) fn get_or_compile(
        &self,
        key: TypeKey,
        compile: impl FnOnce() -> Result<Factory>,
    ) -> Result<Arc<Factory>> {
        if let Some(factory) = self.factories.read().get(&key) {
            trace!(key = %key, "Plan cache hit");
            return Ok(factory.clone());
        }

        let compiled = Arc::new(compile()?);
        let mut factories = self.factories.write();
        Ok(factories.entry(key).or_insert(compiled).clone())
    }

    pub fn get(&self, key: &TypeKey) -> Option<Arc<Factory>> {
        self.factories.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    pub fn clear(&self) {
        self.factories.write().clear();
    }
}

impl std::fmt::Debug for PlanCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanCache").field("compiled", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EnvironmentSelector;
    use crate::error::{ServiceNotFoundError, SlotKind};
    use crate::lifetime::Lifetime;
    use crate::metadata::{
        Arguments, MetadataTable, ParameterInfo, PropertyInfo, RegisterService, Visibility,
    };
    use crate::provider::{Instance, ServiceProvider};
    use crate::resolver::{Constant, DependencyResolver, FnResolver, Named};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ── Scenario types ──

    trait Logger: Send + Sync {
        fn name(&self) -> &str;
    }

    struct ConsoleLogger;

    impl Logger for ConsoleLogger {
        fn name(&self) -> &str {
            "console"
        }
    }

    trait Connection: Send + Sync {
        fn target(&self) -> &str;
    }

    struct DbConnection(&'static str);

    impl Connection for DbConnection {
        fn target(&self) -> &str {
            self.0
        }
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Config {
        retries: u32,
    }

    struct Widget {
        log: Arc<dyn Logger>,
        conn: Arc<dyn Connection>,
        settings: Config,
    }

    /// Records every resolution in order.
    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    /// Lookup context serving only `Arc<dyn Logger>`, journaling lookups.
    struct LoggerOnly {
        journal: Arc<Journal>,
    }

    impl ServiceProvider for LoggerOnly {
        fn get_service(&self, key: &TypeKey) -> Result<Instance> {
            if key.is::<Arc<dyn Logger>>() {
                self.journal.push("lookup:logger");
                return Ok(Box::new(Arc::new(ConsoleLogger) as Arc<dyn Logger>));
            }
            self.journal.push("lookup:miss");
            Err(WiringError::ServiceNotFound(ServiceNotFoundError {
                requested: *key,
                suggestions: vec![],
            }))
        }
    }

    fn journaled<T: Send + Sync + 'static>(
        journal: &Arc<Journal>,
        label: &'static str,
        make: impl Fn() -> T + Send + Sync + 'static,
    ) -> Arc<dyn DependencyResolver> {
        let journal = journal.clone();
        Arc::new(
            FnResolver::new(move |_: &dyn ServiceProvider, _: &TypeKey| {
                journal.push(label);
                Ok(Box::new(make()) as Instance)
            })
            .labeled(label),
        )
    }

    fn widget_metadata(journal: &Arc<Journal>) -> TypeMetadata {
        TypeMetadata::builder::<Widget>()
            .register(RegisterService::transient())
            .constructor(
                vec![
                    ParameterInfo::of::<Arc<dyn Logger>>("log"),
                    ParameterInfo::of::<Arc<dyn Connection>>("conn").with_shared_resolver(journaled(
                        journal,
                        "db",
                        || Arc::new(DbConnection("primary")) as Arc<dyn Connection>,
                    )),
                ],
                |args: &mut Arguments| {
                    Ok(Widget {
                        log: args.take()?,
                        conn: args.take()?,
                        settings: Config::default(),
                    })
                },
            )
            .property(
                PropertyInfo::settable::<Widget, Config>("settings", Visibility::Public, |w, v| {
                    w.settings = v
                })
                .with_shared_resolver(journaled(journal, "opt", || Config { retries: 3 })),
            )
            .build()
    }

    fn plan_one(metadata: TypeMetadata, environment: &str) -> Result<Vec<ServiceRegistration>> {
        let key = metadata.implementation();
        RegistrationPlanner::new(MetadataTable::new().with(metadata)).plan(&key, environment)
    }

    #[test]
    fn widget_scenario_resolves_in_order() {
        let journal = Arc::new(Journal::default());
        let registrations = plan_one(widget_metadata(&journal), "Production").unwrap();
        assert_eq!(registrations.len(), 1);

        let provider = LoggerOnly { journal: journal.clone() };
        let widget = registrations[0]
            .instantiate(&provider)
            .unwrap()
            .downcast::<Widget>()
            .unwrap();

        assert_eq!(
            journal.entries(),
            vec!["lookup:logger", "db", "opt"]
        );
        assert_eq!(widget.log.name(), "console");
        assert_eq!(widget.conn.target(), "primary");
        assert_eq!(widget.settings, Config { retries: 3 });
    }

    #[test]
    fn no_gate_ignores_environment() {
        let journal = Arc::new(Journal::default());
        for environment in ["Production", "Development", "", "anything"] {
            let registrations = plan_one(widget_metadata(&journal), environment).unwrap();
            assert_eq!(registrations.len(), 1, "environment {environment:?}");
        }
    }

    #[test]
    fn gate_excludes_environment() {
        let gated = |selector: EnvironmentSelector| {
            TypeMetadata::builder::<Config>()
                .environment(selector)
                .register(RegisterService::transient())
                .constructor(vec![], |_| Ok(Config::default()))
                .build()
        };

        let only_dev = gated(EnvironmentSelector::new().enabled(["Development"]));
        assert!(plan_one(only_dev.clone(), "Production").unwrap().is_empty());
        assert_eq!(plan_one(only_dev, "Development").unwrap().len(), 1);

        let not_test = gated(EnvironmentSelector::new().disabled(["Test"]));
        assert!(plan_one(not_test, "Test").unwrap().is_empty());
    }

    #[test]
    fn excluded_type_is_not_compiled() {
        // Ambiguous resolvers would fail compilation; the gate wins first.
        let metadata = TypeMetadata::builder::<Config>()
            .environment(EnvironmentSelector::new().enabled(["Development"]))
            .register(RegisterService::singleton())
            .constructor(
                vec![
                    ParameterInfo::of::<u32>("retries")
                        .with_resolver(Named::new("a"))
                        .with_resolver(Named::new("b")),
                ],
                |args| Ok(Config { retries: args.take()? }),
            )
            .build();

        assert!(plan_one(metadata, "Production").unwrap().is_empty());
    }

    #[test]
    fn every_declaration_shares_one_factory() {
        let journal = Arc::new(Journal::default());
        let metadata = TypeMetadata::builder::<Widget>()
            .register(RegisterService::transient())
            .register(RegisterService::singleton().named(TypeKey::of::<Widget>(), "shared"))
            .register_as::<Arc<dyn Logger>>(Lifetime::Scoped, |w: Widget| w.log)
            .constructor(vec![ParameterInfo::of::<Arc<dyn Logger>>("log")], |args| {
                Ok(Widget {
                    log: args.take()?,
                    conn: Arc::new(DbConnection("none")),
                    settings: Config::default(),
                })
            })
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        assert_eq!(registrations.len(), 3);

        let first = registrations[0].factory().unwrap();
        assert!(registrations
            .iter()
            .all(|r| Arc::ptr_eq(r.factory().unwrap(), first)));

        let services: Vec<TypeKey> = registrations.iter().map(|r| r.service()).collect();
        assert_eq!(services[0], TypeKey::of::<Widget>());
        assert_eq!(services[1], TypeKey::named::<Widget>("shared"));
        assert_eq!(services[2], TypeKey::of::<Arc<dyn Logger>>());

        let lifetimes: Vec<Lifetime> = registrations.iter().map(|r| r.lifetime()).collect();
        assert_eq!(
            lifetimes,
            vec![Lifetime::Transient, Lifetime::Singleton, Lifetime::Scoped]
        );

        let provider = LoggerOnly { journal };
        let logger = registrations[2]
            .instantiate(&provider)
            .unwrap()
            .downcast::<Arc<dyn Logger>>()
            .unwrap();
        assert_eq!(logger.name(), "console");
    }

    #[test]
    fn no_declarations_no_registrations() {
        let metadata = TypeMetadata::builder::<Config>().build();
        assert!(plan_one(metadata, "Production").unwrap().is_empty());
    }

    #[test]
    fn unknown_type_fails() {
        let planner = RegistrationPlanner::new(MetadataTable::new());
        assert!(matches!(
            planner.plan(&TypeKey::of::<Widget>(), "Production"),
            Err(WiringError::UnknownType(_))
        ));
    }

    #[test]
    fn two_resolvers_on_parameter_is_ambiguous() {
        let metadata = TypeMetadata::builder::<Config>()
            .register(RegisterService::singleton())
            .constructor(
                vec![
                    ParameterInfo::of::<u32>("retries")
                        .with_resolver(Named::new("a"))
                        .with_resolver(Named::new("b")),
                ],
                |args| Ok(Config { retries: args.take()? }),
            )
            .build();

        match plan_one(metadata, "Production") {
            Err(WiringError::AmbiguousResolver(e)) => {
                assert_eq!(e.kind, SlotKind::Parameter);
                assert_eq!(e.slot, "retries");
            }
            other => panic!("Expected AmbiguousResolver, got: {other:?}"),
        }
    }

    #[test]
    fn two_resolvers_on_skipped_property_is_still_ambiguous() {
        let metadata = TypeMetadata::builder::<Config>()
            .register(RegisterService::singleton())
            .constructor(vec![], |_| Ok(Config::default()))
            .property(
                PropertyInfo::read_only::<u32>("retries")
                    .with_resolver(Named::new("a"))
                    .with_resolver(Named::new("b")),
            )
            .build();

        assert!(matches!(
            plan_one(metadata, "Production"),
            Err(WiringError::AmbiguousResolver(_))
        ));
    }

    #[test]
    fn constructor_count_must_be_one() {
        let none = TypeMetadata::builder::<Config>()
            .register(RegisterService::singleton())
            .build();
        assert!(matches!(
            plan_one(none, "Production"),
            Err(WiringError::ConstructorSelection(ConstructorSelectionError { found: 0, .. }))
        ));

        let two = TypeMetadata::builder::<Config>()
            .register(RegisterService::singleton())
            .constructor(vec![], |_| Ok(Config::default()))
            .constructor(vec![ParameterInfo::of::<u32>("retries")], |args| {
                Ok(Config { retries: args.take()? })
            })
            .build();
        assert!(matches!(
            plan_one(two, "Production"),
            Err(WiringError::ConstructorSelection(ConstructorSelectionError { found: 2, .. }))
        ));
    }

    #[test]
    fn properties_need_resolver_and_public_setter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counting = || {
            let calls = calls.clone();
            FnResolver::new(move |_: &dyn ServiceProvider, _: &TypeKey| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(99u32) as Instance)
            })
        };

        #[derive(Default)]
        struct Knobs {
            public_with: u32,
            restricted_with: u32,
            public_without: u32,
        }

        let metadata = TypeMetadata::builder::<Knobs>()
            .register(RegisterService::transient())
            .constructor(vec![], |_| Ok(Knobs::default()))
            .property(
                PropertyInfo::settable::<Knobs, u32>("public_with", Visibility::Public, |k, v| {
                    k.public_with = v
                })
                .with_resolver(counting()),
            )
            .property(
                PropertyInfo::settable::<Knobs, u32>(
                    "restricted_with",
                    Visibility::Restricted,
                    |k, v| k.restricted_with = v,
                )
                .with_resolver(counting()),
            )
            .property(PropertyInfo::read_only::<u32>("computed").with_resolver(counting()))
            .property(PropertyInfo::settable::<Knobs, u32>(
                "public_without",
                Visibility::Public,
                |k, v| k.public_without = v,
            ))
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        let factory = registrations[0].factory().unwrap();
        assert_eq!(factory.properties().len(), 1);
        assert_eq!(factory.properties()[0].name, "public_with");

        let journal = Arc::new(Journal::default());
        let knobs = registrations[0]
            .instantiate(&LoggerOnly { journal: journal.clone() })
            .unwrap()
            .downcast::<Knobs>()
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(knobs.public_with, 99);
        assert_eq!(knobs.restricted_with, 0);
        assert_eq!(knobs.public_without, 0);
        assert!(journal.entries().is_empty());
    }

    #[test]
    fn parameters_resolve_left_to_right() {
        let counter = Arc::new(AtomicUsize::new(0));
        let ticket = |slot: &'static str, seen: Arc<Mutex<Vec<(&'static str, usize)>>>| {
            let counter = counter.clone();
            FnResolver::new(move |_: &dyn ServiceProvider, _: &TypeKey| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                seen.lock().push((slot, n));
                Ok(Box::new(n) as Instance)
            })
        };

        struct Triple(usize, usize, usize);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let metadata = TypeMetadata::builder::<Triple>()
            .register(RegisterService::transient())
            .constructor(
                vec![
                    ParameterInfo::of::<usize>("a").with_resolver(ticket("a", seen.clone())),
                    ParameterInfo::of::<usize>("b").with_resolver(ticket("b", seen.clone())),
                    ParameterInfo::of::<usize>("c").with_resolver(ticket("c", seen.clone())),
                ],
                |args| Ok(Triple(args.take()?, args.take()?, args.take()?)),
            )
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        let journal = Arc::new(Journal::default());
        let triple = registrations[0]
            .instantiate(&LoggerOnly { journal })
            .unwrap()
            .downcast::<Triple>()
            .unwrap();

        assert_eq!((triple.0, triple.1, triple.2), (0, 1, 2));
        assert_eq!(*seen.lock(), vec![("a", 0), ("b", 1), ("c", 2)]);
    }

    #[test]
    fn failure_aborts_before_construction() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let metadata = TypeMetadata::builder::<Config>()
            .register(RegisterService::transient())
            .constructor(vec![ParameterInfo::of::<u32>("retries")], {
                let constructed = constructed.clone();
                move |args: &mut Arguments| {
                    constructed.fetch_add(1, Ordering::SeqCst);
                    Ok(Config { retries: args.take()? })
                }
            })
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        let journal = Arc::new(Journal::default());
        let result = registrations[0].instantiate(&LoggerOnly { journal });

        assert!(matches!(result, Err(WiringError::UnresolvedDependency(_))));
        assert_eq!(constructed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn property_failure_discards_instance() {
        let metadata = TypeMetadata::builder::<Config>()
            .register(RegisterService::transient())
            .constructor(vec![], |_| Ok(Config::default()))
            .property(
                PropertyInfo::settable::<Config, u32>("retries", Visibility::Public, |c, v| {
                    c.retries = v
                })
                .with_resolver(FnResolver::new(|_: &dyn ServiceProvider, _: &TypeKey| {
                    Err(WiringError::construction::<u32>("vault sealed"))
                })),
            )
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        let journal = Arc::new(Journal::default());
        match registrations[0].instantiate(&LoggerOnly { journal }) {
            Err(WiringError::ConstructionFailed { source, .. }) => {
                assert_eq!(source.to_string(), "vault sealed");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }

    #[test]
    fn resolver_returning_wrong_type_surfaces_as_mismatch() {
        let metadata = TypeMetadata::builder::<Config>()
            .register(RegisterService::transient())
            .constructor(
                vec![ParameterInfo::of::<u32>("retries").with_resolver(FnResolver::new(
                    |_: &dyn ServiceProvider, _: &TypeKey| Ok(Box::new("three") as Instance),
                ))],
                |args| Ok(Config { retries: args.take()? }),
            )
            .build();

        let registrations = plan_one(metadata, "Production").unwrap();
        let journal = Arc::new(Journal::default());
        match registrations[0].instantiate(&LoggerOnly { journal }) {
            Err(WiringError::TypeMismatch(e)) => assert_eq!(e.slot, "retries"),
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn independent_instances_per_invocation() {
        let journal = Arc::new(Journal::default());
        let registrations = plan_one(widget_metadata(&journal), "Production").unwrap();

        let a = registrations[0]
            .instantiate(&LoggerOnly { journal: Arc::new(Journal::default()) })
            .unwrap()
            .downcast::<Widget>()
            .unwrap();
        let mut b = registrations[0]
            .instantiate(&LoggerOnly { journal: Arc::new(Journal::default()) })
            .unwrap()
            .downcast::<Widget>()
            .unwrap();

        assert!(!std::ptr::eq(&*a, &*b));
        b.settings.retries = 10;
        assert_eq!(a.settings.retries, 3);
    }

    #[test]
    fn concurrent_invocations() {
        let journal = Arc::new(Journal::default());
        let registrations = plan_one(widget_metadata(&journal), "Production").unwrap();
        let registration = &registrations[0];

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        let provider = LoggerOnly { journal: Arc::new(Journal::default()) };
                        let widget = registration
                            .instantiate(&provider)
                            .unwrap()
                            .downcast::<Widget>()
                            .unwrap();
                        widget.settings.retries
                    })
                })
                .collect();

            for handle in handles {
                assert_eq!(handle.join().unwrap(), 3);
            }
        });

        // 8 invocations × ("db", "opt") on the shared resolvers
        assert_eq!(journal.entries().len(), 16);
    }

    #[test]
    fn cache_reuses_factory_across_environments() {
        let journal = Arc::new(Journal::default());
        let planner =
            RegistrationPlanner::new(MetadataTable::new().with(widget_metadata(&journal))).cached();

        let key = TypeKey::of::<Widget>();
        let first = planner.plan(&key, "Development").unwrap();
        let second = planner.plan(&key, "Production").unwrap();

        let cache = planner.cache().unwrap();
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(
            first[0].factory().unwrap(),
            second[0].factory().unwrap()
        ));
        assert!(cache.get(&key).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn uncached_planner_has_no_cache() {
        let planner = RegistrationPlanner::new(MetadataTable::new());
        assert!(planner.cache().is_none());
    }

    #[derive(Debug)]
    struct Port(u16);

    fn port_table(port: u16) -> MetadataTable {
        MetadataTable::new().with(
            TypeMetadata::builder::<Port>()
                .register(RegisterService::singleton())
                .constructor(
                    vec![ParameterInfo::of::<u16>("port").with_resolver(Constant::new(port))],
                    |args| Ok(Port(args.take()?)),
                )
                .build(),
        )
    }

    fn planned_port<M: MetadataProvider>(planner: &RegistrationPlanner<M>) -> u16 {
        let empty = crate::container::ServiceCollection::new().build().unwrap();
        planner.plan(&TypeKey::of::<Port>(), "Production").unwrap()[0]
            .instantiate(&empty)
            .unwrap()
            .downcast::<Port>()
            .unwrap()
            .0
    }

    #[test]
    fn cached_planners_keep_their_own_factories() {
        let first = RegistrationPlanner::new(port_table(1)).cached();
        let second = RegistrationPlanner::new(port_table(2)).cached();

        assert_eq!(planned_port(&first), 1);
        assert_eq!(planned_port(&second), 2);
        // Planning again hits each planner's own cache.
        assert_eq!(planned_port(&first), 1);
        assert_eq!(planned_port(&second), 2);

        let (a, b) = (first.cache().unwrap(), second.cache().unwrap());
        assert!(!Arc::ptr_eq(
            &a.get(&TypeKey::of::<Port>()).unwrap(),
            &b.get(&TypeKey::of::<Port>()).unwrap()
        ));
    }

    /// In-memory log sink for a scoped subscriber.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn planning_logs_decisions() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter("autowire_container=debug")
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let journal = Arc::new(Journal::default());
        let gated = TypeMetadata::builder::<Config>()
            .environment(EnvironmentSelector::new().enabled(["Development"]))
            .register(RegisterService::singleton())
            .constructor(vec![], |_| Ok(Config::default()))
            .build();

        tracing::subscriber::with_default(subscriber, || {
            plan_one(widget_metadata(&journal), "Production").unwrap();
            assert!(plan_one(gated, "Production").unwrap().is_empty());
        });

        let logs = captured.text();
        assert!(logs.contains("Compiled factory"), "{logs}");
        assert!(logs.contains("Planned registration"), "{logs}");
        assert!(logs.contains("Excluded by environment gate"), "{logs}");
        assert!(logs.contains("plan{"), "{logs}");
    }
}
