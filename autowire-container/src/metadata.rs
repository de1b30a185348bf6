//! Component metadata.
//!
//! Typed descriptors for everything the planner needs to know about a
//! candidate type: its registration declarations, its environment gate, its
//! constructor and its injectable properties. Descriptors are produced by
//! `#[derive(Component)]` or written by hand with [`TypeMetadata::builder`];
//! the planner only ever reads them through [`MetadataProvider`].
//!
//! # Examples
//! ```
//! use autowire_container::prelude::*;
//! use std::sync::Arc;
//!
//! struct Greeter {
//!     greeting: String,
//!     punctuation: char,
//! }
//!
//! let metadata = TypeMetadata::builder::<Greeter>()
//!     .register(RegisterService::transient())
//!     .constructor(
//!         vec![
//!             ParameterInfo::of::<String>("greeting"),
//!             ParameterInfo::of::<char>("punctuation").with_resolver(Constant::new('!')),
//!         ],
//!         |args| {
//!             Ok(Greeter {
//!                 greeting: args.take()?,
//!                 punctuation: args.take()?,
//!             })
//!         },
//!     )
//!     .build();
//!
//! assert_eq!(metadata.registrations().len(), 1);
//! assert_eq!(metadata.constructors()[0].parameters().len(), 2);
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::environment::EnvironmentSelector;
use crate::error::{
    AmbiguousResolverError, Result, SlotKind, TypeMismatchError, WiringError,
};
use crate::key::TypeKey;
use crate::lifetime::Lifetime;
use crate::provider::{Instance, downcast_instance};
use crate::resolver::{DependencyResolver, ResolutionStrategy};

/// Builds an instance from its resolved constructor arguments.
pub type ConstructorFn = Arc<dyn Fn(&mut Arguments) -> Result<Instance> + Send + Sync>;

/// Assigns a resolved value to a property of a constructed instance.
pub type SetterFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Instance) -> Result<()> + Send + Sync>;

/// Converts an implementation instance into the declared service type.
pub type ProjectionFn = Arc<dyn Fn(Instance) -> Result<Instance> + Send + Sync>;

// ============================================================
// Registration declarations
// ============================================================

/// One registration declaration on a component.
///
/// Without [`service`](RegisterService::service), the component registers
/// under its own type.
#[derive(Clone)]
pub struct RegisterService {
    lifetime: Lifetime,
    service: Option<TypeKey>,
    projection: Option<ProjectionFn>,
}

impl RegisterService {
    pub fn new(lifetime: Lifetime) -> Self {
        Self {
            lifetime,
            service: None,
            projection: None,
        }
    }

    pub fn transient() -> Self {
        Self::new(Lifetime::Transient)
    }

    pub fn scoped() -> Self {
        Self::new(Lifetime::Scoped)
    }

    pub fn singleton() -> Self {
        Self::new(Lifetime::Singleton)
    }

    /// Registers under `service` while handing out the implementation
    /// instance unchanged.
    pub fn service(mut self, service: TypeKey) -> Self {
        self.service = Some(service);
        self.projection = None;
        self
    }

    /// Registers under `S`, converting each `T` instance with `convert`.
    ///
    /// This is how a component is exposed as a trait object:
    /// `service_as::<Widget, Arc<dyn Gadget>>(|w| Arc::new(w))`.
    pub fn service_as<T, S>(mut self, convert: impl Fn(T) -> S + Send + Sync + 'static) -> Self
    where
        T: Send + Sync + 'static,
        S: Send + Sync + 'static,
    {
        self.service = Some(TypeKey::of::<S>());
        self.projection = Some(Arc::new(move |instance: Instance| {
            let implementation = downcast_instance::<T>(instance, TypeKey::of::<T>(), "<instance>")?;
            Ok(Box::new(convert(implementation)) as Instance)
        }));
        self
    }

    /// Registers under the binding `name` of the current service identity.
    ///
    /// Call after [`service`](Self::service)/[`service_as`](Self::service_as)
    /// to name the overridden identity; otherwise `implementation` is named.
    pub fn named(mut self, implementation: TypeKey, name: &'static str) -> Self {
        self.service = Some(self.service.unwrap_or(implementation).with_name(name));
        self
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// The overriding service identity, if any.
    #[inline]
    pub fn service_key(&self) -> Option<TypeKey> {
        self.service
    }

    pub fn projection(&self) -> Option<&ProjectionFn> {
        self.projection.as_ref()
    }
}

impl fmt::Debug for RegisterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterService")
            .field("lifetime", &self.lifetime)
            .field("service", &self.service)
            .field("projected", &self.projection.is_some())
            .finish()
    }
}

// ============================================================
// Slots
// ============================================================

/// A constructor parameter.
#[derive(Clone)]
pub struct ParameterInfo {
    name: &'static str,
    declared: TypeKey,
    resolvers: Vec<Arc<dyn DependencyResolver>>,
}

impl ParameterInfo {
    pub fn of<P: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            declared: TypeKey::of::<P>(),
            resolvers: Vec::new(),
        }
    }

    /// Attaches a custom resolver.
    ///
    /// Attaching a second one is accepted here and rejected when the plan
    /// is compiled.
    pub fn with_resolver(self, resolver: impl DependencyResolver + 'static) -> Self {
        self.with_shared_resolver(Arc::new(resolver))
    }

    pub fn with_shared_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn declared(&self) -> TypeKey {
        self.declared
    }

    pub fn resolvers(&self) -> &[Arc<dyn DependencyResolver>] {
        &self.resolvers
    }

    /// Reads the parameter's resolver declaration.
    pub fn strategy(&self, owner: TypeKey) -> Result<ResolutionStrategy> {
        select_strategy(owner, SlotKind::Parameter, self.name, &self.resolvers)
    }
}

impl fmt::Debug for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterInfo")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

/// Who may call a property setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Restricted,
}

/// Setter handle of a property.
#[derive(Clone)]
pub struct Setter {
    visibility: Visibility,
    apply: SetterFn,
}

impl Setter {
    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn handle(&self) -> &SetterFn {
        &self.apply
    }
}

/// A property of the component.
///
/// Only properties with a public setter and a custom resolver are injected;
/// everything else is left as the constructor produced it.
#[derive(Clone)]
pub struct PropertyInfo {
    name: &'static str,
    declared: TypeKey,
    setter: Option<Setter>,
    resolvers: Vec<Arc<dyn DependencyResolver>>,
}

impl PropertyInfo {
    /// A property of `T` with type `P`, assigned through `set`.
    pub fn settable<T, P>(
        name: &'static str,
        visibility: Visibility,
        set: impl Fn(&mut T, P) + Send + Sync + 'static,
    ) -> Self
    where
        T: Send + Sync + 'static,
        P: Send + Sync + 'static,
    {
        let apply: SetterFn = Arc::new(move |target: &mut (dyn Any + Send + Sync), value: Instance| {
            let target = target.downcast_mut::<T>().ok_or_else(|| {
                WiringError::TypeMismatch(TypeMismatchError {
                    owner: TypeKey::of::<T>(),
                    slot: name,
                    expected: type_name::<T>(),
                })
            })?;
            let value = downcast_instance::<P>(value, TypeKey::of::<T>(), name)?;
            set(target, value);
            Ok(())
        });

        Self {
            name,
            declared: TypeKey::of::<P>(),
            setter: Some(Setter { visibility, apply }),
            resolvers: Vec::new(),
        }
    }

    /// A property with no setter at all.
    pub fn read_only<P: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            declared: TypeKey::of::<P>(),
            setter: None,
            resolvers: Vec::new(),
        }
    }

    pub fn with_resolver(self, resolver: impl DependencyResolver + 'static) -> Self {
        self.with_shared_resolver(Arc::new(resolver))
    }

    pub fn with_shared_resolver(mut self, resolver: Arc<dyn DependencyResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn declared(&self) -> TypeKey {
        self.declared
    }

    pub fn setter(&self) -> Option<&Setter> {
        self.setter.as_ref()
    }

    pub fn resolvers(&self) -> &[Arc<dyn DependencyResolver>] {
        &self.resolvers
    }

    /// Reads the property's resolver declaration.
    pub fn strategy(&self, owner: TypeKey) -> Result<ResolutionStrategy> {
        select_strategy(owner, SlotKind::Property, self.name, &self.resolvers)
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("setter", &self.setter.as_ref().map(Setter::visibility))
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}

fn select_strategy(
    owner: TypeKey,
    kind: SlotKind,
    slot: &'static str,
    resolvers: &[Arc<dyn DependencyResolver>],
) -> Result<ResolutionStrategy> {
    match resolvers {
        [] => Ok(ResolutionStrategy::Default),
        [resolver] => Ok(ResolutionStrategy::Custom(resolver.clone())),
        many => Err(WiringError::AmbiguousResolver(AmbiguousResolverError {
            owner,
            kind,
            slot,
            count: many.len(),
        })),
    }
}

// ============================================================
// Constructors
// ============================================================

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    owner: TypeKey,
    values: std::vec::IntoIter<(&'static str, Instance)>,
}

impl Arguments {
    pub fn new(owner: TypeKey, values: Vec<(&'static str, Instance)>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
        }
    }

    /// Takes the next argument as `T`.
    ///
    /// # Errors
    /// [`WiringError::TypeMismatch`] if the resolved value is not a `T`,
    /// [`WiringError::ConstructionFailed`] if no arguments are left.
    pub fn take<T: 'static>(&mut self) -> Result<T> {
        let (slot, value) = self.values.next().ok_or_else(|| WiringError::ConstructionFailed {
            key: self.owner,
            source: format!(
                "constructor asked for more arguments than it declares (next: {})",
                type_name::<T>()
            )
            .into(),
        })?;
        downcast_instance(value, self.owner, slot)
    }

    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("owner", &self.owner)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// A constructor: its parameter list and the function invoking it.
#[derive(Clone)]
pub struct ConstructorInfo {
    parameters: Vec<ParameterInfo>,
    invoke: ConstructorFn,
}

impl ConstructorInfo {
    pub fn new<T: Send + Sync + 'static>(
        parameters: Vec<ParameterInfo>,
        construct: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parameters,
            invoke: Arc::new(move |args: &mut Arguments| Ok(Box::new(construct(args)?) as Instance)),
        }
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn handle(&self) -> &ConstructorFn {
        &self.invoke
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("parameters", &self.parameters)
            .finish()
    }
}

// ============================================================
// Type metadata
// ============================================================

/// Everything declared about one candidate type.
#[derive(Clone, Debug)]
pub struct TypeMetadata {
    implementation: TypeKey,
    registrations: Vec<RegisterService>,
    environment: Option<EnvironmentSelector>,
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
}

impl TypeMetadata {
    pub fn builder<T: Send + Sync + 'static>() -> TypeMetadataBuilder<T> {
        TypeMetadataBuilder {
            metadata: TypeMetadata {
                implementation: TypeKey::of::<T>(),
                registrations: Vec::new(),
                environment: None,
                constructors: Vec::new(),
                properties: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn registrations(&self) -> &[RegisterService] {
        &self.registrations
    }

    pub fn environment(&self) -> Option<&EnvironmentSelector> {
        self.environment.as_ref()
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }
}

/// Typed builder for [`TypeMetadata`].
pub struct TypeMetadataBuilder<T> {
    metadata: TypeMetadata,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> TypeMetadataBuilder<T> {
    pub fn register(mut self, declaration: RegisterService) -> Self {
        self.metadata.registrations.push(declaration);
        self
    }

    /// Shorthand for `register(RegisterService::new(lifetime).service_as::<T, S>(convert))`.
    pub fn register_as<S: Send + Sync + 'static>(
        self,
        lifetime: Lifetime,
        convert: impl Fn(T) -> S + Send + Sync + 'static,
    ) -> Self {
        self.register(RegisterService::new(lifetime).service_as::<T, S>(convert))
    }

    pub fn environment(mut self, selector: EnvironmentSelector) -> Self {
        self.metadata.environment = Some(selector);
        self
    }

    /// Declares a constructor. Declaring more than one makes the type
    /// unplannable.
    pub fn constructor(
        mut self,
        parameters: Vec<ParameterInfo>,
        construct: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.metadata
            .constructors
            .push(ConstructorInfo::new(parameters, construct));
        self
    }

    pub fn property(mut self, property: PropertyInfo) -> Self {
        self.metadata.properties.push(property);
        self
    }

    pub fn build(self) -> TypeMetadata {
        self.metadata
    }
}

// ============================================================
// Providers
// ============================================================

/// Source of [`TypeMetadata`] for candidate types.
///
/// Implementations must be pure: the same key always yields equivalent
/// metadata.
pub trait MetadataProvider {
    fn type_metadata(&self, ty: &TypeKey) -> Option<TypeMetadata>;
}

impl<M: MetadataProvider + ?Sized> MetadataProvider for &M {
    fn type_metadata(&self, ty: &TypeKey) -> Option<TypeMetadata> {
        (**self).type_metadata(ty)
    }
}

impl<M: MetadataProvider + ?Sized> MetadataProvider for Arc<M> {
    fn type_metadata(&self, ty: &TypeKey) -> Option<TypeMetadata> {
        (**self).type_metadata(ty)
    }
}

/// A type that describes itself, usually via `#[derive(Component)]`.
pub trait Component: Send + Sync + 'static {
    fn metadata() -> TypeMetadata;
}

/// Explicit registration table of component metadata.
///
/// ```
/// use autowire_container::prelude::*;
///
/// #[derive(Default)]
/// struct Clock;
///
/// let table = MetadataTable::new().with(
///     TypeMetadata::builder::<Clock>()
///         .register(RegisterService::singleton())
///         .constructor(vec![], |_| Ok(Clock))
///         .build(),
/// );
///
/// assert!(table.type_metadata(&TypeKey::of::<Clock>()).is_some());
/// assert!(table.type_metadata(&TypeKey::of::<String>()).is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MetadataTable {
    entries: HashMap<TypeKey, TypeMetadata>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the metadata of its implementation type.
    pub fn insert(&mut self, metadata: TypeMetadata) -> Option<TypeMetadata> {
        self.entries.insert(metadata.implementation(), metadata)
    }

    pub fn with(mut self, metadata: TypeMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn with_component<C: Component>(self) -> Self {
        self.with(C::metadata())
    }

    /// Implementation keys, ordered by type name.
    pub fn keys(&self) -> Vec<TypeKey> {
        let mut keys: Vec<TypeKey> = self.entries.keys().copied().collect();
        keys.sort_by_key(|key| key.type_name());
        keys
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataProvider for MetadataTable {
    fn type_metadata(&self, ty: &TypeKey) -> Option<TypeMetadata> {
        self.entries.get(ty).cloned()
    }
}
