//! Error types for planning and instantiation.
//!
//! Planning errors (`AmbiguousResolver`, `ConstructorSelection`,
//! `UnknownType`) stop a type from being registered at all. Invocation
//! errors (`UnresolvedDependency`, `ConstructionFailed`, `TypeMismatch`)
//! abort a single factory call.

use std::fmt;

use autowire_support::rendering::shorten_type_name;

use crate::key::TypeKey;

/// Main error type for all autowire operations.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    /// The lookup context has nothing registered under the requested key.
    #[error("{}", .0)]
    ServiceNotFound(ServiceNotFoundError),

    /// A default-strategy slot could not be satisfied by the lookup context.
    ///
    /// [`source`](std::error::Error::source) is the lookup context's error.
    #[error(transparent)]
    UnresolvedDependency(UnresolvedDependencyError),

    /// More than one custom resolver is attached to a single slot.
    #[error("{}", .0)]
    AmbiguousResolver(AmbiguousResolverError),

    /// The candidate type does not declare exactly one constructor.
    #[error("{}", .0)]
    ConstructorSelection(ConstructorSelectionError),

    /// A resolved value does not have the type its slot expects.
    #[error("{}", .0)]
    TypeMismatch(TypeMismatchError),

    /// A constructor or user factory returned an error.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: TypeKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The metadata provider has no entry for the candidate type.
    #[error("No component metadata for {0}\n  Hint: derive `Component` or add the type to the metadata table")]
    UnknownType(TypeKey),

    /// A service identity was added twice to a collection.
    #[error("Service already registered: {0}\n  Hint: call .allow_override(true) to let later registrations win")]
    AlreadyRegistered(TypeKey),
}

impl WiringError {
    /// Wraps any error raised while constructing `T`.
    pub fn construction<T: ?Sized + 'static>(
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        WiringError::ConstructionFailed {
            key: TypeKey::of::<T>(),
            source: source.into(),
        }
    }

    /// Returns `true` for errors raised while compiling a plan, as opposed
    /// to while invoking one.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            WiringError::AmbiguousResolver(_)
                | WiringError::ConstructorSelection(_)
                | WiringError::UnknownType(_)
        )
    }
}

/// The lookup context could not produce a service.
#[derive(Debug)]
pub struct ServiceNotFoundError {
    pub requested: TypeKey,
    /// Registered identities with similar names.
    pub suggestions: Vec<String>,
}

impl fmt::Display for ServiceNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not found: {}", self.requested)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// A slot using the default strategy found nothing in the lookup context.
#[derive(Debug)]
pub struct UnresolvedDependencyError {
    pub requested: TypeKey,
    /// What the lookup context reported.
    pub cause: Box<WiringError>,
}

impl fmt::Display for UnresolvedDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unresolved dependency: {}", self.requested)?;
        write!(f, "\n  Caused by: {}", self.cause)?;
        write!(
            f,
            "\n  Hint: register {} or attach a custom resolver to the slot",
            shorten_type_name(self.requested.type_name())
        )
    }
}

impl std::error::Error for UnresolvedDependencyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Which kind of slot an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Parameter,
    Property,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Parameter => f.write_str("parameter"),
            SlotKind::Property => f.write_str("property"),
        }
    }
}

/// Several custom resolvers compete for one slot.
#[derive(Debug)]
pub struct AmbiguousResolverError {
    pub owner: TypeKey,
    pub kind: SlotKind,
    pub slot: &'static str,
    pub count: usize,
}

impl fmt::Display for AmbiguousResolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous resolver configuration: {} `{}` of {} has {} custom resolvers",
            self.kind, self.slot, self.owner, self.count,
        )?;
        write!(f, "\n  Hint: attach at most one resolver per {}", self.kind)
    }
}

/// The candidate type declares no constructor, or more than one.
#[derive(Debug)]
pub struct ConstructorSelectionError {
    pub owner: TypeKey,
    pub found: usize,
}

impl fmt::Display for ConstructorSelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.found == 0 {
            write!(f, "No constructor declared for {}", self.owner)
        } else {
            write!(
                f,
                "{} constructors declared for {}, expected exactly one",
                self.found, self.owner,
            )
        }
    }
}

/// A value handed to a constructor or setter has the wrong type.
#[derive(Debug)]
pub struct TypeMismatchError {
    pub owner: TypeKey,
    pub slot: &'static str,
    pub expected: &'static str,
}

impl fmt::Display for TypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type mismatch in `{}` of {}: expected {}",
            self.slot, self.owner, self.expected,
        )?;
        write!(
            f,
            "\n  Hint: a custom resolver must return exactly the declared slot type"
        )
    }
}

/// Convenient Result type for autowire operations.
pub type Result<T> = std::result::Result<T, WiringError>;
