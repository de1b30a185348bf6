//! Type keys.
//!
//! A [`TypeKey`] names a service identity, an implementation type, or the
//! declared type of a constructor parameter or property. It pairs a
//! [`TypeId`] with the type's name (for diagnostics) and an optional
//! binding name, so one type can be registered several times.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use autowire_support::rendering::shorten_type_name;

/// Identifies a type, optionally qualified by a binding name.
///
/// # Examples
/// ```
/// use autowire_container::key::TypeKey;
///
/// let plain = TypeKey::of::<String>();
/// assert!(plain.is::<String>());
/// assert_eq!(plain.name(), None);
///
/// let primary = TypeKey::named::<String>("primary");
/// assert_ne!(plain, primary);
/// assert_eq!(primary.unnamed(), plain);
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<&'static str>,
}

impl TypeKey {
    /// Key for `T` with no binding name.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: None,
        }
    }

    /// Key for `T` under the binding `name`.
    #[inline]
    pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::of::<T>().with_name(name)
    }

    /// Same type, different binding name.
    ///
    /// Used by resolvers that redirect a declared slot type to a named
    /// registration of that type.
    #[inline]
    pub fn with_name(self, name: &'static str) -> Self {
        Self {
            name: Some(name),
            ..self
        }
    }

    /// Same type, binding name removed.
    #[inline]
    pub fn unnamed(self) -> Self {
        Self { name: None, ..self }
    }

    /// Returns `true` if this key names exactly `T` (ignoring the binding name).
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, as reported by [`std::any::type_name`].
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name with module paths stripped, for compact output.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }

    #[inline]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }
}

// Equality and hashing ignore `type_name`: it is derived from `type_id`.
impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tuple = f.debug_tuple("TypeKey");
        tuple.field(&self.type_name);
        if let Some(name) = self.name {
            tuple.field(&name);
        }
        tuple.finish()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)?;
        if let Some(name) = self.name {
            write!(f, " @{name}")?;
        }
        Ok(())
    }
}
