//! The lookup context consumed by factories.
//!
//! [`ServiceProvider`] is the only thing a compiled factory knows about the
//! host container. Anything that can hand out type-erased instances by
//! [`TypeKey`] can drive autowire: the bundled
//! [`ServiceContainer`](crate::container::ServiceContainer), an adapter over
//! another DI crate, or a test double.
//!
//! # Examples
//! ```
//! use autowire_container::prelude::*;
//!
//! struct Fixed;
//!
//! impl ServiceProvider for Fixed {
//!     fn get_service(&self, key: &TypeKey) -> Result<Instance> {
//!         if key.is::<u16>() {
//!             Ok(Box::new(8080u16))
//!         } else {
//!             Err(WiringError::ServiceNotFound(ServiceNotFoundError {
//!                 requested: *key,
//!                 suggestions: vec![],
//!             }))
//!         }
//!     }
//! }
//!
//! let port: u16 = Fixed.get().unwrap();
//! assert_eq!(port, 8080);
//! ```

use std::any::{Any, type_name};

use crate::error::{Result, TypeMismatchError, WiringError};
use crate::key::TypeKey;

/// A type-erased service instance.
pub type Instance = Box<dyn Any + Send + Sync>;

/// Query interface of the host container.
///
/// `get_service` returns [`WiringError::ServiceNotFound`] when nothing is
/// registered under `key`; other errors come from the registered factory.
pub trait ServiceProvider: Send + Sync {
    fn get_service(&self, key: &TypeKey) -> Result<Instance>;
}

impl<P: ServiceProvider + ?Sized> ServiceProvider for &P {
    fn get_service(&self, key: &TypeKey) -> Result<Instance> {
        (**self).get_service(key)
    }
}

/// Typed lookups on top of [`ServiceProvider`].
pub trait ServiceProviderExt: ServiceProvider {
    /// Resolves `T` by its unnamed key.
    fn get<T: Send + Sync + 'static>(&self) -> Result<T> {
        let key = TypeKey::of::<T>();
        downcast_instance(self.get_service(&key)?, key, "<service>")
    }

    /// Resolves `T` registered under the binding `name`.
    fn get_named<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<T> {
        let key = TypeKey::named::<T>(name);
        downcast_instance(self.get_service(&key)?, key, name)
    }
}

impl<P: ServiceProvider + ?Sized> ServiceProviderExt for P {}

/// Unboxes `instance` as `T`, reporting `slot` of `owner` on mismatch.
pub(crate) fn downcast_instance<T: 'static>(
    instance: Instance,
    owner: TypeKey,
    slot: &'static str,
) -> Result<T> {
    instance.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
        WiringError::TypeMismatch(TypeMismatchError {
            owner,
            slot,
            expected: type_name::<T>(),
        })
    })
}
