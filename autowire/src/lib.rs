//! # Autowire: attribute-driven service registration for Rust
//!
//! Components describe themselves (by `#[derive(Component)]` or a
//! hand-written [`metadata::TypeMetadata`]); the [`planner`] turns that
//! description into service registrations sharing one compiled factory.
//!
//! ```
//! use autowire::Component;
//! use autowire::prelude::*;
//!
//! #[derive(Component)]
//! #[component(register(lifetime = "transient"), skip_scan)]
//! struct Greeter {
//!     greeting: String,
//!     #[resolve(Constant::new('!'))]
//!     punctuation: char,
//! }
//!
//! let container = ServiceCollection::new()
//!     .value(String::from("hello"))
//!     .component::<Greeter>("Production")
//!     .build()
//!     .unwrap();
//!
//! let greeter: Greeter = container.get().unwrap();
//! assert_eq!(format!("{}{}", greeter.greeting, greeter.punctuation), "hello!");
//! ```

pub use autowire_container::*;
pub use autowire_derive::*;
pub use autowire_support::*;
