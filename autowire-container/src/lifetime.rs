//! Service lifetimes.
//!
//! A [`Lifetime`] is recorded on every service descriptor and handed to the
//! host container, which decides how long an instance is reused:
//! - [`Lifetime::Singleton`]: one instance for the application
//! - [`Lifetime::Scoped`]: one instance per scope (e.g. HTTP request)
//! - [`Lifetime::Transient`]: a new instance per request
//!
//! The planner never caches instances itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How long the host container keeps a produced instance.
///
/// Ordered by how long an instance lives: `Singleton > Scoped > Transient`.
///
/// ```
/// use autowire_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton > Lifetime::Scoped);
/// assert_eq!("scoped".parse::<Lifetime>().unwrap(), Lifetime::Scoped);
/// ```
///
/// Serializes as the lowercase name and deserializes through [`FromStr`],
/// so `"Singleton"` and `"singleton"` both load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all(serialize = "lowercase"), try_from = "String")]
pub enum Lifetime {
    /// New instance per request. Never cached.
    Transient,
    /// One instance per container scope.
    Scoped,
    /// One instance for the container's whole life.
    Singleton,
}

impl Lifetime {
    pub const ALL: [Lifetime; 3] = [Lifetime::Transient, Lifetime::Scoped, Lifetime::Singleton];

    /// Returns `true` if the host container is expected to reuse instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Lifetime::Transient => "Transient",
            Lifetime::Scoped => "Scoped",
            Lifetime::Singleton => "Singleton",
        };
        f.write_str(label)
    }
}

/// Returned when a string names no lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLifetimeError(String);

impl fmt::Display for ParseLifetimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown lifetime {:?}, expected one of: transient, scoped, singleton",
            self.0
        )
    }
}

impl std::error::Error for ParseLifetimeError {}

impl FromStr for Lifetime {
    type Err = ParseLifetimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lifetime::ALL
            .into_iter()
            .find(|lifetime| lifetime.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseLifetimeError(s.to_string()))
    }
}

impl TryFrom<String> for Lifetime {
    type Error = ParseLifetimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
