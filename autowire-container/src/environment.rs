//! Environment gates.
//!
//! A component may restrict the environments it is registered in. The
//! environment name itself comes from the caller, typically from
//! [`current()`], which reads `AUTOWIRE_ENVIRONMENT`.

use serde::{Deserialize, Serialize};

/// Variable consulted by [`current()`].
pub const ENVIRONMENT_VAR: &str = "AUTOWIRE_ENVIRONMENT";

/// Environment assumed when [`ENVIRONMENT_VAR`] is unset or blank.
pub const DEFAULT_ENVIRONMENT: &str = "Production";

/// Inclusion/exclusion rule keyed by environment name.
///
/// A name passes when it is in `enabled` (if that list is present) and not
/// in `disabled`. Names compare exactly.
///
/// ```
/// use autowire_container::environment::EnvironmentSelector;
///
/// let gate = EnvironmentSelector::new()
///     .enabled(["Development", "Staging"])
///     .disabled(["Staging"]);
///
/// assert!(gate.is_enabled("Development"));
/// assert!(!gate.is_enabled("Staging"));
/// assert!(!gate.is_enabled("Production"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enabled: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disabled: Option<Vec<String>>,
}

impl EnvironmentSelector {
    /// A selector that admits every environment until restricted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only these environments are admitted.
    pub fn enabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled
            .get_or_insert_with(Vec::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// These environments are rejected.
    pub fn disabled<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled
            .get_or_insert_with(Vec::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_enabled(&self, environment: &str) -> bool {
        let listed = |names: &Vec<String>| names.iter().any(|name| name == environment);

        self.enabled.as_ref().is_none_or(listed) && !self.disabled.as_ref().is_some_and(listed)
    }
}

/// Applies an optional gate: no gate admits everything.
pub fn is_enabled(selector: Option<&EnvironmentSelector>, environment: &str) -> bool {
    selector.is_none_or(|gate| gate.is_enabled(environment))
}

/// The environment name for this process.
pub fn current() -> String {
    normalize(std::env::var(ENVIRONMENT_VAR).ok())
}

fn normalize(raw: Option<String>) -> String {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}
