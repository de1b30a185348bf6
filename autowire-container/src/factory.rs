//! Compiled factory plans.
//!
//! A [`Factory`] is the output of plan compilation: the resolution strategy
//! of every constructor parameter and injectable property, captured next to
//! the constructor and setter handles. Invoking it reads no metadata.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use autowire_support::rendering::{SlotLine, render_plan};

use crate::error::Result;
use crate::key::TypeKey;
use crate::metadata::{Arguments, ConstructorFn, SetterFn};
use crate::provider::{Instance, ServiceProvider};
use crate::resolver::ResolutionStrategy;

/// How one constructor parameter is filled.
#[derive(Clone, Debug)]
pub struct ParameterPlan {
    pub name: &'static str,
    pub declared: TypeKey,
    pub strategy: ResolutionStrategy,
}

/// How one property is filled after construction.
#[derive(Clone)]
pub struct PropertyPlan {
    pub name: &'static str,
    pub declared: TypeKey,
    pub strategy: ResolutionStrategy,
    pub(crate) setter: SetterFn,
}

impl fmt::Debug for PropertyPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyPlan")
            .field("name", &self.name)
            .field("declared", &self.declared)
            .field("strategy", &self.strategy)
            .finish()
    }
}

/// Reusable recipe for building one type's instances.
///
/// Immutable after compilation and `Send + Sync`; every [`invoke`]
/// allocates fresh arguments and a fresh instance.
///
/// [`invoke`]: Factory::invoke
pub struct Factory {
    implementation: TypeKey,
    parameters: Vec<ParameterPlan>,
    constructor: ConstructorFn,
    properties: Vec<PropertyPlan>,
}

impl Factory {
    pub(crate) fn new(
        implementation: TypeKey,
        parameters: Vec<ParameterPlan>,
        constructor: ConstructorFn,
        properties: Vec<PropertyPlan>,
    ) -> Self {
        Self {
            implementation,
            parameters,
            constructor,
            properties,
        }
    }

    /// Builds a fully wired instance.
    ///
    /// Parameters resolve left to right, then the constructor runs, then
    /// each injectable property is resolved and set. The first failure
    /// aborts the call and the partially built instance is dropped.
    pub fn invoke(&self, provider: &dyn ServiceProvider) -> Result<Instance> {
        trace!(implementation = %self.implementation, "Invoking factory");

        let mut values = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            let value = parameter.strategy.resolve(provider, &parameter.declared)?;
            values.push((parameter.name, value));
        }

        let mut arguments = Arguments::new(self.implementation, values);
        let mut instance = (self.constructor)(&mut arguments)?;

        for property in &self.properties {
            let value = property.strategy.resolve(provider, &property.declared)?;
            (property.setter)(&mut *instance, value)?;
        }

        Ok(instance)
    }

    #[inline]
    pub fn implementation(&self) -> TypeKey {
        self.implementation
    }

    pub fn parameters(&self) -> &[ParameterPlan] {
        &self.parameters
    }

    /// Properties that will be injected. Skipped properties are not listed.
    pub fn properties(&self) -> &[PropertyPlan] {
        &self.properties
    }

    /// Serializable snapshot of the plan.
    pub fn describe(&self) -> PlanDescription {
        let slot = |name: &str, declared: &TypeKey, strategy: &ResolutionStrategy| SlotDescription {
            name: name.to_string(),
            declared: declared.type_name().to_string(),
            strategy: strategy.label(),
        };

        PlanDescription {
            implementation: self.implementation.type_name().to_string(),
            parameters: self
                .parameters
                .iter()
                .map(|p| slot(p.name, &p.declared, &p.strategy))
                .collect(),
            properties: self
                .properties
                .iter()
                .map(|p| slot(p.name, &p.declared, &p.strategy))
                .collect(),
        }
    }

    /// Human-readable table of the plan, one line per slot.
    pub fn render(&self) -> String {
        let line = |kind, name: &str, declared: &TypeKey, strategy: &ResolutionStrategy| SlotLine {
            kind,
            name: name.to_string(),
            type_name: declared.short_name(),
            strategy: strategy.label(),
        };

        let lines: Vec<SlotLine> = self
            .parameters
            .iter()
            .map(|p| line("param", p.name, &p.declared, &p.strategy))
            .chain(
                self.properties
                    .iter()
                    .map(|p| line("prop", p.name, &p.declared, &p.strategy)),
            )
            .collect();

        render_plan(&self.implementation.short_name(), &lines)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("implementation", &self.implementation)
            .field("parameters", &self.parameters)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Serializable view of a [`Factory`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanDescription {
    pub implementation: String,
    pub parameters: Vec<SlotDescription>,
    pub properties: Vec<SlotDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDescription {
    pub name: String,
    pub declared: String,
    pub strategy: String,
}
