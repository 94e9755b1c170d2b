//! Declared parameter lists and provider markers.
//!
//! A [Signature] replaces any kind of runtime introspection: factories and operations declare
//! their parameters, the plain defaults and the providers up front.

use std::fmt::Debug;

use crate::{
    arguments::CallArgs,
    factories::Factory,
    types::{Injectable, Value},
};

/// Default of a declared parameter
#[derive(Clone, Debug)]
pub enum ParamDefault {
    /// A plain value used when nothing else is bound
    Value(Value),
    /// The parameter is filled by a provider
    Provider(Depends),
}

/// A single declared parameter
#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    default: Option<ParamDefault>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&ParamDefault> {
        self.default.as_ref()
    }

    /// The plain default value, if the parameter has one
    pub fn plain_default(&self) -> Option<&Value> {
        match &self.default {
            Some(ParamDefault::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// The provider marker, if the parameter is filled by a provider
    pub fn provider(&self) -> Option<&Depends> {
        match &self.default {
            Some(ParamDefault::Provider(depends)) => Some(depends),
            _ => None,
        }
    }
}

/// Ordered list of declared parameters
///
/// # Example
/// ```rust
/// use depends::{Depends, Factory, Signature};
///
/// let user = Factory::from_fn("user", Signature::new().param("user_id"), |args| async move {
///     let id: &u32 = args.get("user_id")?;
///     Ok::<_, depends::DynError>(format!("user-{id}"))
/// });
///
/// let signature = Signature::new()
///     .param("user_id")
///     .param_or("verbose", false)
///     .depends("user", Depends::on(&user));
///
/// assert_eq!(signature.len(), 3);
/// assert!(signature.get("user").unwrap().provider().is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required parameter
    pub fn param(self, name: impl Into<String>) -> Self {
        self.declare(name.into(), None)
    }

    /// Declares a parameter with a plain default
    pub fn param_or<T: Injectable>(self, name: impl Into<String>, default: T) -> Self {
        self.declare(name.into(), Some(ParamDefault::Value(Value::new(default))))
    }

    /// Declares a parameter filled by a provider
    pub fn depends(self, name: impl Into<String>, depends: Depends) -> Self {
        self.declare(name.into(), Some(ParamDefault::Provider(depends)))
    }

    fn declare(mut self, name: String, default: Option<ParamDefault>) -> Self {
        // Redeclaring keeps the original position
        match self.params.iter_mut().find(|param| param.name == name) {
            Some(existing) => existing.default = default,
            None => self.params.push(Parameter { name, default }),
        }
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|param| param.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All parameters filled by providers, in declaration order
    pub fn providers(&self) -> impl Iterator<Item = (&str, &Depends)> {
        self.params
            .iter()
            .filter_map(|param| param.provider().map(|depends| (param.name(), depends)))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// A provider marker - a factory together with the arguments bound at declaration
///
/// Markers are immutable once declared. Every marker pointing at the same [Factory] handle is
/// resolved by one single node per call.
#[derive(Clone)]
pub struct Depends {
    factory: Factory,
    bound: CallArgs,
}

impl Depends {
    pub fn on(factory: &Factory) -> Self {
        Depends {
            factory: factory.clone(),
            bound: CallArgs::new(),
        }
    }

    /// Binds the next positional argument
    pub fn arg<T: Injectable>(mut self, value: T) -> Self {
        self.bound = self.bound.arg(value);
        self
    }

    /// Binds a keyword argument
    pub fn kwarg<T: Injectable>(mut self, name: impl Into<String>, value: T) -> Self {
        self.bound = self.bound.kwarg(name, value);
        self
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn bound(&self) -> &CallArgs {
        &self.bound
    }
}

impl Debug for Depends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Depends")
            .field("factory", &self.factory.name())
            .field("bound", &self.bound)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    fn unit_factory() -> Factory {
        Factory::from_fn("unit", Signature::new(), |_| async { Ok::<_, Infallible>(()) })
    }

    #[test]
    fn keeps_declaration_order() {
        let factory = unit_factory();
        let signature = Signature::new()
            .param("a")
            .depends("b", Depends::on(&factory))
            .param_or("c", 3_i32);

        let names: Vec<_> = signature.parameters().iter().map(Parameter::name).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let providers: Vec<_> = signature.providers().map(|(name, _)| name).collect();
        assert_eq!(providers, ["b"]);

        let default = signature.get("c").unwrap().plain_default().unwrap();
        assert_eq!(default.downcast_ref::<i32>(), Ok(&3));
    }

    #[test]
    fn redeclaring_replaces_default_in_place() {
        let signature = Signature::new()
            .param("a")
            .param("b")
            .param_or("a", 1_u8);

        assert_eq!(signature.len(), 2);
        assert_eq!(signature.parameters()[0].name(), "a");
        assert!(signature.parameters()[0].plain_default().is_some());
    }

    #[test]
    fn markers_share_factory_identity() {
        let factory = unit_factory();
        let first = Depends::on(&factory).arg(1_i32);
        let second = Depends::on(&factory).kwarg("b", 2_i32);

        assert_eq!(first.factory().id(), second.factory().id());
        assert_eq!(first.bound().positional().len(), 1);
        assert!(second.bound().keywords().contains_key("b"));
    }
}
