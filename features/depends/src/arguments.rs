use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use crate::{
    errors::{ArgumentError, BindError},
    signature::Signature,
    types::{Injectable, Value},
};

/// Positional and keyword values supplied by a caller or bound to a provider marker
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keywords: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Injectable>(self, value: T) -> Self {
        self.arg_value(Value::new(value))
    }

    pub fn arg_value(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    pub fn kwarg<T: Injectable>(self, name: impl Into<String>, value: T) -> Self {
        self.kwarg_value(name, Value::new(value))
    }

    /// Sets a keyword value, replacing an earlier one with the same name
    pub fn kwarg_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keywords.insert(name.into(), value);
        self
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> &BTreeMap<String, Value> {
        &self.keywords
    }
}

/// Values bound to the parameters of a factory or operation, keyed by parameter name
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    values: BTreeMap<String, Value>,
}

impl Arguments {
    /// Borrows a bound argument as `T`
    pub fn get<T: Injectable>(&self, name: &str) -> Result<&T, ArgumentError> {
        let value = self.require(name)?;
        value
            .downcast_ref::<T>()
            .map_err(|actual| mismatch::<T>(name, actual))
    }

    /// Returns a shared handle to a bound argument
    ///
    /// The handle points to the same allocation every dependent of a provider receives.
    pub fn get_arc<T: Injectable>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        let value = self.require(name)?;
        value
            .downcast::<T>()
            .map_err(|actual| mismatch::<T>(name, actual))
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, name: &str) -> Result<&Value, ArgumentError> {
        self.values
            .get(name)
            .ok_or_else(|| ArgumentError::Missing(name.to_string()))
    }
}

fn mismatch<T: Injectable>(name: &str, actual: &'static str) -> ArgumentError {
    ArgumentError::TypeMismatch {
        name: name.to_string(),
        expected: std::any::type_name::<T>(),
        actual,
    }
}

/// Checks that the given shape of a call fits the signature
///
/// Positionals bind in declaration order, keywords must name a declared parameter and every
/// parameter left over needs a default.
pub(crate) fn check<'a>(
    signature: &Signature,
    positional: usize,
    keywords: impl IntoIterator<Item = &'a str>,
) -> Result<(), BindError> {
    let params = signature.parameters();
    if positional > params.len() {
        return Err(BindError::TooManyPositional {
            expected: params.len(),
            given: positional,
        });
    }

    let keywords: BTreeSet<&str> = keywords.into_iter().collect();
    if let Some(unexpected) = keywords.iter().find(|name| !signature.contains(name)) {
        return Err(BindError::UnexpectedKeyword(unexpected.to_string()));
    }

    for (index, param) in params.iter().enumerate() {
        let bound = index < positional || keywords.contains(param.name());
        if !bound && param.default().is_none() {
            return Err(BindError::MissingArgument(param.name().to_string()));
        }
    }
    Ok(())
}

/// Assembles the arguments of an already checked call
///
/// A keyword replaces a positional bound to the same parameter.
/// Plain defaults fill whatever is still unbound.
pub(crate) fn assemble(
    signature: &Signature,
    positional: Vec<Value>,
    mut keywords: BTreeMap<String, Value>,
) -> Arguments {
    let mut values: BTreeMap<String, Value> = signature
        .parameters()
        .iter()
        .zip(positional)
        .map(|(param, value)| (param.name().to_string(), value))
        .collect();
    values.append(&mut keywords);

    for param in signature.parameters() {
        if values.contains_key(param.name()) {
            continue;
        }
        if let Some(default) = param.plain_default() {
            values.insert(param.name().to_string(), default.clone());
        }
    }
    Arguments { values }
}

/// Binds positional and keyword values onto a signature
pub(crate) fn bind(
    signature: &Signature,
    positional: Vec<Value>,
    keywords: BTreeMap<String, Value>,
) -> Result<Arguments, BindError> {
    check(
        signature,
        positional.len(),
        keywords.keys().map(String::as_str),
    )?;
    Ok(assemble(signature, positional, keywords))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature() -> Signature {
        Signature::new().param("a").param("b").param_or("c", 3_i32)
    }

    fn keywords(pairs: &[(&str, i32)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), Value::new(*value)))
            .collect()
    }

    #[test]
    fn binds_positionals_in_order_and_fills_defaults() {
        let args = bind(
            &signature(),
            vec![Value::new(1_i32), Value::new(2_i32)],
            BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(args.get::<i32>("a"), Ok(&1));
        assert_eq!(args.get::<i32>("b"), Ok(&2));
        assert_eq!(args.get::<i32>("c"), Ok(&3));
        assert_eq!(args.len(), 3);

        let names: Vec<_> = args.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(args.value("b").unwrap().info.is::<i32>());
        assert!(args.value("d").is_none());
    }

    #[test]
    fn keyword_replaces_positional() {
        let args = bind(
            &signature(),
            vec![Value::new(1_i32), Value::new(2_i32)],
            keywords(&[("b", 20), ("c", 30)]),
        )
        .unwrap();

        assert_eq!(args.get::<i32>("b"), Ok(&20));
        assert_eq!(args.get::<i32>("c"), Ok(&30));
    }

    #[test]
    fn rejects_calls_that_do_not_fit() {
        let too_many = vec![Value::new(1_i32); 4];
        assert_eq!(
            bind(&signature(), too_many, BTreeMap::new()).unwrap_err(),
            BindError::TooManyPositional {
                expected: 3,
                given: 4
            }
        );

        assert_eq!(
            bind(&signature(), vec![], keywords(&[("a", 1), ("b", 2), ("d", 4)])).unwrap_err(),
            BindError::UnexpectedKeyword("d".into())
        );

        assert_eq!(
            bind(&signature(), vec![Value::new(1_i32)], BTreeMap::new()).unwrap_err(),
            BindError::MissingArgument("b".into())
        );
    }

    #[test]
    fn typed_access_reports_mismatch() {
        let args = bind(&signature(), vec![], keywords(&[("a", 1), ("b", 2)])).unwrap();

        assert_eq!(args.get_arc::<i32>("a").map(|a| *a), Ok(1));
        assert!(matches!(
            args.get::<String>("a"),
            Err(ArgumentError::TypeMismatch { actual: "i32", .. })
        ));
        assert_eq!(
            args.get::<i32>("zzz").unwrap_err(),
            ArgumentError::Missing("zzz".into())
        );
    }
}
