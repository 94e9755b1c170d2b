use std::collections::BTreeMap;

use crate::{arguments::CallArgs, signature::Signature, types::Value};

/// Values visible to every provider of one call
///
/// Built from the operation's plain defaults, overlaid by the caller's keywords and then by the
/// caller's positionals matched to parameter names by order.
/// Any provider declaring a parameter with one of these names receives the context value,
/// overriding whatever it had bound or resolved for it.
#[derive(Clone, Debug, Default)]
pub struct InjectionContext {
    values: BTreeMap<String, Value>,
}

impl InjectionContext {
    pub fn new(signature: &Signature, call: &CallArgs) -> Self {
        let mut values: BTreeMap<String, Value> = signature
            .parameters()
            .iter()
            .filter_map(|param| {
                let default = param.plain_default()?;
                Some((param.name().to_string(), default.clone()))
            })
            .collect();

        values.extend(
            call.keywords()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        values.extend(
            signature
                .parameters()
                .iter()
                .zip(call.positional())
                .map(|(param, value)| (param.name().to_string(), value.clone())),
        );

        InjectionContext { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
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

    /// Overrides the keywords of every declared parameter the context knows about
    ///
    /// Returns the number of injected values.
    pub(crate) fn inject(
        &self,
        factory: &'static str,
        signature: &Signature,
        keywords: &mut BTreeMap<String, Value>,
    ) -> usize {
        let mut injected = 0;
        for param in signature.parameters() {
            if let Some(value) = self.values.get(param.name()) {
                tracing::trace!(factory, param = param.name(), "Injecting context value");
                keywords.insert(param.name().to_string(), value.clone());
                injected += 1;
            }
        }
        injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positionals_override_keywords_override_defaults() {
        let signature = Signature::new()
            .param("a")
            .param_or("b", 2_i32)
            .param_or("c", 3_i32);
        let call = CallArgs::new()
            .arg(10_i32)
            .arg(20_i32)
            .kwarg("a", 100_i32)
            .kwarg("extra", 7_i32);

        let context = InjectionContext::new(&signature, &call);

        let get = |name| *context.get(name).unwrap().downcast_ref::<i32>().unwrap();
        assert_eq!(get("a"), 10);
        assert_eq!(get("b"), 20);
        assert_eq!(get("c"), 3);
        assert_eq!(get("extra"), 7);
        assert_eq!(context.len(), 4);
        assert!(context.contains("extra"));
        assert!(!context.contains("d"));

        let names: Vec<_> = context.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["a", "b", "c", "extra"]);
    }

    #[test]
    fn injects_only_declared_parameters() {
        let context = InjectionContext::new(
            &Signature::new().param("a").param("b"),
            &CallArgs::new().arg(1_i32).arg(2_i32),
        );
        let mut keywords = BTreeMap::from([("a".to_string(), Value::new(0_i32))]);

        let injected = context.inject("f", &Signature::new().param("a"), &mut keywords);

        assert_eq!(injected, 1);
        assert_eq!(keywords.len(), 1);
        assert_eq!(keywords["a"].downcast_ref::<i32>(), Ok(&1));
    }
}
