use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::Arc,
};

/// Errors raised by factories and operation bodies
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything produced by a factory or passed to a call
///
/// Values may be shared between concurrently running providers on any thread.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type erased value flowing through argument slots
///
/// Cloning is cheap, all clones point to the same allocation.
#[derive(Clone)]
pub struct Value {
    pub info: TypeInfo,
    pub value: Arc<dyn Any + Send + Sync + 'static>,
}

impl Value {
    pub fn new<T: Injectable>(value: T) -> Self {
        Value {
            info: TypeInfo::of::<T>(),
            value: Arc::new(value),
        }
    }

    /// Wraps an already shared value without allocating again
    pub fn from_arc<T: Injectable>(value: Arc<T>) -> Self {
        Value {
            info: TypeInfo::of::<T>(),
            value,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    pub fn downcast_ref<T: Injectable>(&self) -> Result<&T, &'static str> {
        self.value
            .downcast_ref::<T>()
            .ok_or(self.info.type_name)
    }

    /// Returns true if both values share the same allocation
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Value").field(&self.info.type_name).finish()
    }
}

/// Name and id of the type stored in a [Value]
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        TypeInfo {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downcast_to_stored_type() {
        let value = Value::new(42_u32);

        assert_eq!(*value.downcast::<u32>().unwrap(), 42);
        assert_eq!(value.downcast_ref::<u32>(), Ok(&42));
        assert_eq!(value.downcast::<i64>().unwrap_err(), "u32");
        assert!(value.info.is::<u32>());
    }

    #[test]
    fn clones_share_allocation() {
        let value = Value::new("shared".to_string());
        let clone = value.clone();
        let other = Value::new("shared".to_string());

        assert!(value.ptr_eq(&clone));
        assert!(!value.ptr_eq(&other));
    }

    #[test]
    fn wraps_shared_value_without_copy() {
        let shared = Arc::new(vec![1_u8, 2]);
        let value = Value::from_arc(shared.clone());

        assert!(Arc::ptr_eq(&value.downcast::<Vec<u8>>().unwrap(), &shared));
        assert_eq!(value.info, TypeInfo::of::<Vec<u8>>());
    }
}
