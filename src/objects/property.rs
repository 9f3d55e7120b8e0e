//! Property variants stored on objects

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::mixin::Receiver;

/// Computes a value for the receiving object
pub type Getter = Arc<dyn Fn(&Receiver<'_>) -> Value + Send + Sync>;

/// Accepts a value written on the receiving object
pub type Setter = Arc<dyn Fn(&Receiver<'_>, Value) + Send + Sync>;

/// Callable property, invoked with the receiving object and arguments
pub type Method = Arc<dyn Fn(&Receiver<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// A single property slot on an object.
///
/// Accessors and methods are always invoked with the object the read or
/// write was made on (the receiver), not the object that defines them.
#[derive(Clone)]
pub enum Property {
    /// Plain JSON value
    Value(Value),
    /// Getter/setter pair; either half may be absent
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    /// Callable through `CompositionRegistry::call`
    Method(Method),
}

impl Property {
    /// Accessor with only a getter
    pub fn getter<F>(get: F) -> Self
    where
        F: Fn(&Receiver<'_>) -> Value + Send + Sync + 'static,
    {
        Property::Accessor {
            get: Some(Arc::new(get)),
            set: None,
        }
    }

    /// Accessor with both a getter and a setter
    pub fn accessor<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&Receiver<'_>) -> Value + Send + Sync + 'static,
        S: Fn(&Receiver<'_>, Value) + Send + Sync + 'static,
    {
        Property::Accessor {
            get: Some(Arc::new(get)),
            set: Some(Arc::new(set)),
        }
    }

    /// Accessor with only a setter; reads of it yield nothing
    pub fn setter<S>(set: S) -> Self
    where
        S: Fn(&Receiver<'_>, Value) + Send + Sync + 'static,
    {
        Property::Accessor {
            get: None,
            set: Some(Arc::new(set)),
        }
    }

    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&Receiver<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Property::Method(Arc::new(f))
    }

    /// Read this property on behalf of `receiver`
    pub fn read(&self, receiver: &Receiver<'_>) -> Option<Value> {
        match self {
            Property::Value(v) => Some(v.clone()),
            Property::Accessor { get: Some(get), .. } => Some(get(receiver)),
            Property::Accessor { get: None, .. } => None,
            Property::Method(_) => None,
        }
    }

    /// The setter, if this is a writable accessor
    pub fn setter_fn(&self) -> Option<&Setter> {
        match self {
            Property::Accessor { set: Some(set), .. } => Some(set),
            _ => None,
        }
    }

    /// The plain value, if this is not an accessor or method
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self, Property::Accessor { .. })
    }

    pub fn is_method(&self) -> bool {
        matches!(self, Property::Method(_))
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Property::Accessor { get, set } => f
                .debug_struct("Accessor")
                .field("get", &get.is_some())
                .field("set", &set.is_some())
                .finish(),
            Property::Method(_) => f.write_str("Method"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixin::CompositionRegistry;
    use crate::objects::Handle;
    use serde_json::json;

    #[test]
    fn test_value_read() {
        let registry = CompositionRegistry::default();
        let obj = Handle::new();
        let rx = Receiver::new(&registry, &obj);

        let prop = Property::from(json!("bar"));
        assert_eq!(prop.read(&rx), Some(json!("bar")));
        assert_eq!(prop.as_value(), Some(&json!("bar")));
        assert!(prop.setter_fn().is_none());
    }

    #[test]
    fn test_accessor_read_uses_receiver() {
        let registry = CompositionRegistry::default();
        let obj = Handle::new();
        obj.set_own("name", json!("sword"));
        let rx = Receiver::new(&registry, &obj);

        let prop = Property::getter(|rx| json!(format!("a {}", rx.get_str("name").unwrap_or_default())));
        assert!(prop.is_accessor());
        assert_eq!(prop.read(&rx), Some(json!("a sword")));
    }

    #[test]
    fn test_write_only_and_method_read_nothing() {
        let registry = CompositionRegistry::default();
        let obj = Handle::new();
        let rx = Receiver::new(&registry, &obj);

        let write_only = Property::setter(|_, _| {});
        assert_eq!(write_only.read(&rx), None);
        assert!(write_only.setter_fn().is_some());

        let method = Property::method(|_, _| Ok(json!(1)));
        assert!(method.is_method());
        assert_eq!(method.read(&rx), None);
    }

    #[test]
    fn test_debug_hides_closures() {
        let prop = Property::accessor(|_| json!(1), |_, _| {});
        assert_eq!(format!("{:?}", prop), "Accessor { get: true, set: true }");
    }
}
