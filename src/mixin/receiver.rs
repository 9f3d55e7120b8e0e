//! Receiver context passed to accessors, methods and hooks

use serde_json::Value;

use super::{CompositionRegistry, MixError};
use crate::objects::Handle;

/// The object a read, write, call or hook applies to, together with the
/// registry resolving it. Plays the role of `this` for callbacks.
#[derive(Clone, Copy)]
pub struct Receiver<'a> {
    registry: &'a CompositionRegistry,
    target: &'a Handle,
}

impl<'a> Receiver<'a> {
    pub fn new(registry: &'a CompositionRegistry, target: &'a Handle) -> Self {
        Self { registry, target }
    }

    pub fn target(&self) -> &'a Handle {
        self.target
    }

    pub fn registry(&self) -> &'a CompositionRegistry {
        self.registry
    }

    /// Resolve a key on the receiver
    pub fn get(&self, key: &str) -> Option<Value> {
        self.registry.get(self.target, key)
    }

    /// Resolve a key on the receiver as a string
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Resolve a key on the receiver as i64
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_i64())
    }

    /// Assign a key on the receiver
    pub fn set(&self, key: &str, value: Value) {
        self.registry.set(self.target, key, value);
    }

    /// Call a method on the receiver
    pub fn call(&self, key: &str, args: &[Value]) -> Result<Value, MixError> {
        self.registry.call(self.target, key, args)
    }
}
