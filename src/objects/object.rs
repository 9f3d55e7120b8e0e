//! Object types and core structures

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;

use super::Property;
use crate::mixin::{MixError, MixLink, Receiver};

/// Unique object identifier (uuid v4)
pub type ObjectId = String;

/// Own properties of an object, keyed by name
pub type Properties = HashMap<String, Property>;

/// Lifecycle callback run when a source is mixed into or out of a target.
/// The receiver is the target.
pub type Hook = Arc<dyn Fn(&Receiver<'_>) -> anyhow::Result<()> + Send + Sync>;

/// A composable object
pub struct Object {
    /// Unique identifier
    pub id: ObjectId,
    /// Optional human readable label, used in logs and scenario output
    pub label: Option<String>,
    /// Own properties (always shadow mixed-in ones)
    pub(crate) properties: Properties,
    /// Mixed-in sources, lowest priority first
    pub(crate) links: Vec<MixLink>,
    /// Fallback consulted after own properties and links
    pub(crate) prototype: Option<Handle>,
    pub(crate) on_attached: Option<Hook>,
    pub(crate) on_detached: Option<Hook>,
}

impl Object {
    fn new(label: Option<String>, prototype: Option<Handle>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label,
            properties: Properties::new(),
            links: Vec::new(),
            prototype,
            on_attached: None,
            on_detached: None,
        }
    }
}

/// Shared reference to an [`Object`].
///
/// Cloning a handle is cheap and yields the same object; identity is
/// pointer identity.
#[derive(Clone)]
pub struct Handle(Arc<RwLock<Object>>);

impl Handle {
    /// Create an object with no prototype
    pub fn new() -> Self {
        Self::from_object(Object::new(None, None))
    }

    /// Create an object with a label and no prototype
    pub fn named(label: &str) -> Self {
        Self::from_object(Object::new(Some(label.to_string()), None))
    }

    /// Create an object whose lookups fall back to `prototype`
    pub fn with_prototype(prototype: &Handle) -> Self {
        Self::from_object(Object::new(None, Some(prototype.clone())))
    }

    /// Build an object from a JSON object; every member becomes an own value.
    ///
    /// # Returns
    /// * `Ok(Handle)` - New object without a prototype
    /// * `Err(MixError::InvalidSource)` - If `value` is not a JSON object
    pub fn from_json(value: Value) -> Result<Self, MixError> {
        match value {
            Value::Object(map) => {
                let handle = Self::new();
                {
                    let mut obj = handle.write();
                    for (k, v) in map {
                        obj.properties.insert(k, Property::Value(v));
                    }
                }
                Ok(handle)
            }
            other => Err(MixError::InvalidSource(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_object(obj: Object) -> Self {
        Self(Arc::new(RwLock::new(obj)))
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write()
    }

    pub fn id(&self) -> ObjectId {
        self.read().id.clone()
    }

    /// Label if set, otherwise the id
    pub fn label(&self) -> String {
        let obj = self.read();
        obj.label.clone().unwrap_or_else(|| obj.id.clone())
    }

    pub fn set_label(&self, label: &str) {
        self.write().label = Some(label.to_string());
    }

    /// True if both handles refer to the same object
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn prototype(&self) -> Option<Handle> {
        self.read().prototype.clone()
    }

    /// Get an own property, ignoring links and prototypes
    pub fn get_own(&self, key: &str) -> Option<Property> {
        self.read().properties.get(key).cloned()
    }

    /// Get an own plain value, ignoring links and prototypes
    pub fn get_own_value(&self, key: &str) -> Option<Value> {
        self.read()
            .properties
            .get(key)
            .and_then(|p| p.as_value().cloned())
    }

    /// Set an own plain value directly, bypassing setter forwarding
    pub fn set_own(&self, key: &str, value: Value) {
        self.define(key, Property::Value(value));
    }

    /// Define (or replace) an own property
    pub fn define(&self, key: &str, property: Property) {
        self.write().properties.insert(key.to_string(), property);
    }

    /// Remove an own property
    pub fn remove_own(&self, key: &str) -> Option<Property> {
        self.write().properties.remove(key)
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.read().properties.contains_key(key)
    }

    /// Own property names, sorted
    pub fn own_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().properties.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Run `hook` each time this object is mixed into a target
    pub fn on_attached<F>(&self, hook: F)
    where
        F: Fn(&Receiver<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.write().on_attached = Some(Arc::new(hook));
    }

    /// Run `hook` each time this object is mixed out of a target
    pub fn on_detached<F>(&self, hook: F)
    where
        F: Fn(&Receiver<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.write().on_detached = Some(Arc::new(hook));
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let obj = self.read();
        f.debug_struct("Object")
            .field("id", &obj.id)
            .field("label", &obj.label)
            .field("properties", &obj.properties)
            .field("links", &obj.links.len())
            .field("has_prototype", &obj.prototype.is_some())
            .finish()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
