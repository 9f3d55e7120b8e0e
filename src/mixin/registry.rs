//! Composition registry: mixing, unmixing and property resolution
//!
//! Lookup order for a key on a target (first hit wins):
//! 1. Own property of the target
//! 2. Mixed-in sources, most recently mixed first, depth-first: a source's
//!    own properties, then its own mixed-in sources, then its prototypes
//! 3. The same search on each object of the target's prototype chain
//!
//! Each object is visited at most once per lookup.
//!
//! No lock is held while accessors, methods or hooks run.

use std::collections::{BTreeSet, HashSet};
use std::sync::OnceLock;

use serde_json::Value;
use tracing::{debug, warn};

use super::{CycleKind, HookKind, MixError, MixLink, Receiver};
use crate::config::{MixConfig, WriteMode};
use crate::objects::{Handle, Hook, ObjectId, Property};

static GLOBAL: OnceLock<CompositionRegistry> = OnceLock::new();

/// Resolves properties of composite objects and manages their links
#[derive(Debug)]
pub struct CompositionRegistry {
    config: MixConfig,
    root: Handle,
}

impl Default for CompositionRegistry {
    fn default() -> Self {
        Self::new(MixConfig::default())
    }
}

impl CompositionRegistry {
    /// Create a registry with its own root object
    pub fn new(config: MixConfig) -> Self {
        Self {
            config,
            root: Handle::named("root"),
        }
    }

    /// The process-wide registry. Uses the default configuration unless
    /// [`install`](Self::install) ran first.
    pub fn global() -> &'static CompositionRegistry {
        GLOBAL.get_or_init(Self::default)
    }

    /// Configure the process-wide registry.
    ///
    /// # Returns
    /// * `Ok(&registry)` - The installed registry
    /// * `Err(config)` - The global registry already exists; `config` is handed back
    pub fn install(config: MixConfig) -> Result<&'static CompositionRegistry, MixConfig> {
        GLOBAL
            .set(Self::new(config))
            .map_err(|rejected| rejected.config)?;
        Ok(Self::global())
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    /// Root object; every object created by [`object`](Self::object) falls back to it
    pub fn root(&self) -> &Handle {
        &self.root
    }

    /// Create an object whose prototype is the root
    pub fn object(&self) -> Handle {
        Handle::with_prototype(&self.root)
    }

    /// Create a root-backed object from a JSON object
    pub fn object_from_json(&self, value: Value) -> Result<Handle, MixError> {
        let obj = Handle::from_json(value)?;
        obj.write().prototype = Some(self.root.clone());
        Ok(obj)
    }

    /// Mix `sources` into `target`, in order; the last one gets the highest priority.
    ///
    /// Every source is checked for cycles before any link is made. Each link
    /// is committed before the source's attached hook runs; if a hook fails
    /// the error is returned and the remaining sources are not mixed.
    pub fn mix<'t>(&self, target: &'t Handle, sources: &[&Handle]) -> Result<&'t Handle, MixError> {
        for source in sources {
            self.check_cycle(target, source)?;
        }
        for source in sources {
            self.link(target, source, None)?;
        }
        Ok(target)
    }

    /// Mix `source` into `target`, exposing only `keys`.
    ///
    /// Keys the source does not expose at this moment are dropped from the set.
    pub fn mix_with_keys<'t, I, K>(
        &self,
        target: &'t Handle,
        source: &Handle,
        keys: I,
    ) -> Result<&'t Handle, MixError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.check_cycle(target, source)?;

        let available = self.source_keys(source);
        let mut selected = BTreeSet::new();
        for key in keys {
            let key = key.as_ref();
            if available.contains(key) {
                selected.insert(key.to_string());
            } else {
                debug!("{} does not expose {}, not mixing it", source.label(), key);
            }
        }

        self.link(target, source, Some(selected))?;
        Ok(target)
    }

    /// Build a source from a JSON object and mix it into `target`.
    /// Returns the new source so it can be unmixed later.
    pub fn mix_json(&self, target: &Handle, value: Value) -> Result<Handle, MixError> {
        let source = Handle::from_json(value)?;
        self.mix(target, &[&source])?;
        Ok(source)
    }

    /// Remove `sources` from `target`, in order.
    ///
    /// A source that is not mixed in is skipped. Each link is removed before
    /// the source's detached hook runs; a failing hook stops the call.
    pub fn unmix<'t>(&self, target: &'t Handle, sources: &[&Handle]) -> Result<&'t Handle, MixError> {
        for source in sources {
            let removed = {
                let mut obj = target.write();
                match obj.links.iter().position(|l| l.source.ptr_eq(source)) {
                    Some(i) => {
                        obj.links.remove(i);
                        true
                    }
                    None => false,
                }
            };

            if !removed {
                debug!("{} is not mixed into {}", source.label(), target.label());
                continue;
            }
            debug!("unmixed {} from {}", source.label(), target.label());

            let hook = source.read().on_detached.clone();
            self.run_hook(HookKind::Detached, hook, target, source)?;
        }
        Ok(target)
    }

    /// Resolve `key` on `target`
    pub fn get(&self, target: &Handle, key: &str) -> Option<Value> {
        let property = self.find(target, key)?;
        property.read(&Receiver::new(self, target))
    }

    /// Check whether `key` resolves to any property on `target`
    pub fn contains(&self, target: &Handle, key: &str) -> bool {
        self.find(target, key).is_some()
    }

    /// The property `key` resolves to on `target`, without invoking it
    pub fn find(&self, target: &Handle, key: &str) -> Option<Property> {
        self.search(target, key, true)
    }

    /// Assign `key` on `target`.
    ///
    /// An own accessor receives the write through its setter. Otherwise the
    /// property the key would resolve to without the target's own slot is
    /// looked up (links, then prototypes); if it has a setter, every write is
    /// forwarded to it. The value is then stored as an own property, except
    /// in `forward_only` mode when a setter was called and no own value
    /// exists yet.
    pub fn set(&self, target: &Handle, key: &str, value: Value) {
        let receiver = Receiver::new(self, target);

        let own = target.get_own(key);
        match &own {
            Some(Property::Accessor { set: Some(setter), .. }) => {
                setter(&receiver, value);
                return;
            }
            Some(Property::Accessor { set: None, .. }) => {
                debug!("{} has a read-only {}, ignoring write", target.label(), key);
                return;
            }
            _ => {}
        }

        let forwarded = match self.search(target, key, false) {
            Some(Property::Accessor {
                set: Some(setter), ..
            }) => {
                setter(&receiver, value.clone());
                true
            }
            _ => false,
        };

        if forwarded && own.is_none() && self.config.write_mode == WriteMode::ForwardOnly {
            return;
        }
        target.set_own(key, value);
    }

    /// Remove an own property of `target`, revealing mixed-in or inherited values
    pub fn remove(&self, target: &Handle, key: &str) -> Option<Property> {
        let removed = target.remove_own(key);
        if removed.is_some() {
            debug!("removed {} from {}", key, target.label());
        }
        removed
    }

    /// Call the method `key` resolves to, with `target` as receiver
    pub fn call(&self, target: &Handle, key: &str, args: &[Value]) -> Result<Value, MixError> {
        match self.find(target, key) {
            Some(Property::Method(method)) => {
                method(&Receiver::new(self, target), args).map_err(|error| MixError::Method {
                    key: key.to_string(),
                    error,
                })
            }
            Some(_) => Err(MixError::NotCallable(key.to_string())),
            None => Err(MixError::NotFound(key.to_string())),
        }
    }

    /// Every key visible on `target`, sorted
    pub fn keys(&self, target: &Handle) -> Vec<String> {
        self.collect_keys(target, false).into_iter().collect()
    }

    /// Sources mixed into `target`, lowest priority first
    pub fn mixins(&self, target: &Handle) -> Vec<Handle> {
        target
            .read()
            .links
            .iter()
            .map(|l| l.source.clone())
            .collect()
    }

    pub fn is_mixed(&self, target: &Handle, source: &Handle) -> bool {
        target.read().links.iter().any(|l| l.source.ptr_eq(source))
    }

    fn link(
        &self,
        target: &Handle,
        source: &Handle,
        keys: Option<BTreeSet<String>>,
    ) -> Result<(), MixError> {
        // hooks of earlier sources may have changed the link graph
        self.check_cycle(target, source)?;

        let replaced = {
            let mut obj = target.write();
            let before = obj.links.len();
            obj.links.retain(|l| !l.source.ptr_eq(source));
            let replaced = obj.links.len() != before;
            obj.links.push(MixLink::new(source.clone(), keys));
            replaced
        };

        if replaced {
            debug!("re-mixed {} into {}", source.label(), target.label());
        } else {
            debug!("mixed {} into {}", source.label(), target.label());
        }

        let hook = source.read().on_attached.clone();
        self.run_hook(HookKind::Attached, hook, target, source)
    }

    fn run_hook(
        &self,
        kind: HookKind,
        hook: Option<Hook>,
        target: &Handle,
        source: &Handle,
    ) -> Result<(), MixError> {
        let Some(hook) = hook else {
            return Ok(());
        };

        hook(&Receiver::new(self, target)).map_err(|error| {
            warn!(
                "{} hook of {} failed on {}: {:#}",
                kind,
                source.label(),
                target.label(),
                error
            );
            MixError::Hook {
                kind,
                source_id: source.id(),
                error,
            }
        })
    }

    fn check_cycle(&self, target: &Handle, source: &Handle) -> Result<(), MixError> {
        let kind = if target.ptr_eq(source) {
            Some(CycleKind::SelfMix)
        } else if self
            .prototype_chain(target)
            .iter()
            .skip(1)
            .any(|ancestor| ancestor.ptr_eq(source))
        {
            Some(CycleKind::Ancestor)
        } else if reaches(source, target) {
            Some(CycleKind::Reachable)
        } else {
            None
        };

        match kind {
            Some(kind) => Err(MixError::CyclicMix {
                target_id: target.id(),
                source_id: source.id(),
                kind,
            }),
            None => Ok(()),
        }
    }

    /// `target` followed by its prototypes, nearest first
    fn prototype_chain(&self, target: &Handle) -> Vec<Handle> {
        let mut chain = vec![target.clone()];
        let mut current = target.prototype();
        while let Some(proto) = current {
            current = proto.prototype();
            chain.push(proto);
        }
        chain
    }

    /// Depth-first search for `key`: an object's own slot, then its links
    /// (newest first, each searched fully), then its prototype. Linked
    /// sources are searched the same way, prototypes included. An object
    /// already visited is skipped, so shared or cyclic graphs stay finite.
    fn search(&self, start: &Handle, key: &str, check_own: bool) -> Option<Property> {
        let prefix = self.config.reserved_prefix.as_str();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack = vec![(start.clone(), check_own)];

        while let Some((obj, check_own)) = stack.pop() {
            let obj = obj.read();
            if !seen.insert(obj.id.clone()) {
                continue;
            }
            if check_own {
                if let Some(property) = obj.properties.get(key) {
                    return Some(property.clone());
                }
            }
            // pushed first, popped after every link
            if let Some(proto) = &obj.prototype {
                stack.push((proto.clone(), true));
            }
            // oldest first, so the newest link is popped next
            stack.extend(
                obj.links
                    .iter()
                    .filter(|l| l.exposes(key, prefix))
                    .map(|l| (l.source.clone(), true)),
            );
        }

        None
    }

    /// Keys a link to `source` would expose right now
    fn source_keys(&self, source: &Handle) -> BTreeSet<String> {
        self.collect_keys(source, true)
    }

    /// Keys visible from `start` through its own slots, links and prototypes.
    ///
    /// Keys reached through a link honor the link key sets and the reserved
    /// prefix; `linked` applies those rules to `start` itself.
    fn collect_keys(&self, start: &Handle, linked: bool) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut seen: HashSet<(ObjectId, bool, Option<BTreeSet<String>>)> = HashSet::new();
        let mut stack: Vec<(Handle, bool, Option<BTreeSet<String>>)> =
            vec![(start.clone(), linked, None)];

        while let Some((obj, linked, filter)) = stack.pop() {
            let obj = obj.read();
            if !seen.insert((obj.id.clone(), linked, filter.clone())) {
                continue;
            }
            out.extend(
                obj.properties
                    .keys()
                    .filter(|k| !linked || self.is_exposed(k, &filter))
                    .cloned(),
            );
            if let Some(proto) = &obj.prototype {
                stack.push((proto.clone(), linked, filter.clone()));
            }
            for link in &obj.links {
                stack.push((link.source.clone(), true, narrow(&filter, &link.keys)));
            }
        }

        out
    }

    fn is_exposed(&self, key: &str, filter: &Option<BTreeSet<String>>) -> bool {
        !self.is_reserved(key) && filter.as_ref().map_or(true, |f| f.contains(key))
    }

    fn is_reserved(&self, key: &str) -> bool {
        let prefix = &self.config.reserved_prefix;
        !prefix.is_empty() && key.starts_with(prefix.as_str())
    }
}

/// Intersection of two optional key sets; `None` means unrestricted
fn narrow(a: &Option<BTreeSet<String>>, b: &Option<BTreeSet<String>>) -> Option<BTreeSet<String>> {
    match (a, b) {
        (None, None) => None,
        (Some(keys), None) | (None, Some(keys)) => Some(keys.clone()),
        (Some(a), Some(b)) => Some(a.intersection(b).cloned().collect()),
    }
}

/// True if `to` is reachable from `from` by following links
fn reaches(from: &Handle, to: &Handle) -> bool {
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut stack = vec![from.clone()];

    while let Some(obj) = stack.pop() {
        if obj.ptr_eq(to) {
            return true;
        }
        let obj = obj.read();
        if !seen.insert(obj.id.clone()) {
            continue;
        }
        stack.extend(obj.links.iter().map(|l| l.source.clone()));
    }

    false
}
