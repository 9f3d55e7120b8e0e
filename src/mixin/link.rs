//! Links between a target and its mixed-in sources

use std::collections::BTreeSet;

use crate::objects::Handle;

/// One mixed-in source of a target
#[derive(Debug, Clone)]
pub struct MixLink {
    /// The live source object
    pub source: Handle,
    /// Keys this link may expose; `None` exposes every key
    pub keys: Option<BTreeSet<String>>,
}

impl MixLink {
    pub fn new(source: Handle, keys: Option<BTreeSet<String>>) -> Self {
        Self { source, keys }
    }

    /// Check whether `key` may be resolved through this link.
    /// Keys starting with `reserved_prefix` never are.
    pub fn exposes(&self, key: &str, reserved_prefix: &str) -> bool {
        if !reserved_prefix.is_empty() && key.starts_with(reserved_prefix) {
            return false;
        }
        match &self.keys {
            Some(keys) => keys.contains(key),
            None => true,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.keys.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_link() {
        let link = MixLink::new(Handle::new(), None);
        assert!(!link.is_restricted());
        assert!(link.exposes("foo", "__mix"));
        assert!(link.exposes("anything", "__mix"));
    }

    #[test]
    fn test_restricted_link() {
        let keys = BTreeSet::from(["a".to_string()]);
        let link = MixLink::new(Handle::new(), Some(keys));
        assert!(link.is_restricted());
        assert!(link.exposes("a", "__mix"));
        assert!(!link.exposes("b", "__mix"));
    }

    #[test]
    fn test_reserved_prefix_never_exposed() {
        let keys = BTreeSet::from(["__mixedin__".to_string()]);
        let restricted = MixLink::new(Handle::new(), Some(keys));
        let open = MixLink::new(Handle::new(), None);

        assert!(!restricted.exposes("__mixedin__", "__mix"));
        assert!(!open.exposes("__mixin__", "__mix"));
        // other dunder keys are fine
        assert!(open.exposes("__proto", "__mix"));
    }

    #[test]
    fn test_empty_prefix_disables_reservation() {
        let link = MixLink::new(Handle::new(), None);
        assert!(link.exposes("__mixin__", ""));
    }
}
