//! Mixin errors

use std::fmt;

use thiserror::Error;

use crate::objects::ObjectId;

/// Why a mix was rejected as cyclic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Source and target are the same object
    SelfMix,
    /// Source is in the target's prototype chain
    Ancestor,
    /// Target is already reachable from the source through its links
    Reachable,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleKind::SelfMix => write!(f, "source is the target itself"),
            CycleKind::Ancestor => write!(f, "source is an ancestor of the target"),
            CycleKind::Reachable => write!(f, "target is already mixed into the source"),
        }
    }
}

/// Which lifecycle hook ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Attached,
    Detached,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Attached => write!(f, "attached"),
            HookKind::Detached => write!(f, "detached"),
        }
    }
}

/// Errors returned by composition operations
#[derive(Debug, Error)]
pub enum MixError {
    #[error("invalid mixin source: {0}")]
    InvalidSource(String),

    #[error("cannot mix {source_id} into {target_id}: {kind}")]
    CyclicMix {
        target_id: ObjectId,
        source_id: ObjectId,
        kind: CycleKind,
    },

    /// The link change was committed before the hook ran
    #[error("{kind} hook of {source_id} failed")]
    Hook {
        kind: HookKind,
        source_id: ObjectId,
        #[source]
        error: anyhow::Error,
    },

    #[error("property not found: {0}")]
    NotFound(String),

    #[error("property is not callable: {0}")]
    NotCallable(String),

    #[error("method {key} failed")]
    Method {
        key: String,
        #[source]
        error: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_cyclic_message() {
        let err = MixError::CyclicMix {
            target_id: "t".into(),
            source_id: "s".into(),
            kind: CycleKind::Ancestor,
        };
        assert_eq!(
            err.to_string(),
            "cannot mix s into t: source is an ancestor of the target"
        );
    }

    #[test]
    fn test_hook_error_keeps_cause() {
        let err = MixError::Hook {
            kind: HookKind::Detached,
            source_id: "s".into(),
            error: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.to_string(), "detached hook of s failed");
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }
}
