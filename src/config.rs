//! Registry configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file,
//! then `MIXKIT_*` environment variables.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default prefix of keys that are never resolved through a link
pub const DEFAULT_RESERVED_PREFIX: &str = "__mix";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "MIXKIT_";

/// What an assignment does when a mixed-in accessor has a setter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Forward to the setter and also store an own value, which later reads return
    #[default]
    ShadowAndForward,
    /// Forward to the setter only; reads keep going through the accessor
    ForwardOnly,
}

/// Configuration for a [`CompositionRegistry`](crate::mixin::CompositionRegistry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Keys starting with this prefix are never mixed (empty disables)
    pub reserved_prefix: String,
    /// Setter forwarding behavior
    pub write_mode: WriteMode,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            reserved_prefix: DEFAULT_RESERVED_PREFIX.to_string(),
            write_mode: WriteMode::default(),
        }
    }
}

impl MixConfig {
    /// Figment with defaults, `path` (if any) and the environment merged in
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(MixConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults() {
        let config = MixConfig::default();
        assert_eq!(config.reserved_prefix, "__mix");
        assert_eq!(config.write_mode, WriteMode::ShadowAndForward);
    }

    #[test]
    fn test_load_without_file() {
        Jail::expect_with(|_jail| {
            let config = MixConfig::load(None)?;
            assert_eq!(config, MixConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "mixkit.toml",
                r#"
                reserved_prefix = "_hidden"
                write_mode = "forward_only"
                "#,
            )?;

            let config = MixConfig::load(Some(Path::new("mixkit.toml")))?;
            assert_eq!(config.reserved_prefix, "_hidden");
            assert_eq!(config.write_mode, WriteMode::ForwardOnly);
            Ok(())
        });
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file("mixkit.toml", "write_mode = \"forward_only\"")?;

            let config = MixConfig::load(Some(Path::new("mixkit.toml")))?;
            assert_eq!(config.reserved_prefix, DEFAULT_RESERVED_PREFIX);
            assert_eq!(config.write_mode, WriteMode::ForwardOnly);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("mixkit.toml", "reserved_prefix = \"_file\"")?;
            jail.set_env("MIXKIT_RESERVED_PREFIX", "_env");
            jail.set_env("MIXKIT_WRITE_MODE", "forward_only");

            let config = MixConfig::load(Some(Path::new("mixkit.toml")))?;
            assert_eq!(config.reserved_prefix, "_env");
            assert_eq!(config.write_mode, WriteMode::ForwardOnly);
            Ok(())
        });
    }

    #[test]
    fn test_bad_write_mode_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("mixkit.toml", "write_mode = \"sideways\"")?;

            assert!(MixConfig::load(Some(Path::new("mixkit.toml"))).is_err());
            Ok(())
        });
    }
}
