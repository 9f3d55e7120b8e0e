//! Scenario files - named objects plus a list of mix operations and expectations
//!
//! ```toml
//! [objects.obj]
//! [objects.mixme]
//! foo = "bar"
//!
//! [[steps]]
//! op = "mix"
//! target = "obj"
//! sources = ["mixme"]
//!
//! [[steps]]
//! op = "expect"
//! target = "obj"
//! key = "foo"
//! value = "bar"
//! ```
//!
//! The name `root` refers to the registry root. An `expect` step with
//! `missing = true` expects the key to be unresolved; without it, a missing
//! `value` means JSON `null`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::providers::{Format, Json, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::mixin::{CompositionRegistry, MixError};
use crate::objects::Handle;

/// Name that always refers to the registry root
pub const ROOT_NAME: &str = "root";

/// Errors loading or running a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("scenario file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] figment::Error),

    #[error("object {name} is invalid: {error}")]
    InvalidObject {
        name: String,
        #[source]
        error: MixError,
    },

    #[error("step {step}: unknown object {name}")]
    UnknownObject { step: usize, name: String },

    #[error("step {step} failed")]
    Step {
        step: usize,
        #[source]
        error: MixError,
    },
}

/// One scenario operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Mix {
        target: String,
        sources: Vec<String>,
    },
    MixKeys {
        target: String,
        source: String,
        keys: Vec<String>,
    },
    Unmix {
        target: String,
        sources: Vec<String>,
    },
    Set {
        target: String,
        key: String,
        value: Value,
    },
    Remove {
        target: String,
        key: String,
    },
    /// Check what `key` resolves to; `missing = true` expects it unresolved
    Expect {
        target: String,
        key: String,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        missing: bool,
    },
}

/// A parsed scenario file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Object name -> JSON object of own values
    #[serde(default)]
    pub objects: BTreeMap<String, Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Result of one `expect` step
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    pub step: usize,
    pub target: String,
    pub key: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl Expectation {
    pub fn passed(&self) -> bool {
        self.expected == self.actual
    }
}

/// Outcome of running a scenario
#[derive(Debug, Default)]
pub struct Report {
    pub steps_run: usize,
    pub expectations: Vec<Expectation>,
}

impl Report {
    pub fn failures(&self) -> impl Iterator<Item = &Expectation> {
        self.expectations.iter().filter(|e| !e.passed())
    }

    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Named objects created for a scenario
#[derive(Debug)]
pub struct World {
    objects: BTreeMap<String, Handle>,
}

impl World {
    pub fn get(&self, name: &str) -> Option<&Handle> {
        self.objects.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    fn lookup(&self, step: usize, name: &str) -> Result<&Handle, ScenarioError> {
        self.objects
            .get(name)
            .ok_or_else(|| ScenarioError::UnknownObject {
                step,
                name: name.to_string(),
            })
    }
}

impl Scenario {
    /// Load a scenario; `.json` files are parsed as JSON, anything else as TOML
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        if !path.exists() {
            return Err(ScenarioError::NotFound(path.to_path_buf()));
        }
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Figment::from(Json::file(path)),
            _ => Figment::from(Toml::file(path)),
        };
        Ok(figment.extract()?)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ScenarioError> {
        Ok(Figment::from(Toml::string(source)).extract()?)
    }

    pub fn from_json_str(source: &str) -> Result<Self, ScenarioError> {
        Ok(Figment::from(Json::string(source)).extract()?)
    }

    /// Create the scenario's objects in `registry`
    pub fn build(&self, registry: &CompositionRegistry) -> Result<World, ScenarioError> {
        let mut objects = BTreeMap::new();
        objects.insert(ROOT_NAME.to_string(), registry.root().clone());

        for (name, value) in &self.objects {
            let invalid = |error| ScenarioError::InvalidObject {
                name: name.clone(),
                error,
            };

            if name == ROOT_NAME {
                // members land directly on the root
                let values = Handle::from_json(value.clone()).map_err(invalid)?;
                for key in values.own_keys() {
                    if let Some(v) = values.get_own_value(&key) {
                        registry.root().set_own(&key, v);
                    }
                }
                continue;
            }

            let obj = registry.object_from_json(value.clone()).map_err(invalid)?;
            obj.set_label(name);
            objects.insert(name.clone(), obj);
        }

        Ok(World { objects })
    }

    /// Build the objects and run every step in order
    pub fn run(&self, registry: &CompositionRegistry) -> Result<(World, Report), ScenarioError> {
        info!(
            "running scenario with {} objects and {} steps",
            self.objects.len(),
            self.steps.len()
        );

        let world = self.build(registry)?;
        let mut report = Report::default();

        for (step, op) in self.steps.iter().enumerate() {
            debug!("step {}: {:?}", step, op);
            let failed = |error| ScenarioError::Step { step, error };

            match op {
                Step::Mix { target, sources } => {
                    let target = world.lookup(step, target)?;
                    let sources = sources
                        .iter()
                        .map(|name| world.lookup(step, name))
                        .collect::<Result<Vec<_>, _>>()?;
                    registry.mix(target, &sources).map_err(failed)?;
                }
                Step::MixKeys {
                    target,
                    source,
                    keys,
                } => {
                    let target = world.lookup(step, target)?;
                    let source = world.lookup(step, source)?;
                    registry
                        .mix_with_keys(target, source, keys)
                        .map_err(failed)?;
                }
                Step::Unmix { target, sources } => {
                    let target = world.lookup(step, target)?;
                    let sources = sources
                        .iter()
                        .map(|name| world.lookup(step, name))
                        .collect::<Result<Vec<_>, _>>()?;
                    registry.unmix(target, &sources).map_err(failed)?;
                }
                Step::Set { target, key, value } => {
                    let obj = world.lookup(step, target)?;
                    registry.set(obj, key, value.clone());
                }
                Step::Remove { target, key } => {
                    let obj = world.lookup(step, target)?;
                    registry.remove(obj, key);
                }
                Step::Expect {
                    target,
                    key,
                    value,
                    missing,
                } => {
                    let obj = world.lookup(step, target)?;
                    report.expectations.push(Expectation {
                        step,
                        target: target.clone(),
                        key: key.clone(),
                        expected: (!missing).then(|| value.clone()),
                        actual: registry.get(obj, key),
                    });
                }
            }
            report.steps_run += 1;
        }

        Ok((world, report))
    }
}
