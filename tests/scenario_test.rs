//! Scenario files loaded from disk

use std::io::Write;

use mixkit::scenario::{Scenario, ScenarioError};
use mixkit::CompositionRegistry;
use serde_json::json;

fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_toml_scenario_from_disk() {
    let file = write_file(
        ".toml",
        r#"
        [objects.obj]
        [objects.s1]
        hello = "world"
        [objects.s2]
        hello = "Sphen"

        [[steps]]
        op = "mix"
        target = "obj"
        sources = ["s1"]

        [[steps]]
        op = "mix"
        target = "obj"
        sources = ["s2"]

        [[steps]]
        op = "unmix"
        target = "obj"
        sources = ["s1"]

        [[steps]]
        op = "expect"
        target = "obj"
        key = "hello"
        value = "Sphen"

        [[steps]]
        op = "unmix"
        target = "obj"
        sources = ["s2"]

        [[steps]]
        op = "expect"
        target = "obj"
        key = "hello"
        missing = true
        "#,
    );

    let registry = CompositionRegistry::default();
    let scenario = Scenario::load(file.path()).unwrap();
    let (_, report) = scenario.run(&registry).unwrap();

    assert_eq!(report.steps_run, 6);
    assert!(report.passed());
}

#[test]
fn test_json_scenario_from_disk() {
    let file = write_file(
        ".json",
        r#"{
            "objects": {
                "obj": {},
                "s": { "a": 1, "b": 2 }
            },
            "steps": [
                { "op": "mix_keys", "target": "obj", "source": "s", "keys": ["a"] },
                { "op": "expect", "target": "obj", "key": "a", "value": 1 },
                { "op": "expect", "target": "obj", "key": "b", "missing": true },
                { "op": "set", "target": "obj", "key": "a", "value": "local" },
                { "op": "remove", "target": "obj", "key": "a" },
                { "op": "expect", "target": "obj", "key": "a", "value": 1 }
            ]
        }"#,
    );

    let registry = CompositionRegistry::default();
    let scenario = Scenario::load(file.path()).unwrap();
    let (world, report) = scenario.run(&registry).unwrap();

    assert!(report.passed(), "failures: {:?}", report.failures().collect::<Vec<_>>());
    let obj = world.get("obj").unwrap();
    assert_eq!(registry.keys(obj), vec!["a"]);
    assert_eq!(registry.get(obj, "a"), Some(json!(1)));
}

#[test]
fn test_malformed_scenario() {
    let file = write_file(".toml", "[[steps]]\nop = \"explode\"\n");

    let err = Scenario::load(file.path()).unwrap_err();
    assert!(matches!(err, ScenarioError::Parse(_)));
}

#[test]
fn test_world_names_include_root() {
    let registry = CompositionRegistry::default();
    let scenario = Scenario::from_toml_str("[objects.thing]\n").unwrap();
    let world = scenario.build(&registry).unwrap();

    let names: Vec<_> = world.names().collect();
    assert_eq!(names, vec!["root", "thing"]);
    assert!(world.get("root").unwrap().ptr_eq(registry.root()));
}
