//! Integration tests for plugin registration and options merging.

mod helpers;

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use helpers::{EventLog, config_probe, onion};
use pluggi_core::error::{AppError, ErrorKind};
use pluggi_plugin::prelude::*;
use pluggi_plugin::{Catalog, PluginClass};

#[derive(Default)]
struct Cache;

#[async_trait]
impl Plugin for Cache {
    fn implements(&self, phase: &str) -> bool {
        matches!(phase, "prepare" | "stop")
    }

    fn init(&self, _host: &mut Host, config: &mut Options) -> AppResult<()> {
        config.entry("capacity").or_insert(json!(64));
        Ok(())
    }

    async fn run(&self, _phase: &str, _call: PhaseCall, next: Next) -> AppResult<()> {
        next.run().await
    }
}

struct Metrics {
    name: String,
}

#[async_trait]
impl Plugin for Metrics {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn implements(&self, phase: &str) -> bool {
        phase == "start"
    }

    async fn run(&self, _phase: &str, _call: PhaseCall, next: Next) -> AppResult<()> {
        next.run().await
    }
}

#[test]
fn test_duplicate_name_leaves_existing_record() {
    let log = EventLog::new();
    let mut host = Host::new(None).unwrap();
    host.plugin(("a", onion("a", "start", &log), json!({"v": 1})))
        .unwrap();

    let err = host
        .plugin(("a", onion("a", "stop", &log), json!({"v": 2})))
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::DuplicateName);
    assert_eq!(host.len(), 1);
    let record = host.get("a").unwrap();
    assert_eq!(record.config().get("v"), Some(&json!(1)));
    assert!(record.implements("start"));
    assert!(!record.implements("stop"));
}

#[tokio::test]
async fn test_local_options_override_global() {
    let seen = Arc::new(Mutex::new(None));
    let mut host = Host::new(Some(json!({"p": {"a": 1}}))).unwrap();
    host.plugin(("p", config_probe("start", &seen), json!({"a": 2, "b": 3})))
        .unwrap();

    host.start(None).await.unwrap();

    assert_eq!(seen.lock().unwrap().take(), Some(json!({"a": 2, "b": 3})));
}

#[tokio::test]
async fn test_global_options_used_as_is() {
    let seen = Arc::new(Mutex::new(None));
    let mut host = Host::new(Some(json!({"p": {"a": 1}}))).unwrap();
    host.plugin(("p", config_probe("start", &seen))).unwrap();

    host.start(None).await.unwrap();

    assert_eq!(seen.lock().unwrap().take(), Some(json!({"a": 1})));
}

#[test]
fn test_mutated_config_does_not_alias_global_options() {
    let mut host = Host::new(Some(json!({"p": {"a": 1}}))).unwrap();
    let mutate_then_fail = PluginUnit::function(|_host, config| {
        config.insert("a".into(), json!(99));
        Err(AppError::execution("not today"))
    });
    assert!(host.plugin(("p", mutate_then_fail)).is_err());

    let keep = PluginUnit::function(|_host, config| {
        config.insert("b".into(), json!(true));
        Ok(None)
    });
    host.plugin(("p", keep)).unwrap();

    assert_eq!(host.options()["p"], json!({"a": 1}));
    assert_eq!(
        Value::Object((**host.get("p").unwrap().config()).clone()),
        json!({"a": 1, "b": true})
    );
}

#[test]
fn test_registration_shapes() {
    let catalog = Catalog::new().with_module("feature-flags", || {
        PluginUnit::object(PluginDefinition::new().on("start", Method::sync(|_, _| Ok(Flow::Done))))
    });
    let mut host = Host::builder().catalog(catalog).build().unwrap();

    host.plugin(PluginUnit::object(PluginDefinition::new().named("Audit")))
        .unwrap()
        .plugin(PluginUnit::named_function("Bootstrap", |_, _| Ok(None)))
        .unwrap()
        .plugin((PluginUnit::class::<Cache>(), json!({"capacity": 8})))
        .unwrap()
        .plugin(PluginUnit::instance(Metrics {
            name: "stats".into(),
        }))
        .unwrap()
        .plugin("feature-flags")
        .unwrap()
        .plugin(("explicit", PluginUnit::class::<Cache>()))
        .unwrap();

    assert_eq!(
        host.plugins().names().collect::<Vec<_>>(),
        vec!["Audit", "bootstrap", "cache", "stats", "featureFlags", "explicit"]
    );

    let cache = host.get("cache").unwrap();
    assert_eq!(cache.phases().collect::<Vec<_>>(), vec!["prepare", "stop"]);
    assert_eq!(cache.config().get("capacity"), Some(&json!(8)));
    assert_eq!(
        host.get("explicit").unwrap().config().get("capacity"),
        Some(&json!(64))
    );
}

#[test]
fn test_class_constructor_runs_per_registration() {
    let built = Arc::new(Mutex::new(0));
    let counter = built.clone();
    let class = PluginClass::new("Counter", move || {
        *counter.lock().unwrap() += 1;
        Arc::new(Cache) as Arc<dyn Plugin>
    });

    let mut host = Host::new(None).unwrap();
    host.plugin(PluginUnit::Class(class.clone())).unwrap();
    host.plugin(("second", PluginUnit::Class(class))).unwrap();

    assert_eq!(*built.lock().unwrap(), 2);
    assert!(host.contains("counter"));
}

#[test]
fn test_unresolvable_name_leaves_host_unchanged() {
    let log = EventLog::new();
    let mut host = Host::new(None).unwrap();
    host.plugin(("a", onion("a", "start", &log))).unwrap();

    let err = host.plugin("does-not-exist").unwrap_err();

    assert_eq!(err.kind, ErrorKind::PluginNotFound);
    assert_eq!(host.plugins().names().collect::<Vec<_>>(), vec!["a"]);
}

#[test]
fn test_failing_init_rolls_back_children() {
    let log = EventLog::new();
    let child_log = log.clone();
    let mut host = Host::new(None).unwrap();
    host.plugin(("first", onion("first", "start", &log))).unwrap();

    let parent = PluginUnit::function(move |host, _config| {
        host.plugin(("child", onion("child", "start", &child_log)))?;
        Err(AppError::execution("parent init failed"))
    });
    let err = host.plugin(("parent", parent)).unwrap_err();

    assert_eq!(err.message, "parent init failed");
    assert_eq!(host.plugins().names().collect::<Vec<_>>(), vec!["first"]);
}

#[tokio::test]
async fn test_children_dispatch_before_parent() {
    let log = EventLog::new();
    let child_log = log.clone();
    let parent_log = log.clone();
    let mut host = Host::new(None).unwrap();

    let parent = PluginUnit::object(
        PluginDefinition::new()
            .with_init(move |host, _config| {
                host.plugin(("child", onion("child", "start", &child_log)))?;
                Ok(None)
            })
            .on(
                "start",
                Method::sync(move |_call, next| {
                    parent_log.push("parent");
                    Ok(Flow::next(next))
                }),
            ),
    );
    host.plugin(("parent", parent)).unwrap();

    host.start(None).await.unwrap();

    assert_eq!(log.events(), vec!["child-before", "parent", "child-after"]);
}

#[test]
fn test_nameless_unit_rejected() {
    let mut host = Host::new(None).unwrap();
    let err = host
        .plugin(PluginUnit::function(|_, _| Ok(None)))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidPlugin);
    assert!(host.is_empty());
}
