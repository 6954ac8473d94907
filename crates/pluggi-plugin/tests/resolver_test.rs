//! Integration tests for registration by name through the resolver.

use serde_json::json;

use pluggi_core::config::ResolverConfig;
use pluggi_core::error::ErrorKind;
use pluggi_plugin::prelude::*;
use pluggi_plugin::{Catalog, Reference, Resolve, Resolver};

fn catalog() -> Catalog {
    Catalog::new()
        .with_local("local/db", || {
            PluginUnit::object(PluginDefinition::new().named("localDb"))
        })
        .with_module("db", || {
            PluginUnit::object(PluginDefinition::new().named("moduleDb"))
        })
        .with_module("acme-queue", || PluginUnit::object(PluginDefinition::new()))
}

fn host_with(policy: ResolverConfig) -> Host {
    Host::builder()
        .catalog(catalog())
        .resolver_policy(policy)
        .build()
        .unwrap()
}

fn policy(module_first: bool) -> ResolverConfig {
    ResolverConfig {
        paths: vec!["local".into()],
        prefixes: vec!["acme".into()],
        module_first,
        ..ResolverConfig::default()
    }
}

#[test]
fn test_local_shadows_module_by_default() {
    let mut host = host_with(policy(false));
    host.plugin("db").unwrap();
    assert!(host.contains("localDb"));
}

#[test]
fn test_module_first_flips_order() {
    let mut host = host_with(policy(true));
    host.plugin("db").unwrap();
    assert!(host.contains("moduleDb"));
}

#[test]
fn test_prefixed_module_takes_canonical_name() {
    let mut host = host_with(policy(false));
    host.plugin(("queue", json!({"workers": 2}))).unwrap();

    let record = host.get("queue").unwrap();
    assert_eq!(record.config().get("workers"), Some(&json!(2)));
}

#[test]
fn test_prefixed_only_hides_bare_modules() {
    let mut host = host_with(ResolverConfig {
        paths: Vec::new(),
        prefixed_only: true,
        ..policy(true)
    });

    host.plugin("queue").unwrap();
    let err = host.plugin("db").unwrap_err();
    assert_eq!(err.kind, ErrorKind::PluginNotFound);
}

#[test]
fn test_custom_resolver_replaces_policy() {
    struct AlwaysDb;

    impl Resolve for AlwaysDb {
        fn resolve(&self, _name: &str) -> Option<Reference> {
            Some(Reference::Module("db".into()))
        }
    }

    let mut host = Host::builder()
        .catalog(catalog())
        .resolver(AlwaysDb)
        .build()
        .unwrap();

    host.plugin("anything").unwrap();
    assert!(host.contains("moduleDb"));
}

#[test]
fn test_resolver_exposes_strategies() {
    let catalog = std::sync::Arc::new(catalog());
    let mut resolver = Resolver::new(catalog);
    resolver.add_path("local").add_prefix("acme");

    assert_eq!(
        resolver.resolve_local("db"),
        Some(Reference::Local("local/db".into()))
    );
    assert_eq!(
        resolver.resolve_module("queue"),
        Some(Reference::Module("acme-queue".into()))
    );
    assert_eq!(resolver.resolve("missing"), None);
}
