//! Plugin normalizer: turns a [`Registration`] into a [`Draft`].
//!
//! The draft carries the canonical name, the init hook and the raw phase
//! methods. It does not touch the host; duplicate checks, option merging and
//! method wrapping happen during insertion.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

use crate::dispatcher::{Next, PhaseCall};
use crate::host::Host;
use crate::loader::Load;
use crate::method::Method;
use crate::options::Options;
use crate::registration::Registration;
use crate::resolver::Resolve;
use crate::unit::{InitFn, Plugin, PluginUnit};

/// A normalized plugin, ready to be initialised and inserted.
pub struct Draft {
    pub name: String,
    pub init: Option<InitFn>,
    pub methods: IndexMap<String, Method>,
    pub coroutines: bool,
}

impl std::fmt::Debug for Draft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Draft")
            .field("name", &self.name)
            .field("init", &self.init.as_ref().map(|_| "<fn>"))
            .field("methods", &self.methods)
            .field("coroutines", &self.coroutines)
            .finish()
    }
}

struct Expanded {
    declared: Option<String>,
    init: Option<InitFn>,
    methods: IndexMap<String, Method>,
    coroutines: bool,
}

/// Normalizes registration arguments.
///
/// `phases` are the host's phase names; class-style plugins get one method
/// per phase they report implementing. Bare names are resolved with
/// `resolver` and loaded with `loader`.
pub fn normalize(
    registration: Registration,
    phases: &[String],
    resolver: &dyn Resolve,
    loader: &dyn Load,
) -> AppResult<Draft> {
    let (name, expanded) = match registration {
        Registration::Named { name, unit, .. } => {
            ensure_name(&name)?;
            (name, expand(unit, phases))
        }
        Registration::ByName { name, .. } => {
            ensure_name(&name)?;
            let reference = resolver.resolve(&name).ok_or_else(|| {
                AppError::plugin_not_found(format!("Unable to load plugin '{name}'"))
            })?;
            debug!(plugin = %name, reference = %reference, "Resolved plugin");

            let expanded = expand(loader.load(&reference)?, phases);
            let name = expanded
                .declared
                .clone()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| snake_to_camel(&name));
            (name, expanded)
        }
        Registration::Unit { unit, .. } => {
            let kind = unit.kind();
            let expanded = expand(unit, phases);
            let name = expanded
                .declared
                .clone()
                .filter(|n| !n.is_empty())
                .ok_or_else(|| {
                    AppError::invalid_plugin(format!(
                        "Plugin name must be provided: {kind} unit declares no name"
                    ))
                })?;
            (name, expanded)
        }
    };
    ensure_name(&name)?;

    Ok(Draft {
        name,
        init: expanded.init,
        methods: expanded.methods,
        coroutines: expanded.coroutines,
    })
}

fn ensure_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::invalid_argument("Plugin name must not be empty"));
    }
    Ok(())
}

fn expand(unit: PluginUnit, phases: &[String]) -> Expanded {
    match unit {
        PluginUnit::Object(def) => Expanded {
            declared: def.name,
            init: def.init,
            methods: def.methods,
            coroutines: def.coroutines.unwrap_or(true),
        },
        PluginUnit::Function { name, init } => Expanded {
            declared: name.as_deref().map(uncapitalize),
            init: Some(init),
            methods: IndexMap::new(),
            coroutines: true,
        },
        PluginUnit::Class(class) => {
            let instance = class.instantiate();
            let declared = instance
                .name()
                .map(str::to_string)
                .or_else(|| Some(uncapitalize(class.name())));
            from_instance(instance, declared, phases)
        }
        PluginUnit::Instance(instance) => {
            let declared = instance.name().map(str::to_string);
            from_instance(instance, declared, phases)
        }
    }
}

fn from_instance(
    instance: Arc<dyn Plugin>,
    declared: Option<String>,
    phases: &[String],
) -> Expanded {
    let methods = phases
        .iter()
        .filter(|phase| instance.implements(phase))
        .map(|phase| {
            let plugin = Arc::clone(&instance);
            let phase_name = phase.clone();
            let method = Method::future(move |call: PhaseCall, next: Next| {
                let plugin = Arc::clone(&plugin);
                let phase_name = phase_name.clone();
                async move { plugin.run(&phase_name, call, next).await }
            });
            (phase.clone(), method)
        })
        .collect();

    let init: InitFn = Arc::new(move |host: &mut Host, config: &mut Options| {
        instance.init(host, config)?;
        Ok(None)
    });

    Expanded {
        declared,
        init: Some(init),
        methods,
        coroutines: true,
    }
}

/// Converts `my-thing` to `myThing`: each hyphen and the character after it
/// become that character uppercased.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '-' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(following) => out.extend(following.to_uppercase()),
            None => out.push('-'),
        }
    }
    out
}

/// Lowercases the first character of an identifier.
pub fn uncapitalize(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Catalog;
    use crate::method::Flow;
    use crate::resolver::Resolver;
    use crate::unit::{PluginClass, PluginDefinition};
    use async_trait::async_trait;
    use pluggi_core::error::ErrorKind;

    fn phases() -> Vec<String> {
        ["prepare", "start", "stop"].map(String::from).to_vec()
    }

    fn normalize_with(registration: Registration, catalog: Catalog) -> AppResult<Draft> {
        let catalog = Arc::new(catalog);
        let resolver = Resolver::new(catalog.clone());
        normalize(registration, &phases(), &resolver, catalog.as_ref())
    }

    fn normalize_unit(registration: Registration) -> AppResult<Draft> {
        normalize_with(registration, Catalog::new())
    }

    #[derive(Default)]
    struct HttpServer;

    #[async_trait]
    impl Plugin for HttpServer {
        fn implements(&self, phase: &str) -> bool {
            matches!(phase, "start" | "stop")
        }

        async fn run(&self, _phase: &str, _call: PhaseCall, next: Next) -> AppResult<()> {
            next.run().await
        }
    }

    struct Named;

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> Option<&str> {
            Some("Custom")
        }

        fn implements(&self, _phase: &str) -> bool {
            false
        }

        async fn run(&self, _phase: &str, _call: PhaseCall, _next: Next) -> AppResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("my-thing"), "myThing");
        assert_eq!(snake_to_camel("a-b-c"), "aBC");
        assert_eq!(snake_to_camel("plain"), "plain");
        assert_eq!(snake_to_camel("trailing-"), "trailing-");
    }

    #[test]
    fn test_uncapitalize() {
        assert_eq!(uncapitalize("HttpServer"), "httpServer");
        assert_eq!(uncapitalize("x"), "x");
        assert_eq!(uncapitalize(""), "");
    }

    #[test]
    fn test_explicit_name_wins() {
        let unit = PluginUnit::object(PluginDefinition::new().named("inner"));
        let draft = normalize_unit(("outer", unit).into()).unwrap();
        assert_eq!(draft.name, "outer");
    }

    #[test]
    fn test_object_name_used_verbatim() {
        let unit = PluginUnit::object(PluginDefinition::new().named("MyPlugin"));
        let draft = normalize_unit(unit.into()).unwrap();
        assert_eq!(draft.name, "MyPlugin");
        assert!(draft.coroutines);
    }

    #[test]
    fn test_function_name_uncapitalized() {
        let unit = PluginUnit::named_function("Setup", |_, _| Ok(None));
        let draft = normalize_unit(unit.into()).unwrap();
        assert_eq!(draft.name, "setup");
        assert!(draft.init.is_some());
    }

    #[test]
    fn test_class_methods_follow_implements() {
        let draft = normalize_unit(PluginUnit::class::<HttpServer>().into()).unwrap();
        assert_eq!(draft.name, "httpServer");
        assert_eq!(
            draft.methods.keys().collect::<Vec<_>>(),
            vec!["start", "stop"]
        );
    }

    #[test]
    fn test_instance_declared_name() {
        let draft = normalize_unit(PluginUnit::Instance(Arc::new(Named)).into()).unwrap();
        assert_eq!(draft.name, "Custom");
        assert!(draft.methods.is_empty());

        let class = PluginClass::new("Ignored", || Arc::new(Named) as Arc<dyn Plugin>);
        let draft = normalize_unit(PluginUnit::Class(class).into()).unwrap();
        assert_eq!(draft.name, "Custom");
    }

    #[test]
    fn test_nameless_unit_is_invalid() {
        let err = normalize_unit(PluginUnit::function(|_, _| Ok(None)).into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPlugin);

        let err = normalize_unit(PluginUnit::instance(HttpServer).into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPlugin);
    }

    #[test]
    fn test_empty_name_is_invalid_argument() {
        let unit = PluginUnit::object(PluginDefinition::new());
        let err = normalize_unit(("", unit).into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_by_name_ignores_empty_declared_name() {
        let catalog = Catalog::new()
            .with_module("blank", || {
                PluginUnit::object(PluginDefinition::new().named(""))
            })
            .with_module("blank-setup", || {
                PluginUnit::named_function("", |_, _| Ok(None))
            });

        let draft = normalize_with("blank".into(), catalog.clone()).unwrap();
        assert_eq!(draft.name, "blank");

        let draft = normalize_with("blank-setup".into(), catalog).unwrap();
        assert_eq!(draft.name, "blankSetup");
    }

    #[test]
    fn test_by_name_resolves_and_camel_cases() {
        let catalog = Catalog::new().with_module("my-thing", || {
            PluginUnit::object(
                PluginDefinition::new().on("start", Method::sync(|_, _| Ok(Flow::Done))),
            )
        });
        let draft = normalize_with("my-thing".into(), catalog).unwrap();
        assert_eq!(draft.name, "myThing");
        assert!(draft.methods.contains_key("start"));
    }

    #[test]
    fn test_by_name_keeps_declared_name() {
        let catalog = Catalog::new().with_module("my-thing", || {
            PluginUnit::object(PluginDefinition::new().named("thing"))
        });
        let draft = normalize_with("my-thing".into(), catalog).unwrap();
        assert_eq!(draft.name, "thing");
    }

    #[test]
    fn test_unresolved_name_is_not_found() {
        let err = normalize_unit("missing".into()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::PluginNotFound);
        assert_eq!(err.message, "Unable to load plugin 'missing'");
    }
}
