//! Shared fixtures for host integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;

use pluggi_core::error::AppError;
use pluggi_plugin::prelude::*;

/// Ordered record of events emitted by test plugins.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }
}

/// Records `{name}-before`, runs the rest of the chain, then `{name}-after`.
pub fn onion(name: &'static str, phase: &str, log: &EventLog) -> PluginUnit {
    let log = log.clone();
    PluginUnit::object(PluginDefinition::new().on(
        phase,
        Method::future(move |_call, next| {
            let log = log.clone();
            async move {
                log.push(format!("{name}-before"));
                next.run().await?;
                log.push(format!("{name}-after"));
                Ok(())
            }
        }),
    ))
}

/// Records `name` and never runs its continuation.
pub fn blocker(name: &'static str, phase: &str, log: &EventLog) -> PluginUnit {
    let log = log.clone();
    PluginUnit::object(PluginDefinition::new().on(
        phase,
        Method::sync(move |_call, _next| {
            log.push(name);
            Ok(Flow::Done)
        }),
    ))
}

/// Records `name` and fails synchronously.
pub fn sync_failure(name: &'static str, phase: &str, log: &EventLog) -> PluginUnit {
    let log = log.clone();
    PluginUnit::object(PluginDefinition::new().on(
        phase,
        Method::sync(move |_call, _next| {
            log.push(name);
            Err(AppError::execution(format!("{name} failed")))
        }),
    ))
}

/// Records `name` and returns a rejected future.
pub fn async_failure(name: &'static str, phase: &str, log: &EventLog) -> PluginUnit {
    let log = log.clone();
    PluginUnit::object(PluginDefinition::new().on(
        phase,
        Method::future(move |_call, _next| {
            log.push(name);
            async move { Err(AppError::execution(format!("{name} failed"))) }
        }),
    ))
}

/// Stores the configuration the plugin receives on `phase`.
pub fn config_probe(phase: &str, sink: &Arc<Mutex<Option<Value>>>) -> PluginUnit {
    let sink = Arc::clone(sink);
    PluginUnit::object(PluginDefinition::new().on(
        phase,
        Method::sync(move |call, next| {
            *sink.lock().unwrap() = Some(Value::Object(call.config().clone()));
            Ok(Flow::next(next))
        }),
    ))
}
