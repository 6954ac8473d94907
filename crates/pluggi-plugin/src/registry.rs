//! Plugin registry: the host's insertion-ordered map of plugin records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use uuid::Uuid;

use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

use crate::method::MethodSlot;
use crate::options::Options;

/// A registered plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    name: String,
    config: Arc<Options>,
    methods: IndexMap<String, MethodSlot>,
    coroutines: bool,
    host: Uuid,
    registered_at: DateTime<Utc>,
}

impl PluginRecord {
    pub(crate) fn new(
        name: String,
        config: Options,
        methods: IndexMap<String, MethodSlot>,
        coroutines: bool,
        host: Uuid,
    ) -> Self {
        Self {
            name,
            config: Arc::new(config),
            methods,
            coroutines,
            host,
            registered_at: Utc::now(),
        }
    }

    /// Unique plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merged configuration passed to every phase call.
    pub fn config(&self) -> &Arc<Options> {
        &self.config
    }

    /// Phases this plugin implements, in declaration order.
    pub fn phases(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn method(&self, phase: &str) -> Option<&MethodSlot> {
        self.methods.get(phase)
    }

    pub fn implements(&self, phase: &str) -> bool {
        self.methods.contains_key(phase)
    }

    /// Whether coroutine methods are driven.
    pub fn coroutines(&self) -> bool {
        self.coroutines
    }

    /// Id of the owning host.
    pub fn host_id(&self) -> Uuid {
        self.host
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

/// Registry of plugin records, keyed by name in registration order.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    records: IndexMap<String, PluginRecord>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `name` is already registered.
    pub fn ensure_vacant(&self, name: &str) -> AppResult<()> {
        if self.records.contains_key(name) {
            return Err(AppError::duplicate_name(format!(
                "Plugin '{name}' is already registered"
            )));
        }
        Ok(())
    }

    /// Inserts a record; an existing record with the same name is never
    /// replaced.
    pub fn insert(&mut self, record: PluginRecord) -> AppResult<()> {
        self.ensure_vacant(&record.name)?;
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Drops every record inserted after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.records.truncate(len);
    }

    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &PluginRecord> {
        self.records.values()
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
