//! Argument shapes accepted by [`Host::plugin`](crate::host::Host::plugin).
//!
//! Every overload is resolved here, at the boundary, into one of three
//! variants. The rest of registration only ever sees a [`Registration`].

use serde_json::Value;

use crate::unit::PluginUnit;

/// One registration call's arguments.
#[derive(Debug, Clone)]
pub enum Registration {
    /// Explicit name and unit.
    Named {
        name: String,
        unit: PluginUnit,
        options: Option<Value>,
    },
    /// A bare name; the unit is resolved and loaded.
    ByName { name: String, options: Option<Value> },
    /// A unit that names itself.
    Unit {
        unit: PluginUnit,
        options: Option<Value>,
    },
}

impl Registration {
    /// The local options supplied with the call.
    pub fn options(&self) -> Option<&Value> {
        match self {
            Self::Named { options, .. }
            | Self::ByName { options, .. }
            | Self::Unit { options, .. } => options.as_ref(),
        }
    }
}

impl From<(&str, PluginUnit)> for Registration {
    fn from((name, unit): (&str, PluginUnit)) -> Self {
        Self::Named {
            name: name.to_string(),
            unit,
            options: None,
        }
    }
}

impl From<(&str, PluginUnit, Value)> for Registration {
    fn from((name, unit, options): (&str, PluginUnit, Value)) -> Self {
        Self::Named {
            name: name.to_string(),
            unit,
            options: Some(options),
        }
    }
}

impl From<&str> for Registration {
    fn from(name: &str) -> Self {
        Self::ByName {
            name: name.to_string(),
            options: None,
        }
    }
}

impl From<String> for Registration {
    fn from(name: String) -> Self {
        Self::ByName {
            name,
            options: None,
        }
    }
}

impl From<(&str, Value)> for Registration {
    fn from((name, options): (&str, Value)) -> Self {
        Self::ByName {
            name: name.to_string(),
            options: Some(options),
        }
    }
}

impl From<PluginUnit> for Registration {
    fn from(unit: PluginUnit) -> Self {
        Self::Unit {
            unit,
            options: None,
        }
    }
}

impl From<(PluginUnit, Value)> for Registration {
    fn from((unit, options): (PluginUnit, Value)) -> Self {
        Self::Unit {
            unit,
            options: Some(options),
        }
    }
}
