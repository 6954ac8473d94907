//! Options objects and the global/local merge rule.

use serde_json::{Map, Value};

use pluggi_core::error::AppError;
use pluggi_core::result::AppResult;

/// An object-shaped options value.
pub type Options = Map<String, Value>;

/// Conforms a caller-supplied options value into an object.
///
/// `None` and `null` become an empty object; anything that is not an object
/// is rejected as an invalid argument. `what` names the argument in the
/// error message.
pub fn conform(value: Option<Value>, what: &str) -> AppResult<Options> {
    match value {
        None | Some(Value::Null) => Ok(Options::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(AppError::invalid_argument(format!(
            "{what} must be an object, got {}",
            type_name(&other)
        ))),
    }
}

/// Merges a plugin's global options with its local options.
///
/// Global values act as defaults and local values override them key by key.
/// The result is always a fresh object; neither input is aliased.
pub fn merge(name: &str, global: Option<&Value>, local: Options) -> AppResult<Options> {
    let mut merged = match global {
        None | Some(Value::Null) => Options::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(AppError::invalid_argument(format!(
                "global options for plugin '{name}' must be an object, got {}",
                type_name(other)
            )));
        }
    };

    for (key, value) in local {
        merged.insert(key, value);
    }

    Ok(merged)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
