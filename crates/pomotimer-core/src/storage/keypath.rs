//! Dot-separated key access over serde-serializable settings.
//!
//! Values are type-checked against the existing value at that key, so
//! `set("clock.tick_interval_ms", "fast")` fails instead of corrupting the
//! file.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::ConfigError;

fn lookup<'a>(root: &'a serde_json::Value, key: &str) -> Option<&'a serde_json::Value> {
    if key.is_empty() {
        return None;
    }
    let mut current = root;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn assign(root: &mut serde_json::Value, key: &str, value: &str) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(key.to_string());
    let invalid = |message: String| ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    };

    let mut parts = key.split('.').peekable();
    if key.is_empty() {
        return Err(unknown());
    }

    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_some() {
            current = current.get_mut(part).ok_or_else(unknown)?;
            continue;
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(part).ok_or_else(unknown)?;
        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(_) => {
                if let Ok(n) = value.parse::<u64>() {
                    serde_json::Value::Number(n.into())
                } else {
                    return Err(invalid(format!("cannot parse '{value}' as a whole number")));
                }
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(part.to_string(), new_value);
        return Ok(());
    }
    Err(unknown())
}

/// Read `key` from `item` as a display string.
pub(crate) fn get<T: Serialize>(item: &T, key: &str) -> Option<String> {
    let json = serde_json::to_value(item).ok()?;
    match lookup(&json, key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Return a copy of `item` with `key` set to `value`.
pub(crate) fn set<T: Serialize + DeserializeOwned>(
    item: &T,
    key: &str,
    value: &str,
) -> Result<T, ConfigError> {
    let mut json =
        serde_json::to_value(item).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
    assign(&mut json, key, value)?;
    serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
