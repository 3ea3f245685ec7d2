//! Script value bridge.
//!
//! Converts rhai values into host types when a script hands the engine a
//! plain map instead of a wrapped object. Field lookup tries historical
//! aliases in priority order (modern short key first, legacy
//! underscore-prefixed key second), so scripts written against either map
//! format generation keep working.
//!
//! Custom data crosses the boundary as a deep copy; scripts never hold an
//! implicit alias into host state.

use rhai::{Dynamic, Map};
use serde_json::Value;

use crate::beatmap::CustomData;
use crate::errors::ScriptBindingError;

fn lookup<'a>(map: &'a Map, aliases: &[&str]) -> Option<&'a Dynamic> {
    aliases.iter().find_map(|key| map.get(*key))
}

/// Read a required float field, trying each alias in order.
pub fn get_f32(map: &Map, aliases: &[&str]) -> Result<f32, ScriptBindingError> {
    let value = lookup(map, aliases).ok_or_else(|| ScriptBindingError::new(aliases))?;
    value
        .as_float()
        .or_else(|_| value.as_int().map(|i| i as f32))
        .map_err(|_| ScriptBindingError::new(aliases))
}

/// Read a required integer field, trying each alias in order. Accepts
/// floats with no fractional part the way a script engine produces them.
pub fn get_i32(map: &Map, aliases: &[&str]) -> Result<i32, ScriptBindingError> {
    let value = lookup(map, aliases).ok_or_else(|| ScriptBindingError::new(aliases))?;
    value
        .as_int()
        .map(|i| i as i32)
        .or_else(|_| value.as_float().map(|f| f as i32))
        .map_err(|_| ScriptBindingError::new(aliases))
}

/// Read a required string field, trying each alias in order.
pub fn get_string(map: &Map, aliases: &[&str]) -> Result<String, ScriptBindingError> {
    let value = lookup(map, aliases).ok_or_else(|| ScriptBindingError::new(aliases))?;
    value
        .clone()
        .into_string()
        .map_err(|_| ScriptBindingError::new(aliases))
}

/// Read an optional float field, falling back to a default.
pub fn opt_f32(map: &Map, aliases: &[&str], default: f32) -> f32 {
    match lookup(map, aliases) {
        Some(value) => value
            .as_float()
            .or_else(|_| value.as_int().map(|i| i as f32))
            .unwrap_or(default),
        None => default,
    }
}

/// Read an optional integer field, falling back to a default.
pub fn opt_i32(map: &Map, aliases: &[&str], default: i32) -> i32 {
    match lookup(map, aliases) {
        Some(value) => value
            .as_int()
            .map(|i| i as i32)
            .or_else(|_| value.as_float().map(|f| f as i32))
            .unwrap_or(default),
        None => default,
    }
}

/// Read an optional boolean field, falling back to a default.
pub fn opt_bool(map: &Map, key: &str, default: bool) -> bool {
    map.get(key).and_then(|v| v.as_bool().ok()).unwrap_or(default)
}

/// Extract a custom data payload as a deep copy. Missing or non-map values
/// yield an empty payload; custom data is always optional.
pub fn custom_data(map: &Map, aliases: &[&str]) -> CustomData {
    match lookup(map, aliases).and_then(|v| v.clone().try_cast::<Map>()) {
        Some(inner) => map_to_json(&inner),
        None => CustomData::new(),
    }
}

/// Deep-copy a rhai map into JSON. Values a script can hold but JSON
/// cannot (closures, host types) degrade to null.
pub fn map_to_json(map: &Map) -> CustomData {
    map.iter()
        .map(|(key, value)| (key.to_string(), dynamic_to_json(value)))
        .collect()
}

pub fn dynamic_to_json(value: &Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Ok(b) = value.as_bool() {
        return Value::Bool(b);
    }
    if let Ok(i) = value.as_int() {
        return Value::from(i);
    }
    if let Ok(f) = value.as_float() {
        return Value::from(f as f64);
    }
    if let Ok(s) = value.clone().into_string() {
        return Value::String(s);
    }
    if let Some(array) = value.clone().try_cast::<rhai::Array>() {
        return Value::Array(array.iter().map(dynamic_to_json).collect());
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        return Value::Object(map_to_json(&map));
    }
    Value::Null
}

/// Rebuild a rhai value from JSON, again as a fresh deep copy.
pub fn json_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else {
                Dynamic::from(n.as_f64().unwrap_or(0.0) as f32)
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let array: rhai::Array = items.iter().map(json_to_dynamic).collect();
            Dynamic::from(array)
        }
        Value::Object(fields) => {
            let mut map = Map::new();
            for (key, item) in fields {
                map.insert(key.as_str().into(), json_to_dynamic(item));
            }
            Dynamic::from(map)
        }
    }
}

/// Convert a custom data payload into a rhai map for a wrapper getter.
pub fn custom_data_to_map(data: &CustomData) -> Map {
    let mut map = Map::new();
    for (key, value) in data {
        map.insert(key.as_str().into(), json_to_dynamic(value));
    }
    map
}
