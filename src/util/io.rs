//! JSON file helpers for node-tree dumps and snapshots.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Error, Result};

/// Load a JSON document whose top level must be an object.
pub fn load_json_object(path: impl AsRef<Path>) -> Result<serde_json::Map<String, serde_json::Value>> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    match serde_json::from_str(&text)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(Error::NotAnObject(json_kind(&other).to_string())),
    }
}

/// Load and deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Serialize `data` as pretty JSON, creating parent directories as needed.
pub fn dump_json<T: Serialize + ?Sized>(data: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(folder) = path.parent() {
        if !folder.as_os_str().is_empty() {
            fs::create_dir_all(folder)?;
        }
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
