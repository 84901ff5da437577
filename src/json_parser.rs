use crate::error::{GenerationError, Result};
use once_cell::sync::Lazy;
use serde_json::{self, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Cache for loaded JSON files to avoid repeated disk reads
static JSON_CACHE: Lazy<Mutex<HashMap<PathBuf, Value>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Cache for embedded JSON strings
static EMBEDDED_CACHE: Lazy<Mutex<HashMap<String, Value>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn lock<T>(cache: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // a poisoned cache only ever holds fully inserted values
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cached access to the JSON documents the generator reads: materials
/// stores and generator configuration.
pub struct JsonParser;

impl JsonParser {
    /// Load JSON data from a file path, using cache if available
    pub fn load_json<P: AsRef<Path>>(file_path: P) -> Result<Value> {
        let path_buf = file_path.as_ref().to_path_buf();

        if let Some(json) = lock(&JSON_CACHE).get(&path_buf) {
            return Ok(json.clone());
        }

        let json_str =
            fs::read_to_string(&path_buf).map_err(|e| GenerationError::io(&path_buf, e))?;
        let json: Value = serde_json::from_str(&json_str).map_err(|e| {
            GenerationError::invalid(format!("failed to parse {}: {}", path_buf.display(), e))
        })?;

        lock(&JSON_CACHE).insert(path_buf, json.clone());
        Ok(json)
    }

    /// Load JSON data from an embedded string, using cache if available
    pub fn load_json_str(key: &str, json_str: &str) -> Result<Value> {
        if let Some(json) = lock(&EMBEDDED_CACHE).get(key) {
            return Ok(json.clone());
        }

        let json: Value = serde_json::from_str(json_str)
            .map_err(|e| GenerationError::invalid(format!("failed to parse '{}': {}", key, e)))?;

        lock(&EMBEDDED_CACHE).insert(key.to_string(), json.clone());
        Ok(json)
    }

    /// Get a nested value from JSON using a path of keys
    pub fn get_value<'a>(json: &'a Value, path: &[&str]) -> Option<&'a Value> {
        let mut current = json;
        for &key in path {
            current = current.get(key)?;
        }
        Some(current)
    }

    pub fn get_f64(json: &Value, path: &[&str]) -> Option<f64> {
        Self::get_value(json, path).and_then(|v| v.as_f64())
    }

    pub fn get_str<'a>(json: &'a Value, path: &[&str]) -> Option<&'a str> {
        Self::get_value(json, path).and_then(|v| v.as_str())
    }
}
