//! Persistent settings
//!
//! Key-value store addressed by `(namespace, key)`. On the device this is
//! backed by flash; [`MemorySettings`] keeps everything in RAM.

use alloc::string::{String, ToString};
use hashbrown::HashMap;
use spin::Mutex;

use crate::Result;

/// Persistence collaborator.
pub trait Settings: Send + Sync {
    fn get_bool(&self, namespace: &str, key: &str, default: bool) -> bool;
    fn set_bool(&self, namespace: &str, key: &str, value: bool) -> Result<()>;
    fn get_int(&self, namespace: &str, key: &str, default: i32) -> i32;
    fn set_int(&self, namespace: &str, key: &str, value: i32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Value {
    Bool(bool),
    Int(i32),
}

/// In-memory settings store.
pub struct MemorySettings {
    values: Mutex<HashMap<(String, String), Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        self.values
            .lock()
            .get(&(namespace.to_string(), key.to_string()))
            .copied()
    }

    fn put(&self, namespace: &str, key: &str, value: Value) {
        self.values
            .lock()
            .insert((namespace.to_string(), key.to_string()), value);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings for MemorySettings {
    fn get_bool(&self, namespace: &str, key: &str, default: bool) -> bool {
        match self.get(namespace, key) {
            Some(Value::Bool(v)) => v,
            _ => default,
        }
    }

    fn set_bool(&self, namespace: &str, key: &str, value: bool) -> Result<()> {
        self.put(namespace, key, Value::Bool(value));
        Ok(())
    }

    fn get_int(&self, namespace: &str, key: &str, default: i32) -> i32 {
        match self.get(namespace, key) {
            Some(Value::Int(v)) => v,
            _ => default,
        }
    }

    fn set_int(&self, namespace: &str, key: &str, value: i32) -> Result<()> {
        self.put(namespace, key, Value::Int(value));
        Ok(())
    }
}
