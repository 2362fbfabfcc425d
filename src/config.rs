//! Hierarchical key-value configuration tree.
//!
//! The pipeline consumes a tree handed in by an external loader. Only a small
//! surface is needed here: scalar values, nested subblocks, merging (later
//! sources override earlier ones), and per-key read-only marking so the edge
//! builder can freeze the `dependency` key after forcing it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// A scalar configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(f) => Some(*f),
            ConfigValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config key `{0}` is read-only")]
    ReadOnlyKey(String),
}

/// One block of a configuration tree: scalar values plus named child blocks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigBlock {
    values: BTreeMap<String, ConfigValue>,
    children: BTreeMap<String, ConfigBlock>,
    read_only: BTreeSet<String>,
}

impl ConfigBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the named child block, or an empty block if absent.
    pub fn subblock(&self, key: &str) -> ConfigBlock {
        self.children.get(key).cloned().unwrap_or_default()
    }

    /// The named child block, created empty if absent.
    pub fn subblock_mut(&mut self, key: &str) -> &mut ConfigBlock {
        self.children.entry(key.to_string()).or_default()
    }

    /// Overlay `other` onto this block. Values from `other` win, except for
    /// keys already marked read-only here. Read-only markers are unioned.
    pub fn merge(&mut self, other: &ConfigBlock) {
        for (key, value) in &other.values {
            if !self.read_only.contains(key) {
                self.values.insert(key.clone(), value.clone());
            }
        }
        for key in &other.read_only {
            self.read_only.insert(key.clone());
        }
        for (key, child) in &other.children {
            self.subblock_mut(key).merge(child);
        }
    }

    pub fn set_value(
        &mut self,
        key: impl Into<String>,
        value: ConfigValue,
    ) -> Result<(), ConfigError> {
        let key = key.into();
        if self.read_only.contains(&key) {
            return Err(ConfigError::ReadOnlyKey(key));
        }
        self.values.insert(key, value);
        Ok(())
    }

    pub fn mark_read_only(&mut self, key: impl Into<String>) {
        self.read_only.insert(key.into());
    }

    pub fn is_read_only(&self, key: &str) -> bool {
        self.read_only.contains(key)
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ConfigValue::as_int)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }
}
