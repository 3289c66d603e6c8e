//! Time models: how a raw timestamp field becomes an orderable value, and how
//! a fresh "now" is produced for the last-updated field.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::types::{DataType, Value};

pub const DIRECT_TIME_MODEL: &str = "direct";
pub const LONG_MILLIS_TIME_MODEL: &str = "longmillis";

/// A stateless conversion between raw field values and an ordering representation.
pub trait TimeModel: fmt::Debug + Send + Sync {
    /// Registry name of the model.
    fn name(&self) -> &str;

    /// Convert a raw field value into a value that orders correctly.
    fn comparable(&self, raw: &Value) -> Result<Value>;

    /// Current wall-clock time in the model's stored representation.
    fn now(&self) -> Value;

    /// Type of the values produced by [`TimeModel::now`].
    fn now_type(&self) -> DataType;
}

/// Field values are already ordered as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectTimeModel;

impl TimeModel for DirectTimeModel {
    fn name(&self) -> &str {
        DIRECT_TIME_MODEL
    }

    fn comparable(&self, raw: &Value) -> Result<Value> {
        if raw.is_null() {
            return Err(Error::malformed("event time field is null"));
        }
        Ok(raw.clone())
    }

    fn now(&self) -> Value {
        Value::Timestamp(Utc::now())
    }

    fn now_type(&self) -> DataType {
        DataType::Timestamp
    }
}

/// Field values are signed epoch milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongMillisTimeModel;

impl TimeModel for LongMillisTimeModel {
    fn name(&self) -> &str {
        LONG_MILLIS_TIME_MODEL
    }

    fn comparable(&self, raw: &Value) -> Result<Value> {
        match raw {
            Value::Long(ms) => Ok(Value::Long(*ms)),
            Value::Int(ms) => Ok(Value::Long(i64::from(*ms))),
            Value::Null => Err(Error::malformed("event time field is null")),
            other => Err(Error::malformed(format!(
                "{LONG_MILLIS_TIME_MODEL} time model expects epoch milliseconds, got {other}"
            ))),
        }
    }

    fn now(&self) -> Value {
        Value::Long(Utc::now().timestamp_millis())
    }

    fn now_type(&self) -> DataType {
        DataType::Long
    }
}

/// Named time models available to configuration resolution.
#[derive(Debug, Clone)]
pub struct TimeModelRegistry {
    models: BTreeMap<String, Arc<dyn TimeModel>>,
}

impl TimeModelRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// A registry holding the `direct` and `longmillis` models.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DIRECT_TIME_MODEL, Arc::new(DirectTimeModel));
        registry.register(LONG_MILLIS_TIME_MODEL, Arc::new(LongMillisTimeModel));
        registry
    }

    /// Register `model` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, model: Arc<dyn TimeModel>) {
        self.models.insert(name.into(), model);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn TimeModel>> {
        self.models.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }
}

impl Default for TimeModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
