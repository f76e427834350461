//! Knob snapshots and the seam to the live settings store.
//!
//! The search never touches live configuration: it clones a `KnobSettings`
//! snapshot and applies hypothetical actions to the clone. Only the planner
//! calls `SettingsStore::apply`, once per cycle.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{Error, Result};

/// Current value of one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KnobValue {
    Bool(bool),
    Int(i64),
}

impl fmt::Display for KnobValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnobValue::Bool(b) => write!(f, "{b}"),
            KnobValue::Int(v) => write!(f, "{v}"),
        }
    }
}

/// Ordered snapshot of knob values (BTreeMap keeps hashing/logging stable).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnobSettings {
    values: BTreeMap<String, KnobValue>,
}

impl KnobSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: KnobValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: KnobValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<KnobValue> {
        self.values.get(name).copied()
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.values.get(name) {
            Some(KnobValue::Bool(b)) => Ok(*b),
            Some(other) => Err(Error::TypeMismatch(format!(
                "knob '{name}' is not boolean (value {other})"
            ))),
            None => Err(Error::NotFound(format!("knob '{name}'"))),
        }
    }

    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(KnobValue::Int(v)) => Ok(*v),
            Some(other) => Err(Error::TypeMismatch(format!(
                "knob '{name}' is not numeric (value {other})"
            ))),
            None => Err(Error::NotFound(format!("knob '{name}'"))),
        }
    }

    /// Boolean lookup that falls back to `default` when the knob is absent.
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.values.get(name) {
            Some(KnobValue::Bool(b)) => *b,
            _ => default,
        }
    }

    /// Numeric lookup that falls back to `default` when the knob is absent.
    pub fn int_or(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(KnobValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, KnobValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The live configuration collaborator.
pub trait SettingsStore {
    /// Current values of every knob.
    fn snapshot(&self) -> KnobSettings;

    /// Mutate live configuration by applying `action`.
    fn apply(&mut self, action: &Action) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_report_mismatch_and_absence() {
        let s = KnobSettings::new()
            .with("enable_jit", KnobValue::Bool(true))
            .with("batch_size", KnobValue::Int(64));
        assert!(s.get_bool("enable_jit").unwrap());
        assert_eq!(s.get_int("batch_size").unwrap(), 64);
        assert!(matches!(s.get_int("enable_jit"), Err(Error::TypeMismatch(_))));
        assert!(matches!(s.get_bool("missing"), Err(Error::NotFound(_))));
        assert_eq!(s.int_or("missing", 9), 9);
    }

    #[test]
    fn serializes_as_plain_map() {
        let s = KnobSettings::new().with("a", KnobValue::Int(1));
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"a":1}"#);
    }
}
