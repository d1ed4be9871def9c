//! Dynamic parameter dictionaries for index-time and query-time settings.
//!
//! Methods under test accept open-ended `name=value` settings (e.g. HNSW's
//! `M`, `efConstruction`, `ef`). The harness keeps them as an ordered map of
//! string keys to tagged scalars so that serialization to command lines and
//! file names is deterministic: iteration always follows insertion order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            // External binaries take booleans as 0/1
            ParamValue::Bool(v) => write!(f, "{}", u8::from(*v)),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// An insertion-ordered mapping of parameter names to scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Vec<(String, ParamValue)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a parameter, replacing an existing value in place (the key keeps
    /// its original position so the serialized form stays stable).
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Builder-style `set`, for constructing parameter lists inline.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to the `key=value,key=value` form used both for external
    /// binary flags and for namespaced file names.
    ///
    /// Iterates in insertion order, so identical parameter sets always
    /// produce identical strings.
    #[must_use]
    pub fn to_arg_string(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_string_preserves_insertion_order() {
        let p = Params::new()
            .with("M", 20)
            .with("efConstruction", 200)
            .with("post", 0);
        assert_eq!(p.to_arg_string(), "M=20,efConstruction=200,post=0");
    }

    #[test]
    fn arg_string_is_stable_across_calls() {
        let p = Params::new().with("ef", 50);
        assert_eq!(p.to_arg_string(), p.to_arg_string());
    }

    #[test]
    fn set_replaces_in_place() {
        let mut p = Params::new().with("a", 1).with("b", 2);
        p.set("a", 3);
        assert_eq!(p.to_arg_string(), "a=3,b=2");
        assert_eq!(p.get("a"), Some(&ParamValue::Int(3)));
    }

    #[test]
    fn value_rendering() {
        let p = Params::new()
            .with("i", 7)
            .with("f", 0.5)
            .with("b", true)
            .with("s", "abc");
        assert_eq!(p.to_arg_string(), "i=7,f=0.5,b=1,s=abc");
    }

    #[test]
    fn different_values_give_different_strings() {
        let a = Params::new().with("ef", 25);
        let b = Params::new().with("ef", 50);
        assert_ne!(a.to_arg_string(), b.to_arg_string());
    }
}
